use crate::scan_types::{NotificationBatch, PersistedState, Snapshot};

/// Outcome of comparing a fresh snapshot with the persisted one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOutcome {
    /// Slots that became available since the previous run, in discovery order
    pub to_notify: NotificationBatch,
    /// State to persist for the next run
    pub next_state: PersistedState,
}

/// Find newly available slots by comparing with the previous run
///
/// The next state replaces the previous one wholesale, so slots that are no
/// longer listed are forgotten without a notification.
pub fn diff(previous: &PersistedState, current: Snapshot) -> DiffOutcome {
    let to_notify = current
        .iter()
        .filter(|slot| !previous.contains(slot))
        .cloned()
        .collect();

    DiffOutcome {
        to_notify,
        next_state: current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan_types::SlotId;

    fn snapshot(keys: &[&str]) -> Snapshot {
        keys.iter().copied().map(SlotId::from).collect()
    }

    fn keys(slots: &[SlotId]) -> Vec<&str> {
        slots.iter().map(SlotId::as_str).collect()
    }

    #[test]
    fn test_unchanged_snapshot_notifies_nothing() {
        for state in [
            snapshot(&[]),
            snapshot(&["a"]),
            snapshot(&["01.01.2030 - Court 1: 18:00", "01.01.2030 - Court 2: 18:00"]),
        ] {
            let outcome = diff(&state, state.clone());
            assert!(outcome.to_notify.is_empty());
            assert_eq!(outcome.next_state, state);
        }
    }

    #[test]
    fn test_only_new_slots_are_notified_in_discovery_order() {
        let previous = snapshot(&["b", "x"]);
        let current = snapshot(&["c", "b", "a"]);

        let outcome = diff(&previous, current.clone());

        assert_eq!(keys(&outcome.to_notify), vec!["c", "a"]);
        for slot in &outcome.to_notify {
            assert!(current.contains(slot));
            assert!(!previous.contains(slot));
        }
        assert_eq!(outcome.next_state, current);
    }

    #[test]
    fn test_stale_slots_are_dropped() {
        let previous = snapshot(&["gone", "kept"]);
        let outcome = diff(&previous, snapshot(&["kept"]));

        assert!(outcome.to_notify.is_empty());
        assert!(!outcome.next_state.contains(&SlotId::from("gone")));
        assert_eq!(outcome.next_state, snapshot(&["kept"]));
    }

    #[test]
    fn test_empty_current_forgets_everything() {
        let outcome = diff(&snapshot(&["a", "b"]), Snapshot::new());
        assert!(outcome.to_notify.is_empty());
        assert!(outcome.next_state.is_empty());
    }

    #[test]
    fn test_cold_start_notifies_every_slot() {
        let current = snapshot(&["01.01.2030 - Court 1: 18:00", "02.01.2030 - Court 1: 18:00"]);
        let outcome = diff(&Snapshot::new(), current);
        assert_eq!(
            keys(&outcome.to_notify),
            vec!["01.01.2030 - Court 1: 18:00", "02.01.2030 - Court 1: 18:00"]
        );
    }
}
