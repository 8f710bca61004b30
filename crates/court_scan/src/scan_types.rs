use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date format used in slot identifiers and schedule URLs
pub const SLOT_DATE_FORMAT: &str = "%d.%m.%Y";

/// Separator between the date and the rest of a slot identifier
const DATE_SEPARATOR: &str = " - ";

/// Stable string key for one bookable (date, resource, time) unit
///
/// Formatted as `"01.01.2030 - Court 1: 18:00"`. Equality and hashing are plain
/// string comparisons, so identifiers read back from disk match freshly built ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(String);

impl SlotId {
    /// Builds the identifier for `resource_index` (1-based) at `time_label` on `date`
    pub fn new(
        date: NaiveDate,
        resource_label: &str,
        resource_index: usize,
        time_label: &str,
    ) -> Self {
        Self(format!(
            "{}{}{} {}: {}",
            date.format(SLOT_DATE_FORMAT),
            DATE_SEPARATOR,
            resource_label,
            resource_index,
            time_label
        ))
    }

    /// The date portion of the key, used to group notification lines
    pub fn date_part(&self) -> &str {
        self.0
            .split_once(DATE_SEPARATOR)
            .map_or(self.0.as_str(), |(date, _)| date)
    }

    /// The full key
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SlotId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SlotId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status recorded for a slot in a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    /// The slot can be booked
    Available,
}

/// The set of available slots observed by one scan
///
/// Keeps discovery order for notifications; a slot is stored at most once and
/// equality ignores order.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    order: Vec<SlotId>,
    seen: HashSet<SlotId>,
}

/// The snapshot persisted by the previous run
pub type PersistedState = Snapshot;

/// Newly available slots reported in one message, in discovery order
pub type NotificationBatch = Vec<SlotId>;

impl Snapshot {
    /// Creates an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `slot` as available. Returns `false` if it was already present.
    pub fn insert(&mut self, slot: SlotId) -> bool {
        if self.seen.contains(&slot) {
            return false;
        }
        self.seen.insert(slot.clone());
        self.order.push(slot);
        true
    }

    /// Whether `slot` is present
    pub fn contains(&self, slot: &SlotId) -> bool {
        self.seen.contains(slot)
    }

    /// Slots in discovery order
    pub fn iter(&self) -> impl Iterator<Item = &SlotId> {
        self.order.iter()
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no slot is available
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Appends every slot of `other` that is not present yet
    pub fn extend(&mut self, other: impl IntoIterator<Item = SlotId>) {
        for slot in other {
            self.insert(slot);
        }
    }

    /// Mapping form written to the state file
    pub fn to_status_map(&self) -> BTreeMap<&SlotId, SlotStatus> {
        self.order
            .iter()
            .map(|slot| (slot, SlotStatus::Available))
            .collect()
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.seen == other.seen
    }
}

impl Eq for Snapshot {}

impl FromIterator<SlotId> for Snapshot {
    fn from_iter<I: IntoIterator<Item = SlotId>>(iter: I) -> Self {
        let mut snapshot = Snapshot::new();
        snapshot.extend(iter);
        snapshot
    }
}

/// Failure while fetching or reading the schedule for one date
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// The request never produced a response
    #[error("Request failed for URL: {url}, error: {message}")]
    Network {
        /// Requested URL
        url: String,
        /// Transport error
        message: String,
    },

    /// The server answered with a non-success status
    #[error("HTTP error {status} for URL: {url}")]
    Http {
        /// Response status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// The page did not have the expected schedule shape
    #[error("Error processing HTML content: {0}")]
    Parse(String),

    /// The HTTP client could not be built
    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()
    }

    #[test]
    fn test_slot_id_format() {
        let slot = SlotId::new(date(), "Court", 1, "18:00");
        assert_eq!(slot.as_str(), "01.01.2030 - Court 1: 18:00");
        assert_eq!(slot.date_part(), "01.01.2030");
        assert_eq!(slot, SlotId::from("01.01.2030 - Court 1: 18:00"));
    }

    #[test]
    fn test_date_part_without_separator() {
        assert_eq!(SlotId::from("legacy").date_part(), "legacy");
    }

    #[test]
    fn test_snapshot_keeps_first_occurrence() {
        let mut snapshot = Snapshot::new();
        assert!(snapshot.insert(SlotId::from("b")));
        assert!(snapshot.insert(SlotId::from("a")));
        assert!(!snapshot.insert(SlotId::from("b")));

        let order: Vec<&str> = snapshot.iter().map(SlotId::as_str).collect();
        assert_eq!(order, vec!["b", "a"]);
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_snapshot_equality_ignores_order() {
        let left: Snapshot = ["a", "b"].into_iter().map(SlotId::from).collect();
        let right: Snapshot = ["b", "a"].into_iter().map(SlotId::from).collect();
        assert_eq!(left, right);
        assert_ne!(left, Snapshot::new());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&SlotStatus::Available).unwrap();
        assert_eq!(json, "\"available\"");
    }
}
