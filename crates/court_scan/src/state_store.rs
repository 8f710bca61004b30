use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::run_log::RunLog;
use crate::scan_types::{PersistedState, SlotId, SlotStatus, Snapshot};

/// Failure while reading or writing the availability file
#[derive(thiserror::Error, Debug)]
pub enum StateError {
    /// The file exists but could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        /// State file path
        path: String,
        /// Underlying IO error
        source: io::Error,
    },

    /// The file could not be written or replaced
    #[error("failed to write {path}: {source}")]
    Write {
        /// State file path
        path: String,
        /// Underlying IO error
        source: io::Error,
    },

    /// The file is not a JSON object of slot statuses
    #[error("corrupt state file {path}: {source}")]
    Corrupt {
        /// State file path
        path: String,
        /// JSON error
        source: serde_json::Error,
    },

    /// The snapshot could not be encoded
    #[error("failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),
}

/// JSON file holding the snapshot of the previous run
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Create a store backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the previous snapshot, treating any failure as an empty state
    pub fn load(&self, run_log: &RunLog) -> PersistedState {
        self.try_load().unwrap_or_else(|e| {
            run_log.error(&format!("Error loading availability: {}", e));
            Snapshot::new()
        })
    }

    /// Load the previous snapshot; a missing file is an empty state
    pub fn try_load(&self) -> Result<PersistedState, StateError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No state file at {}, starting empty", self.path.display());
                return Ok(Snapshot::new());
            }
            Err(source) => {
                return Err(StateError::Read {
                    path: self.path.display().to_string(),
                    source,
                });
            }
        };

        let entries: BTreeMap<SlotId, SlotStatus> =
            serde_json::from_str(&contents).map_err(|source| StateError::Corrupt {
                path: self.path.display().to_string(),
                source,
            })?;

        Ok(entries.into_keys().collect())
    }

    /// Replace the stored snapshot, logging a failure instead of returning it
    pub fn save(&self, state: &PersistedState, run_log: &RunLog) {
        if let Err(e) = self.try_save(state) {
            run_log.error(&format!("Error saving availability: {}", e));
        }
    }

    /// Replace the stored snapshot
    ///
    /// Writes a sibling temporary file and renames it over the target, so a
    /// reader never sees a half-written state.
    pub fn try_save(&self, state: &PersistedState) -> Result<(), StateError> {
        let json = serde_json::to_string_pretty(&state.to_status_map())?;
        let tmp_path = self.tmp_path();

        let write_error = |source: io::Error| StateError::Write {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_error)?;
            }
        }
        fs::write(&tmp_path, json).map_err(write_error)?;
        fs::rename(&tmp_path, &self.path).map_err(write_error)?;

        debug!("Saved {} slot(s) to {}", state.len(), self.path.display());
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(keys: &[&str]) -> Snapshot {
        keys.iter().copied().map(SlotId::from).collect()
    }

    fn fixture() -> (tempfile::TempDir, StateStore, RunLog) {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("availability.json"));
        let log = RunLog::new(dir.path().join("error.log"), dir.path().join("info.log"));
        (dir, store, log)
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let (_dir, store, log) = fixture();
        assert!(store.try_load().unwrap().is_empty());
        assert!(store.load(&log).is_empty());
        assert_eq!(log.read_errors().unwrap(), "");
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let (_dir, store, _log) = fixture();
        for state in [
            snapshot(&[]),
            snapshot(&["01.01.2030 - Court 1: 18:00"]),
            snapshot(&["02.01.2030 - Court 2: 19:00", "01.01.2030 - Court 1: 18:00"]),
        ] {
            store.try_save(&state).unwrap();
            assert_eq!(store.try_load().unwrap(), state);
        }
    }

    #[test]
    fn test_saved_file_is_pretty_status_map() {
        let (_dir, store, _log) = fixture();
        store
            .try_save(&snapshot(&["01.01.2030 - Court 1: 18:00"]))
            .unwrap();

        let contents = fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            contents,
            "{\n  \"01.01.2030 - Court 1: 18:00\": \"available\"\n}"
        );
        assert!(!store.tmp_path().exists());
    }

    #[test]
    fn test_save_overwrites_previous_state() {
        let (_dir, store, _log) = fixture();
        store.try_save(&snapshot(&["old"])).unwrap();
        store.try_save(&snapshot(&["new"])).unwrap();
        assert_eq!(store.try_load().unwrap(), snapshot(&["new"]));
    }

    #[test]
    fn test_corrupt_file_is_logged_and_loads_empty() {
        let (_dir, store, log) = fixture();
        fs::write(store.path(), "{ not json").unwrap();

        assert!(matches!(store.try_load(), Err(StateError::Corrupt { .. })));
        assert!(store.load(&log).is_empty());

        let errors = log.read_errors().unwrap();
        assert_eq!(errors.lines().count(), 1);
        assert!(errors.contains("Error loading availability"));
    }

    #[test]
    fn test_unknown_status_is_corrupt() {
        let (_dir, store, _log) = fixture();
        fs::write(store.path(), r#"{"a": "booked"}"#).unwrap();
        assert!(matches!(store.try_load(), Err(StateError::Corrupt { .. })));
    }

    #[test]
    fn test_failed_save_is_logged() {
        let (dir, _store, log) = fixture();
        // A directory in place of the file makes the rename fail
        let blocked = dir.path().join("blocked");
        fs::create_dir_all(blocked.join("inner")).unwrap();
        let store = StateStore::new(blocked.clone());

        store.save(&snapshot(&["a"]), &log);

        let errors = log.read_errors().unwrap();
        assert!(errors.contains("Error saving availability"));
    }
}
