//! Crash-recoverable processing state.
//!
//! Progress is a small JSON document on disk: the resumption cursor, running
//! totals, and the per-label histogram. Reads substitute defaults for
//! missing or corrupt files; writes go through a temp-file rename so a
//! concurrent reader never sees a half-written record. One state file per
//! store/query combination; single-writer discipline is the caller's
//! responsibility.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::Result;

/// Persisted processing state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    /// Opaque continuation token, or `None` when no resumption is pending.
    pub next_cursor: Option<String>,
    /// Total messages processed across runs.
    pub total_processed: u64,
    /// Cumulative per-label counts.
    #[serde(default)]
    pub history: BTreeMap<String, u64>,
    /// Timestamp of the last save.
    pub last_run: Option<DateTime<Utc>>,
    /// Identifier of the backing store the state belongs to.
    pub backing_store_id: Option<String>,
}

/// Loads and persists a [`StateRecord`] at a fixed path.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    record: StateRecord,
}

impl StateStore {
    /// Open a state store, loading any existing record.
    ///
    /// A missing file yields defaults. A file that fails to parse also
    /// yields defaults - the failure is logged, not raised, so a corrupt
    /// state file can never block a run.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let record = Self::load_from(&path);
        Self { path, record }
    }

    fn load_from(path: &Path) -> StateRecord {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(record) => record,
                Err(e) => {
                    error!("failed to parse state file {}: {e}", path.display());
                    StateRecord::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StateRecord::default(),
            Err(e) => {
                error!("failed to read state file {}: {e}", path.display());
                StateRecord::default()
            }
        }
    }

    /// The current in-memory record.
    #[must_use]
    pub const fn record(&self) -> &StateRecord {
        &self.record
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a resumption cursor is pending.
    #[must_use]
    pub const fn is_resumable(&self) -> bool {
        self.record.next_cursor.is_some()
    }

    /// Persist the given progress, overwriting the stored record.
    ///
    /// The write is atomic: the record goes to a sibling temp file which is
    /// then renamed over the target.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or renamed. Callers in
    /// the pipeline treat a failed save as best-effort and keep running.
    pub fn save(
        &mut self,
        cursor: Option<String>,
        total_processed: u64,
        history: BTreeMap<String, u64>,
        backing_store_id: &str,
    ) -> Result<()> {
        self.record.next_cursor = cursor;
        self.record.total_processed = total_processed;
        self.record.history = history;
        self.record.last_run = Some(Utc::now());
        self.record.backing_store_id = Some(backing_store_id.to_string());

        let serialized = serde_json::to_string_pretty(&self.record)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serialized)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Remove the backing file and reset to defaults.
    pub fn clear(&mut self) {
        self.record = StateRecord::default();
        if let Err(e) = fs::remove_file(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!("failed to remove state file {}: {e}", self.path.display());
        }
    }
}
