use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{debug, info};

use crate::error::LedgerError;
use crate::store::{Entry, Ledger, LedgerState, WriteBatch};

/// Ledger persisted as a single JSON snapshot.
///
/// Every commit rewrites the snapshot to a sibling temp file and renames it
/// over the old one, so a crash leaves either the previous or the new state
/// on disk. The in-memory state is only swapped after the rename succeeds.
pub struct FileLedger {
    path: PathBuf,
    state: Mutex<LedgerState>,
}

impl FileLedger {
    /// Open the snapshot at `path`, starting empty when the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let state = if path.exists() {
            let json = std::fs::read_to_string(&path)?;
            serde_json::from_str(&json).map_err(|source| LedgerError::Serialization {
                key: path.display().to_string(),
                source,
            })?
        } else {
            LedgerState::default()
        };

        info!(
            "Ledger: file backend at {} ({} keys, sequence {})",
            path.display(),
            state.entries.len(),
            state.sequence
        );

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    fn persist(&self, state: &LedgerState) -> Result<(), LedgerError> {
        let json = serde_json::to_string(state).map_err(|source| LedgerError::Serialization {
            key: self.path.display().to_string(),
            source,
        })?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!("Ledger snapshot written at sequence {}", state.sequence);
        Ok(())
    }
}

impl Ledger for FileLedger {
    fn get(&self, key: &str) -> Result<Option<Entry>, LedgerError> {
        let state = self.state.lock().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(state.get(key))
    }

    fn range_scan(&self, start: &str, end: &str) -> Result<Vec<(String, Entry)>, LedgerError> {
        let state = self.state.lock().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(state.range(start, end))
    }

    fn commit(&self, batch: WriteBatch) -> Result<u64, LedgerError> {
        let mut state = self.state.lock().map_err(|_| LedgerError::LockPoisoned)?;
        state.validate(&batch)?;
        if batch.is_empty() {
            return Ok(state.sequence);
        }

        let mut next = state.clone();
        let version = next.apply(batch);
        self.persist(&next)?;
        *state = next;
        Ok(version)
    }

    fn sequence(&self) -> Result<u64, LedgerError> {
        let state = self.state.lock().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(state.sequence)
    }
}
