use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// A stored record plus the commit sequence that last wrote it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub value: String,
    pub version: u64,
}

/// Writes applied together by one commit, guarded by the versions observed
/// when the keys were read.
///
/// `reads` maps a key to the version seen (`None` = key was absent). `writes`
/// maps a key to its new value (`None` = delete).
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    pub reads: BTreeMap<String, Option<u64>>,
    pub writes: BTreeMap<String, Option<String>>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.writes.insert(key.into(), Some(value.into()));
    }

    pub fn delete(&mut self, key: impl Into<String>) {
        self.writes.insert(key.into(), None);
    }

    pub fn expect_version(&mut self, key: impl Into<String>, version: Option<u64>) {
        self.reads.insert(key.into(), version);
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Ordered key-value store with optimistic, all-or-nothing commits.
pub trait Ledger: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Entry>, LedgerError>;

    /// Entries with `start <= key < end`, in byte-wise key order.
    fn range_scan(&self, start: &str, end: &str) -> Result<Vec<(String, Entry)>, LedgerError>;

    /// Validate every read version and apply every write, or apply nothing.
    /// Returns the commit sequence stamped on the written keys.
    fn commit(&self, batch: WriteBatch) -> Result<u64, LedgerError>;

    /// Highest commit sequence applied so far.
    fn sequence(&self) -> Result<u64, LedgerError>;

    /// Unconditional single-key write.
    fn put(&self, key: &str, value: String) -> Result<u64, LedgerError> {
        let mut batch = WriteBatch::new();
        batch.put(key, value);
        self.commit(batch)
    }

    /// Unconditional single-key delete.
    fn delete(&self, key: &str) -> Result<u64, LedgerError> {
        let mut batch = WriteBatch::new();
        batch.delete(key);
        self.commit(batch)
    }

    /// Delete every key in `[start, end)`. Returns how many were removed.
    fn delete_range(&self, start: &str, end: &str) -> Result<usize, LedgerError> {
        let entries = self.range_scan(start, end)?;
        if entries.is_empty() {
            return Ok(0);
        }
        let mut batch = WriteBatch::new();
        for (key, _) in &entries {
            batch.delete(key.clone());
        }
        self.commit(batch)?;
        Ok(entries.len())
    }
}

/// In-memory contents shared by every backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct LedgerState {
    pub sequence: u64,
    pub entries: BTreeMap<String, Entry>,
}

impl LedgerState {
    pub fn get(&self, key: &str) -> Option<Entry> {
        self.entries.get(key).cloned()
    }

    pub fn range(&self, start: &str, end: &str) -> Vec<(String, Entry)> {
        if start >= end {
            return Vec::new();
        }
        self.entries
            .range::<str, _>((
                std::ops::Bound::Included(start),
                std::ops::Bound::Excluded(end),
            ))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Reject the batch if any key it read has moved on.
    pub fn validate(&self, batch: &WriteBatch) -> Result<(), LedgerError> {
        for (key, seen) in &batch.reads {
            let current = self.entries.get(key).map(|e| e.version);
            if current != *seen {
                return Err(LedgerError::Conflict(key.clone()));
            }
        }
        Ok(())
    }

    /// Apply an already-validated batch under a fresh sequence number.
    pub fn apply(&mut self, batch: WriteBatch) -> u64 {
        if batch.writes.is_empty() {
            return self.sequence;
        }
        self.sequence += 1;
        let version = self.sequence;
        for (key, value) in batch.writes {
            match value {
                Some(value) => {
                    self.entries.insert(key, Entry { value, version });
                }
                None => {
                    self.entries.remove(&key);
                }
            }
        }
        version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_stamps_one_version_per_commit() {
        let mut state = LedgerState::default();
        let mut batch = WriteBatch::new();
        batch.put("a", "1");
        batch.put("b", "2");
        assert_eq!(state.apply(batch), 1);
        assert_eq!(state.get("a").unwrap().version, 1);
        assert_eq!(state.get("b").unwrap().version, 1);
    }

    #[test]
    fn validate_detects_insert_after_absent_read() {
        let mut state = LedgerState::default();
        let mut guarded = WriteBatch::new();
        guarded.expect_version("k", None);
        guarded.put("k", "mine");
        assert!(state.validate(&guarded).is_ok());

        let mut other = WriteBatch::new();
        other.put("k", "theirs");
        state.apply(other);
        assert!(matches!(state.validate(&guarded), Err(LedgerError::Conflict(k)) if k == "k"));
    }

    #[test]
    fn inverted_range_is_empty() {
        let mut state = LedgerState::default();
        let mut batch = WriteBatch::new();
        batch.put("m", "x");
        state.apply(batch);
        assert!(state.range("z", "a").is_empty());
        assert_eq!(state.range("a", "z").len(), 1);
    }
}
