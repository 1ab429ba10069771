use std::sync::Mutex;

use crate::error::LedgerError;
use crate::store::{Entry, Ledger, LedgerState, WriteBatch};

/// Process-local ledger. Contents are lost on exit.
#[derive(Default)]
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Ledger for MemoryLedger {
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
        Ok(state.apply(batch))
    }

    fn sequence(&self) -> Result<u64, LedgerError> {
        let state = self.state.lock().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(state.sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_delete() {
        let ledger = MemoryLedger::new();
        assert!(ledger.get("k").unwrap().is_none());

        let v1 = ledger.put("k", "one".into()).unwrap();
        let entry = ledger.get("k").unwrap().unwrap();
        assert_eq!(entry.value, "one");
        assert_eq!(entry.version, v1);

        let v2 = ledger.put("k", "two".into()).unwrap();
        assert!(v2 > v1);

        ledger.delete("k").unwrap();
        assert!(ledger.get("k").unwrap().is_none());
        assert_eq!(ledger.sequence().unwrap(), 3);
    }

    #[test]
    fn range_scan_is_ordered_and_end_exclusive() {
        let ledger = MemoryLedger::new();
        for key in ["D0002", "D0001", "E", "C", "D"] {
            ledger.put(key, key.to_string()).unwrap();
        }
        let keys: Vec<String> = ledger
            .range_scan("D", "E")
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["D", "D0001", "D0002"]);
    }

    #[test]
    fn stale_commit_applies_nothing() {
        let ledger = MemoryLedger::new();
        let v = ledger.put("a", "1".into()).unwrap();

        let mut stale = WriteBatch::new();
        stale.expect_version("a", Some(v));
        stale.put("a", "from-stale");
        stale.put("b", "side-effect");

        ledger.put("a", "2".into()).unwrap();

        let err = ledger.commit(stale).unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(ref k) if k == "a"));
        assert_eq!(ledger.get("a").unwrap().unwrap().value, "2");
        assert!(ledger.get("b").unwrap().is_none());
    }

    #[test]
    fn delete_range_counts_removed() {
        let ledger = MemoryLedger::new();
        for key in ["T1", "T2", "D0001"] {
            ledger.put(key, "{}".into()).unwrap();
        }
        assert_eq!(ledger.delete_range("T", "U").unwrap(), 2);
        assert_eq!(ledger.delete_range("T", "U").unwrap(), 0);
        assert!(ledger.get("D0001").unwrap().is_some());
    }
}
