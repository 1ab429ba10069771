use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::LedgerError;
use crate::store::{Ledger, WriteBatch};

/// Read-modify-write unit over a [`Ledger`].
///
/// Reads go straight to the ledger and remember the version they observed;
/// writes are buffered and become visible to later reads in the same
/// transaction. `commit` hands everything to the ledger, which rejects the
/// whole batch if any observed key moved on in the meantime.
pub struct Transaction<'a> {
    ledger: &'a dyn Ledger,
    tx_id: String,
    batch: WriteBatch,
}

impl<'a> Transaction<'a> {
    pub fn begin(ledger: &'a dyn Ledger) -> Self {
        Self {
            ledger,
            tx_id: uuid::Uuid::new_v4().simple().to_string(),
            batch: WriteBatch::new(),
        }
    }

    /// Unique ID of this transaction, used to key the records it creates.
    pub fn id(&self) -> &str {
        &self.tx_id
    }

    fn observe(&mut self, key: &str, version: Option<u64>) {
        // First observation wins so a key that changes mid-transaction conflicts.
        self.batch
            .reads
            .entry(key.to_string())
            .or_insert(version);
    }

    pub fn get(&mut self, key: &str) -> Result<Option<String>, LedgerError> {
        if let Some(pending) = self.batch.writes.get(key) {
            return Ok(pending.clone());
        }
        let entry = self.ledger.get(key)?;
        self.observe(key, entry.as_ref().map(|e| e.version));
        Ok(entry.map(|e| e.value))
    }

    /// Ordered `[start, end)` scan including this transaction's pending writes.
    pub fn scan(&mut self, start: &str, end: &str) -> Result<Vec<(String, String)>, LedgerError> {
        let mut merged: BTreeMap<String, String> = BTreeMap::new();
        for (key, entry) in self.ledger.range_scan(start, end)? {
            self.observe(&key, Some(entry.version));
            merged.insert(key, entry.value);
        }
        for (key, pending) in &self.batch.writes {
            if key.as_str() < start || key.as_str() >= end {
                continue;
            }
            match pending {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }

    pub fn get_json<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>, LedgerError> {
        match self.get(key)? {
            Some(raw) => decode(key, &raw).map(Some),
            None => Ok(None),
        }
    }

    pub fn scan_json<T: DeserializeOwned>(
        &mut self,
        start: &str,
        end: &str,
    ) -> Result<Vec<(String, T)>, LedgerError> {
        self.scan(start, end)?
            .into_iter()
            .map(|(key, raw)| {
                let value = decode(&key, &raw)?;
                Ok((key, value))
            })
            .collect()
    }

    pub fn put(&mut self, key: &str, value: String) {
        self.batch.put(key, value);
    }

    pub fn put_json<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), LedgerError> {
        let raw = serde_json::to_string(value).map_err(|source| LedgerError::Serialization {
            key: key.to_string(),
            source,
        })?;
        self.put(key, raw);
        Ok(())
    }

    pub fn delete(&mut self, key: &str) {
        self.batch.delete(key);
    }

    /// Atomically apply the buffered writes. Returns the commit sequence.
    pub fn commit(self) -> Result<u64, LedgerError> {
        debug!(
            tx = %self.tx_id,
            reads = self.batch.reads.len(),
            writes = self.batch.writes.len(),
            "Committing transaction"
        );
        self.ledger.commit(self.batch)
    }
}

pub(crate) fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T, LedgerError> {
    serde_json::from_str(raw).map_err(|source| LedgerError::Serialization {
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryLedger;

    #[test]
    fn reads_see_own_writes() {
        let ledger = MemoryLedger::new();
        ledger.put("a", "old".into()).unwrap();

        let mut tx = Transaction::begin(&ledger);
        tx.put("a", "new".into());
        tx.put("b", "added".into());
        tx.delete("c");
        assert_eq!(tx.get("a").unwrap().as_deref(), Some("new"));
        assert_eq!(tx.get("c").unwrap(), None);

        let scanned = tx.scan("a", "z").unwrap();
        assert_eq!(
            scanned,
            vec![
                ("a".to_string(), "new".to_string()),
                ("b".to_string(), "added".to_string())
            ]
        );

        // nothing is visible outside until commit
        assert_eq!(ledger.get("a").unwrap().unwrap().value, "old");
        tx.commit().unwrap();
        assert_eq!(ledger.get("a").unwrap().unwrap().value, "new");
    }

    #[test]
    fn concurrent_writer_causes_conflict() {
        let ledger = MemoryLedger::new();
        ledger.put("D0001", "1".into()).unwrap();

        let mut slow = Transaction::begin(&ledger);
        let mut fast = Transaction::begin(&ledger);
        slow.scan("D", "E").unwrap();
        fast.scan("D", "E").unwrap();

        slow.put("D0001", "slow".into());
        fast.put("D0001", "fast".into());

        fast.commit().unwrap();
        let err = slow.commit().unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(ref k) if k == "D0001"));
        assert_eq!(ledger.get("D0001").unwrap().unwrap().value, "fast");
    }

    #[test]
    fn transaction_ids_are_unique() {
        let ledger = MemoryLedger::new();
        let a = Transaction::begin(&ledger);
        let b = Transaction::begin(&ledger);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.id().len(), 32);
    }

    #[test]
    fn bad_json_reports_the_key() {
        let ledger = MemoryLedger::new();
        ledger.put("D0001", "{broken".into()).unwrap();
        let mut tx = Transaction::begin(&ledger);
        let err = tx.get_json::<serde_json::Value>("D0001").unwrap_err();
        assert!(matches!(err, LedgerError::Serialization { ref key, .. } if key == "D0001"));
    }
}
