pub mod accessor;
pub mod error;
pub mod file;
pub mod keys;
pub mod memory;
pub mod store;
pub mod transaction;

use std::sync::Arc;

use cobra_core::config::{LedgerBackend, LedgerConfig};

pub use accessor::NodeLedger;
pub use error::LedgerError;
pub use file::FileLedger;
pub use memory::MemoryLedger;
pub use store::{Entry, Ledger, WriteBatch};
pub use transaction::Transaction;

/// Open the ledger backend selected by config.
pub fn open_ledger(config: &LedgerConfig) -> Result<Arc<dyn Ledger>, LedgerError> {
    match config.backend {
        LedgerBackend::Memory => {
            tracing::info!("Ledger: in-memory backend");
            Ok(Arc::new(MemoryLedger::new()))
        }
        LedgerBackend::File => Ok(Arc::new(FileLedger::open(config.snapshot_path())?)),
    }
}
