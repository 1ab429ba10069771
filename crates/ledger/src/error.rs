use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    /// A key read by the transaction changed before it could commit.
    #[error("commit conflict on key {0}")]
    Conflict(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("core error: {0}")]
    Core(#[from] cobra_core::CobraError),

    #[error("serialization error for key {key}: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("ledger lock poisoned")]
    LockPoisoned,

    #[error("{0}")]
    Backend(String),
}
