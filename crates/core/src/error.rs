use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CobraError {
    #[error("Unknown task type: {0}")]
    UnknownTaskType(String),

    #[error("Unknown node class: {0}")]
    UnknownNodeClass(String),

    #[error("Invalid node: {0}")]
    InvalidNode(String),

    #[error("Invalid clear scope: {0} (expected tasks, nodes or all)")]
    InvalidScope(String),

    #[error("Unknown status: {0}")]
    UnknownStatus(String),

    #[error("Unknown ledger backend: {0} (expected memory or file)")]
    UnknownBackend(String),

    #[error("Unknown dispatch policy: {0}")]
    UnknownPolicy(String),
}
