use thiserror::Error;

use cobra_core::CobraError;
use cobra_ledger::LedgerError;

use crate::types::PolicyKind;

/// Why a dispatch or an administrative operation failed. None of these leave
/// partial writes behind.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no eligible node for policy {policy}")]
    NoEligibleNode { policy: PolicyKind },

    #[error("unknown task type: {0}")]
    UnknownTaskType(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("storage failure: {0}")]
    Storage(LedgerError),

    #[error("serialization failure: {0}")]
    Serialization(LedgerError),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl DispatchError {
    /// Stable label used as a metrics key.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::NoEligibleNode { .. } => "no_eligible_node",
            DispatchError::UnknownTaskType(_) => "unknown_task_type",
            DispatchError::InvalidRequest(_) => "invalid_request",
            DispatchError::Storage(LedgerError::Conflict(_)) => "conflict",
            DispatchError::Storage(_) => "storage",
            DispatchError::Serialization(_) => "serialization",
            DispatchError::LockPoisoned(_) => "lock_poisoned",
        }
    }

    /// Whether a caller retry has a chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DispatchError::Storage(LedgerError::Conflict(_)) | DispatchError::NoEligibleNode { .. }
        )
    }
}

impl From<LedgerError> for DispatchError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Serialization { .. } => DispatchError::Serialization(e),
            LedgerError::Core(core) => DispatchError::from(core),
            other => DispatchError::Storage(other),
        }
    }
}

impl From<CobraError> for DispatchError {
    fn from(e: CobraError) -> Self {
        match e {
            CobraError::UnknownTaskType(t) => DispatchError::UnknownTaskType(t),
            other => DispatchError::InvalidRequest(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_errors_map_by_kind() {
        let conflict: DispatchError = LedgerError::Conflict("D0001".into()).into();
        assert_eq!(conflict.kind(), "conflict");
        assert!(conflict.is_retryable());

        let bad_json = serde_json::from_str::<u32>("x").unwrap_err();
        let ser: DispatchError = LedgerError::Serialization {
            key: "D0001".into(),
            source: bad_json,
        }
        .into();
        assert!(matches!(ser, DispatchError::Serialization(_)));

        let invalid: DispatchError =
            LedgerError::Core(CobraError::InvalidNode("bad".into())).into();
        assert!(matches!(invalid, DispatchError::InvalidRequest(_)));
    }

    #[test]
    fn unknown_task_type_keeps_its_label() {
        let e: DispatchError = CobraError::UnknownTaskType("XR".into()).into();
        assert_eq!(e.to_string(), "unknown task type: XR");
        assert!(!e.is_retryable());
    }
}
