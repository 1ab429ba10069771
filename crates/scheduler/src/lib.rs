//! Resource-aware task dispatch across Edge and UAV nodes.
//!
//! A [`Scheduler`] reads the node fleet from a ledger, picks one node under a
//! [`Policy`], charges the task to it and commits node, task record and
//! dispatch context in one transaction.

pub mod accounting;
pub mod error;
pub mod latency;
pub mod metrics;
pub mod phase;
pub mod policy;
pub mod runner;
pub mod scoring;
pub mod types;

pub use accounting::AssignmentReport;
pub use error::DispatchError;
pub use metrics::SchedulerMetrics;
pub use runner::Scheduler;
pub use types::{
    CobraParams, DispatchOutcome, DispatchRequest, Policy, PolicyKind, SchedulerConfig, TaskSpec,
};
