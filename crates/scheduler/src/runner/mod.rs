//! Scheduler runner -- owns the ledger handle, RNG and metrics.
//!
//! Split into focused submodules:
//! - `core`: Scheduler struct, constructors, registration, listing and clearing
//! - `dispatch`: request validation and the read-select-assign-commit cycle

mod core;
mod dispatch;

pub use self::core::Scheduler;
