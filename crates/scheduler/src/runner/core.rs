use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use cobra_core::{
    ClearScope, DispatchContext, Node, NodeFilter, NodeRegistration, TaskFilter, TaskRecord,
};
use cobra_ledger::{Ledger, NodeLedger};

use crate::error::DispatchError;
use crate::metrics::SchedulerMetrics;
use crate::types::SchedulerConfig;

/// Assigns tasks to nodes recorded in a [`Ledger`].
///
/// Safe to share across threads: every dispatch is one optimistic ledger
/// transaction, and the RNG lock is never held across the latency wait.
pub struct Scheduler {
    pub(super) config: SchedulerConfig,
    pub(super) ledger: NodeLedger,
    /// Shared randomness for Random, ECP edge/UAV draws and latency.
    pub(super) rng: Mutex<StdRng>,
    pub(super) metrics: Arc<RwLock<SchedulerMetrics>>,
}

impl Scheduler {
    /// Create a scheduler. The RNG is seeded from `config.rng_seed` when set,
    /// otherwise from OS entropy.
    pub fn new(config: SchedulerConfig, ledger: Arc<dyn Ledger>) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, ledger, rng)
    }

    pub fn with_rng(config: SchedulerConfig, ledger: Arc<dyn Ledger>, rng: StdRng) -> Self {
        info!(
            "Scheduler ready (default policy: {}, lambda: {}, epsilon: {}, latency scale: {})",
            config.default_policy, config.lambda, config.epsilon, config.latency_time_scale
        );
        Self {
            config,
            ledger: NodeLedger::new(ledger),
            rng: Mutex::new(rng),
            metrics: Arc::new(RwLock::new(SchedulerMetrics::default())),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn ledger(&self) -> &NodeLedger {
        &self.ledger
    }

    pub(super) fn lock_rng(&self) -> Result<MutexGuard<'_, StdRng>, DispatchError> {
        self.rng
            .lock()
            .map_err(|e| DispatchError::LockPoisoned(format!("scheduler rng: {}", e)))
    }

    /// Add or replace a node.
    pub fn register_node(&self, registration: NodeRegistration) -> Result<Node, DispatchError> {
        Ok(self.ledger.register(registration)?)
    }

    /// Remove records in bulk. Returns the number of records removed.
    pub fn clear(&self, scope: ClearScope) -> Result<usize, DispatchError> {
        Ok(self.ledger.clear(scope)?)
    }

    pub fn list_nodes(&self) -> Result<Vec<Node>, DispatchError> {
        Ok(self.ledger.list_nodes()?)
    }

    pub fn list_tasks(&self) -> Result<Vec<TaskRecord>, DispatchError> {
        Ok(self.ledger.list_tasks()?)
    }

    /// Nodes in ID order, restricted to those the filter matches.
    pub fn find_nodes(&self, filter: &NodeFilter) -> Result<Vec<Node>, DispatchError> {
        let mut nodes = self.list_nodes()?;
        nodes.retain(|n| filter.matches(n));
        Ok(nodes)
    }

    pub fn find_tasks(&self, filter: &TaskFilter) -> Result<Vec<TaskRecord>, DispatchError> {
        let mut tasks = self.list_tasks()?;
        tasks.retain(|t| filter.matches(t));
        Ok(tasks)
    }

    /// The persisted dispatch context.
    pub fn dispatch_context(&self) -> Result<DispatchContext, DispatchError> {
        Ok(self.ledger.context()?)
    }

    /// Get a snapshot of the current scheduler metrics.
    pub fn metrics(&self) -> SchedulerMetrics {
        self.metrics
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}
