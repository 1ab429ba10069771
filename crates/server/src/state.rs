use std::sync::Arc;

use cobra_core::Config;
use cobra_scheduler::{Scheduler, SchedulerConfig};

/// Shared state handed to every HTTP handler.
pub struct AppState {
    pub scheduler: Arc<Scheduler>,
    pub config: Config,
}

impl AppState {
    pub fn new(scheduler: Arc<Scheduler>, config: Config) -> Self {
        Self { scheduler, config }
    }
}

/// Open the configured ledger and wrap it in a scheduler.
pub fn build_scheduler(config: &Config) -> anyhow::Result<Arc<Scheduler>> {
    let ledger = cobra_ledger::open_ledger(&config.ledger)?;
    let scheduler_config = SchedulerConfig::from_settings(&config.scheduler)?;
    Ok(Arc::new(Scheduler::new(scheduler_config, ledger)))
}
