mod api;
mod cli;
mod fleet;
mod router;
mod simulate;
mod state;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use cobra_core::config::LedgerBackend;
use cobra_core::{ClearScope, Config};
use cobra_scheduler::{PolicyKind, Scheduler};

use crate::cli::{CliArgs, Command, ListTarget};
use crate::simulate::SimulationOptions;
use crate::state::AppState;

fn load_config() -> Config {
    cobra_core::config::load_dotenv();
    Config::from_env()
}

/// One-shot commands against the in-memory backend lose their writes on exit.
fn warn_if_ephemeral(config: &Config, command: &str) {
    if config.ledger.backend == LedgerBackend::Memory {
        warn!(
            "`{}` is running against the in-memory ledger; set LEDGER_BACKEND=file to keep the result",
            command
        );
    }
}

async fn serve(config: Config, scheduler: Arc<Scheduler>) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let port = config.server.port;
    let app = router::build_router(Arc::new(AppState::new(scheduler, config)));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://localhost:{}", port);
    axum::serve(listener, app).await?;
    Ok(())
}

fn print_json_lines<T: serde::Serialize>(records: &[T]) -> anyhow::Result<()> {
    for record in records {
        println!("{}", serde_json::to_string(record)?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let config = load_config();
    config.log_summary();

    let scheduler = state::build_scheduler(&config).context("failed to initialise scheduler")?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, scheduler).await?,
        Command::Seed { edge, uav } => {
            warn_if_ephemeral(&config, "seed");
            fleet::seed(&scheduler, edge, uav)?;
        }
        Command::Simulate { tasks, policy, concurrency, max_retries, seed } => {
            let policy = policy
                .map(|p| p.parse::<PolicyKind>())
                .transpose()?;
            if seed {
                fleet::seed(&scheduler, 3, 6)?;
            }
            let options = SimulationOptions { tasks, policy, concurrency, max_retries };
            let summary = simulate::run(Arc::clone(&scheduler), &options).await?;
            println!("{}", serde_json::to_string_pretty(&scheduler.metrics())?);
            println!("{}", serde_json::to_string_pretty(&summary.fleet)?);
            if summary.failed > 0 {
                warn!("{} of {} task(s) could not be placed", summary.failed, tasks);
            }
        }
        Command::Clear { scope } => {
            let scope: ClearScope = scope.parse()?;
            warn_if_ephemeral(&config, "clear");
            let removed = scheduler.clear(scope)?;
            info!("Removed {} record(s)", removed);
        }
        Command::List { target, filter } => match target {
            ListTarget::Nodes => print_json_lines(&scheduler.find_nodes(&filter.nodes()?)?)?,
            ListTarget::Tasks => print_json_lines(&scheduler.find_tasks(&filter.tasks()?)?)?,
        },
    }

    Ok(())
}
