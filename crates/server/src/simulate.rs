//! Workload driver: pushes a task mix through the scheduler with bounded
//! concurrency and caller-side retry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{info, warn};

use cobra_core::{Node, NodeStatus, TaskType};
use cobra_ledger::LedgerError;
use cobra_scheduler::{DispatchError, DispatchRequest, PolicyKind, Scheduler};

/// Share of each task type in a generated workload, in percent.
const TASK_MIX: [(TaskType, usize); 6] = [
    (TaskType::IC, 10),
    (TaskType::AIC, 15),
    (TaskType::HRLLC, 10),
    (TaskType::ISC, 25),
    (TaskType::UC, 20),
    (TaskType::MC, 15),
];

const BACKOFF_STEP: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct SimulationOptions {
    pub tasks: usize,
    /// Policy for every request. `None` uses the scheduler default.
    pub policy: Option<PolicyKind>,
    pub concurrency: usize,
    pub max_retries: u32,
}

#[derive(Debug, Default, Clone)]
pub struct SimulationSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub retries: u64,
    pub elapsed: Duration,
    pub fleet: FleetStats,
}

/// Resource and workload spread across the fleet after a run.
///
/// Averages over an empty class are 0. A UAV driven below zero battery
/// counts as empty.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct FleetStats {
    pub avg_uav_battery: f64,
    pub available_uavs: usize,
    pub avg_compute_cost: f64,
    pub avg_uav_compute_cost: f64,
    pub avg_edge_compute_cost: f64,
    pub avg_tasks_per_uav: f64,
    pub avg_tasks_per_edge: f64,
    /// Percent of all completed tasks.
    pub uav_task_share: f64,
    pub edge_task_share: f64,
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 * 100.0 / whole as f64 }
}

impl FleetStats {
    pub fn from_nodes(nodes: &[Node]) -> Self {
        let uavs = || nodes.iter().filter(|n| n.is_uav());
        let edges = || nodes.iter().filter(|n| n.is_edge());
        let uav_tasks: u64 = uavs().map(|n| n.tasks_completed).sum();
        let edge_tasks: u64 = edges().map(|n| n.tasks_completed).sum();
        let total = uav_tasks + edge_tasks;

        Self {
            avg_uav_battery: mean(uavs().map(|n| n.battery_life.max(0.0))),
            available_uavs: uavs()
                .filter(|n| n.status == NodeStatus::Available && n.battery_life > 0.0)
                .count(),
            avg_compute_cost: mean(nodes.iter().map(|n| n.total_compute_cost_consumed)),
            avg_uav_compute_cost: mean(uavs().map(|n| n.total_compute_cost_consumed)),
            avg_edge_compute_cost: mean(edges().map(|n| n.total_compute_cost_consumed)),
            avg_tasks_per_uav: mean(uavs().map(|n| n.tasks_completed as f64)),
            avg_tasks_per_edge: mean(edges().map(|n| n.tasks_completed as f64)),
            uav_task_share: percent(uav_tasks, total),
            edge_task_share: percent(edge_tasks, total),
        }
    }
}

/// Build a shuffled workload of `total` task types. Rounding leftovers are IC.
pub fn task_mix(total: usize, rng: &mut StdRng) -> Vec<TaskType> {
    let mut tasks = Vec::with_capacity(total);
    for (task_type, pct) in TASK_MIX {
        tasks.extend(std::iter::repeat(task_type).take(total * pct / 100));
    }
    while tasks.len() < total {
        tasks.push(TaskType::IC);
    }
    tasks.shuffle(rng);
    tasks
}

enum TaskResult {
    Done { retries: u32 },
    Failed { retries: u32 },
}

/// Dispatch one task, retrying conflicts and empty fleets with linear backoff.
async fn dispatch_with_retry(
    scheduler: Arc<Scheduler>,
    request: DispatchRequest,
    max_retries: u32,
) -> TaskResult {
    let mut attempt = 0;
    loop {
        let s = Arc::clone(&scheduler);
        let req = request.clone();
        let result = tokio::task::spawn_blocking(move || s.dispatch(req)).await;

        let err = match result {
            Ok(Ok(_)) => return TaskResult::Done { retries: attempt },
            Ok(Err(e)) => e,
            Err(join) => {
                warn!("Dispatch worker failed: {}", join);
                return TaskResult::Failed { retries: attempt };
            }
        };

        if !err.is_retryable() || attempt >= max_retries {
            warn!("Giving up on {} task after {} attempt(s): {}", request.task_type, attempt + 1, err);
            return TaskResult::Failed { retries: attempt };
        }
        attempt += 1;
        warn!("Retrying {} task (attempt {}/{}): {}", request.task_type, attempt, max_retries, err);
        tokio::time::sleep(BACKOFF_STEP * attempt).await;
    }
}

async fn acquire(semaphore: &Arc<Semaphore>) -> Result<OwnedSemaphorePermit, DispatchError> {
    Arc::clone(semaphore).acquire_owned().await.map_err(|e| {
        DispatchError::Storage(LedgerError::Backend(format!("simulation semaphore: {}", e)))
    })
}

fn build_request(task_type: TaskType, index: usize, policy: Option<PolicyKind>) -> DispatchRequest {
    let (energy, compute) = task_type.nominal_costs();
    let request =
        DispatchRequest::new(task_type, energy, compute).with_payload(format!("sim-{}-{}", index, task_type));
    match policy {
        Some(p) => request.with_policy(p),
        None => request,
    }
}

/// Run a workload to completion and report how it went.
pub async fn run(
    scheduler: Arc<Scheduler>,
    options: &SimulationOptions,
) -> Result<SimulationSummary, DispatchError> {
    let mut rng = match scheduler.config().rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let workload = task_mix(options.tasks, &mut rng);
    let policy_label = options
        .policy
        .unwrap_or(scheduler.config().default_policy);
    info!(
        "Simulating {} task(s) with policy {} (concurrency {}, max retries {})",
        workload.len(),
        policy_label,
        options.concurrency,
        options.max_retries
    );

    let start = Instant::now();
    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let mut handles = Vec::with_capacity(workload.len());

    for (i, task_type) in workload.into_iter().enumerate() {
        let permit = acquire(&semaphore).await?;
        let scheduler = Arc::clone(&scheduler);
        let request = build_request(task_type, i, options.policy);
        let max_retries = options.max_retries;
        handles.push(tokio::spawn(async move {
            let result = dispatch_with_retry(scheduler, request, max_retries).await;
            drop(permit);
            result
        }));
    }

    let mut summary = SimulationSummary::default();
    for handle in handles {
        match handle.await {
            Ok(TaskResult::Done { retries }) => {
                summary.succeeded += 1;
                summary.retries += retries as u64;
            }
            Ok(TaskResult::Failed { retries }) => {
                summary.failed += 1;
                summary.retries += retries as u64;
            }
            Err(e) => {
                warn!("Simulation task panicked: {}", e);
                summary.failed += 1;
            }
        }
    }
    summary.elapsed = start.elapsed();
    summary.fleet = FleetStats::from_nodes(&scheduler.list_nodes()?);

    info!(
        "Simulation finished in {:.2?}: {} succeeded, {} failed, {} retries",
        summary.elapsed, summary.succeeded, summary.failed, summary.retries
    );
    let fleet = &summary.fleet;
    info!(
        "Fleet: {} UAV(s) available, avg UAV battery {:.2}, task share UAV {:.1}% / Edge {:.1}%",
        fleet.available_uavs, fleet.avg_uav_battery, fleet.uav_task_share, fleet.edge_task_share
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    use cobra_core::{NodeClass, NodeRegistration};
    use cobra_ledger::MemoryLedger;
    use cobra_scheduler::SchedulerConfig;

    use crate::fleet;

    #[test]
    fn mix_follows_shares_and_pads_with_ic() {
        let mut rng = StdRng::seed_from_u64(3);
        let tasks = task_mix(100, &mut rng);
        let count = |t: TaskType| tasks.iter().filter(|&&x| x == t).count();
        assert_eq!(tasks.len(), 100);
        assert_eq!(count(TaskType::ISC), 25);
        assert_eq!(count(TaskType::UC), 20);
        // shares sum to 95%, the rest is IC
        assert_eq!(count(TaskType::IC), 15);

        let small = task_mix(7, &mut rng);
        assert_eq!(small.len(), 7);
        let ic = small.iter().filter(|&&x| x == TaskType::IC).count();
        assert_eq!(ic, 7 - 1 - 1 - 1 - 1);
    }

    #[test]
    fn same_seed_same_order() {
        let a = task_mix(50, &mut StdRng::seed_from_u64(9));
        let b = task_mix(50, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_run_commits_every_success() {
        let scheduler = Arc::new(Scheduler::new(
            SchedulerConfig::instant(11),
            Arc::new(MemoryLedger::new()),
        ));
        fleet::seed(&scheduler, 3, 6).unwrap();

        let options = SimulationOptions {
            tasks: 40,
            policy: Some(PolicyKind::Cobra),
            concurrency: 4,
            max_retries: 20,
        };
        let summary = run(Arc::clone(&scheduler), &options).await.unwrap();
        assert_eq!(summary.succeeded + summary.failed, 40);
        assert_eq!(scheduler.list_tasks().unwrap().len(), summary.succeeded);
        assert_eq!(scheduler.metrics().total_dispatches(), summary.succeeded as u64);

        let fleet = &summary.fleet;
        assert!(fleet.available_uavs <= 6);
        if summary.succeeded > 0 {
            assert!((fleet.uav_task_share + fleet.edge_task_share - 100.0).abs() < 1e-9);
        }
    }

    fn worked(id: &str, class: NodeClass, battery: f64, tasks: u64, cost: f64) -> Node {
        NodeRegistration {
            tasks_completed: tasks,
            total_tasks: tasks,
            total_compute_cost_consumed: cost,
            battery_life: battery,
            ..NodeRegistration::new(id, class, 10.0, 50.0)
        }
        .into_node()
        .unwrap()
    }

    #[test]
    fn fleet_stats_split_by_class() {
        let nodes = vec![
            worked("1", NodeClass::Edge, 50.0, 6, 12.0),
            worked("2", NodeClass::Uav, 40.0, 3, 3.0),
            worked("3", NodeClass::Uav, -1.0, 1, 1.0),
        ];
        let stats = FleetStats::from_nodes(&nodes);
        assert_eq!(stats.avg_uav_battery, 20.0);
        assert_eq!(stats.available_uavs, 1);
        assert!((stats.avg_compute_cost - 16.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.avg_uav_compute_cost, 2.0);
        assert_eq!(stats.avg_edge_compute_cost, 12.0);
        assert_eq!(stats.avg_tasks_per_uav, 2.0);
        assert_eq!(stats.avg_tasks_per_edge, 6.0);
        assert_eq!(stats.uav_task_share, 40.0);
        assert_eq!(stats.edge_task_share, 60.0);
    }

    #[test]
    fn fleet_stats_of_idle_or_empty_fleet_are_zero() {
        assert_eq!(FleetStats::from_nodes(&[]), FleetStats::default());

        let idle = vec![worked("1", NodeClass::Edge, 50.0, 0, 0.0)];
        let stats = FleetStats::from_nodes(&idle);
        assert_eq!(stats.avg_uav_battery, 0.0);
        assert_eq!(stats.uav_task_share, 0.0);
        assert_eq!(stats.edge_task_share, 0.0);
    }

    #[tokio::test]
    async fn closed_semaphore_is_a_storage_failure() {
        let semaphore = Arc::new(Semaphore::new(1));
        semaphore.close();
        let err = acquire(&semaphore).await.unwrap_err();
        assert!(matches!(err, DispatchError::Storage(LedgerError::Backend(_))));
        assert_eq!(err.kind(), "storage");
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn empty_fleet_fails_after_retries() {
        let scheduler = Arc::new(Scheduler::new(
            SchedulerConfig::instant(5),
            Arc::new(MemoryLedger::new()),
        ));
        let options = SimulationOptions {
            tasks: 2,
            policy: Some(PolicyKind::FirstAvailable),
            concurrency: 2,
            max_retries: 1,
        };
        let summary = run(scheduler, &options).await.unwrap();
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.retries, 2);
    }
}
