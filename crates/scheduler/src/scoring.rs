//! Node and task scores used by the selection policies.

use cobra_core::Node;

/// Tasks scoring below this are steered toward UAVs by COBRA.
pub const TCI_UAV_THRESHOLD: f64 = 0.55;

/// Reference maximum for both energy and compute cost.
const MAX_TASK_COST: f64 = 3.0;

/// Completions between reputation recomputes.
pub const REPUTATION_PERIOD: u64 = 5;

const BATTERY_WEIGHT: f64 = 0.75;
const COMPUTE_WEIGHT: f64 = 0.25;
const LOW_BATTERY_PENALTY: f64 = 10.0;

fn ratio(value: f64, initial: f64) -> f64 {
    if initial > 0.0 { value / initial } else { 0.0 }
}

/// Task Cost Index: how heavy a task is, with `epsilon` weighting compute
/// over energy.
pub fn task_cost_index(energy_cost: f64, compute_cost: f64, epsilon: f64) -> f64 {
    (energy_cost / MAX_TASK_COST) * (1.0 - epsilon) + (compute_cost / MAX_TASK_COST) * epsilon
}

/// Reliability Index: remaining resources blended with reputation.
pub fn reliability_index(node: &Node, lambda: f64, epsilon: f64) -> f64 {
    let reputation_blend = lambda * node.reputation + (1.0 - lambda) * node.previous_reputation;
    let resource_ratio = ratio(node.compute_resources, node.initial_resources);
    let battery_ratio = if node.is_uav() {
        ratio(node.battery_life.max(0.0), node.initial_battery)
    } else {
        0.0
    };
    epsilon * (battery_ratio + resource_ratio) + (1.0 - epsilon) * reputation_blend
}

pub fn energy_efficiency_score(node: &Node, energy_cost: f64) -> f64 {
    let mut score = BATTERY_WEIGHT * node.battery_life + COMPUTE_WEIGHT * node.compute_resources;
    if node.is_uav() && node.battery_life < energy_cost {
        score -= LOW_BATTERY_PENALTY;
    }
    score
}

/// Recompute reputation when the completion count hits a multiple of
/// [`REPUTATION_PERIOD`]. Returns whether it fired.
pub fn update_reputation(node: &mut Node, lambda: f64) -> bool {
    if node.tasks_completed == 0 || node.tasks_completed % REPUTATION_PERIOD != 0 {
        return false;
    }
    node.previous_reputation = node.reputation;
    let total = node.total_tasks.max(1) as f64;
    let success_rate = node.tasks_completed as f64 / total;
    let time_rate = node.on_time_tasks as f64 / total;
    node.reputation = lambda * (success_rate + time_rate) + (1.0 - lambda) * node.previous_reputation;
    true
}

/// Highest-scoring node. Ties keep the earliest candidate.
pub fn argmax_by<'a, I, F>(candidates: I, score: F) -> Option<&'a Node>
where
    I: IntoIterator<Item = &'a Node>,
    F: Fn(&Node) -> f64,
{
    let mut best: Option<(&'a Node, f64)> = None;
    for node in candidates {
        let s = score(node);
        let better = match best {
            Some((_, best_score)) => s > best_score,
            None => true,
        };
        if better {
            best = Some((node, s));
        }
    }
    best.map(|(node, _)| node)
}
