//! Resource and counter bookkeeping for a node that just ran a task.

use serde::Serialize;

use cobra_core::{Node, NodeStatus, TaskRecord, TaskStatus, LOW_WATERMARK};

use crate::latency::LatencyProfile;
use crate::scoring;
use crate::types::TaskSpec;

/// What happened to a node during one assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentReport {
    pub latency_ms: u64,
    pub on_time: bool,
    pub resources_reset: bool,
    pub reputation_updated: bool,
}

/// Charge `task` to `node` and build the completed task record.
///
/// `latency_ms` is the already drawn execution latency. `reputation_lambda`
/// is set only on the COBRA path, which is the only one that maintains
/// reputation.
pub fn assign(
    node: &mut Node,
    task: &TaskSpec,
    task_id: &str,
    latency_ms: u64,
    reputation_lambda: Option<f64>,
) -> (TaskRecord, AssignmentReport) {
    node.compute_resources -= task.compute_cost;
    node.total_compute_cost_consumed += task.compute_cost;

    if node.is_uav() {
        node.battery_life -= task.energy_cost;
        if node.battery_life < LOW_WATERMARK {
            node.status = NodeStatus::Unavailable;
        }
    }
    if node.compute_resources < LOW_WATERMARK && node.status != NodeStatus::Unavailable {
        node.status = NodeStatus::Busy;
    }

    let on_time = LatencyProfile::for_task(task.task_type).is_on_time(latency_ms);
    if on_time {
        node.on_time_tasks += 1;
    }

    let record = TaskRecord {
        task_id: task_id.to_string(),
        node_id: node.node_id.clone(),
        payload: task.payload.clone(),
        task_type: task.task_type,
        energy_cost: task.energy_cost,
        compute_cost: task.compute_cost,
        status: TaskStatus::Completed,
    };

    node.tasks_completed += 1;
    node.total_tasks += 1;
    node.tasks_since_reset += 1;

    let reputation_updated = match reputation_lambda {
        Some(lambda) => scoring::update_reputation(node, lambda),
        None => false,
    };

    let resources_reset = node.tasks_since_reset >= node.class.reset_cap();
    if resources_reset {
        node.compute_resources = node.initial_resources;
        node.tasks_since_reset = 0;
    }

    if node.compute_resources >= LOW_WATERMARK && node.status == NodeStatus::Busy {
        node.status = NodeStatus::Available;
    }

    let report = AssignmentReport {
        latency_ms,
        on_time,
        resources_reset,
        reputation_updated,
    };
    (record, report)
}
