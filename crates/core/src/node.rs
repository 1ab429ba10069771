use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CobraError;

/// Battery and compute level below which a node stops taking work.
pub const LOW_WATERMARK: f64 = 3.0;

/// Node IDs are numeric and zero-padded to this many digits in ledger keys.
pub const NODE_ID_WIDTH: usize = 4;

/// Worker class. Edge servers are stationary and unconstrained by battery,
/// UAVs carry a depletable battery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeClass {
    #[serde(alias = "EC")]
    Edge,
    #[serde(rename = "UAV")]
    Uav,
}

impl NodeClass {
    /// Completions since the last reset after which compute is replenished.
    pub fn reset_cap(&self) -> u32 {
        match self {
            NodeClass::Edge => 30,
            NodeClass::Uav => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeClass::Edge => "Edge",
            NodeClass::Uav => "UAV",
        }
    }
}

impl std::fmt::Display for NodeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeClass {
    type Err = CobraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EDGE" | "EC" => Ok(NodeClass::Edge),
            "UAV" => Ok(NodeClass::Uav),
            _ => Err(CobraError::UnknownNodeClass(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeStatus {
    Available,
    Busy,
    Unavailable,
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeStatus::Available => write!(f, "Available"),
            NodeStatus::Busy => write!(f, "Busy"),
            NodeStatus::Unavailable => write!(f, "Unavailable"),
        }
    }
}

impl FromStr for NodeStatus {
    type Err = CobraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" => Ok(NodeStatus::Available),
            "busy" => Ok(NodeStatus::Busy),
            "unavailable" => Ok(NodeStatus::Unavailable),
            _ => Err(CobraError::UnknownStatus(s.to_string())),
        }
    }
}

/// A worker node as persisted in the ledger.
///
/// Resource fields are mutated only by task assignment; everything else is
/// fixed at registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub node_id: String,
    pub class: NodeClass,
    pub status: NodeStatus,
    pub battery_life: f64,
    pub initial_battery: f64,
    pub compute_resources: f64,
    pub initial_resources: f64,
    /// Completions ever recorded against this node.
    pub tasks_completed: u64,
    /// Assignments ever made to this node. Mirrors `tasks_completed` because
    /// no partial task record can exist.
    pub total_tasks: u64,
    /// Completions that landed within the task type's latency tolerance.
    pub on_time_tasks: u64,
    pub total_compute_cost_consumed: f64,
    pub tasks_since_reset: u32,
    pub reputation: f64,
    pub previous_reputation: f64,
}

impl Node {
    pub fn is_uav(&self) -> bool {
        self.class == NodeClass::Uav
    }

    pub fn is_edge(&self) -> bool {
        self.class == NodeClass::Edge
    }

    /// Status implied by the current resource levels.
    pub fn derived_status(&self) -> NodeStatus {
        if self.is_uav() && self.battery_life < LOW_WATERMARK {
            NodeStatus::Unavailable
        } else if self.compute_resources < LOW_WATERMARK {
            NodeStatus::Busy
        } else {
            NodeStatus::Available
        }
    }

    /// Whether the node can take a task of the given compute cost.
    pub fn is_eligible(&self, compute_cost: f64) -> bool {
        self.status == NodeStatus::Available && self.compute_resources >= compute_cost
    }
}

/// Pad a numeric node ID to the fixed ledger width ("7" -> "0007").
pub fn normalize_node_id(raw: &str) -> Result<String, CobraError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(CobraError::InvalidNode(format!(
            "node id must be numeric, got {:?}",
            raw
        )));
    }
    let digits = trimmed.trim_start_matches('0');
    let digits = if digits.is_empty() { "0" } else { digits };
    if digits.len() > NODE_ID_WIDTH {
        return Err(CobraError::InvalidNode(format!(
            "node id {} exceeds {} digits",
            raw, NODE_ID_WIDTH
        )));
    }
    Ok(format!("{:0>width$}", digits, width = NODE_ID_WIDTH))
}

/// Full set of attributes accepted when registering a node.
///
/// Counters and reputation default to zero so a caller only has to provide
/// identity and resources. `status` is never taken from the caller; it is
/// derived from the resource levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRegistration {
    pub node_id: String,
    pub class: NodeClass,
    #[serde(default)]
    pub battery_life: f64,
    #[serde(default)]
    pub initial_battery: f64,
    pub compute_resources: f64,
    pub initial_resources: f64,
    #[serde(default)]
    pub tasks_completed: u64,
    #[serde(default)]
    pub total_tasks: u64,
    #[serde(default)]
    pub on_time_tasks: u64,
    #[serde(default)]
    pub total_compute_cost_consumed: f64,
    #[serde(default)]
    pub tasks_since_reset: u32,
    #[serde(default)]
    pub reputation: f64,
    #[serde(default)]
    pub previous_reputation: f64,
}

impl NodeRegistration {
    /// Minimal registration: fresh counters, resources at their initial level.
    pub fn new(node_id: &str, class: NodeClass, compute: f64, battery: f64) -> Self {
        Self {
            node_id: node_id.to_string(),
            class,
            battery_life: battery,
            initial_battery: battery,
            compute_resources: compute,
            initial_resources: compute,
            tasks_completed: 0,
            total_tasks: 0,
            on_time_tasks: 0,
            total_compute_cost_consumed: 0.0,
            tasks_since_reset: 0,
            reputation: 0.0,
            previous_reputation: 0.0,
        }
    }

    pub fn with_reputation(mut self, reputation: f64, previous: f64) -> Self {
        self.reputation = reputation;
        self.previous_reputation = previous;
        self
    }

    /// Validate and turn into a ledger node with a normalized ID and status.
    pub fn into_node(self) -> Result<Node, CobraError> {
        let node_id = normalize_node_id(&self.node_id)?;

        if !(self.initial_resources > 0.0) {
            return Err(CobraError::InvalidNode(format!(
                "node {}: initialResources must be positive",
                node_id
            )));
        }
        if !(0.0..=self.initial_resources).contains(&self.compute_resources) {
            return Err(CobraError::InvalidNode(format!(
                "node {}: computeResources {} outside [0, {}]",
                node_id, self.compute_resources, self.initial_resources
            )));
        }
        if self.class == NodeClass::Uav && !(self.initial_battery > 0.0) {
            return Err(CobraError::InvalidNode(format!(
                "node {}: UAV initialBattery must be positive",
                node_id
            )));
        }

        let mut node = Node {
            node_id,
            class: self.class,
            status: NodeStatus::Available,
            battery_life: self.battery_life,
            initial_battery: self.initial_battery,
            compute_resources: self.compute_resources,
            initial_resources: self.initial_resources,
            tasks_completed: self.tasks_completed,
            total_tasks: self.total_tasks,
            on_time_tasks: self.on_time_tasks,
            total_compute_cost_consumed: self.total_compute_cost_consumed,
            tasks_since_reset: self.tasks_since_reset,
            reputation: self.reputation,
            previous_reputation: self.previous_reputation,
        };
        node.status = node.derived_status();
        Ok(node)
    }
}
