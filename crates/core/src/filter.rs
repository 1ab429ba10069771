//! Record selection for node and task listings.
//!
//! Every field is optional; an empty filter matches everything. Field names
//! follow the record's camelCase JSON so the same struct reads a query string.

use serde::{Deserialize, Serialize};

use crate::node::{normalize_node_id, Node, NodeClass, NodeStatus};
use crate::task::{TaskRecord, TaskStatus, TaskType};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeFilter {
    pub node_id: Option<String>,
    pub class: Option<NodeClass>,
    pub status: Option<NodeStatus>,
    /// Keep nodes whose battery is strictly above this level.
    pub battery_above: Option<f64>,
}

impl NodeFilter {
    pub fn matches(&self, node: &Node) -> bool {
        self.node_id.as_deref().map_or(true, |id| same_node(id, &node.node_id))
            && self.class.map_or(true, |c| node.class == c)
            && self.status.map_or(true, |s| node.status == s)
            && self.battery_above.map_or(true, |b| node.battery_life > b)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskFilter {
    pub node_id: Option<String>,
    pub task_type: Option<TaskType>,
    pub status: Option<TaskStatus>,
}

impl TaskFilter {
    pub fn matches(&self, task: &TaskRecord) -> bool {
        self.node_id.as_deref().map_or(true, |id| same_node(id, &task.node_id))
            && self.task_type.map_or(true, |t| task.task_type == t)
            && self.status.map_or(true, |s| task.status == s)
    }
}

/// "7" and "0007" name the same node.
fn same_node(wanted: &str, stored: &str) -> bool {
    match normalize_node_id(wanted) {
        Ok(id) => id == stored,
        Err(_) => wanted == stored,
    }
}
