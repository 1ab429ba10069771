use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CobraError;

/// Communication class of a task. Each class has its own latency profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    /// Immersive Communication
    IC,
    /// Hyper-Reliable and Low-Latency Communication
    HRLLC,
    /// Ubiquitous Connectivity
    UC,
    /// Massive Communication
    MC,
    /// AI and Communication
    AIC,
    /// Integrated Sensing and Communication
    ISC,
}

impl TaskType {
    pub const ALL: [TaskType; 6] = [
        TaskType::IC,
        TaskType::HRLLC,
        TaskType::UC,
        TaskType::MC,
        TaskType::AIC,
        TaskType::ISC,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::IC => "IC",
            TaskType::HRLLC => "HRLLC",
            TaskType::UC => "UC",
            TaskType::MC => "MC",
            TaskType::AIC => "AIC",
            TaskType::ISC => "ISC",
        }
    }

    /// Typical `(energy_cost, compute_cost)` of a task of this class.
    pub fn nominal_costs(&self) -> (f64, f64) {
        match self {
            TaskType::IC => (2.2, 2.7),
            TaskType::HRLLC => (1.1, 1.9),
            TaskType::UC => (0.5, 0.9),
            TaskType::MC => (0.9, 1.4),
            TaskType::AIC => (2.7, 3.0),
            TaskType::ISC => (1.2, 2.0),
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = CobraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CobraError::UnknownTaskType(s.to_string()))
    }
}

/// Terminal status of a task record. A record only exists once work is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Completed,
}

impl FromStr for TaskStatus {
    type Err = CobraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("completed") {
            Ok(TaskStatus::Completed)
        } else {
            Err(CobraError::UnknownStatus(s.to_string()))
        }
    }
}

/// Immutable record of a completed task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub task_id: String,
    pub node_id: String,
    pub payload: String,
    pub task_type: TaskType,
    pub energy_cost: f64,
    pub compute_cost: f64,
    pub status: TaskStatus,
}

/// Which record families a bulk clear removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearScope {
    Tasks,
    Nodes,
    All,
}

impl ClearScope {
    pub fn includes_tasks(&self) -> bool {
        matches!(self, ClearScope::Tasks | ClearScope::All)
    }

    pub fn includes_nodes(&self) -> bool {
        matches!(self, ClearScope::Nodes | ClearScope::All)
    }
}

impl FromStr for ClearScope {
    type Err = CobraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tasks" => Ok(ClearScope::Tasks),
            // "devices" is the legacy name for the node family
            "nodes" | "devices" => Ok(ClearScope::Nodes),
            "all" => Ok(ClearScope::All),
            _ => Err(CobraError::InvalidScope(s.to_string())),
        }
    }
}
