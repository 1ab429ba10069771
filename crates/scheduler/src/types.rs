use std::str::FromStr;

use serde::{Deserialize, Serialize};

use cobra_core::config::SchedulerSettings;
use cobra_core::{CobraError, DispatchContext, Node, TaskRecord, TaskType};

use crate::accounting::AssignmentReport;
use crate::error::DispatchError;

/// Policy names as they appear in requests, config and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    FirstAvailable,
    RoundRobin,
    Random,
    #[serde(rename = "ecp")]
    EdgePriority,
    EnergyAware,
    Cobra,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 6] = [
        PolicyKind::FirstAvailable,
        PolicyKind::RoundRobin,
        PolicyKind::Random,
        PolicyKind::EdgePriority,
        PolicyKind::EnergyAware,
        PolicyKind::Cobra,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::FirstAvailable => "first-available",
            PolicyKind::RoundRobin => "round-robin",
            PolicyKind::Random => "random",
            PolicyKind::EdgePriority => "ecp",
            PolicyKind::EnergyAware => "energy-aware",
            PolicyKind::Cobra => "cobra",
        }
    }
}

impl std::fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = CobraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        PolicyKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| CobraError::UnknownPolicy(s.to_string()))
    }
}

/// COBRA weights: `lambda` blends current against previous reputation,
/// `epsilon` weights resources against reputation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CobraParams {
    pub lambda: f64,
    pub epsilon: f64,
}

impl Default for CobraParams {
    fn default() -> Self {
        Self {
            lambda: default_lambda(),
            epsilon: default_epsilon(),
        }
    }
}

impl CobraParams {
    pub fn validate(&self) -> Result<(), DispatchError> {
        for (name, v) in [("lambda", self.lambda), ("epsilon", self.epsilon)] {
            if !(0.0..=1.0).contains(&v) {
                return Err(DispatchError::InvalidRequest(format!(
                    "{} must be within [0, 1], got {}",
                    name, v
                )));
            }
        }
        Ok(())
    }
}

/// Selection strategy for one dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Policy {
    FirstAvailable,
    RoundRobin,
    Random,
    EdgePriority,
    EnergyAware,
    Cobra(CobraParams),
}

impl Policy {
    pub fn from_kind(kind: PolicyKind, params: CobraParams) -> Self {
        match kind {
            PolicyKind::FirstAvailable => Policy::FirstAvailable,
            PolicyKind::RoundRobin => Policy::RoundRobin,
            PolicyKind::Random => Policy::Random,
            PolicyKind::EdgePriority => Policy::EdgePriority,
            PolicyKind::EnergyAware => Policy::EnergyAware,
            PolicyKind::Cobra => Policy::Cobra(params),
        }
    }

    pub fn kind(&self) -> PolicyKind {
        match self {
            Policy::FirstAvailable => PolicyKind::FirstAvailable,
            Policy::RoundRobin => PolicyKind::RoundRobin,
            Policy::Random => PolicyKind::Random,
            Policy::EdgePriority => PolicyKind::EdgePriority,
            Policy::EnergyAware => PolicyKind::EnergyAware,
            Policy::Cobra(_) => PolicyKind::Cobra,
        }
    }

    /// Lambda used for reputation recomputes. Only COBRA maintains reputation.
    pub fn reputation_lambda(&self) -> Option<f64> {
        match self {
            Policy::Cobra(p) => Some(p.lambda),
            _ => None,
        }
    }
}

/// A task as submitted by a caller. Validated into a [`TaskSpec`] before the
/// ledger is touched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    #[serde(default)]
    pub payload: String,
    pub task_type: String,
    pub energy_cost: f64,
    pub compute_cost: f64,
    /// Falls back to the configured default policy.
    #[serde(default)]
    pub policy: Option<String>,
    #[serde(default)]
    pub lambda: Option<f64>,
    #[serde(default)]
    pub epsilon: Option<f64>,
}

impl DispatchRequest {
    pub fn new(task_type: TaskType, energy_cost: f64, compute_cost: f64) -> Self {
        Self {
            payload: String::new(),
            task_type: task_type.as_str().to_string(),
            energy_cost,
            compute_cost,
            policy: None,
            lambda: None,
            epsilon: None,
        }
    }

    pub fn with_policy(mut self, policy: PolicyKind) -> Self {
        self.policy = Some(policy.as_str().to_string());
        self
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn with_cobra_params(mut self, lambda: f64, epsilon: f64) -> Self {
        self.lambda = Some(lambda);
        self.epsilon = Some(epsilon);
        self
    }
}

/// A validated task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSpec {
    pub payload: String,
    pub task_type: TaskType,
    pub energy_cost: f64,
    pub compute_cost: f64,
}

impl TaskSpec {
    pub fn new(task_type: TaskType, energy_cost: f64, compute_cost: f64) -> Self {
        Self {
            payload: String::new(),
            task_type,
            energy_cost,
            compute_cost,
        }
    }
}

/// Result of a committed dispatch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchOutcome {
    pub policy: PolicyKind,
    pub task: TaskRecord,
    /// The selected node after accounting.
    pub node: Node,
    #[serde(flatten)]
    pub report: AssignmentReport,
    pub burst_started: bool,
    pub context: DispatchContext,
    pub commit_sequence: u64,
}

/// Scheduler configuration, typically built from environment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Policy applied when a request names none.
    #[serde(default = "default_policy")]
    pub default_policy: PolicyKind,
    #[serde(default = "default_lambda")]
    pub lambda: f64,
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    /// Multiplier on the drawn latency before blocking. 0 disables the wait.
    #[serde(default = "default_latency_time_scale")]
    pub latency_time_scale: f64,
    /// Fixed RNG seed. Unset means seeded from OS entropy.
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

fn default_policy() -> PolicyKind { PolicyKind::Cobra }
fn default_lambda() -> f64 { 0.3 }
fn default_epsilon() -> f64 { 0.7 }
fn default_latency_time_scale() -> f64 { 1.0 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_policy: default_policy(),
            lambda: default_lambda(),
            epsilon: default_epsilon(),
            latency_time_scale: default_latency_time_scale(),
            rng_seed: None,
        }
    }
}

impl SchedulerConfig {
    pub fn from_settings(settings: &SchedulerSettings) -> Result<Self, DispatchError> {
        let config = Self {
            default_policy: settings.policy.parse()?,
            lambda: settings.lambda,
            epsilon: settings.epsilon,
            latency_time_scale: settings.latency_time_scale,
            rng_seed: settings.rng_seed,
        };
        config.cobra_params().validate()?;
        Ok(config)
    }

    /// Config for tests and simulations: no real waiting, deterministic RNG.
    pub fn instant(seed: u64) -> Self {
        Self {
            latency_time_scale: 0.0,
            rng_seed: Some(seed),
            ..Self::default()
        }
    }

    pub fn cobra_params(&self) -> CobraParams {
        CobraParams {
            lambda: self.lambda,
            epsilon: self.epsilon,
        }
    }
}
