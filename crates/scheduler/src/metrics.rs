use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use cobra_core::{NodeClass, TaskType};

use crate::accounting::AssignmentReport;
use crate::types::PolicyKind;

/// Dispatch counters exposed over the API.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerMetrics {
    /// Committed dispatches by policy name.
    pub dispatches_by_policy: HashMap<String, u64>,
    /// Committed dispatches by node class of the target.
    pub dispatches_by_class: HashMap<String, u64>,
    /// Failed dispatches by error kind.
    pub failures_by_kind: HashMap<String, u64>,
    pub bursts_started: u64,
    pub resource_resets: u64,
    pub reputation_recomputes: u64,
    pub on_time_tasks: u64,
    /// Mean drawn latency in milliseconds by task type.
    pub avg_latency_ms: HashMap<String, f64>,
    #[serde(skip)]
    latency_samples: HashMap<String, u64>,
    pub last_dispatch: Option<DateTime<Utc>>,
}

impl SchedulerMetrics {
    pub fn record_dispatch(
        &mut self,
        policy: PolicyKind,
        class: NodeClass,
        task_type: TaskType,
        report: &AssignmentReport,
        burst_started: bool,
    ) {
        *self.dispatches_by_policy.entry(policy.to_string()).or_default() += 1;
        *self.dispatches_by_class.entry(class.to_string()).or_default() += 1;
        if burst_started {
            self.bursts_started += 1;
        }
        if report.resources_reset {
            self.resource_resets += 1;
        }
        if report.reputation_updated {
            self.reputation_recomputes += 1;
        }
        if report.on_time {
            self.on_time_tasks += 1;
        }
        self.last_dispatch = Some(Utc::now());

        // Incremental mean: new_avg = prev_avg + (sample - prev_avg) / count
        let key = task_type.to_string();
        let count = self.latency_samples.entry(key.clone()).or_default();
        *count += 1;
        let n = *count as f64;
        let avg = self.avg_latency_ms.entry(key).or_insert(0.0);
        *avg += (report.latency_ms as f64 - *avg) / n;
    }

    pub fn record_failure(&mut self, kind: &str) {
        *self.failures_by_kind.entry(kind.to_string()).or_default() += 1;
    }

    pub fn total_dispatches(&self) -> u64 {
        self.dispatches_by_policy.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(latency_ms: u64) -> AssignmentReport {
        AssignmentReport {
            latency_ms,
            on_time: true,
            resources_reset: false,
            reputation_updated: false,
        }
    }

    #[test]
    fn record_multiple_dispatches_averages() {
        let mut m = SchedulerMetrics::default();
        m.record_dispatch(PolicyKind::Cobra, NodeClass::Uav, TaskType::UC, &report(700), false);
        m.record_dispatch(PolicyKind::Cobra, NodeClass::Edge, TaskType::UC, &report(800), true);

        assert_eq!(m.dispatches_by_policy["cobra"], 2);
        assert_eq!(m.dispatches_by_class["UAV"], 1);
        assert_eq!(m.bursts_started, 1);
        assert_eq!(m.on_time_tasks, 2);
        assert!((m.avg_latency_ms["UC"] - 750.0).abs() < 1e-9);
        assert!(m.last_dispatch.is_some());
        assert_eq!(m.total_dispatches(), 2);
    }

    #[test]
    fn failures_are_counted_by_kind() {
        let mut m = SchedulerMetrics::default();
        m.record_failure("conflict");
        m.record_failure("conflict");
        m.record_failure("no_eligible_node");
        assert_eq!(m.failures_by_kind["conflict"], 2);
        assert_eq!(m.total_dispatches(), 0);
    }

    #[test]
    fn default_metrics() {
        let m = SchedulerMetrics::default();
        assert!(m.dispatches_by_policy.is_empty());
        assert_eq!(m.resource_resets, 0);
        assert!(m.last_dispatch.is_none());
    }
}
