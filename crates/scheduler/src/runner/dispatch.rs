use tracing::{debug, warn};

use cobra_core::TaskType;

use crate::accounting;
use crate::error::DispatchError;
use crate::latency::{self, LatencyProfile};
use crate::policy;
use crate::types::{CobraParams, DispatchOutcome, DispatchRequest, Policy, PolicyKind, TaskSpec};

use super::Scheduler;

impl Scheduler {
    /// Assign one task to one node and persist the result.
    ///
    /// Either the node update, the task record and the dispatch context are
    /// all committed, or nothing is. Conflicts with concurrent dispatches are
    /// reported, not retried.
    pub fn dispatch(&self, request: DispatchRequest) -> Result<DispatchOutcome, DispatchError> {
        let result = self
            .resolve(request)
            .and_then(|(policy, task)| self.run_dispatch(&policy, &task));

        match &result {
            Ok(outcome) => {
                if let Ok(mut m) = self.metrics.write() {
                    m.record_dispatch(
                        outcome.policy,
                        outcome.node.class,
                        outcome.task.task_type,
                        &outcome.report,
                        outcome.burst_started,
                    );
                }
            }
            Err(e) => {
                warn!("Dispatch failed: {}", e);
                if let Ok(mut m) = self.metrics.write() {
                    m.record_failure(e.kind());
                }
            }
        }
        result
    }

    /// Validate a request without touching the ledger.
    pub(super) fn resolve(&self, request: DispatchRequest) -> Result<(Policy, TaskSpec), DispatchError> {
        let task_type: TaskType = request.task_type.parse()?;

        for (name, v) in [("energyCost", request.energy_cost), ("computeCost", request.compute_cost)] {
            if !v.is_finite() || v < 0.0 {
                return Err(DispatchError::InvalidRequest(format!(
                    "{} must be a non-negative number, got {}",
                    name, v
                )));
            }
        }

        let kind = match request.policy.as_deref() {
            Some(name) => name.parse::<PolicyKind>()?,
            None => self.config.default_policy,
        };
        let params = CobraParams {
            lambda: request.lambda.unwrap_or(self.config.lambda),
            epsilon: request.epsilon.unwrap_or(self.config.epsilon),
        };
        if kind == PolicyKind::Cobra {
            params.validate()?;
        }

        let task = TaskSpec {
            payload: request.payload,
            task_type,
            energy_cost: request.energy_cost,
            compute_cost: request.compute_cost,
        };
        Ok((Policy::from_kind(kind, params), task))
    }

    fn run_dispatch(&self, policy: &Policy, task: &TaskSpec) -> Result<DispatchOutcome, DispatchError> {
        let mut tx = self.ledger.begin();
        let nodes = tx.load_nodes()?;
        let ctx = tx.load_context()?;

        let profile = LatencyProfile::for_task(task.task_type);
        let (mut node, next_ctx, burst_started, latency_ms) = {
            let mut rng = self.lock_rng()?;
            let selection = policy::select(policy, &nodes, task, &ctx, &mut *rng).ok_or(
                DispatchError::NoEligibleNode {
                    policy: policy.kind(),
                },
            )?;
            let latency_ms = profile.sample(&mut *rng);
            (
                selection.node.clone(),
                selection.context,
                selection.burst_started,
                latency_ms,
            )
        };

        debug!(
            policy = %policy.kind(),
            node_id = %node.node_id,
            class = %node.class,
            task_type = %task.task_type,
            latency_ms,
            burst_started,
            "Selected node"
        );

        if let Some(wait) = latency::scaled_wait(latency_ms, self.config.latency_time_scale) {
            std::thread::sleep(wait);
        }

        let task_id = tx.id().to_string();
        let (record, report) =
            accounting::assign(&mut node, task, &task_id, latency_ms, policy.reputation_lambda());

        tx.store_node(&node)?;
        tx.store_task(&record)?;
        if next_ctx != ctx {
            tx.store_context(&next_ctx)?;
        }
        let commit_sequence = tx.commit()?;

        debug!(
            task_id = %record.task_id,
            node_id = %node.node_id,
            compute_left = node.compute_resources,
            status = %node.status,
            on_time = report.on_time,
            reset = report.resources_reset,
            "Dispatch committed"
        );

        Ok(DispatchOutcome {
            policy: policy.kind(),
            task: record,
            node,
            report,
            burst_started,
            context: next_ctx,
            commit_sequence,
        })
    }
}
