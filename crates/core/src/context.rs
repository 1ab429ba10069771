use serde::{Deserialize, Serialize};

/// Scheduler-wide dispatch state, persisted as a single ledger record.
///
/// Every dispatch reads and writes it inside the same transaction that
/// mutates the chosen node, so two concurrent dispatches can never spend the
/// same burst credit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchContext {
    /// Edge node chosen most recently by an Edge-aware policy.
    #[serde(default)]
    pub last_used_node_id: Option<String>,
    /// UAV dispatches still owed before Edge nodes are considered again.
    #[serde(default)]
    pub uav_burst_remaining: u32,
    /// Node chosen by the previous round-robin dispatch.
    #[serde(default)]
    pub round_robin_last_node_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    EdgePhase,
    UavBurstPhase,
}

impl DispatchContext {
    pub fn phase(&self) -> Phase {
        if self.uav_burst_remaining > 0 {
            Phase::UavBurstPhase
        } else {
            Phase::EdgePhase
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_edge_phase() {
        let ctx = DispatchContext::default();
        assert_eq!(ctx.phase(), Phase::EdgePhase);
        assert_eq!(ctx.uav_burst_remaining, 0);
        assert!(ctx.last_used_node_id.is_none());
    }

    #[test]
    fn missing_fields_default_on_decode() {
        let ctx: DispatchContext = serde_json::from_str(r#"{"uavBurstRemaining": 4}"#).unwrap();
        assert_eq!(ctx.uav_burst_remaining, 4);
        assert_eq!(ctx.phase(), Phase::UavBurstPhase);
        assert!(ctx.round_robin_last_node_id.is_none());
    }
}
