//! Edge-first / UAV-burst alternation shared by ECP and Energy-Aware.
//!
//! Edge nodes are served one at a time, never the same one twice in a row,
//! until every eligible Edge node has completed work. The controller then
//! owes UAVs a burst of `3 * edges - 1` further dispatches before Edge nodes
//! are considered again.

use rand::Rng;

use cobra_core::{DispatchContext, Node, Phase};

use crate::scoring;

/// Dispatches owed to UAVs per eligible Edge node when a burst starts.
pub const UAV_BURST_FACTOR: usize = 3;

/// How a UAV is chosen during a burst.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UavPick {
    Random,
    /// Highest energy-efficiency score for a task of this energy cost.
    EnergyEfficiency { energy_cost: f64 },
}

#[derive(Debug, Clone, Copy)]
pub struct PhaseDecision<'a> {
    pub node: &'a Node,
    pub phase: Phase,
    pub burst_started: bool,
}

fn pick_uav<'a, R: Rng + ?Sized>(uavs: &[&'a Node], pick: UavPick, rng: &mut R) -> Option<&'a Node> {
    if uavs.is_empty() {
        return None;
    }
    match pick {
        UavPick::Random => Some(uavs[rng.gen_range(0..uavs.len())]),
        UavPick::EnergyEfficiency { energy_cost } => scoring::argmax_by(uavs.iter().copied(), |n| {
            scoring::energy_efficiency_score(n, energy_cost)
        }),
    }
}

/// Random Edge node other than the last one used. When that leaves nothing,
/// the exclusion is dropped.
pub fn pick_edge_avoiding_last<'a, R: Rng + ?Sized>(
    edges: &[&'a Node],
    last_used: Option<&str>,
    rng: &mut R,
) -> Option<&'a Node> {
    let fresh: Vec<&Node> = edges
        .iter()
        .copied()
        .filter(|n| Some(n.node_id.as_str()) != last_used)
        .collect();
    let pool: &[&Node] = if fresh.is_empty() { edges } else { &fresh };
    if pool.is_empty() {
        return None;
    }
    Some(pool[rng.gen_range(0..pool.len())])
}

/// Advance the phase machine by one dispatch. `ctx` is only modified when a
/// node is returned.
pub fn advance<'a, R: Rng + ?Sized>(
    edges: &[&'a Node],
    uavs: &[&'a Node],
    ctx: &mut DispatchContext,
    pick: UavPick,
    rng: &mut R,
) -> Option<PhaseDecision<'a>> {
    if ctx.phase() == Phase::UavBurstPhase {
        let node = pick_uav(uavs, pick, rng)?;
        ctx.uav_burst_remaining -= 1;
        return Some(PhaseDecision {
            node,
            phase: Phase::UavBurstPhase,
            burst_started: false,
        });
    }

    if edges.iter().any(|n| n.tasks_completed == 0) {
        let node = pick_edge_avoiding_last(edges, ctx.last_used_node_id.as_deref(), rng)?;
        ctx.last_used_node_id = Some(node.node_id.clone());
        return Some(PhaseDecision {
            node,
            phase: Phase::EdgePhase,
            burst_started: false,
        });
    }

    let node = pick_uav(uavs, pick, rng)?;
    ctx.uav_burst_remaining = (UAV_BURST_FACTOR * edges.len()).saturating_sub(1) as u32;
    Some(PhaseDecision {
        node,
        phase: Phase::UavBurstPhase,
        burst_started: true,
    })
}
