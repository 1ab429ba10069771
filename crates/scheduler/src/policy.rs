use rand::Rng;

use cobra_core::{DispatchContext, Node};

use crate::phase::{self, UavPick};
use crate::scoring::{self, TCI_UAV_THRESHOLD};
use crate::types::{CobraParams, Policy, TaskSpec};

/// Node chosen for a task plus the dispatch context to persist with it.
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    pub node: &'a Node,
    pub context: DispatchContext,
    pub burst_started: bool,
}

impl<'a> Selection<'a> {
    fn plain(node: &'a Node, context: DispatchContext) -> Self {
        Self {
            node,
            context,
            burst_started: false,
        }
    }
}

/// Nodes that can take a task of this compute cost, in listing order.
pub fn eligible_nodes(nodes: &[Node], compute_cost: f64) -> Vec<&Node> {
    nodes.iter().filter(|n| n.is_eligible(compute_cost)).collect()
}

/// Pick one node for `task` under `policy`. `None` means no eligible node in
/// the partition the policy needed; the caller's context is never modified.
pub fn select<'a, R: Rng + ?Sized>(
    policy: &Policy,
    nodes: &'a [Node],
    task: &TaskSpec,
    ctx: &DispatchContext,
    rng: &mut R,
) -> Option<Selection<'a>> {
    let eligible = eligible_nodes(nodes, task.compute_cost);
    let mut next = ctx.clone();

    match policy {
        Policy::FirstAvailable => eligible
            .first()
            .copied()
            .map(|node| Selection::plain(node, next)),

        Policy::RoundRobin => {
            let node = round_robin_successor(&eligible, ctx.round_robin_last_node_id.as_deref())?;
            next.round_robin_last_node_id = Some(node.node_id.clone());
            Some(Selection::plain(node, next))
        }

        Policy::Random => {
            if eligible.is_empty() {
                return None;
            }
            let node = eligible[rng.gen_range(0..eligible.len())];
            Some(Selection::plain(node, next))
        }

        Policy::EdgePriority | Policy::EnergyAware => {
            let (edges, uavs) = partition(&eligible);
            let pick = match policy {
                Policy::EnergyAware => UavPick::EnergyEfficiency {
                    energy_cost: task.energy_cost,
                },
                _ => UavPick::Random,
            };
            let decision = phase::advance(&edges, &uavs, &mut next, pick, rng)?;
            Some(Selection {
                node: decision.node,
                context: next,
                burst_started: decision.burst_started,
            })
        }

        Policy::Cobra(params) => {
            let node = select_cobra(&eligible, task, params, &mut next)?;
            Some(Selection::plain(node, next))
        }
    }
}

fn partition<'a>(eligible: &[&'a Node]) -> (Vec<&'a Node>, Vec<&'a Node>) {
    eligible.iter().copied().partition(|n| n.is_edge())
}

/// First eligible node whose ID sorts after `previous`, wrapping to the
/// first eligible node.
fn round_robin_successor<'a>(eligible: &[&'a Node], previous: Option<&str>) -> Option<&'a Node> {
    let first = eligible.first().copied()?;
    let Some(previous) = previous else {
        return Some(first);
    };
    Some(
        eligible
            .iter()
            .copied()
            .find(|n| n.node_id.as_str() > previous)
            .unwrap_or(first),
    )
}

fn select_cobra<'a>(
    eligible: &[&'a Node],
    task: &TaskSpec,
    params: &CobraParams,
    ctx: &mut DispatchContext,
) -> Option<&'a Node> {
    let (edges, uavs) = partition(eligible);
    let ri = |n: &Node| scoring::reliability_index(n, params.lambda, params.epsilon);
    let tci = scoring::task_cost_index(task.energy_cost, task.compute_cost, params.epsilon);

    if tci < TCI_UAV_THRESHOLD && !uavs.is_empty() {
        return scoring::argmax_by(uavs.iter().copied(), ri);
    }

    if !edges.is_empty() {
        let last_used = ctx.last_used_node_id.as_deref();
        let node = scoring::argmax_by(
            edges
                .iter()
                .copied()
                .filter(|n| Some(n.node_id.as_str()) != last_used),
            ri,
        )
        .unwrap_or(edges[0]);
        ctx.last_used_node_id = Some(node.node_id.clone());
        return Some(node);
    }

    scoring::argmax_by(uavs.iter().copied(), ri)
}
