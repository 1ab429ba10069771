//! Demo fleet used by `seed` and by local experiments.

use tracing::info;

use cobra_core::{Node, NodeClass, NodeRegistration};
use cobra_scheduler::{DispatchError, Scheduler};

pub const EDGE_COMPUTE: f64 = 100.0;
pub const UAV_COMPUTE: f64 = 10.0;
pub const DEMO_BATTERY: f64 = 50.0;

/// Registration for the `index`-th demo node (1-based IDs).
pub fn demo_registration(index: usize, class: NodeClass) -> NodeRegistration {
    let compute = match class {
        NodeClass::Edge => EDGE_COMPUTE,
        NodeClass::Uav => UAV_COMPUTE,
    };
    NodeRegistration::new(&index.to_string(), class, compute, DEMO_BATTERY).with_reputation(1.0, 0.0)
}

/// Register `edges` Edge nodes followed by `uavs` UAV nodes. IDs run
/// consecutively from 1, so re-seeding overwrites the same records.
pub fn seed(scheduler: &Scheduler, edges: usize, uavs: usize) -> Result<Vec<Node>, DispatchError> {
    let classes = std::iter::repeat(NodeClass::Edge)
        .take(edges)
        .chain(std::iter::repeat(NodeClass::Uav).take(uavs));

    let mut nodes = Vec::with_capacity(edges + uavs);
    for (i, class) in classes.enumerate() {
        nodes.push(scheduler.register_node(demo_registration(i + 1, class))?);
    }
    info!("Seeded {} Edge and {} UAV node(s)", edges, uavs);
    Ok(nodes)
}
