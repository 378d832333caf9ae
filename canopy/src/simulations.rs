//! End-to-end mesh scenarios on the simulated link layer.
//!
//! Each simulation stands up a small mesh, walks it through part of the
//! address-management protocol, and asserts on the state both sides end up
//! in. The integration tests run every one of them.

pub mod first_join;
pub mod lone_coordinator;
pub mod lossy_join;
pub mod mesh_lookup;
pub mod release_rejoin;
pub mod renewal;
pub mod sibling_join;

pub use first_join::first_join;
pub use lone_coordinator::lone_coordinator;
pub use lossy_join::lossy_join;
pub use mesh_lookup::mesh_lookup;
pub use release_rejoin::release_rejoin;
pub use renewal::renewal;
pub use sibling_join::sibling_join;

use crate::testbed::{Air, NodeHandle, SimNetwork, SimRadio};
use canopy_core::{Mesh, MeshConfig, NodeId};

/// Stands up the coordinator on the given air.
pub(crate) fn coordinator(air: &Air) -> (Mesh<SimRadio, SimNetwork>, NodeHandle) {
    let (radio, network) = air.endpoint();
    let handle = network.handle();
    let mut mesh = Mesh::new(radio, network);
    mesh.set_node_id(NodeId::COORDINATOR);
    mesh.begin(MeshConfig::default())
        .expect("coordinator failed to initialize");
    (mesh, handle)
}

/// Attaches a member with the given id, not yet joined.
pub(crate) fn member(air: &Air, id: u8) -> (Mesh<SimRadio, SimNetwork>, NodeHandle) {
    let (radio, network) = air.endpoint();
    let handle = network.handle();
    let mut mesh = Mesh::new(radio, network);
    mesh.set_node_id(NodeId::new(id));
    (mesh, handle)
}

/// Pumps a mesh on the current thread until its inbox-driven work is done.
pub(crate) fn drain(mesh: &mut Mesh<SimRadio, SimNetwork>) {
    for _ in 0..32 {
        mesh.update();
        mesh.dhcp();
    }
}
