use super::coordinator;
use crate::testbed::Air;
use canopy_core::net::frame::MessageType;
use canopy_core::{NodeAddr, Role};

/// A coordinator with nobody to talk to: it holds address 0, its table is
/// empty, and pumping it does nothing.
pub fn lone_coordinator() {
    let air = Air::new();
    let (mut mesh, _) = coordinator(&air);

    assert_eq!(mesh.role(), Role::Coordinator);
    assert_eq!(mesh.address(), NodeAddr::COORDINATOR);
    assert_eq!(mesh.bindings().count(), 0);
    assert_eq!(mesh.error_code(), None);

    assert_eq!(mesh.update(), MessageType::None);
    mesh.dhcp();
    assert_eq!(mesh.bindings().count(), 0);
}
