use super::{coordinator, drain, member};
use crate::testbed::{retry, Air, Pump};
use canopy_core::{MeshConfig, NodeAddr, NodeId};

/// Members resolve each other by id through the coordinator, and the
/// coordinator resolves addresses back to ids out of its own table.
pub fn mesh_lookup() {
    let air = Air::new();
    let (coordinator, _) = coordinator(&air);
    let pump = Pump::spawn(coordinator);

    let (mut member7, _) = member(&air, 7);
    member7
        .begin(MeshConfig::default())
        .expect("member 7 failed to join");
    let (mut member8, _) = member(&air, 8);
    member8
        .begin(MeshConfig::default())
        .expect("member 8 failed to join");

    let addr_of_8 = retry(50, || member7.get_address(NodeId::new(8)))
        .expect("member 7 could not resolve member 8");
    assert_eq!(addr_of_8, NodeAddr::new(0o2));

    let id_of_1 = retry(50, || member8.get_node_id(Some(NodeAddr::new(0o1))))
        .expect("member 8 could not resolve address 01");
    assert_eq!(id_of_1, NodeId::new(7));

    // Asking for nobody's address is an explicit miss, not a timeout.
    assert!(retry(5, || member7.get_address(NodeId::new(99))).is_err());

    let mut coordinator = pump.stop();
    drain(&mut coordinator);

    assert_eq!(
        coordinator.get_node_id(Some(NodeAddr::new(0o1))),
        Ok(NodeId::new(7))
    );
    assert_eq!(
        coordinator.get_address(NodeId::new(8)),
        Ok(NodeAddr::new(0o2))
    );
    assert_eq!(coordinator.get_node_id(None), Ok(NodeId::COORDINATOR));
}
