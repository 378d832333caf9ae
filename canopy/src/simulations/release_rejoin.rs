use super::{coordinator, drain, member};
use crate::testbed::{Air, Pump};
use canopy_core::{MeshConfig, NodeAddr, NodeId};

/// A member hands its address back: the coordinator marks the row released
/// without shrinking the table, and a later re-join lands the same id on a
/// fresh lease.
pub fn release_rejoin() {
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

    member7.release_address().expect("release failed");
    assert_eq!(member7.address(), NodeAddr::DEFAULT);

    let mut coordinator = pump.stop();
    drain(&mut coordinator);

    let released = coordinator
        .bindings()
        .find(|binding| binding.id == NodeId::new(7))
        .copied()
        .expect("released row should stay in the table");
    assert_eq!(released.addr, NodeAddr::EMPTY);
    assert_eq!(coordinator.bindings().count(), 2);
    assert_eq!(coordinator.get_address(NodeId::new(7)).ok(), None);

    let pump = Pump::spawn(coordinator);
    member7
        .begin(MeshConfig::default())
        .expect("member 7 failed to rejoin");
    let rejoined = member7.address();
    assert_ne!(rejoined, NodeAddr::DEFAULT);

    let mut coordinator = pump.stop();
    drain(&mut coordinator);

    assert_eq!(coordinator.bindings().count(), 2);
    assert_eq!(coordinator.get_address(NodeId::new(7)), Ok(rejoined));
}
