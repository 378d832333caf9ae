use super::{coordinator, drain, member};
use crate::testbed::{Air, Pump};
use canopy_core::{MeshConfig, NodeAddr, NodeId, Role};

/// A single member joins directly under the coordinator and lands in the
/// first child slot.
pub fn first_join() {
    let air = Air::new();
    let (coordinator, _) = coordinator(&air);
    let pump = Pump::spawn(coordinator);

    let (mut member7, _) = member(&air, 7);
    member7
        .begin(MeshConfig::default())
        .expect("member 7 failed to join");

    assert_eq!(member7.role(), Role::Member);
    assert_eq!(member7.address(), NodeAddr::new(0o1));
    assert_eq!(member7.error_code(), None);

    let mut coordinator = pump.stop();
    drain(&mut coordinator);

    let bindings: Vec<_> = coordinator.bindings().copied().collect();
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].id, NodeId::new(7));
    assert_eq!(bindings[0].addr, NodeAddr::new(0o1));
}
