use super::{coordinator, drain, member};
use crate::testbed::{Air, Pump};
use canopy_core::{MeshConfig, NodeAddr, NodeId};

/// A second member joins under the same parent and gets the next child
/// slot, leaving the first member's binding untouched.
pub fn sibling_join() {
    let air = Air::new();
    let (coordinator, _) = coordinator(&air);
    let pump = Pump::spawn(coordinator);

    let (mut member7, _) = member(&air, 7);
    member7
        .begin(MeshConfig::default())
        .expect("member 7 failed to join");
    assert_eq!(member7.address(), NodeAddr::new(0o1));

    let (mut member8, _) = member(&air, 8);
    member8
        .begin(MeshConfig::default())
        .expect("member 8 failed to join");
    assert_eq!(member8.address(), NodeAddr::new(0o2));

    let mut coordinator = pump.stop();
    drain(&mut coordinator);

    let bindings: Vec<_> = coordinator.bindings().copied().collect();
    assert_eq!(bindings.len(), 2);
    assert_eq!(bindings[0].id, NodeId::new(7));
    assert_eq!(bindings[0].addr, NodeAddr::new(0o1));
    assert_eq!(bindings[1].id, NodeId::new(8));
    assert_eq!(bindings[1].addr, NodeAddr::new(0o2));
}
