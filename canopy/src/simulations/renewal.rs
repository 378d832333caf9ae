use super::{coordinator, drain, member};
use crate::testbed::{retry, Air, Pump};
use canopy_core::{MeshConfig, NodeAddr, NodeId};

/// A member loses its direct path to the coordinator, notices through the
/// connectivity check, and renews: it re-joins through a sibling and the
/// coordinator overwrites its old binding.
pub fn renewal() {
    let air = Air::new();
    let (coordinator, coordinator_handle) = coordinator(&air);
    let pump = Pump::spawn(coordinator);

    let (mut member7, member7_handle) = member(&air, 7);
    member7
        .begin(MeshConfig::default())
        .expect("member 7 failed to join");
    assert_eq!(member7.address(), NodeAddr::new(0o1));

    let (mut member8, _) = member(&air, 8);
    member8
        .begin(MeshConfig::default())
        .expect("member 8 failed to join");
    // Member 8 keeps pumping so it can relay its new sibling's traffic.
    let pump8 = Pump::spawn(member8);

    air.sever(member7_handle, coordinator_handle);

    assert!(!member7.check_connection());

    let new_addr = member7
        .renew_address(5_000)
        .expect("renewal through member 8 failed");
    assert_ne!(new_addr, NodeAddr::new(0o1));
    assert_eq!(new_addr, NodeAddr::new(0o12));
    assert_eq!(member7.address(), new_addr);

    // The lookup routes through member 8 now; it also proves the
    // coordinator rebound id 7 to the new address.
    let looked_up = retry(50, || member7.get_address(NodeId::new(7)))
        .expect("member 7 could not resolve itself after renewal");
    assert_eq!(looked_up, new_addr);

    let mut coordinator = pump.stop();
    drain(&mut coordinator);
    pump8.stop();

    let rebound = coordinator
        .bindings()
        .find(|binding| binding.id == NodeId::new(7))
        .copied()
        .expect("binding for member 7 disappeared");
    assert_eq!(rebound.addr, new_addr);
}
