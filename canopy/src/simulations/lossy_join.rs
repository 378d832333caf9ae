use super::{coordinator, drain, member};
use crate::testbed::{Air, Pump};
use canopy_core::{MeshConfig, NodeAddr, NodeId};

/// Joining keeps working when the air eats a share of the frames; the
/// renewal loop's backoff and the confirmation retries absorb the loss.
pub fn lossy_join() {
    let air = Air::new();
    air.set_loss(0.15, 0xC0FFEE);

    let (coordinator, _) = coordinator(&air);
    let pump = Pump::spawn(coordinator);

    let (mut member42, _) = member(&air, 42);
    member42
        .begin(MeshConfig::default())
        .expect("member 42 failed to join over a lossy link");

    let addr = member42.address();
    assert_ne!(addr, NodeAddr::DEFAULT);
    assert_eq!(addr.level(), 1);

    let mut coordinator = pump.stop();
    drain(&mut coordinator);

    assert_eq!(coordinator.get_address(NodeId::new(42)), Ok(addr));
}
