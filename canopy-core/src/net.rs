//! The tree-routing layer seam.
//!
//! The routing layer does the actual frame moving: unicast along the octal
//! tree, multicast to a tree level, retries and route timeouts. The mesh
//! core drives it through [`Network`] and never reaches around it to the
//! radio for traffic. See [`frame`] for the wire layout the two sides
//! agree on.

pub mod frame;

use self::frame::{Header, MessageType};
use crate::address::NodeAddr;
use crate::radio::{DataRate, PowerLevel};

/// Destination used for multicast polls; the routing layer fans the frame
/// out to every listener at the requested tree level.
pub const MULTICAST_ADDR: NodeAddr = NodeAddr::new(0o100);

/// Behavior toggles on the routing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    /// The layer is holding inbound frames because the embedder has not
    /// drained the last one.
    HoldIncoming,
    /// Ignore holds; used while renewing so a stale hold cannot block the
    /// join protocol.
    BypassHolds,
    /// Do not answer discovery polls, which keeps children from attaching.
    NoPoll,
}

/// The routing-layer surface the mesh core consumes.
///
/// Everything is synchronous: `update` is a poll, writes report success as
/// a boolean (for acknowledged types this means the far end confirmed
/// receipt), and the received frame is exposed as raw bytes for
/// [`frame::Frame::parse`].
pub trait Network {
    /// Initializes the layer and the radio beneath it.
    fn begin(&mut self, channel: u8, addr: NodeAddr, rate: DataRate, power: PowerLevel) -> bool;

    /// Pumps the layer once, returning the type of the system frame that
    /// arrived, if any.
    fn update(&mut self) -> MessageType;

    /// The raw bytes of the most recently received frame.
    fn frame_buffer(&self) -> &[u8];

    /// Sends a frame routed along the tree toward `header.dst`. The layer
    /// stamps `header.src` with the current logical address.
    fn write(&mut self, header: Header, payload: &[u8]) -> bool;

    /// Sends a frame straight to a physical neighbor, skipping routing.
    /// Stamps `header.src` like [`Network::write`].
    fn write_direct(&mut self, header: Header, payload: &[u8], to: NodeAddr) -> bool;

    /// Multicasts a frame to every listener at the given tree level.
    fn multicast(&mut self, header: Header, payload: &[u8], level: u8) -> bool;

    /// Adopts a new logical address, re-keying the layer's receive pipes.
    fn set_address(&mut self, addr: NodeAddr) -> bool;

    fn logical_address(&self) -> NodeAddr;

    /// Whether an address is a well-formed position in the tree.
    fn is_valid_address(&self, addr: NodeAddr) -> bool;

    /// Which of this node's child slots are occupied; bit `i` set means
    /// slot `i + 1` is taken.
    fn child_bit_field(&self) -> u8;

    /// How long the layer will keep retrying a routed, acknowledged write.
    fn route_timeout_ms(&self) -> u32;

    fn set_flag(&mut self, flag: Flag);

    fn clear_flag(&mut self, flag: Flag);

    fn flag(&self, flag: Flag) -> bool;

    /// Whether `update` should surface system frames to the caller instead
    /// of consuming them internally. The mesh core turns this on.
    fn set_return_system_messages(&mut self, enabled: bool);
}
