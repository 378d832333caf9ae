use super::{AirState, NodeHandle};
use canopy_core::net::frame::{Frame, Header, MessageType};
use canopy_core::{DataRate, Flag, Network, NodeAddr, PowerLevel};
use std::sync::{Arc, Mutex};

/// A stand-in for the tree-routing layer, backed by an
/// [`Air`](super::Air).
///
/// Routing, multicast fan-out and poll replies happen inside the air; this
/// type adds the per-node state the mesh core observes: the received-frame
/// buffer, flags, and the logical address.
pub struct SimNetwork {
    air: Arc<Mutex<AirState>>,
    handle: usize,
    buffer: Vec<u8>,
    return_system_messages: bool,
}

/// How long the simulated layer keeps retrying a routed write, which also
/// bounds the coordinator's wait for a join confirmation.
const ROUTE_TIMEOUT_MS: u32 = 1_000;

impl SimNetwork {
    pub(super) fn new(air: Arc<Mutex<AirState>>, handle: usize) -> Self {
        Self {
            air,
            handle,
            buffer: Vec::new(),
            return_system_messages: false,
        }
    }

    /// This node's identity on the air, stable across address changes.
    pub fn handle(&self) -> NodeHandle {
        NodeHandle(self.handle)
    }
}

impl Network for SimNetwork {
    fn begin(&mut self, _channel: u8, addr: NodeAddr, _rate: DataRate, _power: PowerLevel) -> bool {
        let mut air = self.air.lock().unwrap();
        air.nodes[self.handle].addr = addr;
        air.nodes[self.handle].listening = true;
        true
    }

    fn update(&mut self) -> MessageType {
        let mut air = self.air.lock().unwrap();
        let bytes = match air.nodes[self.handle].inbox.pop_front() {
            Some(bytes) => bytes,
            None => return MessageType::None,
        };
        let frame = match Frame::parse(&bytes) {
            Ok(frame) => frame,
            Err(_) => return MessageType::None,
        };

        // An address response that lands on a configured node has reached
        // the end of its routed path; the joiner it is for is a neighbor
        // still sitting on the unconfigured address. Pass it down instead
        // of surfacing it.
        let my_addr = air.nodes[self.handle].addr;
        if frame.header.msg_type == MessageType::AddrResponse && my_addr != NodeAddr::DEFAULT {
            let mut header = frame.header;
            header.dst = NodeAddr::DEFAULT;
            air.direct(self.handle, header, &frame.payload, NodeAddr::DEFAULT);
            self.buffer = bytes;
            return MessageType::None;
        }

        // System frames stay internal unless the mesh asked for them.
        if !self.return_system_messages && u8::from(frame.header.msg_type) > 127 {
            self.buffer = bytes;
            return MessageType::None;
        }

        self.buffer = bytes;
        frame.header.msg_type
    }

    fn frame_buffer(&self) -> &[u8] {
        &self.buffer
    }

    fn write(&mut self, header: Header, payload: &[u8]) -> bool {
        self.air.lock().unwrap().routed(self.handle, header, payload)
    }

    fn write_direct(&mut self, header: Header, payload: &[u8], to: NodeAddr) -> bool {
        self.air.lock().unwrap().direct(self.handle, header, payload, to)
    }

    fn multicast(&mut self, header: Header, payload: &[u8], level: u8) -> bool {
        self.air
            .lock()
            .unwrap()
            .multicast(self.handle, header, payload, level)
    }

    fn set_address(&mut self, addr: NodeAddr) -> bool {
        let mut air = self.air.lock().unwrap();
        air.nodes[self.handle].addr = addr;
        air.nodes[self.handle].listening = true;
        true
    }

    fn logical_address(&self) -> NodeAddr {
        self.air.lock().unwrap().nodes[self.handle].addr
    }

    fn is_valid_address(&self, addr: NodeAddr) -> bool {
        if addr == NodeAddr::COORDINATOR {
            return true;
        }
        let mut rest = addr.to_u16();
        while rest != 0 {
            let digit = rest & 0o7;
            if digit == 0 || digit > 5 {
                return false;
            }
            rest >>= 3;
        }
        true
    }

    fn child_bit_field(&self) -> u8 {
        let air = self.air.lock().unwrap();
        let addr = air.nodes[self.handle].addr;
        air.child_bits(addr)
    }

    fn route_timeout_ms(&self) -> u32 {
        ROUTE_TIMEOUT_MS
    }

    fn set_flag(&mut self, flag: Flag) {
        let mut air = self.air.lock().unwrap();
        let node = &mut air.nodes[self.handle];
        match flag {
            Flag::HoldIncoming => node.hold_incoming = true,
            Flag::BypassHolds => node.bypass_holds = true,
            Flag::NoPoll => node.no_poll = true,
        }
    }

    fn clear_flag(&mut self, flag: Flag) {
        let mut air = self.air.lock().unwrap();
        let node = &mut air.nodes[self.handle];
        match flag {
            Flag::HoldIncoming => node.hold_incoming = false,
            Flag::BypassHolds => node.bypass_holds = false,
            Flag::NoPoll => node.no_poll = false,
        }
    }

    fn flag(&self, flag: Flag) -> bool {
        let air = self.air.lock().unwrap();
        let node = &air.nodes[self.handle];
        match flag {
            Flag::HoldIncoming => node.hold_incoming,
            Flag::BypassHolds => node.bypass_holds,
            Flag::NoPoll => node.no_poll,
        }
    }

    fn set_return_system_messages(&mut self, enabled: bool) {
        self.return_system_messages = enabled;
    }
}
