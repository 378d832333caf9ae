//! The mesh object: one per node, coordinator or member.
//!
//! [`Mesh`] owns the radio and the routing layer and is driven entirely by
//! the embedder's main loop: call [`Mesh::update`] at regular intervals and
//! [`Mesh::dhcp`] right after it, and use the returned
//! [`MessageType`](crate::net::frame::MessageType) to decide whether an
//! application payload is waiting in the routing layer.
//!
//! The join protocol, lookups and the coordinator's confirmation wait are
//! bounded spin-waits over `network.update()` and `radio.millis()`; nothing
//! here suspends or spawns.

mod dhcp;
mod join;

use crate::address::{NodeAddr, NodeId};
use crate::binding::{Binding, BindingTable};
use crate::config::MeshConfig;
use crate::error::MeshError;
use crate::logging;
use crate::net::frame::{Frame, Header, MessageType};
use crate::net::{Flag, Network};
use crate::radio::Radio;

/// How long a member waits for the coordinator to answer an id-to-address
/// lookup.
const ADDR_LOOKUP_WAIT_MS: u32 = 150;

/// How long a member waits for the coordinator to answer an address-to-id
/// lookup.
const ID_LOOKUP_WAIT_MS: u32 = 500;

/// Spacing between connectivity-check attempts.
const CONNECTION_RETRY_DELAY_MS: u32 = 103;

/// Which half of the protocol this node runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The single node with id 0; owns the binding table and serves
    /// address assignment and lookups.
    Coordinator,
    /// Everyone else; holds a leased route-address and asks the
    /// coordinator for lookups.
    Member,
}

/// The most recently issued, unconfirmed assignment. At most one exists;
/// racing joiners overwrite it and the earlier joiner finds out at its next
/// connectivity check.
#[derive(Debug, Clone, Copy)]
struct PendingAssignment {
    id: NodeId,
    addr: NodeAddr,
}

/// State only the coordinator holds. Members never own a binding table.
#[derive(Debug, Default)]
struct CoordinatorState {
    table: BindingTable,
    pending: Option<PendingAssignment>,
}

/// A node of the mesh. Generic over the radio driver and the tree-routing
/// layer so simulations can swap both out.
pub struct Mesh<R: Radio, N: Network> {
    radio: R,
    network: N,
    node_id: NodeId,
    addr: NodeAddr,
    channel: u8,
    role: Role,
    config: MeshConfig,
    coordinator: Option<CoordinatorState>,
    dhcp_frame: Vec<u8>,
    process_dhcp: bool,
    last_error: Option<MeshError>,
}

impl<R: Radio, N: Network> Mesh<R, N> {
    pub fn new(radio: R, network: N) -> Self {
        Self {
            radio,
            network,
            node_id: NodeId::COORDINATOR,
            addr: NodeAddr::DEFAULT,
            channel: 0,
            role: Role::Member,
            config: MeshConfig::default(),
            coordinator: None,
            dhcp_frame: Vec::new(),
            process_dhcp: false,
            last_error: None,
        }
    }

    /// Sets this node's stable identifier. Call before [`Mesh::begin`];
    /// id 0 makes this node the coordinator.
    pub fn set_node_id(&mut self, id: NodeId) {
        self.node_id = id;
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// The route-address this node currently holds;
    /// [`NodeAddr::DEFAULT`] while not joined.
    pub fn address(&self) -> NodeAddr {
        self.addr
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// The radio channel the mesh was started on or moved to.
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// The most recent failure, cleared at the start of every operation.
    pub fn error_code(&self) -> Option<MeshError> {
        self.last_error
    }

    /// The coordinator's bindings in assignment order; empty on members.
    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.coordinator.iter().flat_map(|state| state.table.iter())
    }

    /// Brings the routing layer up and, on a member, runs address renewal
    /// until an address is held or the configured renewal timeout expires.
    pub fn begin(&mut self, config: MeshConfig) -> Result<(), MeshError> {
        self.last_error = None;
        self.config = config;

        if !self.network.begin(
            config.channel,
            NodeAddr::DEFAULT,
            config.data_rate,
            config.power,
        ) {
            return self.fail(MeshError::FailedInit);
        }
        self.channel = config.channel;
        self.network.set_return_system_messages(true);

        if self.node_id.is_coordinator() {
            self.role = Role::Coordinator;
            self.coordinator = Some(CoordinatorState::default());
            if !self.network.set_address(NodeAddr::COORDINATOR) {
                return self.fail(MeshError::FailedInit);
            }
            self.addr = NodeAddr::COORDINATOR;
            Ok(())
        } else {
            self.role = Role::Member;
            self.renew_address(config.renewal_timeout_ms)?;
            Ok(())
        }
    }

    /// Pumps the routing layer once and dispatches any system frame.
    ///
    /// Address-management frames are snapshotted for [`Mesh::dhcp`];
    /// lookups, releases and confirmations are served inline on the
    /// coordinator. Returns the received frame's type so the embedder can
    /// drive its own application logic off it.
    pub fn update(&mut self) -> MessageType {
        if self.addr == NodeAddr::DEFAULT {
            return MessageType::None;
        }

        let kind = self.network.update();

        if matches!(kind, MessageType::ReqAddress | MessageType::AddrResponse) {
            self.dhcp_frame.clear();
            self.dhcp_frame.extend_from_slice(self.network.frame_buffer());
            self.process_dhcp = true;
        }

        if self.role == Role::Coordinator {
            match kind {
                MessageType::AddrLookup | MessageType::IdLookup => self.serve_lookup(kind),
                MessageType::AddrRelease => self.serve_release(),
                MessageType::AddrConfirm => self.serve_confirmation(),
                _ => {}
            }
        }

        kind
    }

    /// Sends an application payload. With a recipient id, the destination
    /// address is looked up first, retrying with a widening delay until the
    /// lookup budget runs out or the coordinator reports the id unbound.
    /// Without one the payload goes to the coordinator.
    pub fn write(
        &mut self,
        payload: &[u8],
        msg_type: u8,
        to: Option<NodeId>,
    ) -> Result<(), MeshError> {
        self.last_error = None;
        if self.addr == NodeAddr::DEFAULT {
            return self.fail(MeshError::NotConfigured);
        }

        let dst = match to {
            None => NodeAddr::COORDINATOR,
            Some(id) if id.is_coordinator() => NodeAddr::COORDINATOR,
            Some(id) => {
                let started = self.radio.millis();
                let mut retry_delay = 50;
                loop {
                    match self.get_address(id) {
                        Ok(addr) => break addr,
                        // The coordinator answered and the id is not bound;
                        // waiting will not help. A coordinator's own table
                        // miss keeps retrying: the id may join any moment.
                        Err(err @ MeshError::NotConfigured) if self.role == Role::Member => {
                            return Err(err)
                        }
                        Err(err) => {
                            if self
                                .radio
                                .millis()
                                .wrapping_sub(started)
                                > self.config.lookup_timeout_ms
                            {
                                return Err(err);
                            }
                            retry_delay += 50;
                            self.radio.delay_ms(retry_delay);
                        }
                    }
                }
            }
        };

        self.write_to(dst, payload, msg_type)
    }

    /// Sends an application payload to an explicit route-address.
    pub fn write_to(
        &mut self,
        dst: NodeAddr,
        payload: &[u8],
        msg_type: u8,
    ) -> Result<(), MeshError> {
        self.last_error = None;
        if self.addr == NodeAddr::DEFAULT {
            return self.fail(MeshError::NotConfigured);
        }
        let header = Header::new(dst, MessageType::from(msg_type));
        if self.network.write(header, payload) {
            Ok(())
        } else {
            self.fail(MeshError::FailedWrite)
        }
    }

    /// The route-address currently bound to `id`: a table lookup on the
    /// coordinator, a round trip to the coordinator on a member.
    pub fn get_address(&mut self, id: NodeId) -> Result<NodeAddr, MeshError> {
        self.last_error = None;

        if self.role == Role::Coordinator {
            let addr = self
                .coordinator
                .as_ref()
                .and_then(|state| state.table.addr_of(id));
            return match addr {
                Some(addr) => Ok(addr),
                None => self.fail(MeshError::NotConfigured),
            };
        }

        if self.addr == NodeAddr::DEFAULT {
            return self.fail(MeshError::NotConfigured);
        }
        if id.is_coordinator() {
            return self.fail(MeshError::InvalidParam);
        }

        let header = Header::new(NodeAddr::COORDINATOR, MessageType::AddrLookup);
        if !self.network.write(header, &[id.to_u8()]) {
            return self.fail(MeshError::FailedWrite);
        }

        let started = self.radio.millis();
        loop {
            if self.network.update() == MessageType::AddrLookup {
                let value = Frame::parse(self.network.frame_buffer())
                    .ok()
                    .and_then(|frame| frame.payload_i16(0))
                    .unwrap_or(-1);
                return if value >= 0 {
                    Ok(NodeAddr::new(value as u16))
                } else {
                    // An explicit miss from the coordinator, not a lost
                    // reply.
                    self.fail(MeshError::NotConfigured)
                };
            }
            if self.radio.millis().wrapping_sub(started) > ADDR_LOOKUP_WAIT_MS {
                return self.fail(MeshError::FailedAddrLookup);
            }
        }
    }

    /// The identifier of the node holding `addr`. `None` asks for this
    /// node's own id.
    pub fn get_node_id(&mut self, addr: Option<NodeAddr>) -> Result<NodeId, MeshError> {
        self.last_error = None;

        let addr = match addr {
            None => return Ok(self.node_id),
            Some(addr) if addr == NodeAddr::COORDINATOR => return Ok(NodeId::COORDINATOR),
            Some(addr) => addr,
        };

        if self.role == Role::Coordinator {
            let id = self
                .coordinator
                .as_ref()
                .and_then(|state| state.table.id_of(addr));
            return match id {
                Some(id) => Ok(id),
                None => self.fail(MeshError::NotConfigured),
            };
        }

        if self.addr == NodeAddr::DEFAULT {
            return self.fail(MeshError::NotConfigured);
        }

        let header = Header::new(NodeAddr::COORDINATOR, MessageType::IdLookup);
        if !self
            .network
            .write(header, &addr.to_u16().to_le_bytes())
        {
            return self.fail(MeshError::FailedWrite);
        }

        let started = self.radio.millis();
        loop {
            if self.network.update() == MessageType::IdLookup {
                let value = Frame::parse(self.network.frame_buffer())
                    .ok()
                    .and_then(|frame| frame.payload_i16(0))
                    .unwrap_or(-1);
                return if value >= 0 {
                    Ok(NodeId::new(value as u8))
                } else {
                    self.fail(MeshError::NotConfigured)
                };
            }
            if self.radio.millis().wrapping_sub(started) > ID_LOOKUP_WAIT_MS {
                return self.fail(MeshError::Timeout);
            }
        }
    }

    /// Whether inbound traffic is backed up in the radio or the routing
    /// layer. [`Mesh::check_connection`] treats this as evidence the mesh
    /// is alive without draining anything.
    pub fn inbound_backpressure(&self) -> bool {
        self.radio.rx_fifo_full() || self.network.flag(Flag::HoldIncoming)
    }

    /// Probes reachability of the coordinator: up to three attempts, each
    /// a pump plus a ping. On total failure the radio is dropped into
    /// standby; renew the address before expecting traffic again.
    pub fn check_connection(&mut self) -> bool {
        let mut attempts = 3;
        let mut result = false;

        while attempts > 0 && self.addr != NodeAddr::DEFAULT {
            attempts -= 1;
            self.update();

            if self.inbound_backpressure() {
                return true;
            }

            let header = Header::new(NodeAddr::COORDINATOR, MessageType::Ping);
            if self.network.write(header, &[]) {
                result = true;
                break;
            }

            self.radio.delay_ms(CONNECTION_RETRY_DELAY_MS);
        }

        if !result {
            self.radio.stop_listening();
        }
        result
    }

    /// Discards the current address and re-runs the join protocol until it
    /// succeeds or `timeout_ms` expires, backing off a little more after
    /// each failed round while cycling the polled tree level.
    pub fn renew_address(&mut self, timeout_ms: u32) -> Result<NodeAddr, MeshError> {
        self.last_error = None;

        if self.radio.available() {
            return self.fail(MeshError::PendingData);
        }

        self.radio.stop_listening();
        // A stale hold must not block the join protocol; losing a frame
        // here is acceptable, being addressless forever is not.
        self.network.set_flag(Flag::BypassHolds);
        self.radio.delay_ms(10);

        self.network.set_address(NodeAddr::DEFAULT);
        self.addr = NodeAddr::DEFAULT;

        let started = self.radio.millis();
        let mut level: u8 = 0;
        let mut total_requests: u32 = 0;
        let result = loop {
            match self.request_address(level) {
                Ok(addr) => break Ok(addr),
                Err(_) => {
                    if self.radio.millis().wrapping_sub(started) > timeout_ms {
                        break self.fail(MeshError::Timeout);
                    }
                    self.radio
                        .delay_ms(50 + ((total_requests + 1) * (u32::from(level) + 1)) * 2);
                    level = (level + 1) % 4;
                    total_requests = (total_requests + 1) % 10;
                }
            }
        };

        self.network.clear_flag(Flag::BypassHolds);
        if result.is_ok() {
            self.last_error = None;
        }
        result
    }

    /// Hands the address back to the coordinator (best effort, the release
    /// frame is not acknowledged) and reverts to the unconfigured state.
    pub fn release_address(&mut self) -> Result<(), MeshError> {
        self.last_error = None;
        if self.addr == NodeAddr::DEFAULT {
            return self.fail(MeshError::NotConfigured);
        }

        let header = Header::new(NodeAddr::COORDINATOR, MessageType::AddrRelease);
        if self.network.write(header, &[]) {
            self.network.set_address(NodeAddr::DEFAULT);
            self.addr = NodeAddr::DEFAULT;
            Ok(())
        } else {
            self.fail(MeshError::FailedWrite)
        }
    }

    /// Allow or forbid children from attaching beneath this node.
    pub fn set_child(&mut self, allow: bool) {
        if allow {
            self.network.clear_flag(Flag::NoPoll);
        } else {
            self.network.set_flag(Flag::NoPoll);
        }
    }

    /// Changes the radio channel while the mesh is running.
    pub fn set_channel(&mut self, channel: u8) {
        self.channel = channel;
        self.radio.set_channel(channel);
        self.radio.start_listening();
    }

    /// Operator override: binds `id` to `addr` on the coordinator.
    pub fn set_binding(&mut self, id: NodeId, addr: NodeAddr) -> Result<(), MeshError> {
        self.last_error = None;
        match self.coordinator.as_mut() {
            Some(state) => {
                state.table.insert_or_replace(id, addr);
                logging::address_assigned_event(id, addr);
                Ok(())
            }
            None => self.fail(MeshError::InvalidParam),
        }
    }

    fn fail<T>(&mut self, err: MeshError) -> Result<T, MeshError> {
        self.last_error = Some(err);
        Err(err)
    }

    /// Answers an id or address lookup out of the binding table, sending
    /// the result (or `-1`) back to the requester under the same message
    /// type.
    fn serve_lookup(&mut self, kind: MessageType) {
        let frame = match Frame::parse(self.network.frame_buffer()) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::error!("dropping malformed lookup frame: {err}");
                return;
            }
        };
        let Some(state) = self.coordinator.as_ref() else {
            return;
        };

        let (label, value): (&'static str, i16) = match kind {
            MessageType::AddrLookup => {
                let id = frame.payload.first().copied().map(NodeId::new);
                let addr = id.and_then(|id| state.table.addr_of(id));
                ("address", addr.map_or(-1, |addr| addr.to_u16() as i16))
            }
            _ => {
                let addr = frame.payload_u16(0).map(NodeAddr::new);
                let id = addr.and_then(|addr| state.table.id_of(addr));
                ("id", id.map_or(-1, |id| i16::from(id.to_u8())))
            }
        };

        let mut reply = frame.header;
        reply.dst = frame.header.src;
        logging::lookup_served_event(label, frame.header.src, value >= 0);
        if !self.network.write(reply, &value.to_le_bytes()) {
            tracing::debug!(requester = %frame.header.src, "lookup reply failed to send");
        }
    }

    /// Releases every binding held by the requesting address.
    fn serve_release(&mut self) {
        let frame = match Frame::parse(self.network.frame_buffer()) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::error!("dropping malformed release frame: {err}");
                return;
            }
        };
        if let Some(state) = self.coordinator.as_mut() {
            state.table.release_addr(frame.header.src);
            logging::address_released_event(frame.header.src);
        }
    }

    /// Commits the pending assignment when its confirmation arrives
    /// outside the bounded wait in the assignment path, e.g. a replay.
    fn serve_confirmation(&mut self) {
        let frame = match Frame::parse(self.network.frame_buffer()) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::error!("dropping malformed confirmation frame: {err}");
                return;
            }
        };
        if let Some(state) = self.coordinator.as_mut() {
            if let Some(pending) = state.pending {
                if frame.header.src == pending.addr {
                    state.table.insert_or_replace(pending.id, pending.addr);
                    logging::address_assigned_event(pending.id, pending.addr);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::VecDeque;

    struct StubRadio {
        now: Cell<u32>,
    }

    impl StubRadio {
        fn new() -> Self {
            Self { now: Cell::new(0) }
        }
    }

    impl Radio for StubRadio {
        fn millis(&self) -> u32 {
            self.now.set(self.now.get() + 1);
            self.now.get()
        }

        fn delay_ms(&self, ms: u32) {
            self.now.set(self.now.get() + ms);
        }

        fn available(&self) -> bool {
            false
        }

        fn rx_fifo_full(&self) -> bool {
            false
        }

        fn start_listening(&mut self) {}

        fn stop_listening(&mut self) {}

        fn set_channel(&mut self, _channel: u8) {}
    }

    /// A scripted routing layer: frames pushed onto the inbox come back
    /// out of `update` one per call.
    struct StubNetwork {
        addr: NodeAddr,
        inbox: VecDeque<Frame>,
        buffer: Vec<u8>,
        sent: Vec<Frame>,
    }

    impl StubNetwork {
        fn new() -> Self {
            Self {
                addr: NodeAddr::DEFAULT,
                inbox: VecDeque::new(),
                buffer: Vec::new(),
                sent: Vec::new(),
            }
        }
    }

    impl Network for StubNetwork {
        fn begin(
            &mut self,
            _channel: u8,
            addr: NodeAddr,
            _rate: crate::DataRate,
            _power: crate::PowerLevel,
        ) -> bool {
            self.addr = addr;
            true
        }

        fn update(&mut self) -> MessageType {
            match self.inbox.pop_front() {
                Some(frame) => {
                    self.buffer = frame.build();
                    frame.header.msg_type
                }
                None => MessageType::None,
            }
        }

        fn frame_buffer(&self) -> &[u8] {
            &self.buffer
        }

        fn write(&mut self, header: Header, payload: &[u8]) -> bool {
            self.sent.push(Frame::new(header, payload));
            true
        }

        fn write_direct(&mut self, header: Header, payload: &[u8], _to: NodeAddr) -> bool {
            self.sent.push(Frame::new(header, payload));
            true
        }

        fn multicast(&mut self, header: Header, payload: &[u8], _level: u8) -> bool {
            self.sent.push(Frame::new(header, payload));
            true
        }

        fn set_address(&mut self, addr: NodeAddr) -> bool {
            self.addr = addr;
            true
        }

        fn logical_address(&self) -> NodeAddr {
            self.addr
        }

        fn is_valid_address(&self, _addr: NodeAddr) -> bool {
            true
        }

        fn child_bit_field(&self) -> u8 {
            0
        }

        fn route_timeout_ms(&self) -> u32 {
            10
        }

        fn set_flag(&mut self, _flag: Flag) {}

        fn clear_flag(&mut self, _flag: Flag) {}

        fn flag(&self, _flag: Flag) -> bool {
            false
        }

        fn set_return_system_messages(&mut self, _enabled: bool) {}
    }

    fn coordinator() -> Mesh<StubRadio, StubNetwork> {
        let mut mesh = Mesh::new(StubRadio::new(), StubNetwork::new());
        mesh.set_node_id(NodeId::COORDINATOR);
        mesh.begin(MeshConfig::default()).unwrap();
        mesh
    }

    fn push(mesh: &mut Mesh<StubRadio, StubNetwork>, frame: Frame) {
        mesh.network.inbox.push_back(frame);
    }

    fn request_frame(id: u8) -> Frame {
        let mut header = Header::new(NodeAddr::COORDINATOR, MessageType::ReqAddress);
        header.reserved = id;
        Frame::new(header, vec![0, 0, 0, 0])
    }

    fn confirm_frame(from: NodeAddr) -> Frame {
        let mut header = Header::new(NodeAddr::COORDINATOR, MessageType::AddrConfirm);
        header.src = from;
        Frame::new(header, Vec::new())
    }

    #[test]
    fn operations_require_an_address() {
        let mut mesh = Mesh::new(StubRadio::new(), StubNetwork::new());
        mesh.set_node_id(NodeId::new(7));

        assert_eq!(mesh.update(), MessageType::None);
        assert_eq!(
            mesh.write(b"hi", 10, None),
            Err(MeshError::NotConfigured)
        );
        assert_eq!(
            mesh.get_address(NodeId::new(3)),
            Err(MeshError::NotConfigured)
        );
        assert_eq!(mesh.release_address(), Err(MeshError::NotConfigured));
        assert_eq!(mesh.error_code(), Some(MeshError::NotConfigured));
        assert!(mesh.network.sent.is_empty());
    }

    #[test]
    fn coordinator_serves_local_lookups() {
        let mut mesh = coordinator();
        assert_eq!(mesh.address(), NodeAddr::COORDINATOR);
        assert_eq!(mesh.error_code(), None);

        mesh.set_binding(NodeId::new(7), NodeAddr::new(0o1)).unwrap();
        assert_eq!(mesh.get_address(NodeId::new(7)), Ok(NodeAddr::new(0o1)));
        assert_eq!(
            mesh.get_node_id(Some(NodeAddr::new(0o1))),
            Ok(NodeId::new(7))
        );
        assert_eq!(
            mesh.get_node_id(Some(NodeAddr::COORDINATOR)),
            Ok(NodeId::COORDINATOR)
        );
        assert_eq!(
            mesh.get_address(NodeId::new(9)),
            Err(MeshError::NotConfigured)
        );
    }

    #[test]
    fn member_cannot_override_bindings() {
        let mut mesh = Mesh::new(StubRadio::new(), StubNetwork::new());
        mesh.set_node_id(NodeId::new(7));
        assert_eq!(
            mesh.set_binding(NodeId::new(8), NodeAddr::new(0o2)),
            Err(MeshError::InvalidParam)
        );
    }

    #[test]
    fn assignment_commits_on_confirmation() {
        let mut mesh = coordinator();

        push(&mut mesh, request_frame(7));
        assert_eq!(mesh.update(), MessageType::ReqAddress);
        push(&mut mesh, confirm_frame(NodeAddr::new(0o1)));
        mesh.dhcp();

        let bindings: Vec<_> = mesh.bindings().copied().collect();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].id, NodeId::new(7));
        assert_eq!(bindings[0].addr, NodeAddr::new(0o1));

        // The response went back out with the joiner's id in the header.
        let response = mesh.network.sent.last().unwrap();
        assert_eq!(response.header.msg_type, MessageType::AddrResponse);
        assert_eq!(response.header.reserved, 7);
        assert_eq!(response.payload_u16(0), Some(0o1));
    }

    #[test]
    fn confirmation_replay_changes_nothing() {
        let mut mesh = coordinator();

        push(&mut mesh, request_frame(7));
        mesh.update();
        push(&mut mesh, confirm_frame(NodeAddr::new(0o1)));
        mesh.dhcp();

        push(&mut mesh, confirm_frame(NodeAddr::new(0o1)));
        assert_eq!(mesh.update(), MessageType::AddrConfirm);

        let bindings: Vec<_> = mesh.bindings().copied().collect();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].addr, NodeAddr::new(0o1));
    }

    #[test]
    fn unconfirmed_assignment_is_not_committed() {
        let mut mesh = coordinator();

        push(&mut mesh, request_frame(7));
        mesh.update();
        // No confirmation ever arrives; the bounded wait expires.
        mesh.dhcp();

        assert_eq!(mesh.bindings().count(), 0);
        assert_eq!(mesh.error_code(), Some(MeshError::Timeout));
    }

    #[test]
    fn blank_id_requests_are_discarded() {
        let mut mesh = coordinator();

        push(&mut mesh, request_frame(0));
        mesh.update();
        mesh.dhcp();

        assert_eq!(mesh.bindings().count(), 0);
        assert!(mesh.network.sent.is_empty());
    }

    #[test]
    fn release_empties_the_row() {
        let mut mesh = coordinator();
        mesh.set_binding(NodeId::new(7), NodeAddr::new(0o1)).unwrap();

        let mut header = Header::new(NodeAddr::COORDINATOR, MessageType::AddrRelease);
        header.src = NodeAddr::new(0o1);
        push(&mut mesh, Frame::new(header, Vec::new()));
        assert_eq!(mesh.update(), MessageType::AddrRelease);

        assert_eq!(mesh.bindings().count(), 1);
        assert_eq!(
            mesh.get_address(NodeId::new(7)),
            Err(MeshError::NotConfigured)
        );
    }

    #[test]
    fn member_forwards_requests_with_its_child_mask() {
        let mut mesh = Mesh::new(StubRadio::new(), StubNetwork::new());
        mesh.set_node_id(NodeId::new(8));
        // Stand the member up as if it had joined at 02.
        mesh.network.begin(
            97,
            NodeAddr::new(0o2),
            crate::DataRate::Mbps1,
            crate::PowerLevel::Max,
        );
        mesh.addr = NodeAddr::new(0o2);
        mesh.role = Role::Member;

        let mut header = Header::new(NodeAddr::new(0o2), MessageType::ReqAddress);
        header.reserved = 9;
        let mut payload = vec![0u8; 4];
        payload[..2].copy_from_slice(&0o2u16.to_le_bytes());
        push(&mut mesh, Frame::new(header, payload));

        assert_eq!(mesh.update(), MessageType::ReqAddress);
        mesh.dhcp();

        let forwarded = mesh.network.sent.last().unwrap();
        assert_eq!(forwarded.header.msg_type, MessageType::ReqAddress);
        assert_eq!(forwarded.header.dst, NodeAddr::COORDINATOR);
        assert_eq!(forwarded.header.reserved, 9);
        assert_eq!(forwarded.payload_u16(0), Some(0o2));
    }
}
