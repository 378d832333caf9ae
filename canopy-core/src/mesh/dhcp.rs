//! Address-request processing: assignment on the coordinator, forwarding on
//! members that sit between a joiner and the coordinator.

use super::{Mesh, PendingAssignment, Role};
use crate::address::{NodeAddr, NodeId};
use crate::allocator::next_child_address;
use crate::error::MeshError;
use crate::logging;
use crate::net::frame::{Frame, MessageType};
use crate::net::Network;
use crate::radio::Radio;

impl<R: Radio, N: Network> Mesh<R, N> {
    /// Processes the address-management frame snapshotted by
    /// [`Mesh::update`], if there is one. Embedders call this right after
    /// `update` from the same loop.
    ///
    /// Address responses are consumed inside the join loop, so the only
    /// frame acted on here is a request: the coordinator assigns from it, a
    /// member passes it up the tree.
    pub fn dhcp(&mut self) {
        if !self.process_dhcp {
            return;
        }
        self.process_dhcp = false;

        let frame = match Frame::parse(&self.dhcp_frame) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::error!("dropping malformed address-management frame: {err}");
                return;
            }
        };
        if frame.header.msg_type != MessageType::ReqAddress {
            return;
        }

        match self.role {
            Role::Coordinator => self.assign_address(frame),
            Role::Member => self.forward_address_request(frame),
        }
    }

    /// Passes a joiner's request toward the coordinator. When this node is
    /// the parent the joiner named, its child occupancy is stamped into the
    /// payload so the coordinator can allocate without asking. The routed
    /// write replaces the unconfigured source with this node's address,
    /// which is what lets the coordinator route the response back down.
    fn forward_address_request(&mut self, frame: Frame) {
        let mut payload = [0u8; 4];
        let len = frame.payload.len().min(payload.len());
        payload[..len].copy_from_slice(&frame.payload[..len]);

        let candidate = frame.payload_u16(0).map(NodeAddr::new);
        if candidate == Some(self.addr) {
            payload[3] = self.network.child_bit_field();
        }

        let mut header = frame.header;
        header.dst = NodeAddr::COORDINATOR;
        tracing::debug!(
            joiner = header.reserved,
            "forwarding address request to the coordinator"
        );
        if !self.network.write(header, &payload) {
            tracing::debug!("address request forward failed to send");
        }
    }

    /// Allocates an address for the requesting joiner, sends it back, and
    /// waits (bounded by the routing layer's route timeout) for the joiner
    /// to confirm before committing the binding. If several joiners race,
    /// only the most recent pending assignment survives.
    fn assign_address(&mut self, frame: Frame) {
        if frame.header.reserved == 0 {
            tracing::debug!("discarding address request with a blank id");
            return;
        }
        let requester = NodeId::new(frame.header.reserved);

        let candidate = frame
            .payload_u16(0)
            .map(NodeAddr::new)
            .unwrap_or(NodeAddr::DEFAULT);
        let (parent, child_mask) =
            if candidate == NodeAddr::COORDINATOR || candidate == NodeAddr::DEFAULT {
                (NodeAddr::COORDINATOR, self.network.child_bit_field())
            } else {
                (candidate, frame.payload.get(3).copied().unwrap_or(0))
            };

        let Some(state) = self.coordinator.as_ref() else {
            return;
        };
        let Some(new_addr) = next_child_address(parent, child_mask, &state.table, requester)
        else {
            tracing::debug!(parent = %parent, "no free child slot");
            return;
        };

        let mut response = frame.header;
        response.msg_type = MessageType::AddrResponse;
        response.dst = frame.header.src;

        self.radio.delay_ms(10);
        let payload = new_addr.to_u16().to_le_bytes();
        self.radio.delay_ms(2);
        let sent = if frame.header.src != NodeAddr::DEFAULT {
            // Routed request: the response retraces the forwarder's path.
            self.network.write(response, &payload)
        } else {
            // The joiner is adjacent and still unconfigured.
            self.network.write_direct(response, &payload, NodeAddr::DEFAULT)
        };
        if !sent {
            tracing::debug!(joiner = requester.to_u8(), "address response failed to send");
        }

        if let Some(state) = self.coordinator.as_mut() {
            state.pending = Some(PendingAssignment {
                id: requester,
                addr: new_addr,
            });
        }

        let started = self.radio.millis();
        let deadline = self.network.route_timeout_ms();
        loop {
            if self.network.update() == MessageType::AddrConfirm {
                let confirmed = Frame::parse(self.network.frame_buffer())
                    .map(|confirm| confirm.header.src == new_addr)
                    .unwrap_or(false);
                if confirmed {
                    if let Some(state) = self.coordinator.as_mut() {
                        state.table.insert_or_replace(requester, new_addr);
                    }
                    logging::address_assigned_event(requester, new_addr);
                    return;
                }
            }
            if self.radio.millis().wrapping_sub(started) > deadline {
                self.last_error = Some(MeshError::Timeout);
                return;
            }
        }
    }
}
