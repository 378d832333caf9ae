//! Member side of the join protocol: poll for contacts, request an address
//! through one, confirm it to the coordinator.

use super::Mesh;
use crate::address::NodeAddr;
use crate::error::MeshError;
use crate::logging;
use crate::net::frame::{Frame, Header, MessageType};
use crate::net::{Network, MULTICAST_ADDR};
use crate::radio::Radio;

/// How long to wait for an address response after asking one contact.
const RESPONSE_WAIT_MS: u32 = 225;

/// How many times the confirmation write is retried before the assignment
/// is abandoned.
const CONFIRM_RETRIES: u32 = 6;

/// Spacing between confirmation retries.
const CONFIRM_RETRY_DELAY_MS: u32 = 3;

impl<R: Radio, N: Network> Mesh<R, N> {
    /// One round of the join protocol at the given tree level.
    ///
    /// Multicasts a poll, collects contact nodes, then asks each in turn to
    /// get an address request to the coordinator. On a valid response the
    /// new address is adopted and confirmed; on confirmation failure the
    /// node reverts to unconfigured so a half-committed address never
    /// leaks.
    pub(crate) fn request_address(&mut self, level: u8) -> Result<NodeAddr, MeshError> {
        let header = Header::new(MULTICAST_ADDR, MessageType::Poll);
        self.network.multicast(header, &[], level);

        let mut contacts: Vec<NodeAddr> = Vec::with_capacity(self.config.max_polls);
        let started = self.radio.millis();
        loop {
            if self.network.update() == MessageType::Poll {
                if let Ok(reply) = Frame::parse(self.network.frame_buffer()) {
                    if contacts.len() < self.config.max_polls {
                        contacts.push(reply.header.src);
                    }
                }
            }
            if self.radio.millis().wrapping_sub(started) > self.config.poll_timeout_ms
                || contacts.len() >= self.config.max_polls
            {
                break;
            }
        }
        if contacts.is_empty() {
            tracing::debug!(level, "no neighbor answered the poll");
            return self.fail(MeshError::PollFailed);
        }

        let mut response: Option<Frame> = None;
        for contact in contacts {
            if !self.network.is_valid_address(contact) {
                continue;
            }

            let mut request = Header::new(contact, MessageType::ReqAddress);
            request.reserved = self.node_id.to_u8();
            let mut payload = [0u8; 4];
            payload[..2].copy_from_slice(&contact.to_u16().to_le_bytes());
            self.network.write_direct(request, &payload, contact);
            tracing::debug!(contact = %contact, "requested address");

            let started = self.radio.millis();
            while self.radio.millis().wrapping_sub(started) < RESPONSE_WAIT_MS {
                if self.network.update() == MessageType::AddrResponse {
                    if let Ok(frame) = Frame::parse(self.network.frame_buffer()) {
                        response = Some(frame);
                        break;
                    }
                }
            }
            self.radio.delay_ms(5);
            if response.is_some() {
                break;
            }
        }

        let Some(response) = response else {
            return self.fail(MeshError::NoResponse);
        };

        let new_addr = response.payload_u16(0).unwrap_or(0);
        if new_addr == 0 || response.header.reserved != self.node_id.to_u8() {
            tracing::debug!(
                addr = new_addr,
                for_id = response.header.reserved,
                "discarding address response meant for someone else"
            );
            return self.fail(MeshError::FailedAddrRequest);
        }
        let new_addr = NodeAddr::new(new_addr);

        self.radio.stop_listening();
        self.radio.delay_ms(10);
        self.network.set_address(new_addr);
        self.addr = new_addr;

        let mut confirm = Header::new(NodeAddr::COORDINATOR, MessageType::AddrConfirm);
        confirm.reserved = self.node_id.to_u8();
        let mut attempts = 0;
        while !self.network.write(confirm, &[]) {
            attempts += 1;
            if attempts >= CONFIRM_RETRIES {
                self.network.set_address(NodeAddr::DEFAULT);
                self.addr = NodeAddr::DEFAULT;
                return self.fail(MeshError::FailedAddrConfirm);
            }
            self.radio.delay_ms(CONFIRM_RETRY_DELAY_MS);
        }

        logging::joined_event(self.node_id, new_addr);
        Ok(new_addr)
    }
}
