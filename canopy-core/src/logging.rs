//! Structured logging for address assignment and join events.
//!
//! Wrapper functions for the events the coordinator and members emit while
//! managing addresses. These are meant to be called from inside the core
//! protocol paths; embedders subscribe with whatever `tracing` subscriber
//! suits them.

use crate::address::{NodeAddr, NodeId};
use tracing::{event, Level};

/// Logged when the coordinator commits an assignment into its table.
pub fn address_assigned_event(id: NodeId, addr: NodeAddr) {
    event!(
        target: "ADDR_ASSIGNED",
        Level::INFO,
        id = id.to_u8(),
        addr = format!("{}", addr),
    );
}

/// Logged when the coordinator releases every binding for an address.
pub fn address_released_event(addr: NodeAddr) {
    event!(
        target: "ADDR_RELEASED",
        Level::INFO,
        addr = format!("{}", addr),
    );
}

/// Logged when the coordinator answers a lookup. `found` is false when the
/// reply carried the not-found marker.
pub fn lookup_served_event(kind: &'static str, requester: NodeAddr, found: bool) {
    event!(
        target: "LOOKUP_SERVED",
        Level::INFO,
        kind,
        requester = format!("{}", requester),
        found,
    );
}

/// Logged when a member finishes the join protocol.
pub fn joined_event(id: NodeId, addr: NodeAddr) {
    event!(
        target: "MESH_JOINED",
        Level::INFO,
        id = id.to_u8(),
        addr = format!("{}", addr),
    );
}
