//! Address management and peer discovery for a tree-routed radio mesh.
//!
//! A canopy mesh has one **coordinator** (identifier 0) and any number of
//! **members**. Members carry a stable, operator-assigned [`NodeId`]; the
//! coordinator leases each of them a [`NodeAddr`], an octal path through
//! the routing tree, and tracks the pairing in its [`BindingTable`]. When
//! the topology shifts, a member drops its lease and joins again wherever
//! it can reach the tree; writers keep addressing it by id and the binding
//! table absorbs the move.
//!
//! The actual frame moving is done by an external tree-routing layer over a
//! low-power 2.4 GHz radio. Both sit behind traits ([`Network`], [`Radio`])
//! so simulations and tests can stand in for hardware.
//!
//! # Organization
//!
//! - [`address`] and [`net::frame`] define the shared vocabulary: octal
//!   route-addresses, identifiers, and the wire frame layout.
//! - [`binding`] and [`allocator`] are the coordinator's bookkeeping:
//!   who holds what, and which child slot a joiner gets.
//! - [`mesh`] ties it together: `Mesh::update` is the single pump the
//!   embedder polls, `Mesh::dhcp` processes address requests, and the join,
//!   lookup and renewal protocols run as bounded waits inside it.
//!
//! There are no background tasks. Everything happens inside the embedder's
//! main loop, one received frame per pump.

pub mod address;
pub use address::{NodeAddr, NodeId};

pub mod allocator;

pub mod binding;
pub use binding::{Binding, BindingTable};

pub mod config;
pub use config::MeshConfig;

pub mod error;
pub use error::MeshError;

mod logging;

pub mod mesh;
pub use mesh::{Mesh, Role};

pub mod net;
pub use net::{Flag, Network};

pub mod radio;
pub use radio::{DataRate, PowerLevel, Radio};
