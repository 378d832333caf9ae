//! Error kinds reported by mesh operations.
//!
//! Every public operation on [`Mesh`](crate::Mesh) returns a `Result`; the
//! most recent failure is also stored on the mesh object and readable via
//! [`Mesh::error_code`](crate::Mesh::error_code), which embedders polling
//! from a main loop tend to prefer over plumbing the `Result` around.

use thiserror::Error;

/// A failure of a mesh operation. All failures are recoverable by the
/// caller: retry, renew the address, or release and rejoin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum MeshError {
    /// The routing layer refused to initialize.
    #[error("the routing layer failed to initialize")]
    FailedInit,

    /// The operation requires a joined node (or a bound id) and there is
    /// none.
    #[error("node is not connected to the mesh")]
    NotConfigured,

    /// The operation does not make sense for this node's role or arguments.
    #[error("invalid parameter for this operation")]
    InvalidParam,

    /// Address renewal was refused because unread data is pending in the
    /// radio.
    #[error("unread radio data is pending")]
    PendingData,

    /// The routing layer reported a send failure.
    #[error("the routing layer failed to send")]
    FailedWrite,

    /// The coordinator did not answer an address lookup within the
    /// deadline.
    #[error("address lookup got no answer in time")]
    FailedAddrLookup,

    /// An address response was rejected as invalid: zero address or a
    /// response meant for another node.
    #[error("address response was invalid")]
    FailedAddrRequest,

    /// The address confirmation could not be acknowledged after all
    /// retries; the assignment was abandoned.
    #[error("address confirmation was never acknowledged")]
    FailedAddrConfirm,

    /// No neighbor answered the discovery poll.
    #[error("no neighbor answered the poll")]
    PollFailed,

    /// A contact node was found but no address response ever arrived.
    #[error("no contact produced an address response")]
    NoResponse,

    /// A bounded wait hit its deadline.
    #[error("timed out")]
    Timeout,
}
