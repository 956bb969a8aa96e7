use ipctxn_parcel::ParcelError;
use ipctxn_transaction::Transaction;

/// Errors that can occur in portal operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortalError {
    /// The handle does not name a pending transaction of the right kind.
    #[error("unknown transaction {0}")]
    UnknownTransaction(Transaction),

    /// A put commit named more bytes than were reserved.
    #[error("cannot commit {committed} bytes to a put of {capacity} bytes")]
    CommitExceedsCapacity { committed: usize, capacity: usize },

    /// A write does not fit inside the reserved parcel.
    #[error("write of {len} bytes at offset {offset} exceeds parcel capacity {capacity}")]
    OutOfBounds {
        offset: usize,
        len: usize,
        capacity: usize,
    },

    /// Parcel-level error.
    #[error("parcel error: {0}")]
    Parcel(#[from] ParcelError),

    /// The peer's inbound queue is at its configured limit.
    #[error("peer queue full ({queued_parcels} parcels, {queued_bytes} bytes queued)")]
    QueueFull {
        queued_parcels: usize,
        queued_bytes: usize,
    },

    /// No parcel is queued for get.
    #[error("no parcel available")]
    Unavailable,

    /// The peer portal has been closed.
    #[error("peer portal closed")]
    PeerClosed,

    /// This portal has been closed.
    #[error("portal closed")]
    Closed,

    /// The portal cannot close while transactions are outstanding.
    #[error("{0} transactions still pending")]
    TransactionsPending(usize),
}

pub type Result<T> = std::result::Result<T, PortalError>;
