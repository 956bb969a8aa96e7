//! Two-phase parcel transactions for inter-process communication.
//!
//! # Crate Structure
//!
//! - [`parcel`] : Parcel buffers, size accounting and the in-order parcel queue
//! - [`transaction`] : Pending transaction set with opaque handles
//! - [`portal`] : Connected portal pairs (behind `portal` feature)

/// Re-export parcel types.
pub mod parcel {
    pub use ipctxn_parcel::*;
}

/// Re-export transaction types.
pub mod transaction {
    pub use ipctxn_transaction::*;
}

/// Re-export portal types (requires `portal` feature).
#[cfg(feature = "portal")]
pub mod portal {
    pub use ipctxn_portal::*;
}
