//! Parcel buffers for two-phase IPC transactions.
//!
//! A [`Parcel`] is one quantum of payload bytes moving through a portal. Its
//! length is fixed when it is created:
//! - Put transactions reserve a zero-filled parcel of the requested capacity
//!   and the caller writes into it before committing.
//! - Get transactions hand out a fully populated parcel.
//!
//! [`SizeTraits`] is the byte-accounting contract consumed by ordered parcel
//! queues, and [`ParcelQueue`] is the in-order queue built on it.

pub mod error;
pub mod parcel;
pub mod queue;
pub mod size;

pub use error::{ParcelError, Result};
pub use parcel::{Parcel, DEFAULT_MAX_PARCEL_SIZE};
pub use queue::{ParcelQueue, SizedQueue};
pub use size::{ParcelSizeTraits, SizeTraits};
