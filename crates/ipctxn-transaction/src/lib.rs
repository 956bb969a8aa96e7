//! Two-phase parcel transactions behind opaque handles.
//!
//! A put or get on a portal can be split into two phases: `begin` hands a
//! parcel to a [`PendingTransactionSet`] and returns an opaque [`Transaction`]
//! handle, and a later `finalize` with that handle yields the same parcel
//! back. In between, the caller reads or writes the parcel's bytes.
//!
//! The dominant pattern is one transaction at a time, so the set retains the
//! allocation of its last slot after finalization and reuses it for the next
//! transaction instead of allocating again.

pub mod set;
pub mod slot;
pub mod transaction;

pub use set::{PendingTransactionSet, SetStats};
pub use slot::TransactionSlot;
pub use transaction::Transaction;
