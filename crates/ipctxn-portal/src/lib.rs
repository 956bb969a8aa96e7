//! Connected portal pairs.
//!
//! A portal is one end of a local parcel pipe. Parcels put on one portal are
//! queued, in order, for get on its peer. Both puts and gets can be split into
//! two phases with opaque [`Transaction`] handles, which is how foreign callers
//! write into or read from parcel memory in place.

pub mod config;
pub mod error;
pub mod portal;

pub use config::PortalConfig;
pub use error::{PortalError, Result};
pub use ipctxn_transaction::Transaction;
pub use portal::{open_pair, open_pair_with_config, Portal, PortalStats};
