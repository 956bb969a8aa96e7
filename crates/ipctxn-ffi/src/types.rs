use std::ffi::c_void;

use ipctxn_portal::Portal;

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpcTxnResult {
    Ok = 0,
    InvalidArgument = 1,
    UnknownTransaction = 2,
    OutOfRange = 3,
    ResourceExhausted = 4,
    Unavailable = 5,
    PeerClosed = 6,
    Closed = 7,
    TransactionsPending = 8,
    Internal = 99,
}

#[allow(dead_code)]
pub const IPCTXN_OK: IpcTxnResult = IpcTxnResult::Ok;
#[allow(dead_code)]
pub const IPCTXN_ERR_INVALID_ARGUMENT: IpcTxnResult = IpcTxnResult::InvalidArgument;
#[allow(dead_code)]
pub const IPCTXN_ERR_UNKNOWN_TRANSACTION: IpcTxnResult = IpcTxnResult::UnknownTransaction;
#[allow(dead_code)]
pub const IPCTXN_ERR_OUT_OF_RANGE: IpcTxnResult = IpcTxnResult::OutOfRange;
#[allow(dead_code)]
pub const IPCTXN_ERR_RESOURCE_EXHAUSTED: IpcTxnResult = IpcTxnResult::ResourceExhausted;
#[allow(dead_code)]
pub const IPCTXN_ERR_UNAVAILABLE: IpcTxnResult = IpcTxnResult::Unavailable;
#[allow(dead_code)]
pub const IPCTXN_ERR_PEER_CLOSED: IpcTxnResult = IpcTxnResult::PeerClosed;
#[allow(dead_code)]
pub const IPCTXN_ERR_CLOSED: IpcTxnResult = IpcTxnResult::Closed;
#[allow(dead_code)]
pub const IPCTXN_ERR_TRANSACTIONS_PENDING: IpcTxnResult = IpcTxnResult::TransactionsPending;
#[allow(dead_code)]
pub const IPCTXN_ERR_INTERNAL: IpcTxnResult = IpcTxnResult::Internal;

/// Opaque transaction value. Zero is never a valid transaction.
///
/// Always 64 bits wide, also on targets with 32-bit pointers.
pub type IpcTxnTransaction = u64;

/// Parcel bytes handed out by `ipctxn_portal_end_get`.
#[repr(C)]
#[derive(Debug)]
pub struct IpcTxnParcel {
    pub data: *mut u8,
    pub len: usize,
}

impl Default for IpcTxnParcel {
    fn default() -> Self {
        Self {
            data: std::ptr::null_mut(),
            len: 0,
        }
    }
}

pub type IpcTxnPortalHandle = *mut c_void;

pub(crate) struct PortalHandle {
    pub(crate) portal: Portal,
}
