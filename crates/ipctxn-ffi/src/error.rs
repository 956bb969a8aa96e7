use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;

use ipctxn_portal::PortalError;

use crate::types::IpcTxnResult;

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
}

pub(crate) fn clear_error_state() {
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::default();
    });
}

pub(crate) fn set_error_message(message: impl Into<String>) {
    let message = message.into();
    let sanitized = message.replace('\0', "?");
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::new(sanitized).unwrap_or_default();
    });
}

pub(crate) fn set_invalid_argument(message: impl Into<String>) -> IpcTxnResult {
    set_error_message(message);
    IpcTxnResult::InvalidArgument
}

pub(crate) fn set_panic_error() {
    set_error_message("panic across FFI boundary");
}

pub(crate) fn map_portal_error(err: &PortalError) -> IpcTxnResult {
    set_error_message(err.to_string());
    match err {
        PortalError::UnknownTransaction(_) => IpcTxnResult::UnknownTransaction,
        PortalError::CommitExceedsCapacity { .. }
        | PortalError::OutOfBounds { .. }
        | PortalError::Parcel(_) => IpcTxnResult::OutOfRange,
        PortalError::QueueFull { .. } => IpcTxnResult::ResourceExhausted,
        PortalError::Unavailable => IpcTxnResult::Unavailable,
        PortalError::PeerClosed => IpcTxnResult::PeerClosed,
        PortalError::Closed => IpcTxnResult::Closed,
        PortalError::TransactionsPending(_) => IpcTxnResult::TransactionsPending,
    }
}

pub(crate) fn last_error_ptr() -> *const c_char {
    LAST_ERROR.with(|state| state.borrow().as_ptr())
}
