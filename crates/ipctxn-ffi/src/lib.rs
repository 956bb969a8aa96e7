//! ipctxn-ffi: C-ABI exports for portals and two-phase transactions.

mod args;
mod error;
mod parcel;
mod portal;
mod types;

use std::panic::AssertUnwindSafe;

pub use parcel::ipctxn_parcel_free;
pub use portal::{
    ipctxn_portal_abort_get, ipctxn_portal_abort_put, ipctxn_portal_begin_get,
    ipctxn_portal_begin_put, ipctxn_portal_close, ipctxn_portal_commit_put,
    ipctxn_portal_end_get, ipctxn_portal_free, ipctxn_portal_has_pending,
    ipctxn_portal_open_pair, ipctxn_portal_put, ipctxn_portal_write,
};
pub use types::{
    IpcTxnParcel, IpcTxnPortalHandle, IpcTxnResult, IpcTxnTransaction, IPCTXN_ERR_CLOSED,
    IPCTXN_ERR_INTERNAL, IPCTXN_ERR_INVALID_ARGUMENT, IPCTXN_ERR_OUT_OF_RANGE,
    IPCTXN_ERR_PEER_CLOSED, IPCTXN_ERR_RESOURCE_EXHAUSTED, IPCTXN_ERR_TRANSACTIONS_PENDING,
    IPCTXN_ERR_UNAVAILABLE, IPCTXN_ERR_UNKNOWN_TRANSACTION, IPCTXN_OK,
};

fn ffi_boundary<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error::set_panic_error();
            on_panic
        }
    }
}

#[no_mangle]
pub extern "C" fn ipctxn_init() -> IpcTxnResult {
    ffi_boundary(IpcTxnResult::Internal, || {
        error::clear_error_state();
        IpcTxnResult::Ok
    })
}

#[no_mangle]
pub extern "C" fn ipctxn_cleanup() {
    ffi_boundary((), || {
        error::clear_error_state();
    });
}

#[no_mangle]
pub extern "C" fn ipctxn_last_error() -> *const std::os::raw::c_char {
    ffi_boundary(std::ptr::null(), error::last_error_ptr)
}

/// Largest capacity `ipctxn_portal_begin_put` accepts with default limits.
#[no_mangle]
pub extern "C" fn ipctxn_max_parcel_size() -> usize {
    ipctxn_parcel::DEFAULT_MAX_PARCEL_SIZE
}
