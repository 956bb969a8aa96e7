use crate::args;
use crate::error;
use crate::parcel::write_parcel_out;
use crate::types::{IpcTxnParcel, IpcTxnPortalHandle, IpcTxnResult, IpcTxnTransaction, PortalHandle};

fn with_portal<T>(handle: IpcTxnPortalHandle, on_error: T, f: impl FnOnce(&PortalHandle) -> T) -> T {
    if handle.is_null() {
        let _ = error::set_invalid_argument("portal handle cannot be null");
        return on_error;
    }

    let portal_handle = {
        // SAFETY: Pointer validity is guaranteed by the caller.
        unsafe { &*(handle as *const PortalHandle) }
    };

    f(portal_handle)
}

fn into_raw_handle(portal: ipctxn_portal::Portal) -> IpcTxnPortalHandle {
    Box::into_raw(Box::new(PortalHandle { portal })) as IpcTxnPortalHandle
}

/// Open a connected pair of portals.
///
/// # Safety
/// `out_first` and `out_second` must be non-null writable pointers.
#[no_mangle]
pub unsafe extern "C" fn ipctxn_portal_open_pair(
    out_first: *mut IpcTxnPortalHandle,
    out_second: *mut IpcTxnPortalHandle,
) -> IpcTxnResult {
    crate::ffi_boundary(IpcTxnResult::Internal, || {
        error::clear_error_state();

        if out_first.is_null() || out_second.is_null() {
            return error::set_invalid_argument("portal out-pointers cannot be null");
        }

        let (first, second) = ipctxn_portal::open_pair();
        // SAFETY: Both pointers were checked for null above.
        unsafe {
            *out_first = into_raw_handle(first);
            *out_second = into_raw_handle(second);
        }
        IpcTxnResult::Ok
    })
}

/// Close a portal. Fails while transactions are pending.
///
/// # Safety
/// `portal` must be a valid portal handle.
#[no_mangle]
pub unsafe extern "C" fn ipctxn_portal_close(portal: IpcTxnPortalHandle) -> IpcTxnResult {
    crate::ffi_boundary(IpcTxnResult::Internal, || {
        error::clear_error_state();

        with_portal(portal, IpcTxnResult::InvalidArgument, |handle| {
            match handle.portal.close() {
                Ok(()) => IpcTxnResult::Ok,
                Err(err) => error::map_portal_error(&err),
            }
        })
    })
}

/// Free a portal handle, abandoning any pending transactions.
///
/// # Safety
/// `portal` must be null or a handle returned by `ipctxn_portal_open_pair`.
#[no_mangle]
pub unsafe extern "C" fn ipctxn_portal_free(portal: IpcTxnPortalHandle) {
    crate::ffi_boundary((), || {
        if portal.is_null() {
            return;
        }

        // SAFETY: Caller guarantees this handle was allocated by ipctxn_portal_open_pair.
        unsafe {
            drop(Box::from_raw(portal as *mut PortalHandle));
        }
    });
}

/// Put `len` bytes to the peer in one step.
///
/// # Safety
/// `portal` must be a valid portal handle. If `len > 0`, `data` must be non-null and readable
/// for `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn ipctxn_portal_put(
    portal: IpcTxnPortalHandle,
    data: *const u8,
    len: usize,
) -> IpcTxnResult {
    crate::ffi_boundary(IpcTxnResult::Internal, || {
        error::clear_error_state();

        let payload = {
            // SAFETY: We validate pointer/length pairing in helper.
            match unsafe { args::bytes_arg(data, len, "data") } {
                Some(v) => v,
                None => return IpcTxnResult::InvalidArgument,
            }
        };

        with_portal(portal, IpcTxnResult::InvalidArgument, |handle| {
            match handle.portal.put(payload) {
                Ok(()) => IpcTxnResult::Ok,
                Err(err) => error::map_portal_error(&err),
            }
        })
    })
}

/// Reserve `capacity` bytes for a two-phase put.
///
/// # Safety
/// `portal` must be a valid portal handle and `out_transaction` a non-null writable pointer.
#[no_mangle]
pub unsafe extern "C" fn ipctxn_portal_begin_put(
    portal: IpcTxnPortalHandle,
    capacity: usize,
    out_transaction: *mut IpcTxnTransaction,
) -> IpcTxnResult {
    crate::ffi_boundary(IpcTxnResult::Internal, || {
        error::clear_error_state();

        if out_transaction.is_null() {
            return error::set_invalid_argument("out_transaction cannot be null");
        }

        with_portal(portal, IpcTxnResult::InvalidArgument, |handle| {
            match handle.portal.begin_put(capacity) {
                Ok(transaction) => {
                    // SAFETY: Pointer was checked for null above.
                    unsafe {
                        *out_transaction = transaction.into_raw();
                    }
                    IpcTxnResult::Ok
                }
                Err(err) => error::map_portal_error(&err),
            }
        })
    })
}

/// Copy `len` bytes into a pending put at `offset`.
///
/// # Safety
/// `portal` must be a valid portal handle. If `len > 0`, `data` must be non-null and readable
/// for `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn ipctxn_portal_write(
    portal: IpcTxnPortalHandle,
    transaction: IpcTxnTransaction,
    offset: usize,
    data: *const u8,
    len: usize,
) -> IpcTxnResult {
    crate::ffi_boundary(IpcTxnResult::Internal, || {
        error::clear_error_state();

        let Some(transaction) = args::transaction_arg(transaction) else {
            return IpcTxnResult::InvalidArgument;
        };
        let payload = {
            // SAFETY: We validate pointer/length pairing in helper.
            match unsafe { args::bytes_arg(data, len, "data") } {
                Some(v) => v,
                None => return IpcTxnResult::InvalidArgument,
            }
        };

        with_portal(portal, IpcTxnResult::InvalidArgument, |handle| {
            match handle.portal.write(transaction, offset, payload) {
                Ok(()) => IpcTxnResult::Ok,
                Err(err) => error::map_portal_error(&err),
            }
        })
    })
}

/// Commit the first `num_bytes` of a pending put to the peer.
///
/// # Safety
/// `portal` must be a valid portal handle.
#[no_mangle]
pub unsafe extern "C" fn ipctxn_portal_commit_put(
    portal: IpcTxnPortalHandle,
    transaction: IpcTxnTransaction,
    num_bytes: usize,
) -> IpcTxnResult {
    crate::ffi_boundary(IpcTxnResult::Internal, || {
        error::clear_error_state();

        let Some(transaction) = args::transaction_arg(transaction) else {
            return IpcTxnResult::InvalidArgument;
        };

        with_portal(portal, IpcTxnResult::InvalidArgument, |handle| {
            match handle.portal.commit_put(transaction, num_bytes) {
                Ok(()) => IpcTxnResult::Ok,
                Err(err) => error::map_portal_error(&err),
            }
        })
    })
}

/// Discard a pending put.
///
/// # Safety
/// `portal` must be a valid portal handle.
#[no_mangle]
pub unsafe extern "C" fn ipctxn_portal_abort_put(
    portal: IpcTxnPortalHandle,
    transaction: IpcTxnTransaction,
) -> IpcTxnResult {
    crate::ffi_boundary(IpcTxnResult::Internal, || {
        error::clear_error_state();

        let Some(transaction) = args::transaction_arg(transaction) else {
            return IpcTxnResult::InvalidArgument;
        };

        with_portal(portal, IpcTxnResult::InvalidArgument, |handle| {
            match handle.portal.abort_put(transaction) {
                Ok(()) => IpcTxnResult::Ok,
                Err(err) => error::map_portal_error(&err),
            }
        })
    })
}

/// Take the next queued parcel into a two-phase get.
///
/// # Safety
/// `portal` must be a valid portal handle. `out_transaction` and `out_len` must be non-null
/// writable pointers.
#[no_mangle]
pub unsafe extern "C" fn ipctxn_portal_begin_get(
    portal: IpcTxnPortalHandle,
    out_transaction: *mut IpcTxnTransaction,
    out_len: *mut usize,
) -> IpcTxnResult {
    crate::ffi_boundary(IpcTxnResult::Internal, || {
        error::clear_error_state();

        if out_transaction.is_null() || out_len.is_null() {
            return error::set_invalid_argument("out_transaction and out_len cannot be null");
        }

        with_portal(portal, IpcTxnResult::InvalidArgument, |handle| {
            match handle.portal.begin_get() {
                Ok((transaction, len)) => {
                    // SAFETY: Both pointers were checked for null above.
                    unsafe {
                        *out_transaction = transaction.into_raw();
                        *out_len = len;
                    }
                    IpcTxnResult::Ok
                }
                Err(err) => error::map_portal_error(&err),
            }
        })
    })
}

/// Finish a get and copy its bytes into `out_parcel`.
///
/// # Safety
/// `portal` must be a valid portal handle and `out_parcel` a valid writable pointer.
/// If `out_parcel->data` already holds a payload from this library, it is freed first.
#[no_mangle]
pub unsafe extern "C" fn ipctxn_portal_end_get(
    portal: IpcTxnPortalHandle,
    transaction: IpcTxnTransaction,
    out_parcel: *mut IpcTxnParcel,
) -> IpcTxnResult {
    crate::ffi_boundary(IpcTxnResult::Internal, || {
        error::clear_error_state();

        let Some(transaction) = args::transaction_arg(transaction) else {
            return IpcTxnResult::InvalidArgument;
        };
        if out_parcel.is_null() {
            return error::set_invalid_argument("out_parcel cannot be null");
        }

        with_portal(portal, IpcTxnResult::InvalidArgument, |handle| {
            match handle.portal.end_get(transaction) {
                Ok(parcel) => write_parcel_out(out_parcel, parcel.data()),
                Err(err) => error::map_portal_error(&err),
            }
        })
    })
}

/// Abandon a get, returning its parcel to the head of the queue.
///
/// # Safety
/// `portal` must be a valid portal handle.
#[no_mangle]
pub unsafe extern "C" fn ipctxn_portal_abort_get(
    portal: IpcTxnPortalHandle,
    transaction: IpcTxnTransaction,
) -> IpcTxnResult {
    crate::ffi_boundary(IpcTxnResult::Internal, || {
        error::clear_error_state();

        let Some(transaction) = args::transaction_arg(transaction) else {
            return IpcTxnResult::InvalidArgument;
        };

        with_portal(portal, IpcTxnResult::InvalidArgument, |handle| {
            match handle.portal.abort_get(transaction) {
                Ok(()) => IpcTxnResult::Ok,
                Err(err) => error::map_portal_error(&err),
            }
        })
    })
}

/// Report whether any put or get transaction is outstanding.
///
/// # Safety
/// `portal` must be a valid portal handle and `out_pending` a non-null writable pointer.
#[no_mangle]
pub unsafe extern "C" fn ipctxn_portal_has_pending(
    portal: IpcTxnPortalHandle,
    out_pending: *mut bool,
) -> IpcTxnResult {
    crate::ffi_boundary(IpcTxnResult::Internal, || {
        error::clear_error_state();

        with_portal(portal, IpcTxnResult::InvalidArgument, |handle| {
            let pending = handle.portal.has_pending_transactions();
            // SAFETY: write_out checks for null; validity is guaranteed by the caller.
            if unsafe { args::write_out(out_pending, pending, "out_pending") } {
                IpcTxnResult::Ok
            } else {
                IpcTxnResult::InvalidArgument
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use std::ptr;

    use super::*;
    use crate::ipctxn_parcel_free;

    struct Pair {
        first: IpcTxnPortalHandle,
        second: IpcTxnPortalHandle,
    }

    impl Pair {
        fn open() -> Self {
            let mut first = ptr::null_mut();
            let mut second = ptr::null_mut();
            // SAFETY: Both out-pointers are live locals.
            let result = unsafe { ipctxn_portal_open_pair(&mut first, &mut second) };
            assert_eq!(result, IpcTxnResult::Ok);
            Self { first, second }
        }
    }

    impl Drop for Pair {
        fn drop(&mut self) {
            // SAFETY: Both handles came from ipctxn_portal_open_pair.
            unsafe {
                ipctxn_portal_free(self.first);
                ipctxn_portal_free(self.second);
            }
        }
    }

    fn end_get(portal: IpcTxnPortalHandle) -> Vec<u8> {
        let mut transaction = 0;
        let mut len = 0;
        // SAFETY: Out-pointers are live locals and the portal handle is valid.
        let result = unsafe { ipctxn_portal_begin_get(portal, &mut transaction, &mut len) };
        assert_eq!(result, IpcTxnResult::Ok);

        let mut parcel = IpcTxnParcel::default();
        // SAFETY: As above.
        let result = unsafe { ipctxn_portal_end_get(portal, transaction, &mut parcel) };
        assert_eq!(result, IpcTxnResult::Ok);
        assert_eq!(parcel.len, len);

        let bytes = if parcel.data.is_null() {
            Vec::new()
        } else {
            // SAFETY: `data` points to `len` bytes allocated by end_get.
            unsafe { std::slice::from_raw_parts(parcel.data, parcel.len) }.to_vec()
        };
        // SAFETY: `parcel` was populated by end_get.
        unsafe { ipctxn_parcel_free(&mut parcel) };
        bytes
    }

    #[test]
    fn put_and_get_round_trip() {
        let pair = Pair::open();
        let payload = b"over the boundary";
        // SAFETY: Payload pointer and length describe a live buffer.
        let result = unsafe { ipctxn_portal_put(pair.first, payload.as_ptr(), payload.len()) };
        assert_eq!(result, IpcTxnResult::Ok);

        assert_eq!(end_get(pair.second), payload);
    }

    #[test]
    fn reused_slot_handles_use_the_high_half() {
        assert_eq!(std::mem::size_of::<IpcTxnTransaction>(), 8);

        let pair = Pair::open();
        let mut first = 0;
        // SAFETY: Out-pointer is a live local.
        let result = unsafe { ipctxn_portal_begin_put(pair.first, 4, &mut first) };
        assert_eq!(result, IpcTxnResult::Ok);
        // SAFETY: Valid handle.
        assert_eq!(unsafe { ipctxn_portal_abort_put(pair.first, first) }, IpcTxnResult::Ok);

        let mut second = 0;
        // SAFETY: Out-pointer is a live local.
        let result = unsafe { ipctxn_portal_begin_put(pair.first, 4, &mut second) };
        assert_eq!(result, IpcTxnResult::Ok);
        assert!(second > u64::from(u32::MAX));
        assert_ne!(first, second);

        // SAFETY: Valid handle; the stale one is rejected.
        unsafe {
            assert_eq!(
                ipctxn_portal_abort_put(pair.first, first),
                IpcTxnResult::UnknownTransaction
            );
            assert_eq!(ipctxn_portal_abort_put(pair.first, second), IpcTxnResult::Ok);
        }
    }

    #[test]
    fn two_phase_put() {
        let pair = Pair::open();
        let mut transaction = 0;
        // SAFETY: Out-pointer is a live local.
        let result = unsafe { ipctxn_portal_begin_put(pair.first, 16, &mut transaction) };
        assert_eq!(result, IpcTxnResult::Ok);
        assert_ne!(transaction, 0);

        let mut pending = false;
        // SAFETY: Out-pointer is a live local.
        unsafe { ipctxn_portal_has_pending(pair.first, &mut pending) };
        assert!(pending);

        let data = b"abc";
        // SAFETY: Data pointer and length describe a live buffer.
        let result =
            unsafe { ipctxn_portal_write(pair.first, transaction, 0, data.as_ptr(), data.len()) };
        assert_eq!(result, IpcTxnResult::Ok);

        // SAFETY: Valid handle.
        let result = unsafe { ipctxn_portal_commit_put(pair.first, transaction, 17) };
        assert_eq!(result, IpcTxnResult::OutOfRange);
        // SAFETY: Valid handle.
        let result = unsafe { ipctxn_portal_commit_put(pair.first, transaction, 3) };
        assert_eq!(result, IpcTxnResult::Ok);

        // SAFETY: Out-pointer is a live local.
        unsafe { ipctxn_portal_has_pending(pair.first, &mut pending) };
        assert!(!pending);
        assert_eq!(end_get(pair.second), b"abc");
    }

    #[test]
    fn stale_and_zero_transactions_are_rejected() {
        let pair = Pair::open();
        let mut transaction = 0;
        // SAFETY: Out-pointer is a live local.
        unsafe { ipctxn_portal_begin_put(pair.first, 1, &mut transaction) };
        // SAFETY: Valid handle.
        assert_eq!(
            unsafe { ipctxn_portal_abort_put(pair.first, transaction) },
            IpcTxnResult::Ok
        );
        // SAFETY: Valid handle.
        assert_eq!(
            unsafe { ipctxn_portal_abort_put(pair.first, transaction) },
            IpcTxnResult::UnknownTransaction
        );
        // SAFETY: Valid handle.
        assert_eq!(
            unsafe { ipctxn_portal_commit_put(pair.first, 0, 0) },
            IpcTxnResult::InvalidArgument
        );
    }

    #[test]
    fn get_on_empty_portal_is_unavailable() {
        let pair = Pair::open();
        let mut transaction = 0;
        let mut len = 0;
        // SAFETY: Out-pointers are live locals.
        let result = unsafe { ipctxn_portal_begin_get(pair.second, &mut transaction, &mut len) };
        assert_eq!(result, IpcTxnResult::Unavailable);
    }

    #[test]
    fn abort_get_requeues_parcel() {
        let pair = Pair::open();
        let payload = b"again";
        // SAFETY: Payload pointer and length describe a live buffer.
        unsafe { ipctxn_portal_put(pair.first, payload.as_ptr(), payload.len()) };

        let mut transaction = 0;
        let mut len = 0;
        // SAFETY: Out-pointers are live locals.
        unsafe { ipctxn_portal_begin_get(pair.second, &mut transaction, &mut len) };
        // SAFETY: Valid handle.
        assert_eq!(
            unsafe { ipctxn_portal_abort_get(pair.second, transaction) },
            IpcTxnResult::Ok
        );
        assert_eq!(end_get(pair.second), payload);
    }

    #[test]
    fn close_with_pending_put_fails() {
        let pair = Pair::open();
        let mut transaction = 0;
        // SAFETY: Out-pointer is a live local.
        unsafe { ipctxn_portal_begin_put(pair.first, 4, &mut transaction) };
        // SAFETY: Valid handle.
        assert_eq!(
            unsafe { ipctxn_portal_close(pair.first) },
            IpcTxnResult::TransactionsPending
        );
        // SAFETY: Valid handle.
        unsafe { ipctxn_portal_abort_put(pair.first, transaction) };
        // SAFETY: Valid handle.
        assert_eq!(unsafe { ipctxn_portal_close(pair.first) }, IpcTxnResult::Ok);
    }

    #[test]
    fn null_portal_is_invalid() {
        let mut transaction = 0;
        // SAFETY: Null handle is rejected before use.
        let result = unsafe { ipctxn_portal_begin_put(ptr::null_mut(), 1, &mut transaction) };
        assert_eq!(result, IpcTxnResult::InvalidArgument);
        // SAFETY: Null is accepted by free.
        unsafe { ipctxn_portal_free(ptr::null_mut()) };
    }
}
