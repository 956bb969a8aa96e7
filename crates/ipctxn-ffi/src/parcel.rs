use std::ptr;

use crate::error;
use crate::types::{IpcTxnParcel, IpcTxnResult};

/// Move `payload` into library-owned memory described by `out_parcel`.
///
/// A payload previously stored in `out_parcel` is freed first.
pub(crate) fn write_parcel_out(out_parcel: *mut IpcTxnParcel, payload: &[u8]) -> IpcTxnResult {
    if out_parcel.is_null() {
        return error::set_invalid_argument("out_parcel cannot be null");
    }

    let parcel_ref = {
        // SAFETY: Pointer validity is guaranteed by the caller.
        unsafe { &mut *out_parcel }
    };
    release(parcel_ref);

    let boxed_payload: Box<[u8]> = payload.to_vec().into_boxed_slice();
    let len = boxed_payload.len();
    let data = if len == 0 {
        ptr::null_mut()
    } else {
        Box::into_raw(boxed_payload) as *mut u8
    };

    parcel_ref.data = data;
    parcel_ref.len = len;
    IpcTxnResult::Ok
}

fn release(parcel: &mut IpcTxnParcel) {
    if !parcel.data.is_null() {
        let slice_ptr = ptr::slice_from_raw_parts_mut(parcel.data, parcel.len);
        // SAFETY: `data` was allocated as `Box<[u8]>` of `len` bytes by `write_parcel_out`.
        unsafe {
            drop(Box::from_raw(slice_ptr));
        }
    }
    *parcel = IpcTxnParcel::default();
}

/// Free payload memory held by an [`IpcTxnParcel`] populated by `ipctxn_portal_end_get`.
///
/// # Safety
/// `parcel` must be either null or a valid pointer to an `IpcTxnParcel` created by caller code.
/// If `parcel->data` is non-null, it must have originated from this library.
#[no_mangle]
pub unsafe extern "C" fn ipctxn_parcel_free(parcel: *mut IpcTxnParcel) {
    crate::ffi_boundary((), || {
        if parcel.is_null() {
            return;
        }

        let parcel_ref = {
            // SAFETY: Pointer validity is guaranteed by the caller.
            unsafe { &mut *parcel }
        };
        release(parcel_ref);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_parcel_out_populates_output() {
        let mut parcel = IpcTxnParcel::default();
        let result = write_parcel_out(&mut parcel as *mut IpcTxnParcel, b"abc");
        assert_eq!(result, IpcTxnResult::Ok);
        assert_eq!(parcel.len, 3);
        assert!(!parcel.data.is_null());

        // SAFETY: `parcel` was populated by `write_parcel_out`.
        unsafe { ipctxn_parcel_free(&mut parcel as *mut IpcTxnParcel) };
        assert!(parcel.data.is_null());
        assert_eq!(parcel.len, 0);
    }

    #[test]
    fn write_parcel_out_reuse_is_safe() {
        let mut parcel = IpcTxnParcel::default();
        assert_eq!(
            write_parcel_out(&mut parcel as *mut IpcTxnParcel, b"old"),
            IpcTxnResult::Ok
        );
        assert_eq!(
            write_parcel_out(&mut parcel as *mut IpcTxnParcel, b"newer"),
            IpcTxnResult::Ok
        );
        assert_eq!(parcel.len, 5);

        // SAFETY: `parcel` was populated by `write_parcel_out`.
        unsafe { ipctxn_parcel_free(&mut parcel as *mut IpcTxnParcel) };
    }

    #[test]
    fn empty_payload_has_null_data() {
        let mut parcel = IpcTxnParcel::default();
        assert_eq!(
            write_parcel_out(&mut parcel as *mut IpcTxnParcel, b""),
            IpcTxnResult::Ok
        );
        assert!(parcel.data.is_null());
        assert_eq!(parcel.len, 0);
    }

    #[test]
    fn null_out_parcel_is_invalid() {
        assert_eq!(
            write_parcel_out(ptr::null_mut(), b"x"),
            IpcTxnResult::InvalidArgument
        );
    }
}
