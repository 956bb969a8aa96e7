use ipctxn_portal::Transaction;

use crate::error;
use crate::types::IpcTxnTransaction;

/// Convert an optional byte pointer + length into a slice.
///
/// # Safety
/// If `len > 0`, `data` must be non-null and readable for `len` bytes.
pub(crate) unsafe fn bytes_arg<'a>(data: *const u8, len: usize, name: &str) -> Option<&'a [u8]> {
    if len == 0 {
        return Some(&[]);
    }
    if data.is_null() {
        let _ = error::set_invalid_argument(format!("{name} cannot be null when len > 0"));
        return None;
    }

    // SAFETY: Pointer and length are validated above and owned by caller for the call duration.
    Some(unsafe { std::slice::from_raw_parts(data, len) })
}

/// Rebuild a transaction from its raw value, rejecting zero.
pub(crate) fn transaction_arg(raw: IpcTxnTransaction) -> Option<Transaction> {
    let transaction = Transaction::from_raw(raw);
    if transaction.is_none() {
        let _ = error::set_invalid_argument("transaction cannot be zero");
    }
    transaction
}

/// Write `value` through an out-pointer.
///
/// # Safety
/// `out` must be null or valid for writes of `T`.
pub(crate) unsafe fn write_out<T>(out: *mut T, value: T, name: &str) -> bool {
    if out.is_null() {
        let _ = error::set_invalid_argument(format!("{name} cannot be null"));
        return false;
    }

    // SAFETY: Pointer was checked for null above; validity is guaranteed by the caller.
    unsafe { out.write(value) };
    true
}
