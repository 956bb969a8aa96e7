//! Byte-size accounting for queued elements.

use crate::parcel::Parcel;

/// Maps a queued element to the number of bytes it contributes to a queue's
/// size accounting. Implementations must be pure and O(1).
pub trait SizeTraits<T> {
    fn element_size(element: &T) -> usize;
}

/// Counts a parcel by its data length.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParcelSizeTraits;

impl SizeTraits<Parcel> for ParcelSizeTraits {
    fn element_size(parcel: &Parcel) -> usize {
        parcel.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parcel_size_is_data_length() {
        assert_eq!(ParcelSizeTraits::element_size(&Parcel::new()), 0);
        assert_eq!(ParcelSizeTraits::element_size(&Parcel::with_capacity(7)), 7);
        assert_eq!(
            ParcelSizeTraits::element_size(&Parcel::from_bytes(b"hello")),
            5
        );
    }
}
