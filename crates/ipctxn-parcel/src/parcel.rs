use bytes::{Bytes, BytesMut};

use crate::error::{ParcelError, Result};

/// Default maximum parcel size: 16 MiB.
pub const DEFAULT_MAX_PARCEL_SIZE: usize = 16 * 1024 * 1024;

/// A buffer of message bytes transferred by one transaction.
///
/// The length of a parcel is fixed at creation. The only way to shrink it is
/// [`Parcel::commit`], which the producer calls after a put transaction has
/// been finalized to trim the reserved capacity down to the bytes it wrote.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Parcel {
    data: BytesMut,
}

impl Parcel {
    /// Create an empty parcel with no data bytes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a zero-filled parcel of `capacity` bytes for a put.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::zeroed(capacity),
        }
    }

    /// Like [`Parcel::with_capacity`] but refuses capacities above `max`.
    pub fn with_capacity_checked(capacity: usize, max: usize) -> Result<Self> {
        if capacity > max {
            return Err(ParcelError::TooLarge {
                size: capacity,
                max,
            });
        }
        Ok(Self::with_capacity(capacity))
    }

    /// Create a populated parcel from `data`.
    pub fn from_bytes(data: impl AsRef<[u8]>) -> Self {
        Self {
            data: BytesMut::from(data.as_ref()),
        }
    }

    /// Number of data bytes in the parcel.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the parcel carries no data bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// View the parcel's data bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutably view the parcel's data bytes. The length cannot change through
    /// this view.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Trim the parcel to the first `num_bytes` bytes.
    pub fn commit(&mut self, num_bytes: usize) -> Result<()> {
        if num_bytes > self.data.len() {
            return Err(ParcelError::CommitOutOfRange {
                committed: num_bytes,
                capacity: self.data.len(),
            });
        }
        self.data.truncate(num_bytes);
        Ok(())
    }

    /// Freeze the parcel into immutable bytes.
    pub fn into_bytes(self) -> Bytes {
        self.data.freeze()
    }
}

impl From<Bytes> for Parcel {
    fn from(data: Bytes) -> Self {
        Self {
            data: BytesMut::from(data.as_ref()),
        }
    }
}

impl From<Vec<u8>> for Parcel {
    fn from(data: Vec<u8>) -> Self {
        Self {
            data: BytesMut::from(&data[..]),
        }
    }
}
