/// Errors that can occur while creating or committing parcels.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParcelError {
    /// The requested parcel capacity exceeds the configured maximum.
    #[error("parcel too large ({size} bytes, max {max})")]
    TooLarge { size: usize, max: usize },

    /// More bytes were committed than the parcel can hold.
    #[error("cannot commit {committed} bytes to a parcel of {capacity} bytes")]
    CommitOutOfRange { committed: usize, capacity: usize },
}

pub type Result<T> = std::result::Result<T, ParcelError>;
