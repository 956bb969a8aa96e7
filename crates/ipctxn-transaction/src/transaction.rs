use std::fmt;
use std::num::{NonZeroU32, NonZeroU64};

/// Opaque handle to one pending transaction.
///
/// The raw value is a fixed-width integer that foreign callers round-trip
/// through [`Transaction::into_raw`] and [`Transaction::from_raw`] without
/// interpreting it. Zero is never a valid handle.
///
/// Layout: slot index in the low 32 bits, slot generation in the high 32 bits.
/// The generation changes every time a slot is reused, so handles of finalized
/// transactions never resolve again (up to the wrap described on the set).
///
/// The raw value is `u64` on every target, including 32-bit ones where a
/// pointer-sized handle would be narrower. It is never a slot address, so
/// callers must carry all 64 bits.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Transaction(NonZeroU64);

impl Transaction {
    pub(crate) fn new(index: u32, generation: NonZeroU32) -> Self {
        let raw = (u64::from(generation.get()) << 32) | u64::from(index);
        // High half is non-zero, so the whole value is.
        match NonZeroU64::new(raw) {
            Some(raw) => Self(raw),
            None => unreachable!("transaction generation is non-zero"),
        }
    }

    /// Rebuild a handle from its raw value. Returns `None` for zero.
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// The raw value to hand to foreign callers.
    pub fn into_raw(self) -> u64 {
        self.0.get()
    }

    pub(crate) fn index(self) -> usize {
        (self.0.get() & u64::from(u32::MAX)) as usize
    }

    pub(crate) fn generation(self) -> u32 {
        (self.0.get() >> 32) as u32
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("index", &self.index())
            .field("generation", &self.generation())
            .finish()
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0.get())
    }
}
