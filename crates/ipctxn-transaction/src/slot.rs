use ipctxn_parcel::Parcel;

/// Storage for one pending transaction.
///
/// A slot is heap-allocated by its [`PendingTransactionSet`] and never moves
/// while a handle to it is outstanding. It holds no parcel only while it is
/// retained for reuse after its transaction was finalized.
///
/// [`PendingTransactionSet`]: crate::PendingTransactionSet
#[derive(Debug, Default)]
pub struct TransactionSlot {
    parcel: Option<Parcel>,
}

impl TransactionSlot {
    /// Create a slot owning `parcel`.
    pub fn with_parcel(parcel: Parcel) -> Self {
        Self {
            parcel: Some(parcel),
        }
    }

    pub fn has_parcel(&self) -> bool {
        self.parcel.is_some()
    }

    /// Install `parcel`, replacing any parcel already held.
    pub fn set_parcel(&mut self, parcel: Parcel) {
        self.parcel = Some(parcel);
    }

    /// Returns true if a parcel is held and it has room for `num_data_bytes`.
    pub fn can_put(&self, num_data_bytes: usize) -> bool {
        self.parcel
            .as_ref()
            .is_some_and(|parcel| parcel.len() >= num_data_bytes)
    }

    pub fn parcel(&self) -> Option<&Parcel> {
        self.parcel.as_ref()
    }

    pub fn parcel_mut(&mut self) -> Option<&mut Parcel> {
        self.parcel.as_mut()
    }

    /// Remove and return the held parcel, leaving the slot empty.
    ///
    /// # Panics
    ///
    /// Panics if the slot holds no parcel. Callers check [`has_parcel`] or
    /// [`can_put`] first.
    ///
    /// [`has_parcel`]: Self::has_parcel
    /// [`can_put`]: Self::can_put
    pub fn take_parcel(&mut self) -> Parcel {
        match self.parcel.take() {
            Some(parcel) => parcel,
            None => panic!("take_parcel() called on an empty transaction slot"),
        }
    }
}
