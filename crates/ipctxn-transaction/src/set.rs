use std::num::NonZeroU32;

use ipctxn_parcel::Parcel;
use tracing::{debug, trace};

use crate::slot::TransactionSlot;
use crate::transaction::Transaction;

/// Slot allocation counters for a [`PendingTransactionSet`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetStats {
    /// Slots heap-allocated by `add`.
    pub slots_allocated: u64,
    /// `add` calls served by the retained slot without allocating.
    pub slots_reused: u64,
    /// Slots deallocated by a finalize.
    pub slots_freed: u64,
}

#[derive(Debug)]
struct Entry {
    generation: NonZeroU32,
    slot: Option<Box<TransactionSlot>>,
}

/// A set of pending transactions, each owning one parcel.
///
/// Every slot is boxed individually, so growing the arena never moves a slot
/// that an outstanding [`Transaction`] refers to. Vacated arena entries keep
/// their generation and are recycled for later slots; the generation is bumped
/// on every reuse so old handles stop resolving.
///
/// When the last pending transaction is finalized its slot is not freed.
/// It stays in the set, empty, and the next [`add`](Self::add) installs its
/// parcel there. At most one such retained slot exists, and only while it is
/// the sole slot in the set.
///
/// Access is not synchronized. The owning portal serializes all calls.
#[derive(Debug, Default)]
pub struct PendingTransactionSet {
    entries: Vec<Entry>,
    free_indices: Vec<usize>,
    live_slots: usize,
    retained: Option<usize>,
    stats: SetStats,
}

impl PendingTransactionSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no transactions are pending. A retained empty slot does
    /// not count as a pending transaction.
    pub fn is_empty(&self) -> bool {
        self.live_slots == 0 || self.has_retained_empty_transaction()
    }

    /// Number of pending transactions.
    pub fn len(&self) -> usize {
        if self.has_retained_empty_transaction() {
            0
        } else {
            self.live_slots
        }
    }

    /// Allocation counters since the set was created.
    pub fn stats(&self) -> SetStats {
        self.stats
    }

    /// Add `parcel` to the set, returning a handle that refers to it until it
    /// is finalized.
    ///
    /// # Panics
    ///
    /// Panics if more than `u32::MAX` slots are live at once.
    pub fn add(&mut self, parcel: Parcel) -> Transaction {
        if let Some(index) = self.retained.take() {
            if let Some(entry) = self.entries.get_mut(index) {
                if let Some(slot) = entry.slot.as_deref_mut() {
                    entry.generation = next_generation(entry.generation);
                    slot.set_parcel(parcel);
                    self.stats.slots_reused += 1;
                    trace!(index, "reusing retained transaction slot");
                    return Transaction::new(arena_index(index), entry.generation);
                }
            }
            debug_assert!(false, "retained transaction slot {index} is missing");
        }

        self.insert(Box::new(TransactionSlot::with_parcel(parcel)))
    }

    /// Finalize a get transaction, returning its parcel.
    ///
    /// Returns `None` and leaves the set unchanged if `transaction` is not
    /// pending.
    pub fn finalize_for_get(&mut self, transaction: Transaction) -> Option<Parcel> {
        if self
            .find(transaction)
            .is_some_and(TransactionSlot::has_parcel)
        {
            return self.remove(transaction.index());
        }

        trace!(%transaction, "finalize for get did not match a pending transaction");
        None
    }

    /// Finalize a put transaction, returning its parcel so `num_data_bytes`
    /// can be committed from it.
    ///
    /// Returns `None` and leaves the set unchanged if `transaction` is not
    /// pending or `num_data_bytes` exceeds the parcel's length. The returned
    /// parcel is not trimmed.
    pub fn finalize_for_put(
        &mut self,
        transaction: Transaction,
        num_data_bytes: usize,
    ) -> Option<Parcel> {
        if self
            .find(transaction)
            .is_some_and(|slot| slot.can_put(num_data_bytes))
        {
            return self.remove(transaction.index());
        }

        trace!(
            %transaction,
            num_data_bytes,
            "finalize for put did not match a pending transaction"
        );
        None
    }

    /// Borrow the parcel of a pending transaction.
    pub fn parcel(&self, transaction: Transaction) -> Option<&Parcel> {
        self.find(transaction)?.parcel()
    }

    /// Mutably borrow the parcel of a pending transaction.
    pub fn parcel_mut(&mut self, transaction: Transaction) -> Option<&mut Parcel> {
        self.find_mut(transaction)?.parcel_mut()
    }

    fn has_retained_empty_transaction(&self) -> bool {
        debug_assert!(self.retained.is_none() || self.live_slots == 1);
        self.retained.is_some()
    }

    fn find(&self, transaction: Transaction) -> Option<&TransactionSlot> {
        let entry = self.entries.get(transaction.index())?;
        if entry.generation.get() != transaction.generation() {
            return None;
        }
        entry.slot.as_deref()
    }

    fn find_mut(&mut self, transaction: Transaction) -> Option<&mut TransactionSlot> {
        let entry = self.entries.get_mut(transaction.index())?;
        if entry.generation.get() != transaction.generation() {
            return None;
        }
        entry.slot.as_deref_mut()
    }

    fn insert(&mut self, slot: Box<TransactionSlot>) -> Transaction {
        self.live_slots += 1;
        self.stats.slots_allocated += 1;

        if let Some(index) = self.free_indices.pop() {
            if let Some(entry) = self.entries.get_mut(index) {
                entry.generation = next_generation(entry.generation);
                entry.slot = Some(slot);
                return Transaction::new(arena_index(index), entry.generation);
            }
        }

        let index = self.entries.len();
        let transaction = Transaction::new(arena_index(index), NonZeroU32::MIN);
        self.entries.push(Entry {
            generation: NonZeroU32::MIN,
            slot: Some(slot),
        });
        debug!(index, "allocated transaction slot");
        transaction
    }

    fn remove(&mut self, index: usize) -> Option<Parcel> {
        let is_last = self.live_slots == 1;
        let entry = self.entries.get_mut(index)?;
        let parcel = entry.slot.as_deref_mut()?.take_parcel();

        if is_last {
            // Keep the allocation for the next add.
            self.retained = Some(index);
        } else {
            entry.slot = None;
            self.free_indices.push(index);
            self.live_slots -= 1;
            self.stats.slots_freed += 1;
        }
        Some(parcel)
    }

    #[cfg(test)]
    fn slot_address(&self, transaction: Transaction) -> Option<*const TransactionSlot> {
        self.find(transaction)
            .map(|slot| slot as *const TransactionSlot)
    }
}

impl Drop for PendingTransactionSet {
    fn drop(&mut self) {
        let abandoned = self.len();
        if abandoned > 0 {
            debug!(abandoned, "dropping abandoned transactions");
        }
    }
}

/// Generation for the next reuse of an arena entry.
///
/// Generations wrap after `u32::MAX` reuses of one entry, skipping zero. A
/// handle held across that many reuses of its entry resolves again, so stale
/// handles are only rejected within that window.
fn next_generation(generation: NonZeroU32) -> NonZeroU32 {
    NonZeroU32::new(generation.get().wrapping_add(1)).unwrap_or(NonZeroU32::MIN)
}

fn arena_index(index: usize) -> u32 {
    match u32::try_from(index) {
        Ok(index) => index,
        Err(_) => panic!("transaction arena exceeded {} slots", u32::MAX),
    }
}
