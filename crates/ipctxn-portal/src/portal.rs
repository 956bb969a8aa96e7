use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use ipctxn_parcel::{Parcel, ParcelQueue};
use ipctxn_transaction::{PendingTransactionSet, SetStats, Transaction};
use tracing::{debug, warn};

use crate::config::PortalConfig;
use crate::error::{PortalError, Result};

static NEXT_PORTAL_ID: AtomicU64 = AtomicU64::new(1);

/// Slot counters for both transaction sets of a portal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PortalStats {
    pub puts: SetStats,
    pub gets: SetStats,
}

#[derive(Debug, Default)]
struct Side {
    pending_puts: PendingTransactionSet,
    pending_gets: PendingTransactionSet,
    inbound: ParcelQueue,
    closed: bool,
}

impl Side {
    fn pending_transactions(&self) -> usize {
        self.pending_puts.len() + self.pending_gets.len()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(PortalError::Closed);
        }
        Ok(())
    }
}

#[derive(Debug)]
struct PairState {
    sides: [Side; 2],
    config: PortalConfig,
}

impl PairState {
    /// Returns `(local, peer)` for the portal on `side`.
    fn split(&mut self, side: usize) -> (&mut Side, &mut Side) {
        let [first, second] = &mut self.sides;
        if side == 0 {
            (first, second)
        } else {
            (second, first)
        }
    }
}

/// Open a connected pair of portals with default limits.
pub fn open_pair() -> (Portal, Portal) {
    open_pair_with_config(PortalConfig::default())
}

/// Open a connected pair of portals.
pub fn open_pair_with_config(config: PortalConfig) -> (Portal, Portal) {
    let shared = Arc::new(Mutex::new(PairState {
        sides: [Side::default(), Side::default()],
        config,
    }));
    let first = Portal::new(0, Arc::clone(&shared));
    let second = Portal::new(1, shared);
    debug!(first = first.id, second = second.id, "opened portal pair");
    (first, second)
}

/// One end of a portal pair.
///
/// All state of both ends lives behind a single lock, so a portal can be
/// shared across threads and every transaction operation is serialized.
#[derive(Debug)]
pub struct Portal {
    id: u64,
    side: usize,
    shared: Arc<Mutex<PairState>>,
}

impl Portal {
    fn new(side: usize, shared: Arc<Mutex<PairState>>) -> Self {
        Self {
            id: NEXT_PORTAL_ID.fetch_add(1, Ordering::Relaxed),
            side,
            shared,
        }
    }

    /// Process-unique portal identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    // Every critical section leaves the state consistent, so a poisoned lock
    // is still usable.
    fn lock(&self) -> MutexGuard<'_, PairState> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Put `data` to the peer in one step.
    pub fn put(&self, data: &[u8]) -> Result<()> {
        let transaction = self.begin_put(data.len())?;
        let result = self
            .write(transaction, 0, data)
            .and_then(|()| self.commit_put(transaction, data.len()));
        if let Err(err) = &result {
            if let Err(abort_err) = self.abort_put(transaction) {
                debug!(
                    portal = self.id,
                    %transaction,
                    error = %err,
                    abort_error = %abort_err,
                    "failed to abort put after error"
                );
            }
        }
        result
    }

    /// Reserve a zero-filled parcel of `capacity` bytes for a two-phase put.
    pub fn begin_put(&self, capacity: usize) -> Result<Transaction> {
        let max = self.lock().config.max_parcel_size;
        let parcel = Parcel::with_capacity_checked(capacity, max)?;

        let mut state = self.lock();
        let (local, peer) = state.split(self.side);
        local.ensure_open()?;
        if peer.closed {
            return Err(PortalError::PeerClosed);
        }

        let transaction = local.pending_puts.add(parcel);
        debug!(portal = self.id, %transaction, capacity, "began put");
        Ok(transaction)
    }

    /// Copy `data` into a pending put at `offset`.
    pub fn write(&self, transaction: Transaction, offset: usize, data: &[u8]) -> Result<()> {
        let mut state = self.lock();
        let (local, _) = state.split(self.side);
        let parcel = local
            .pending_puts
            .parcel_mut(transaction)
            .ok_or(PortalError::UnknownTransaction(transaction))?;

        let capacity = parcel.len();
        let end = offset
            .checked_add(data.len())
            .filter(|end| *end <= capacity)
            .ok_or(PortalError::OutOfBounds {
                offset,
                len: data.len(),
                capacity,
            })?;
        parcel.data_mut()[offset..end].copy_from_slice(data);
        Ok(())
    }

    /// Commit the first `num_bytes` of a pending put and queue it for the peer.
    ///
    /// On [`PortalError::PeerClosed`] and [`PortalError::QueueFull`] the put
    /// stays pending, so it can be retried or aborted.
    pub fn commit_put(&self, transaction: Transaction, num_bytes: usize) -> Result<()> {
        let mut state = self.lock();
        let config = state.config;
        let (local, peer) = state.split(self.side);
        local.ensure_open()?;

        let capacity = local
            .pending_puts
            .parcel(transaction)
            .map(Parcel::len)
            .ok_or(PortalError::UnknownTransaction(transaction))?;
        if num_bytes > capacity {
            return Err(PortalError::CommitExceedsCapacity {
                committed: num_bytes,
                capacity,
            });
        }
        if peer.closed {
            return Err(PortalError::PeerClosed);
        }

        let queued_parcels = peer.inbound.len();
        let queued_bytes = peer.inbound.total_size();
        if queued_parcels >= config.max_queued_parcels
            || queued_bytes.saturating_add(num_bytes) > config.max_queued_bytes
        {
            return Err(PortalError::QueueFull {
                queued_parcels,
                queued_bytes,
            });
        }

        let mut parcel = local
            .pending_puts
            .finalize_for_put(transaction, num_bytes)
            .ok_or(PortalError::UnknownTransaction(transaction))?;
        parcel.commit(num_bytes)?;
        peer.inbound.push_back(parcel);

        debug!(portal = self.id, %transaction, num_bytes, "committed put");
        Ok(())
    }

    /// Discard a pending put without sending anything.
    pub fn abort_put(&self, transaction: Transaction) -> Result<()> {
        let mut state = self.lock();
        let (local, _) = state.split(self.side);
        local
            .pending_puts
            .finalize_for_put(transaction, 0)
            .ok_or(PortalError::UnknownTransaction(transaction))?;

        debug!(portal = self.id, %transaction, "aborted put");
        Ok(())
    }

    /// Get the next parcel in one step.
    pub fn get(&self) -> Result<Parcel> {
        let (transaction, _) = self.begin_get()?;
        self.end_get(transaction)
    }

    /// Take the next queued parcel into a two-phase get.
    ///
    /// Returns the transaction and the parcel's length.
    pub fn begin_get(&self) -> Result<(Transaction, usize)> {
        let mut state = self.lock();
        let (local, peer) = state.split(self.side);
        local.ensure_open()?;

        let parcel = match local.inbound.pop_front() {
            Some(parcel) => parcel,
            None if peer.closed => return Err(PortalError::PeerClosed),
            None => return Err(PortalError::Unavailable),
        };
        let len = parcel.len();
        let transaction = local.pending_gets.add(parcel);

        debug!(portal = self.id, %transaction, len, "began get");
        Ok((transaction, len))
    }

    /// Run `f` on the parcel of a pending get.
    pub fn with_get_parcel<R>(
        &self,
        transaction: Transaction,
        f: impl FnOnce(&Parcel) -> R,
    ) -> Result<R> {
        let mut state = self.lock();
        let (local, _) = state.split(self.side);
        local
            .pending_gets
            .parcel(transaction)
            .map(f)
            .ok_or(PortalError::UnknownTransaction(transaction))
    }

    /// Copy out the bytes of a pending get.
    pub fn read(&self, transaction: Transaction) -> Result<Bytes> {
        self.with_get_parcel(transaction, |parcel| Bytes::copy_from_slice(parcel.data()))
    }

    /// Finish a get, taking ownership of its parcel.
    pub fn end_get(&self, transaction: Transaction) -> Result<Parcel> {
        let mut state = self.lock();
        let (local, _) = state.split(self.side);
        let parcel = local
            .pending_gets
            .finalize_for_get(transaction)
            .ok_or(PortalError::UnknownTransaction(transaction))?;

        debug!(portal = self.id, %transaction, "ended get");
        Ok(parcel)
    }

    /// Abandon a get, returning its parcel to the head of the inbound queue.
    pub fn abort_get(&self, transaction: Transaction) -> Result<()> {
        let mut state = self.lock();
        let (local, _) = state.split(self.side);
        let parcel = local
            .pending_gets
            .finalize_for_get(transaction)
            .ok_or(PortalError::UnknownTransaction(transaction))?;
        local.inbound.push_front(parcel);

        debug!(portal = self.id, %transaction, "aborted get");
        Ok(())
    }

    /// Returns true if any put or get transaction is outstanding.
    pub fn has_pending_transactions(&self) -> bool {
        let mut state = self.lock();
        let (local, _) = state.split(self.side);
        !local.pending_puts.is_empty() || !local.pending_gets.is_empty()
    }

    /// Number of outstanding put and get transactions.
    pub fn pending_transactions(&self) -> usize {
        let mut state = self.lock();
        state.split(self.side).0.pending_transactions()
    }

    /// Number of parcels queued for get.
    pub fn queued_parcels(&self) -> usize {
        let mut state = self.lock();
        state.split(self.side).0.inbound.len()
    }

    /// Total bytes queued for get.
    pub fn queued_bytes(&self) -> usize {
        let mut state = self.lock();
        state.split(self.side).0.inbound.total_size()
    }

    /// Slot counters of this portal's transaction sets.
    pub fn stats(&self) -> PortalStats {
        let mut state = self.lock();
        let (local, _) = state.split(self.side);
        PortalStats {
            puts: local.pending_puts.stats(),
            gets: local.pending_gets.stats(),
        }
    }

    /// Close this portal.
    ///
    /// Fails with [`PortalError::TransactionsPending`] while any transaction
    /// is outstanding. Parcels still queued for get are dropped.
    pub fn close(&self) -> Result<()> {
        let mut state = self.lock();
        let (local, _) = state.split(self.side);
        local.ensure_open()?;

        let pending = local.pending_transactions();
        if pending > 0 {
            return Err(PortalError::TransactionsPending(pending));
        }

        local.closed = true;
        local.inbound = ParcelQueue::new();
        debug!(portal = self.id, "closed portal");
        Ok(())
    }
}

impl Drop for Portal {
    fn drop(&mut self) {
        let mut state = self.lock();
        let (local, _) = state.split(self.side);
        if local.closed {
            return;
        }

        let pending = local.pending_transactions();
        if pending > 0 {
            warn!(portal = self.id, pending, "dropping portal with pending transactions");
        }
        local.closed = true;
        local.pending_puts = PendingTransactionSet::new();
        local.pending_gets = PendingTransactionSet::new();
        local.inbound = ParcelQueue::new();
    }
}
