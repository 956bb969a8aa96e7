use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;

use crate::parcel::Parcel;
use crate::size::{ParcelSizeTraits, SizeTraits};

/// An in-order queue which tracks the total size of its elements.
///
/// Elements are delivered in the order they were pushed. Sizes are measured
/// once on the way in and once on the way out through `S`, which is why
/// [`SizeTraits`] implementations must be pure.
pub struct SizedQueue<T, S> {
    elements: VecDeque<T>,
    total_size: usize,
    _traits: PhantomData<S>,
}

/// A [`SizedQueue`] of parcels, sized by data length.
pub type ParcelQueue = SizedQueue<Parcel, ParcelSizeTraits>;

impl<T, S: SizeTraits<T>> SizedQueue<T, S> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            elements: VecDeque::new(),
            total_size: 0,
            _traits: PhantomData,
        }
    }

    /// Number of queued elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Total size of all queued elements.
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    /// Borrow the element at the head of the queue.
    pub fn front(&self) -> Option<&T> {
        self.elements.front()
    }

    /// Append an element at the tail.
    pub fn push_back(&mut self, element: T) {
        self.total_size = self.total_size.saturating_add(S::element_size(&element));
        self.elements.push_back(element);
    }

    /// Return an element to the head, e.g. after an aborted get.
    pub fn push_front(&mut self, element: T) {
        self.total_size = self.total_size.saturating_add(S::element_size(&element));
        self.elements.push_front(element);
    }

    /// Remove and return the element at the head.
    pub fn pop_front(&mut self) -> Option<T> {
        let element = self.elements.pop_front()?;
        self.total_size = self.total_size.saturating_sub(S::element_size(&element));
        Some(element)
    }
}

impl<T, S: SizeTraits<T>> Default for SizedQueue<T, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S> fmt::Debug for SizedQueue<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SizedQueue")
            .field("len", &self.elements.len())
            .field("total_size", &self.total_size)
            .finish()
    }
}
