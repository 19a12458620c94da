//! Fixed-capacity, newest-first history

use std::collections::VecDeque;

/// Default number of snapshot entries kept for browsing.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// A ring buffer that keeps the `capacity` most recently pushed items,
/// newest first. Pushing onto a full buffer evicts the oldest item.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedHistory<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedHistory<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        BoundedHistory {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Rebuild from a newest-first list, dropping whatever exceeds capacity.
    pub fn from_newest_first(capacity: usize, items: Vec<T>) -> Self {
        let mut history = Self::new(capacity);
        history.items.extend(items.into_iter().take(history.capacity));
        history
    }

    /// Push to the front. Returns the evicted item, if any.
    pub fn push(&mut self, item: T) -> Option<T> {
        self.items.push_front(item);
        if self.items.len() > self.capacity {
            self.items.pop_back()
        } else {
            None
        }
    }

    /// Up to `limit` items, newest first.
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = &T> {
        self.items.iter().take(limit)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> Default for BoundedHistory<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
