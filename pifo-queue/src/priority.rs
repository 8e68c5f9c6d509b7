use std::fmt;

use pifo_common::{OrderingKey, Tick};

use crate::{heap::RankedHeap, Discipline, QueueError};

/// A PIFO that always releases the resident item with the lowest key.
///
/// The dequeue tick does not gate release: as long as the queue is non-empty, a dequeue yields an
/// item. Ties on the key go to the item enqueued on the earlier tick, then to the earlier arrival.
#[derive(Debug)]
pub struct PriorityQueue<T> {
    heap: RankedHeap<T>,
}

impl<T> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PriorityQueue<T> {
    /// Creates an unbounded priority queue.
    pub fn new() -> Self {
        Self { heap: RankedHeap::new(None) }
    }

    /// Creates a priority queue that holds at most `capacity` items. Enqueues beyond that fail
    /// with [`QueueError::Full`].
    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self { heap: RankedHeap::new(Some(capacity)) }
    }

    /// Returns the capacity limit, if any.
    pub const fn capacity_limit(&self) -> Option<usize> {
        self.heap.capacity_limit()
    }

    /// Returns the key of the item that the next dequeue would release.
    pub fn peek_key(&self) -> Option<OrderingKey> {
        self.heap.peek().map(|entry| entry.key)
    }

    /// Iterates over resident items in release order, together with their key and enqueue tick.
    pub fn iter(&self) -> impl Iterator<Item = (&T, OrderingKey, Tick)> {
        self.heap.ordered().into_iter().map(|entry| (&entry.item, entry.key, entry.tick))
    }
}

impl<T> Discipline<T> for PriorityQueue<T> {
    fn enqueue(&mut self, item: T, key: OrderingKey, tick: Tick) -> Result<(), QueueError> {
        self.heap.push(item, key, tick)
    }

    fn dequeue(&mut self, _tick: Tick) -> Option<T> {
        self.heap.pop().map(|entry| entry.item)
    }

    fn len(&self) -> usize {
        self.heap.len()
    }
}

impl<T: fmt::Display> fmt::Display for PriorityQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.heap, f)
    }
}
