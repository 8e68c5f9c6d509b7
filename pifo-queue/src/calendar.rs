use std::fmt;

use pifo_common::{OrderingKey, Tick};

use crate::{heap::RankedHeap, Discipline, QueueError};

/// A PIFO whose keys are departure times.
///
/// An item enqueued with key `T` is held back by every dequeue at a tick below `T`, and released
/// by the first dequeue at a tick at or past `T`. When several items are due, the one scheduled
/// earliest leaves first; ties follow enqueue tick, then arrival.
#[derive(Debug)]
pub struct CalendarQueue<T> {
    heap: RankedHeap<T>,
}

impl<T> Default for CalendarQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CalendarQueue<T> {
    /// Creates an unbounded calendar queue.
    pub fn new() -> Self {
        Self { heap: RankedHeap::new(None) }
    }

    /// Creates a calendar queue that holds at most `capacity` items.
    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self { heap: RankedHeap::new(Some(capacity)) }
    }

    /// Returns the capacity limit, if any.
    pub const fn capacity_limit(&self) -> Option<usize> {
        self.heap.capacity_limit()
    }

    /// Returns the departure tick of the next item to become due.
    pub fn next_due(&self) -> Option<OrderingKey> {
        self.heap.peek().map(|entry| entry.key)
    }

    /// Returns `true` if a dequeue at `tick` would release an item.
    pub fn is_due(&self, tick: Tick) -> bool {
        self.next_due().is_some_and(|key| key <= OrderingKey::from_tick(tick))
    }

    /// Iterates over resident items in departure order, together with their key and enqueue tick.
    pub fn iter(&self) -> impl Iterator<Item = (&T, OrderingKey, Tick)> {
        self.heap.ordered().into_iter().map(|entry| (&entry.item, entry.key, entry.tick))
    }
}

impl<T> Discipline<T> for CalendarQueue<T> {
    fn enqueue(&mut self, item: T, key: OrderingKey, tick: Tick) -> Result<(), QueueError> {
        self.heap.push(item, key, tick)
    }

    fn dequeue(&mut self, tick: Tick) -> Option<T> {
        if !self.is_due(tick) {
            return None;
        }

        self.heap.pop().map(|entry| entry.item)
    }

    fn len(&self) -> usize {
        self.heap.len()
    }
}

impl<T: fmt::Display> fmt::Display for CalendarQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.heap, f)
    }
}
