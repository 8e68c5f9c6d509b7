use std::{cmp::Ordering, collections::BinaryHeap, fmt};

use pifo_common::{OrderingKey, Tick};

use crate::QueueError;

/// A resident item together with the rank it was admitted with.
#[derive(Debug)]
pub(crate) struct Entry<T> {
    pub(crate) key: OrderingKey,
    pub(crate) tick: Tick,
    /// Arrival sequence number, unique within one heap. Makes the order total.
    seq: u64,
    pub(crate) item: T,
}

impl<T> Entry<T> {
    #[inline]
    fn rank(&self) -> (OrderingKey, Tick, u64) {
        (self.key, self.tick, self.seq)
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so that the max-heap pops the lowest rank first.
        other.rank().cmp(&self.rank())
    }
}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.rank() == other.rank()
    }
}

impl<T> Eq for Entry<T> {}

/// Min-heap over `(key, enqueue tick, arrival)` with an optional capacity limit.
#[derive(Debug)]
pub(crate) struct RankedHeap<T> {
    entries: BinaryHeap<Entry<T>>,
    next_seq: u64,
    capacity: Option<usize>,
}

impl<T> RankedHeap<T> {
    pub(crate) fn new(capacity: Option<usize>) -> Self {
        Self { entries: BinaryHeap::new(), next_seq: 0, capacity }
    }

    pub(crate) const fn capacity_limit(&self) -> Option<usize> {
        self.capacity
    }

    pub(crate) fn push(&mut self, item: T, key: OrderingKey, tick: Tick) -> Result<(), QueueError> {
        if let Some(capacity) = self.capacity {
            if self.entries.len() >= capacity {
                tracing::debug!(capacity, %key, tick, "queue full, dropping incoming item");
                return Err(QueueError::Full { capacity });
            }
        }

        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.entries.push(Entry { key, tick, seq, item });

        Ok(())
    }

    #[inline]
    pub(crate) fn peek(&self) -> Option<&Entry<T>> {
        self.entries.peek()
    }

    #[inline]
    pub(crate) fn pop(&mut self) -> Option<Entry<T>> {
        self.entries.pop()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns the resident entries in the order they would be popped.
    pub(crate) fn ordered(&self) -> Vec<&Entry<T>> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_unstable_by_key(|entry| entry.rank());
        entries
    }
}

impl<T: fmt::Display> fmt::Display for RankedHeap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, entry) in self.ordered().into_iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "key={} tick={} {}", entry.key, entry.tick, entry.item)?;
        }
        write!(f, "]")
    }
}
