//! Queue disciplines that back a PIFO pipeline stage.
//!
//! Both disciplines accept items out of order (push-in) and release them in an order defined by
//! the discipline (first-out):
//!
//! - [`PriorityQueue`] always releases the item with the lowest [`OrderingKey`].
//! - [`CalendarQueue`] treats the key as a departure tick and only releases an item once the
//!   current tick has reached it.
//!
//! Items with equal keys leave in the order of their enqueue tick, and then in arrival order.

use thiserror::Error;

use pifo_common::{OrderingKey, Tick};

mod calendar;
pub use calendar::*;

mod heap;

mod priority;
pub use priority::*;

/// Errors raised by a queue discipline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("Queue is full (capacity {capacity})")]
    Full { capacity: usize },
}

/// The contract shared by every queue discipline.
///
/// A stage keeps each discipline in its own bank and calls the concrete type, so this trait is
/// never used as a trait object on the hot path.
pub trait Discipline<T> {
    /// Admits `item` with the given key at `tick`.
    ///
    /// ## Errors
    /// - [`QueueError::Full`] if the queue has a capacity limit and is at it. Resident items are
    ///   left untouched.
    fn enqueue(&mut self, item: T, key: OrderingKey, tick: Tick) -> Result<(), QueueError>;

    /// Releases the next item at `tick`, if the discipline has one to release.
    fn dequeue(&mut self, tick: Tick) -> Option<T>;

    /// Returns the number of resident items.
    fn len(&self) -> usize;

    /// Returns `true` if no items are resident.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
