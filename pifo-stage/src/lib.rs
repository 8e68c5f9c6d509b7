//! # PIFO pipeline stages
//!
//! A [`PipelineStage`] is one node of a hierarchical scheduler built from push-in first-out
//! queues. It owns a bank of [`PriorityQueue`]s and a bank of [`CalendarQueue`]s, computes an
//! [`OrderingKey`] for every packet it admits, and resolves where a packet goes after it leaves
//! through a static [`NextHopTable`].
//!
//! Stages never point at each other. A scheduling tree is wired purely through the
//! [`RoutingTarget`]s inside each table's [`NextHop`] entries, and whatever drives the model
//! (for instance a [`Hierarchy`]) moves packets between stages by stage id.
//!
//! ```text
//!            enqueue(kind, queue, pkt, tick)         dequeue(kind, queue, tick)
//!                        │                                      ▲
//!                        ▼                                      │
//!  ┌──────────────────────────────────────────────────────────────────────────┐
//!  │ PipelineStage                                                            │
//!  │   key = priority_computer(pkt)                                           │
//!  │   Priority bank: [PQ 0] [PQ 1] ...    Calendar bank: [CQ 0] [CQ 1] ...   │
//!  │   NextHopTable: field -> { value -> NextHop }                            │
//!  └──────────────────────────────────────────────────────────────────────────┘
//!                                                       │
//!                             find_next_hop(pkt) ───────┘──▶ Enqueue / Dequeue / Transmit
//! ```
//!
//! Time is discrete and supplied by the caller on every operation. A driver is expected to issue
//! at most one enqueue and one dequeue per stage per tick, with ticks that never go backwards. By
//! default the stage checks both and fails with [`StageError::TickContractViolation`] or
//! [`StageError::TickRegression`] (see [`StageOptions::enforce_tick_contract`]).

use thiserror::Error;

pub use pifo_common::{FieldValue, MissingField, OrderingKey, Packet, Tick};
pub use pifo_queue::{CalendarQueue, Discipline, PriorityQueue, QueueError};

mod hierarchy;
pub use hierarchy::*;

mod hop;
pub use hop::*;

mod lut;
pub use lut::*;

mod stage;
pub use stage::*;

/// Errors raised while building a [`NextHopTable`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("Duplicate next hop entry for {field} = {value}")]
    DuplicateEntry { field: String, value: FieldValue },
    #[error("Invalid next hop for {field} = {value}: {reason}")]
    InvalidDecision { field: String, value: FieldValue, reason: &'static str },
}

/// Errors raised by stage and hierarchy operations.
///
/// None of these are transient: retrying the same operation with the same inputs fails the same
/// way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    #[error("Invalid {kind} queue id {queue_id} (bank size {bank_size})")]
    InvalidQueueId { kind: DisciplineKind, queue_id: u32, bank_size: usize },
    #[error("No next hop for {field} = {value}")]
    LookupMiss { field: String, value: FieldValue },
    #[error(transparent)]
    MissingField(#[from] MissingField),
    #[error("More than one {op} on tick {tick}")]
    TickContractViolation { op: Operation, tick: Tick },
    #[error("{op} on tick {tick} is earlier than the previous {op} on tick {last}")]
    TickRegression { op: Operation, tick: Tick, last: Tick },
    #[error("Invalid {op} decision: {reason}")]
    InvalidDecision { op: Operation, reason: &'static str },
    #[error("Unknown stage {0}")]
    UnknownStage(u32),
    #[error("Hierarchy cannot hold more than {0} stages")]
    TooManyStages(usize),
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}

/// Construction parameters of a [`PipelineStage`].
#[derive(Debug, Clone)]
pub struct StageOptions {
    /// Number of queues in the priority bank.
    priority_queues: u32,
    /// Number of queues in the calendar bank.
    calendar_queues: u32,
    /// Capacity limit applied to every queue in both banks. `None` means unbounded.
    queue_capacity: Option<usize>,
    /// Whether a second enqueue or dequeue on the same tick is rejected.
    enforce_tick_contract: bool,
}

impl Default for StageOptions {
    fn default() -> Self {
        Self {
            priority_queues: 1,
            calendar_queues: 1,
            queue_capacity: None,
            enforce_tick_contract: true,
        }
    }
}

impl StageOptions {
    /// Sets the number of queues in the priority bank.
    pub fn priority_queues(mut self, priority_queues: u32) -> Self {
        self.priority_queues = priority_queues;
        self
    }

    /// Sets the number of queues in the calendar bank.
    pub fn calendar_queues(mut self, calendar_queues: u32) -> Self {
        self.calendar_queues = calendar_queues;
        self
    }

    /// Limits every queue of the stage to `capacity` resident packets. Enqueues into a full
    /// queue fail with [`QueueError::Full`].
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Sets whether the stage rejects a second enqueue (or a second dequeue) on the same tick,
    /// and an enqueue (or dequeue) on a tick earlier than the previous one. Enabled by default.
    /// When disabled, both rules are left to the driver.
    pub fn enforce_tick_contract(mut self, enforce: bool) -> Self {
        self.enforce_tick_contract = enforce;
        self
    }
}
