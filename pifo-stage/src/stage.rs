use std::fmt;

use pifo_common::{OrderingKey, Packet, Tick};
use pifo_queue::{CalendarQueue, Discipline, PriorityQueue};

use crate::{DisciplineKind, NextHop, NextHopTable, Operation, StageError, StageOptions};

/// The field read by the default priority computer.
pub const DEFAULT_RANK_FIELD: &str = "rank";

/// Computes the ordering key of a packet on admission. Must be a pure function of the packet.
pub type PriorityComputer = Box<dyn Fn(&Packet) -> OrderingKey + Send + Sync>;

/// The default priority computer: passes the packet's [`DEFAULT_RANK_FIELD`] through as the key.
/// Packets without the field get the zero key.
pub fn rank_field(packet: &Packet) -> OrderingKey {
    packet.get(DEFAULT_RANK_FIELD).map(OrderingKey::new).unwrap_or_default()
}

/// One stage of a PIFO pipeline: a bank of priority queues, a bank of calendar queues, a next-hop
/// table and a priority computer.
///
/// Bank sizes, table and priority computer are fixed at construction. Both banks are owned by the
/// stage alone; other stages are only ever referred to by id inside the table's decisions.
pub struct PipelineStage {
    priority_bank: Vec<PriorityQueue<Packet>>,
    calendar_bank: Vec<CalendarQueue<Packet>>,
    next_hop_table: NextHopTable,
    priority_computer: PriorityComputer,
    enforce_tick_contract: bool,
    /// Tick of the last successful enqueue.
    last_enqueue: Option<Tick>,
    /// Tick of the last successful dequeue.
    last_dequeue: Option<Tick>,
}

impl fmt::Debug for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineStage")
            .field("priority_bank", &self.priority_bank)
            .field("calendar_bank", &self.calendar_bank)
            .field("next_hop_table", &self.next_hop_table)
            .field("enforce_tick_contract", &self.enforce_tick_contract)
            .field("last_enqueue", &self.last_enqueue)
            .field("last_dequeue", &self.last_dequeue)
            .finish_non_exhaustive()
    }
}

impl PipelineStage {
    /// Creates a stage that ranks packets with [`rank_field`].
    pub fn new(options: StageOptions, next_hop_table: NextHopTable) -> Self {
        Self::with_priority_computer(options, next_hop_table, rank_field)
    }

    /// Creates a stage that ranks packets with `priority_computer`.
    pub fn with_priority_computer<F>(
        options: StageOptions,
        next_hop_table: NextHopTable,
        priority_computer: F,
    ) -> Self
    where
        F: Fn(&Packet) -> OrderingKey + Send + Sync + 'static,
    {
        let priority_bank = (0..options.priority_queues)
            .map(|_| match options.queue_capacity {
                Some(capacity) => PriorityQueue::with_capacity_limit(capacity),
                None => PriorityQueue::new(),
            })
            .collect();

        let calendar_bank = (0..options.calendar_queues)
            .map(|_| match options.queue_capacity {
                Some(capacity) => CalendarQueue::with_capacity_limit(capacity),
                None => CalendarQueue::new(),
            })
            .collect();

        tracing::debug!(
            priority_queues = options.priority_queues,
            calendar_queues = options.calendar_queues,
            capacity = ?options.queue_capacity,
            lookup_field = next_hop_table.field(),
            "created pipeline stage"
        );

        Self {
            priority_bank,
            calendar_bank,
            next_hop_table,
            priority_computer: Box::new(priority_computer),
            enforce_tick_contract: options.enforce_tick_contract,
            last_enqueue: None,
            last_dequeue: None,
        }
    }

    /// Returns the number of queues in the bank of the given kind.
    pub fn bank_size(&self, kind: DisciplineKind) -> usize {
        match kind {
            DisciplineKind::Priority => self.priority_bank.len(),
            DisciplineKind::Calendar => self.calendar_bank.len(),
        }
    }

    /// Returns the priority bank.
    pub fn priority_queues(&self) -> &[PriorityQueue<Packet>] {
        &self.priority_bank
    }

    /// Returns the calendar bank.
    pub fn calendar_queues(&self) -> &[CalendarQueue<Packet>] {
        &self.calendar_bank
    }

    /// Returns the number of packets resident in the given queue.
    pub fn queue_len(&self, kind: DisciplineKind, queue_id: u32) -> Result<usize, StageError> {
        let index = self.index(kind, queue_id)?;
        Ok(match kind {
            DisciplineKind::Priority => self.priority_bank[index].len(),
            DisciplineKind::Calendar => self.calendar_bank[index].len(),
        })
    }

    /// Returns the next-hop table.
    pub fn next_hop_table(&self) -> &NextHopTable {
        &self.next_hop_table
    }

    /// Returns `true` if the stage rejects a second enqueue or dequeue on the same tick, and an
    /// enqueue or dequeue on an earlier tick than the previous one.
    pub const fn enforces_tick_contract(&self) -> bool {
        self.enforce_tick_contract
    }

    /// Checks whether an enqueue into the given queue at `tick` would be accepted, without
    /// changing any state.
    ///
    /// ## Errors
    /// Same as [`Self::enqueue`].
    pub fn check_enqueue(
        &self,
        kind: DisciplineKind,
        queue_id: u32,
        tick: Tick,
    ) -> Result<(), StageError> {
        self.check_tick(Operation::Enqueue, tick)?;
        let index = self.index(kind, queue_id)?;

        let (len, capacity) = match kind {
            DisciplineKind::Priority => {
                let queue = &self.priority_bank[index];
                (queue.len(), queue.capacity_limit())
            }
            DisciplineKind::Calendar => {
                let queue = &self.calendar_bank[index];
                (queue.len(), queue.capacity_limit())
            }
        };

        match capacity {
            Some(capacity) if len >= capacity => {
                Err(pifo_queue::QueueError::Full { capacity }.into())
            }
            _ => Ok(()),
        }
    }

    /// Ranks `packet` with the priority computer and pushes it into the given queue.
    ///
    /// ## Errors
    /// - [`StageError::TickContractViolation`] if the tick contract is enforced and this stage
    ///   already accepted an enqueue on `tick`.
    /// - [`StageError::TickRegression`] if the tick contract is enforced and this stage already
    ///   accepted an enqueue on a later tick.
    /// - [`StageError::InvalidQueueId`] if `queue_id` is outside the selected bank.
    /// - [`StageError::Queue`] if the queue itself rejects the packet.
    ///
    /// A failed enqueue leaves the stage untouched.
    pub fn enqueue(
        &mut self,
        kind: DisciplineKind,
        queue_id: u32,
        packet: Packet,
        tick: Tick,
    ) -> Result<(), StageError> {
        self.check_tick(Operation::Enqueue, tick)?;
        let index = self.index(kind, queue_id)?;
        let key = (self.priority_computer)(&packet);

        match kind {
            DisciplineKind::Priority => self.priority_bank[index].enqueue(packet, key, tick)?,
            DisciplineKind::Calendar => self.calendar_bank[index].enqueue(packet, key, tick)?,
        }

        self.last_enqueue = Some(tick);
        tracing::trace!(%kind, queue_id, tick, %key, "enqueued");

        Ok(())
    }

    /// Releases the next packet of the given queue at `tick`, as chosen by the queue's
    /// discipline. Returns `None` if the queue has nothing to release on this tick.
    ///
    /// ## Errors
    /// - [`StageError::TickContractViolation`] if the tick contract is enforced and this stage
    ///   already served a dequeue on `tick`.
    /// - [`StageError::TickRegression`] if the tick contract is enforced and this stage already
    ///   served a dequeue on a later tick.
    /// - [`StageError::InvalidQueueId`] if `queue_id` is outside the selected bank.
    pub fn dequeue(
        &mut self,
        kind: DisciplineKind,
        queue_id: u32,
        tick: Tick,
    ) -> Result<Option<Packet>, StageError> {
        self.check_tick(Operation::Dequeue, tick)?;
        let index = self.index(kind, queue_id)?;

        let packet = match kind {
            DisciplineKind::Priority => self.priority_bank[index].dequeue(tick),
            DisciplineKind::Calendar => self.calendar_bank[index].dequeue(tick),
        };

        self.last_dequeue = Some(tick);
        tracing::trace!(%kind, queue_id, tick, released = packet.is_some(), "dequeued");

        Ok(packet)
    }

    /// Resolves where `packet` goes after leaving this stage.
    ///
    /// ## Errors
    /// See [`NextHopTable::lookup`].
    pub fn find_next_hop(&self, packet: &Packet) -> Result<&NextHop, StageError> {
        self.next_hop_table.lookup(packet)
    }

    fn index(&self, kind: DisciplineKind, queue_id: u32) -> Result<usize, StageError> {
        let bank_size = self.bank_size(kind);
        usize::try_from(queue_id)
            .ok()
            .filter(|index| *index < bank_size)
            .ok_or(StageError::InvalidQueueId { kind, queue_id, bank_size })
    }

    fn check_tick(&self, op: Operation, tick: Tick) -> Result<(), StageError> {
        if !self.enforce_tick_contract {
            return Ok(());
        }

        let last = match op {
            Operation::Enqueue => self.last_enqueue,
            Operation::Dequeue => self.last_dequeue,
            Operation::Transmit => None,
        };

        match last {
            Some(last) if tick == last => {
                tracing::warn!(%op, tick, "tick contract violated");
                Err(StageError::TickContractViolation { op, tick })
            }
            Some(last) if tick < last => {
                tracing::warn!(%op, tick, last, "tick went backwards");
                Err(StageError::TickRegression { op, tick, last })
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pipeline stage (next hop: {})", self.next_hop_table)?;
        writeln!(f, "Priority queues:")?;
        for (i, queue) in self.priority_bank.iter().enumerate() {
            writeln!(f, "  {i}: {queue}")?;
        }
        writeln!(f, "Calendar queues:")?;
        for (i, queue) in self.calendar_bank.iter().enumerate() {
            writeln!(f, "  {i}: {queue}")?;
        }
        Ok(())
    }
}
