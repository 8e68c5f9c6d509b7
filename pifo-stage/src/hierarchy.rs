use std::fmt;

use pifo_common::{Packet, Tick};

use crate::{NextHop, Operation, PipelineStage, RoutingTarget, StageError};

/// The result of applying a [`NextHop`] to a packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The packet was pushed into this many queues.
    Enqueued(usize),
    /// The target queue was dequeued. Holds whatever it released on this tick.
    Released(Option<Packet>),
    /// The packet left the system.
    Transmitted(Packet),
}

/// A registry of stages indexed by stage id.
///
/// The registry is how a driver turns the data-only [`RoutingTarget`]s of a decision into calls on
/// concrete stages. It does not run on its own: each call applies one operation at one tick.
#[derive(Debug, Default)]
pub struct Hierarchy {
    stages: Vec<PipelineStage>,
}

impl Hierarchy {
    /// Creates an empty hierarchy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a stage and returns its id. Ids are handed out in insertion order starting at 0.
    ///
    /// ## Errors
    /// - [`StageError::TooManyStages`] if every `u32` stage id is taken.
    pub fn push_stage(&mut self, stage: PipelineStage) -> Result<u32, StageError> {
        let id = next_stage_id(self.stages.len())?;
        self.stages.push(stage);
        tracing::debug!(stage_id = id, "added stage to hierarchy");
        Ok(id)
    }

    /// Returns the number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns `true` if the hierarchy has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Returns the stage with the given id.
    pub fn stage(&self, stage_id: u32) -> Result<&PipelineStage, StageError> {
        self.stages.get(stage_id as usize).ok_or(StageError::UnknownStage(stage_id))
    }

    /// Returns the stage with the given id, mutably.
    pub fn stage_mut(&mut self, stage_id: u32) -> Result<&mut PipelineStage, StageError> {
        self.stages.get_mut(stage_id as usize).ok_or(StageError::UnknownStage(stage_id))
    }

    /// Pushes `packet` into the queue addressed by `target`.
    pub fn enqueue(
        &mut self,
        target: RoutingTarget,
        packet: Packet,
        tick: Tick,
    ) -> Result<(), StageError> {
        self.stage_mut(target.stage_id)?.enqueue(target.kind, target.queue_id, packet, tick)
    }

    /// Dequeues from the queue addressed by `target`.
    pub fn dequeue(
        &mut self,
        target: RoutingTarget,
        tick: Tick,
    ) -> Result<Option<Packet>, StageError> {
        self.stage_mut(target.stage_id)?.dequeue(target.kind, target.queue_id, tick)
    }

    /// Resolves the next hop of a packet that just left stage `stage_id`.
    pub fn next_hop(&self, stage_id: u32, packet: &Packet) -> Result<&NextHop, StageError> {
        self.stage(stage_id)?.find_next_hop(packet)
    }

    /// Applies `hop` to `packet` at `tick`.
    ///
    /// The decision is checked first: an Enqueue without targets or with a repeated target, a
    /// Dequeue without exactly one target or a Transmit with targets fails with
    /// [`StageError::InvalidDecision`] before any stage is touched.
    ///
    /// - Enqueue pushes a copy of the packet into every target. Every target is checked before the
    ///   first push, so an unknown stage, an invalid queue id, a full queue or a tick contract
    ///   violation on any target leaves all stages untouched.
    /// - Dequeue consumes `packet` and dequeues the single target.
    /// - Transmit hands the packet back as having left the system.
    pub fn apply(
        &mut self,
        hop: &NextHop,
        packet: Packet,
        tick: Tick,
    ) -> Result<Outcome, StageError> {
        hop.validate().map_err(|reason| {
            tracing::warn!(op = %hop.op(), reason, "rejected malformed decision");
            StageError::InvalidDecision { op: hop.op(), reason }
        })?;

        match hop.op() {
            Operation::Enqueue => {
                let targets = hop.targets();
                self.check_fan_out(targets, tick)?;

                if let Some((last, rest)) = targets.split_last() {
                    for target in rest {
                        self.enqueue(*target, packet.clone(), tick)?;
                    }
                    self.enqueue(*last, packet, tick)?;
                }

                Ok(Outcome::Enqueued(targets.len()))
            }
            Operation::Dequeue => {
                let &[target] = hop.targets() else {
                    return Err(StageError::InvalidDecision {
                        op: Operation::Dequeue,
                        reason: "dequeue needs exactly one target",
                    });
                };

                self.dequeue(target, tick).map(Outcome::Released)
            }
            Operation::Transmit => {
                tracing::trace!(tick, "transmitted");
                Ok(Outcome::Transmitted(packet))
            }
        }
    }

    fn check_fan_out(&self, targets: &[RoutingTarget], tick: Tick) -> Result<(), StageError> {
        for (i, target) in targets.iter().enumerate() {
            let stage = self.stage(target.stage_id)?;
            stage.check_enqueue(target.kind, target.queue_id, tick)?;

            // A stage takes at most one enqueue per tick, so two targets in the same enforcing
            // stage can never both succeed.
            let repeated = targets[..i].iter().any(|prev| prev.stage_id == target.stage_id);
            if repeated && stage.enforces_tick_contract() {
                return Err(StageError::TickContractViolation { op: Operation::Enqueue, tick });
            }
        }

        Ok(())
    }
}

fn next_stage_id(len: usize) -> Result<u32, StageError> {
    u32::try_from(len).map_err(|_| StageError::TooManyStages(len))
}

impl fmt::Display for Hierarchy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, stage) in self.stages.iter().enumerate() {
            writeln!(f, "== Stage {id}")?;
            write!(f, "{stage}")?;
        }
        Ok(())
    }
}
