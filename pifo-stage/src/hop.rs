use std::fmt;

/// Selects one of the two queue banks of a stage.
///
/// The set is closed: a stage keeps each discipline in its own, concretely typed bank and this tag
/// picks the bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisciplineKind {
    /// A [`PriorityQueue`](crate::PriorityQueue), released by key.
    Priority,
    /// A [`CalendarQueue`](crate::CalendarQueue), released by departure tick.
    Calendar,
}

impl fmt::Display for DisciplineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Priority => write!(f, "priority"),
            Self::Calendar => write!(f, "calendar"),
        }
    }
}

/// What happens to a packet after it leaves a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Push the packet into every target queue.
    Enqueue,
    /// Dequeue from the target queue. The packet that triggered the lookup is consumed.
    Dequeue,
    /// The packet leaves the system.
    Transmit,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enqueue => write!(f, "enqueue"),
            Self::Dequeue => write!(f, "dequeue"),
            Self::Transmit => write!(f, "transmit"),
        }
    }
}

/// Addresses exactly one queue in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoutingTarget {
    /// The stage the queue lives in.
    pub stage_id: u32,
    /// The bank the queue lives in.
    pub kind: DisciplineKind,
    /// Index into the bank.
    pub queue_id: u32,
}

impl RoutingTarget {
    /// Creates a new routing target.
    pub const fn new(stage_id: u32, kind: DisciplineKind, queue_id: u32) -> Self {
        Self { stage_id, kind, queue_id }
    }

    /// Targets priority queue `queue_id` of stage `stage_id`.
    pub const fn priority(stage_id: u32, queue_id: u32) -> Self {
        Self::new(stage_id, DisciplineKind::Priority, queue_id)
    }

    /// Targets calendar queue `queue_id` of stage `stage_id`.
    pub const fn calendar(stage_id: u32, queue_id: u32) -> Self {
        Self::new(stage_id, DisciplineKind::Calendar, queue_id)
    }
}

impl fmt::Display for RoutingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.stage_id, self.kind, self.queue_id)
    }
}

/// A routing decision: the operation to perform next, and on which queues.
///
/// Enqueue decisions may fan out to several targets. Dequeue decisions name exactly one target.
/// Transmit decisions carry none.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NextHop {
    op: Operation,
    targets: Vec<RoutingTarget>,
}

impl NextHop {
    /// Creates a decision from its raw parts. The shape is checked when the decision is placed in a
    /// [`NextHopTable`](crate::NextHopTable).
    pub fn new(op: Operation, targets: Vec<RoutingTarget>) -> Self {
        Self { op, targets }
    }

    /// Enqueue into every one of `targets`, in order.
    pub fn enqueue(targets: impl IntoIterator<Item = RoutingTarget>) -> Self {
        Self::new(Operation::Enqueue, targets.into_iter().collect())
    }

    /// Dequeue from `target`.
    pub fn dequeue(target: RoutingTarget) -> Self {
        Self::new(Operation::Dequeue, vec![target])
    }

    /// Leave the system.
    pub fn transmit() -> Self {
        Self::new(Operation::Transmit, Vec::new())
    }

    /// Returns the operation.
    pub const fn op(&self) -> Operation {
        self.op
    }

    /// Returns the targets, in the order they are served.
    pub fn targets(&self) -> &[RoutingTarget] {
        &self.targets
    }

    /// Checks that the targets fit the operation.
    pub(crate) fn validate(&self) -> Result<(), &'static str> {
        match (self.op, self.targets.len()) {
            (Operation::Enqueue, 0) => Err("enqueue needs at least one target"),
            (Operation::Dequeue, n) if n != 1 => Err("dequeue needs exactly one target"),
            (Operation::Transmit, n) if n != 0 => Err("transmit takes no targets"),
            (Operation::Enqueue, _) if self.has_repeated_target() => {
                Err("enqueue targets must be distinct")
            }
            _ => Ok(()),
        }
    }

    fn has_repeated_target(&self) -> bool {
        self.targets.iter().enumerate().any(|(i, target)| self.targets[..i].contains(target))
    }
}

impl fmt::Display for NextHop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.op)?;
        if !self.targets.is_empty() {
            write!(f, " [")?;
            for (i, target) in self.targets.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{target}")?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}
