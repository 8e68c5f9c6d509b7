mod key;
pub use key::*;

mod packet;
pub use packet::*;

/// A discrete time step. Every enqueue and dequeue is stamped with the tick it happens on;
/// calendar queues compare it against the scheduled departure encoded in an [`OrderingKey`].
pub type Tick = u64;

/// The value type of every packet field.
pub type FieldValue = i64;
