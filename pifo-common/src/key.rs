use std::fmt;

use crate::{FieldValue, Tick};

/// The rank assigned to a packet when it is pushed into a PIFO.
///
/// Lower keys leave first. For a calendar queue the key is the tick at which the packet becomes
/// eligible for departure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderingKey(FieldValue);

impl OrderingKey {
    /// Creates a new key with the given rank.
    #[inline]
    pub const fn new(rank: FieldValue) -> Self {
        Self(rank)
    }

    /// Returns the key that a calendar queue compares against at `tick`. Ticks beyond
    /// [`FieldValue::MAX`] saturate.
    #[inline]
    pub fn from_tick(tick: Tick) -> Self {
        Self(FieldValue::try_from(tick).unwrap_or(FieldValue::MAX))
    }

    /// Returns the raw rank.
    #[inline]
    pub const fn rank(&self) -> FieldValue {
        self.0
    }
}

impl From<FieldValue> for OrderingKey {
    fn from(rank: FieldValue) -> Self {
        Self(rank)
    }
}

impl fmt::Display for OrderingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
