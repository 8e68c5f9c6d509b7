use std::{collections::hash_map::Entry, fmt};

use rustc_hash::FxHashMap;

use pifo_common::{FieldValue, Packet};

use crate::{NextHop, StageError, TableError};

/// Static next-hop lookup table of a stage.
///
/// The table reads one named field from a packet and maps its value to a [`NextHop`]. Entries are
/// fixed at construction. A value without an entry is a hole in the routing policy and fails the
/// lookup with [`StageError::LookupMiss`] rather than falling back to some default route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextHopTable {
    /// The packet field the table is keyed on.
    field: String,
    entries: FxHashMap<FieldValue, NextHop>,
}

impl NextHopTable {
    /// Builds a table keyed on `field` from an explicit list of entries.
    ///
    /// ## Errors
    /// - [`TableError::DuplicateEntry`] if two entries share a field value.
    /// - [`TableError::InvalidDecision`] if a decision has the wrong number of targets for its
    ///   operation.
    pub fn new(
        field: impl Into<String>,
        entries: impl IntoIterator<Item = (FieldValue, NextHop)>,
    ) -> Result<Self, TableError> {
        let field = field.into();
        let mut table = FxHashMap::default();

        for (value, hop) in entries {
            if let Err(reason) = hop.validate() {
                return Err(TableError::InvalidDecision { field, value, reason });
            }

            match table.entry(value) {
                Entry::Occupied(_) => return Err(TableError::DuplicateEntry { field, value }),
                Entry::Vacant(slot) => {
                    slot.insert(hop);
                }
            }
        }

        tracing::debug!(%field, entries = table.len(), "built next hop table");

        Ok(Self { field, entries: table })
    }

    /// Returns the name of the field the table is keyed on.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table has no entries. Every lookup on such a table misses.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entry for `value`, if any.
    pub fn get(&self, value: FieldValue) -> Option<&NextHop> {
        self.entries.get(&value)
    }

    /// Looks up the next hop of `packet`.
    ///
    /// ## Errors
    /// - [`StageError::MissingField`] if the packet does not carry the table's field.
    /// - [`StageError::LookupMiss`] if the field value has no entry.
    pub fn lookup(&self, packet: &Packet) -> Result<&NextHop, StageError> {
        let value = packet.field(&self.field)?;

        self.entries.get(&value).ok_or_else(|| {
            tracing::warn!(field = %self.field, value, "next hop lookup miss");
            StageError::LookupMiss { field: self.field.clone(), value }
        })
    }
}

impl fmt::Display for NextHopTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_unstable_by_key(|(value, _)| **value);

        write!(f, "{} -> {{", self.field)?;
        for (i, (value, hop)) in entries.into_iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{value}: {hop}")?;
        }
        write!(f, "}}")
    }
}
