use std::fmt;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::FieldValue;

/// Returned when a packet is asked for a field it does not carry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Packet has no field named {0:?}")]
pub struct MissingField(pub String);

/// A packet as seen by the scheduler: a set of named integer fields.
///
/// Schedulers only ever read fields. Whatever sets them (a parser, a classifier, a test) does so
/// before the packet is handed to the first stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packet {
    fields: FxHashMap<String, FieldValue>,
}

impl Packet {
    /// Creates a packet without any fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the field `name` to `value`, replacing any previous value.
    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.set(name, value);
        self
    }

    /// Sets the field `name` to `value`, returning the previous value if there was one.
    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.fields.insert(name.into(), value)
    }

    /// Returns the value of the field `name`, if present.
    #[inline]
    pub fn get(&self, name: &str) -> Option<FieldValue> {
        self.fields.get(name).copied()
    }

    /// Returns the value of the field `name`.
    ///
    /// ## Errors
    /// - [`MissingField`] if the packet does not carry the field.
    #[inline]
    pub fn field(&self, name: &str) -> Result<FieldValue, MissingField> {
        self.get(name).ok_or_else(|| MissingField(name.to_owned()))
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the packet carries no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over all fields in unspecified order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), *value))
    }
}

impl<S: Into<String>> FromIterator<(S, FieldValue)> for Packet {
    fn from_iter<I: IntoIterator<Item = (S, FieldValue)>>(iter: I) -> Self {
        Self { fields: iter.into_iter().map(|(name, value)| (name.into(), value)).collect() }
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Sorted so that dumps are stable across runs.
        let mut fields: Vec<_> = self.fields().collect();
        fields.sort_unstable_by_key(|(name, _)| *name);

        write!(f, "{{")?;
        for (i, (name, value)) in fields.into_iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        write!(f, "}}")
    }
}
