//! Typed, prefixed unique identifiers.
//!
//! Every aggregate in the system (`Task`, `TestCase`, `Report`) is
//! identified by a string of the form `<PREFIX><uuid-v4-simple>`, e.g.
//! `TASK3fa85f6457174562b3fc2c963f66afa6`. The prefix is not just
//! decoration — callers use it to tell at a glance which table an id
//! from a log line or an error message belongs to.

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Marker trait implemented by zero-sized tag types, one per aggregate.
pub trait IdPrefix {
    /// The short textual prefix, e.g. `"TASK"`, `"TC"`, `"RPT"`.
    const PREFIX: &'static str;
}

/// Task identifiers are prefixed `TASK`.
#[derive(Debug, Clone, Copy)]
pub struct TaskTag;
impl IdPrefix for TaskTag {
    const PREFIX: &'static str = "TASK";
}

/// Test case identifiers are prefixed `TC`.
#[derive(Debug, Clone, Copy)]
pub struct CaseTag;
impl IdPrefix for CaseTag {
    const PREFIX: &'static str = "TC";
}

/// Report identifiers are prefixed `RPT`.
#[derive(Debug, Clone, Copy)]
pub struct ReportTag;
impl IdPrefix for ReportTag {
    const PREFIX: &'static str = "RPT";
}

/// Document identifiers are prefixed `DOC`.
#[derive(Debug, Clone, Copy)]
pub struct DocumentTag;
impl IdPrefix for DocumentTag {
    const PREFIX: &'static str = "DOC";
}

/// A unique identifier typed by its owning aggregate.
///
/// `Id<T>` wraps a plain `String` so it serializes as a bare string
/// (same wire shape as the Python source's ids) while still preventing
/// a `TestCase` id from being passed where a `Task` id is expected.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T> {
    value: String,
    #[serde(skip)]
    _tag: PhantomData<T>,
}

impl<T: IdPrefix> Id<T> {
    /// Generate a fresh id with the aggregate's prefix.
    pub fn new() -> Self {
        let uuid = Uuid::new_v4().simple().to_string();
        Self {
            value: format!("{}{}", T::PREFIX, uuid),
            _tag: PhantomData,
        }
    }
}

impl<T> Id<T> {
    /// Wrap an existing string as an id, e.g. when reading a row back
    /// from the store. Does not re-validate the prefix: a row in the
    /// database is assumed to have been written by [`Id::new`].
    pub fn from_raw(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _tag: PhantomData,
        }
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Consume the id, returning the underlying string.
    pub fn into_string(self) -> String {
        self.value
    }
}

impl<T: IdPrefix> Default for Id<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Id").field(&self.value).finish()
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}
impl<T> Eq for Id<T> {}

impl<T> std::hash::Hash for Id<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> From<Id<T>> for String {
    fn from(id: Id<T>) -> Self {
        id.value
    }
}

/// Task identifier.
pub type TaskId = Id<TaskTag>;
/// Test case identifier.
pub type CaseId = Id<CaseTag>;
/// Report identifier.
pub type ReportId = Id<ReportTag>;
/// Uploaded document identifier.
pub type DocumentId = Id<DocumentTag>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_prefixed_ids() {
        let id = TaskId::new();
        assert!(id.as_str().starts_with("TASK"));
        assert_eq!(id.as_str().len(), "TASK".len() + 32);
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(TaskId::new(), TaskId::new());
    }

    #[test]
    fn round_trips_through_raw_string() {
        let original = CaseId::new();
        let raw = original.as_str().to_string();
        let restored = CaseId::from_raw(raw.clone());
        assert_eq!(restored.as_str(), raw);
        assert_eq!(original, restored);
    }
}
