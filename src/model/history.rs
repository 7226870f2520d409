use serde::{Deserialize, Serialize};

use super::{Metadata, PropValue, PropertyKey};
use crate::security::Visibility;

/// Immutable record of one value write, visibility move or delete of a property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPropertyValue {
    /// Multivalue key.
    pub key: String,
    /// Property name.
    pub name: String,
    /// Property visibility at the time of the change.
    pub visibility: Visibility,
    /// Value written; `None` for delete markers.
    pub value: Option<PropValue>,
    /// Metadata as it stood when the entry was appended.
    pub metadata: Metadata,
    /// Time of the change.
    pub timestamp: i64,
    /// Marks a delete (hard or soft) of the property identity.
    pub is_deleted: bool,
}

impl HistoricalPropertyValue {
    /// Identity of the property this entry belongs to.
    pub fn property_key(&self) -> PropertyKey {
        PropertyKey::new(self.key.clone(), self.name.clone(), self.visibility.clone())
    }

    pub(crate) fn matches_key(&self, key: &PropertyKey) -> bool {
        self.name == key.name && self.key == key.key && self.visibility == key.visibility
    }
}

/// Narrowing parameters for historical value reads; every field is optional.
#[derive(Clone, Debug, Default)]
pub struct HistoryFilter {
    /// Only entries with this key.
    pub key: Option<String>,
    /// Only entries with this name.
    pub name: Option<String>,
    /// Only entries with this visibility.
    pub visibility: Option<Visibility>,
    /// Inclusive lower bound on the timestamp.
    pub start_time: Option<i64>,
    /// Inclusive upper bound on the timestamp.
    pub end_time: Option<i64>,
}

impl HistoryFilter {
    /// Matches every entry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to one key.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Restricts to one name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Restricts to one visibility.
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Restricts to an inclusive time window.
    pub fn between(mut self, start: Option<i64>, end: Option<i64>) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    pub(crate) fn matches(&self, entry: &HistoricalPropertyValue) -> bool {
        self.key.as_ref().map_or(true, |k| k == &entry.key)
            && self.name.as_ref().map_or(true, |n| n == &entry.name)
            && self
                .visibility
                .as_ref()
                .map_or(true, |v| v == &entry.visibility)
            && self.start_time.map_or(true, |t| entry.timestamp >= t)
            && self.end_time.map_or(true, |t| entry.timestamp <= t)
    }
}
