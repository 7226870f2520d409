use std::fmt;

use serde::{Deserialize, Serialize};

use super::PropValue;
use crate::error::{GraphError, Result};
use crate::security::{Authorizations, Visibility};

/// Key used by `set_property`, which does not take one explicitly.
pub const DEFAULT_KEY: &str = "";

/// Identity of a property within its element: `(name, key, visibility)`.
///
/// Two properties may share a name and key at different visibilities; they are
/// distinct entities.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PropertyKey {
    /// Property name.
    pub name: String,
    /// Multivalue key.
    pub key: String,
    /// Property visibility.
    pub visibility: Visibility,
}

impl PropertyKey {
    /// Builds a property identity.
    pub fn new(key: impl Into<String>, name: impl Into<String>, visibility: Visibility) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            visibility,
        }
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}[{}]", self.name, self.key, self.visibility)
    }
}

/// One metadata value on a property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    /// Metadata key.
    pub key: String,
    /// Metadata value.
    pub value: PropValue,
    /// Metadata visibility.
    pub visibility: Visibility,
}

/// Mapping from `(key, visibility)` to value attached to one property.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    entries: Vec<MetadataEntry>,
}

impl Metadata {
    /// Empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the entry for `(key, visibility)`.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<PropValue>, visibility: Visibility) {
        let key = key.into();
        let value = value.into();
        match self
            .entries
            .binary_search_by(|e| (e.key.as_str(), &e.visibility).cmp(&(key.as_str(), &visibility)))
        {
            Ok(idx) => self.entries[idx].value = value,
            Err(idx) => self.entries.insert(
                idx,
                MetadataEntry {
                    key,
                    value,
                    visibility,
                },
            ),
        }
    }

    /// Builder-style [`Metadata::add`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropValue>, visibility: Visibility) -> Self {
        self.add(key, value, visibility);
        self
    }

    /// Entry for an exact `(key, visibility)`.
    pub fn entry(&self, key: &str, visibility: &Visibility) -> Option<&MetadataEntry> {
        self.entries
            .iter()
            .find(|e| e.key == key && &e.visibility == visibility)
    }

    /// First value stored under `key`, whatever its visibility.
    pub fn value(&self, key: &str) -> Option<&PropValue> {
        self.entries.iter().find(|e| e.key == key).map(|e| &e.value)
    }

    /// Removes the entry for `(key, visibility)`; returns whether one existed.
    pub fn remove(&mut self, key: &str, visibility: &Visibility) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|e| !(e.key == key && &e.visibility == visibility));
        before != self.entries.len()
    }

    /// All entries ordered by key then visibility.
    pub fn entries(&self) -> &[MetadataEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn visible_to(&self, auths: &Authorizations) -> Metadata {
        Metadata {
            entries: self
                .entries
                .iter()
                .filter(|e| e.visibility.evaluate(auths))
                .cloned()
                .collect(),
        }
    }

    pub(crate) fn validate(&self, property: &str) -> Result<()> {
        if let Some(entry) = self.entries.iter().find(|e| e.value.is_null()) {
            return Err(GraphError::InvalidArgument(format!(
                "metadata '{}' on property '{property}' cannot have a null value",
                entry.key
            )));
        }
        Ok(())
    }

    pub(crate) fn visibilities(&self) -> impl Iterator<Item = &Visibility> {
        self.entries.iter().map(|e| &e.visibility)
    }
}

/// Caller-visible property materialized on an element.
#[derive(Clone, Debug, PartialEq)]
pub struct Property {
    pub(crate) key: String,
    pub(crate) name: String,
    pub(crate) value: PropValue,
    pub(crate) visibility: Visibility,
    pub(crate) timestamp: i64,
    pub(crate) metadata: Option<Metadata>,
    pub(crate) hidden_visibilities: Vec<Visibility>,
}

impl Property {
    /// Multivalue key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Property name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value.
    pub fn value(&self) -> &PropValue {
        &self.value
    }

    /// Property visibility.
    pub fn visibility(&self) -> &Visibility {
        &self.visibility
    }

    /// Timestamp of the value write.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Identity of the property.
    pub fn property_key(&self) -> PropertyKey {
        PropertyKey::new(self.key.clone(), self.name.clone(), self.visibility.clone())
    }

    /// Metadata readable by the caller; requires metadata in the fetch hints.
    pub fn metadata(&self) -> Result<&Metadata> {
        self.metadata
            .as_ref()
            .ok_or(GraphError::FetchHintViolation("property metadata"))
    }

    /// Visibilities this property has been hidden for.
    pub fn hidden_visibilities(&self) -> &[Visibility] {
        &self.hidden_visibilities
    }

    /// Returns `true` when hidden for a visibility `auths` satisfies.
    pub fn is_hidden(&self, auths: &Authorizations) -> bool {
        self.hidden_visibilities.iter().any(|v| v.evaluate(auths))
    }
}
