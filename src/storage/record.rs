use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{
    Direction, ElementId, ElementKind, HistoricalPropertyValue, Metadata, PropValue, PropertyKey,
};
use crate::security::{Authorizations, Visibility};

/// Values stored in a map keyed by something derivable from the value itself.
///
/// Lets maps with structured keys serialize as plain sequences.
pub(crate) trait Keyed {
    type Key: Ord;
    fn map_key(&self) -> Self::Key;
}

mod keyed_seq {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Keyed;

    pub fn serialize<S, V>(map: &BTreeMap<V::Key, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        V: Keyed + Serialize,
    {
        serializer.collect_seq(map.values())
    }

    pub fn deserialize<'de, D, V>(deserializer: D) -> Result<BTreeMap<V::Key, V>, D::Error>
    where
        D: Deserializer<'de>,
        V: Keyed + Deserialize<'de>,
    {
        let items = Vec::<V>::deserialize(deserializer)?;
        Ok(items.into_iter().map(|v| (v.map_key(), v)).collect())
    }
}

/// Hide or show toggle for one exact visibility.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiddenMark {
    /// Visibility the toggle applies to.
    pub visibility: Visibility,
    /// Time of the toggle.
    pub timestamp: i64,
    /// `true` for hide, `false` for show.
    pub hidden: bool,
}

/// Timeline of hide/show toggles; never consulted for history entries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiddenLog {
    marks: Vec<HiddenMark>,
}

impl HiddenLog {
    /// Hidden state for `visibility` as of `as_of`.
    pub fn is_hidden_for_visibility(&self, visibility: &Visibility, as_of: i64) -> bool {
        let mut state: Option<&HiddenMark> = None;
        for mark in &self.marks {
            if &mark.visibility == visibility
                && mark.timestamp <= as_of
                && state.map_or(true, |s| mark.timestamp >= s.timestamp)
            {
                state = Some(mark);
            }
        }
        state.is_some_and(|m| m.hidden)
    }

    /// Records a toggle; returns `false` when the latest state already matches.
    pub fn set(&mut self, visibility: &Visibility, hidden: bool, timestamp: i64) -> bool {
        if self.is_hidden_for_visibility(visibility, i64::MAX) == hidden {
            return false;
        }
        self.marks.push(HiddenMark {
            visibility: visibility.clone(),
            timestamp,
            hidden,
        });
        true
    }

    /// Visibilities hidden as of `as_of`.
    pub fn hidden_visibilities(&self, as_of: i64) -> Vec<Visibility> {
        let mut out: Vec<Visibility> = Vec::new();
        for mark in &self.marks {
            if out.contains(&mark.visibility) {
                continue;
            }
            if self.is_hidden_for_visibility(&mark.visibility, as_of) {
                out.push(mark.visibility.clone());
            }
        }
        out.sort();
        out
    }

    /// Returns `true` when hidden for a visibility `auths` satisfies, as of `as_of`.
    pub fn is_hidden_for(&self, auths: &Authorizations, as_of: i64) -> bool {
        self.hidden_visibilities(as_of)
            .iter()
            .any(|v| v.evaluate(auths))
    }

    /// Returns `true` when no toggle was ever recorded.
    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }
}

/// Live state of one property identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredProperty {
    /// Identity.
    pub key: PropertyKey,
    /// Current value.
    pub value: PropValue,
    /// Current metadata.
    pub metadata: Metadata,
    /// Time of the latest value write.
    pub timestamp: i64,
}

impl Keyed for StoredProperty {
    type Key = PropertyKey;

    fn map_key(&self) -> PropertyKey {
        self.key.clone()
    }
}

/// Hide/show timeline of one property identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyHiddenLog {
    /// Identity.
    pub key: PropertyKey,
    /// Toggles.
    pub log: HiddenLog,
}

impl Keyed for PropertyHiddenLog {
    type Key = PropertyKey;

    fn map_key(&self) -> PropertyKey {
        self.key.clone()
    }
}

/// Adjacency entry kept on a vertex for every edge touching it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRef {
    /// `Out` when the vertex is the edge's out vertex, `In` otherwise.
    pub direction: Direction,
    /// Edge id.
    pub edge_id: String,
    /// Opposite endpoint.
    pub other_vertex_id: String,
}

impl Keyed for EdgeRef {
    type Key = (Direction, String);

    fn map_key(&self) -> (Direction, String) {
        (self.direction, self.edge_id.clone())
    }
}

/// Endpoints of an edge; immutable after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeEndpoints {
    /// Vertex the edge leaves.
    pub out_vertex_id: String,
    /// Vertex the edge arrives at.
    pub in_vertex_id: String,
}

/// One element-level state change: creation, visibility or type change, soft delete.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementVersion {
    /// Time of the change.
    pub timestamp: i64,
    /// Visibility from this point on.
    pub visibility: Visibility,
    /// Concept type for vertices, label for edges.
    pub type_name: String,
    /// Marks a soft delete.
    pub deleted: bool,
}

/// Borrowed element-level state at a point in time.
#[derive(Clone, Copy, Debug)]
pub struct ElementState<'a> {
    /// Visibility at that time.
    pub visibility: &'a Visibility,
    /// Concept type or label at that time.
    pub type_name: &'a str,
    /// Time of the latest element-level change at or before that time.
    pub timestamp: i64,
}

/// Everything the store keeps for one element.
///
/// Records are immutable once published; writers clone, modify and swap.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    /// Identity.
    pub id: ElementId,
    /// Current visibility.
    pub visibility: Visibility,
    /// Current concept type (vertex) or label (edge).
    pub type_name: String,
    /// Edge endpoints; `None` for vertices.
    pub endpoints: Option<EdgeEndpoints>,
    /// Time of the latest element-level change.
    pub timestamp: i64,
    /// Time of the soft delete while the element is tombstoned.
    pub soft_deleted_at: Option<i64>,
    /// Element-level timeline, append-only.
    pub versions: Vec<ElementVersion>,
    /// Live properties.
    #[serde(with = "keyed_seq")]
    pub properties: BTreeMap<PropertyKey, StoredProperty>,
    /// Property history, append-only.
    pub history: Vec<HistoricalPropertyValue>,
    /// Element hide/show timeline.
    pub hidden: HiddenLog,
    /// Property hide/show timelines.
    #[serde(with = "keyed_seq")]
    pub property_hidden: BTreeMap<PropertyKey, PropertyHiddenLog>,
    /// Adjacency (vertices only); kept for soft-deleted edges until hard delete.
    #[serde(with = "keyed_seq")]
    pub edge_refs: BTreeMap<(Direction, String), EdgeRef>,
}

impl ElementRecord {
    /// Fresh vertex record.
    pub fn new_vertex(id: &str, visibility: Visibility, concept_type: &str, timestamp: i64) -> Self {
        Self::new(ElementId::vertex(id), visibility, concept_type, None, timestamp)
    }

    /// Fresh edge record.
    pub fn new_edge(
        id: &str,
        out_vertex_id: &str,
        in_vertex_id: &str,
        label: &str,
        visibility: Visibility,
        timestamp: i64,
    ) -> Self {
        Self::new(
            ElementId::edge(id),
            visibility,
            label,
            Some(EdgeEndpoints {
                out_vertex_id: out_vertex_id.to_owned(),
                in_vertex_id: in_vertex_id.to_owned(),
            }),
            timestamp,
        )
    }

    fn new(
        id: ElementId,
        visibility: Visibility,
        type_name: &str,
        endpoints: Option<EdgeEndpoints>,
        timestamp: i64,
    ) -> Self {
        Self {
            id,
            versions: vec![ElementVersion {
                timestamp,
                visibility: visibility.clone(),
                type_name: type_name.to_owned(),
                deleted: false,
            }],
            visibility,
            type_name: type_name.to_owned(),
            endpoints,
            timestamp,
            soft_deleted_at: None,
            properties: BTreeMap::new(),
            history: Vec::new(),
            hidden: HiddenLog::default(),
            property_hidden: BTreeMap::new(),
            edge_refs: BTreeMap::new(),
        }
    }

    /// Element kind.
    pub fn kind(&self) -> ElementKind {
        self.id.kind
    }

    /// Returns `true` unless the element is soft-deleted.
    pub fn is_live(&self) -> bool {
        self.soft_deleted_at.is_none()
    }

    /// Records an element-level change on the timeline and in the live fields.
    pub fn push_version(&mut self, visibility: Visibility, type_name: String, deleted: bool, timestamp: i64) {
        self.visibility = visibility.clone();
        self.type_name = type_name.clone();
        self.timestamp = timestamp;
        self.soft_deleted_at = deleted.then_some(timestamp);
        self.versions.push(ElementVersion {
            timestamp,
            visibility,
            type_name,
            deleted,
        });
    }

    /// Shows everything hidden on the element and its properties again, as of `timestamp`.
    pub fn clear_overlays(&mut self, timestamp: i64) {
        for visibility in self.hidden.hidden_visibilities(i64::MAX) {
            self.hidden.set(&visibility, false, timestamp);
        }
        for property in self.property_hidden.values_mut() {
            for visibility in property.log.hidden_visibilities(i64::MAX) {
                property.log.set(&visibility, false, timestamp);
            }
        }
    }

    /// Element-level state now (`None`) or as of a timestamp; `None` when absent or deleted.
    pub fn state_at(&self, as_of: Option<i64>) -> Option<ElementState<'_>> {
        match as_of {
            None => self.is_live().then_some(ElementState {
                visibility: &self.visibility,
                type_name: &self.type_name,
                timestamp: self.timestamp,
            }),
            Some(t) => {
                let mut latest: Option<&ElementVersion> = None;
                for version in &self.versions {
                    if version.timestamp <= t
                        && latest.map_or(true, |l| version.timestamp >= l.timestamp)
                    {
                        latest = Some(version);
                    }
                }
                let version = latest?;
                (!version.deleted).then_some(ElementState {
                    visibility: &version.visibility,
                    type_name: &version.type_name,
                    timestamp: version.timestamp,
                })
            }
        }
    }

    /// Every visibility the element has ever had.
    pub fn ever_visible_to(&self, auths: &Authorizations) -> bool {
        self.versions.iter().any(|v| v.visibility.evaluate(auths))
    }

    /// Live properties now, or properties reconstructed from history as of a timestamp.
    pub fn properties_at(&self, as_of: Option<i64>) -> Vec<StoredProperty> {
        let Some(t) = as_of else {
            return self.properties.values().cloned().collect();
        };
        let mut latest: BTreeMap<PropertyKey, &HistoricalPropertyValue> = BTreeMap::new();
        for entry in &self.history {
            if entry.timestamp > t {
                continue;
            }
            let key = entry.property_key();
            match latest.get(&key) {
                Some(prev) if prev.timestamp > entry.timestamp => {}
                _ => {
                    latest.insert(key, entry);
                }
            }
        }
        latest
            .into_iter()
            .filter_map(|(key, entry)| {
                if entry.is_deleted {
                    return None;
                }
                // Metadata is not versioned: the write still live carries the current metadata.
                let metadata = match self.properties.get(&key) {
                    Some(live)
                        if live.timestamp == entry.timestamp
                            && entry.value.as_ref() == Some(&live.value) =>
                    {
                        live.metadata.clone()
                    }
                    _ => entry.metadata.clone(),
                };
                entry.value.clone().map(|value| StoredProperty {
                    key,
                    value,
                    metadata,
                    timestamp: entry.timestamp,
                })
            })
            .collect()
    }

    /// Hidden visibilities of a property as of `as_of`.
    pub fn property_hidden_visibilities(&self, key: &PropertyKey, as_of: i64) -> Vec<Visibility> {
        self.property_hidden
            .get(key)
            .map(|p| p.log.hidden_visibilities(as_of))
            .unwrap_or_default()
    }

    /// Mutable hide/show timeline for a property, created on demand.
    pub fn property_hidden_log_mut(&mut self, key: &PropertyKey) -> &mut HiddenLog {
        &mut self
            .property_hidden
            .entry(key.clone())
            .or_insert_with(|| PropertyHiddenLog {
                key: key.clone(),
                log: HiddenLog::default(),
            })
            .log
    }

    /// Adds an adjacency entry.
    pub fn add_edge_ref(&mut self, direction: Direction, edge_id: &str, other_vertex_id: &str) {
        let edge_ref = EdgeRef {
            direction,
            edge_id: edge_id.to_owned(),
            other_vertex_id: other_vertex_id.to_owned(),
        };
        self.edge_refs.insert(edge_ref.map_key(), edge_ref);
    }

    /// Removes every adjacency entry for an edge.
    pub fn remove_edge_refs(&mut self, edge_id: &str) -> bool {
        let before = self.edge_refs.len();
        self.edge_refs.retain(|(_, id), _| id != edge_id);
        before != self.edge_refs.len()
    }
}
