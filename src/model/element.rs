use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use super::{Direction, ElementId, FetchHints, PropValue, Property};
use crate::error::{GraphError, Result};
use crate::security::{Authorizations, Visibility};

/// Orders properties by name, then the byte-wise string form of the value,
/// then key and visibility.
pub(crate) fn sort_properties(props: &mut [Property]) {
    props.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.value.cmp_sort_bytes(&b.value))
            .then_with(|| a.key.cmp(&b.key))
            .then_with(|| a.visibility.cmp(&b.visibility))
    });
}

/// State shared by vertices and edges as materialized for one caller.
#[derive(Clone, Debug)]
pub struct ElementBase {
    pub(crate) id: ElementId,
    pub(crate) visibility: Visibility,
    pub(crate) timestamp: i64,
    pub(crate) hints: Arc<FetchHints>,
    pub(crate) properties: Vec<Property>,
    pub(crate) hidden_visibilities: Vec<Visibility>,
    pub(crate) extended_tables: Vec<String>,
}

/// Read accessors common to [`Vertex`] and [`Edge`].
///
/// Property and extended-data accessors fail with
/// [`GraphError::FetchHintViolation`] when the hints used for the read did not
/// request the data.
pub trait GraphElement {
    /// Shared element state.
    fn base(&self) -> &ElementBase;

    /// Element id.
    fn id(&self) -> &str {
        &self.base().id.id
    }

    /// Element identity (kind + id).
    fn element_id(&self) -> &ElementId {
        &self.base().id
    }

    /// Element visibility.
    fn visibility(&self) -> &Visibility {
        &self.base().visibility
    }

    /// Time of the latest element-level change.
    fn timestamp(&self) -> i64 {
        self.base().timestamp
    }

    /// Hints the element was read with.
    fn fetch_hints(&self) -> &FetchHints {
        &self.base().hints
    }

    /// Every materialized property.
    fn properties(&self) -> Result<&[Property]> {
        if !self.base().hints.includes_properties() {
            return Err(GraphError::FetchHintViolation("properties"));
        }
        Ok(&self.base().properties)
    }

    /// Properties named `name`, in canonical value order.
    fn properties_named(&self, name: &str) -> Result<Vec<&Property>> {
        if !self.base().hints.includes_property(name) {
            return Err(GraphError::FetchHintViolation("the requested property name"));
        }
        Ok(self
            .base()
            .properties
            .iter()
            .filter(|p| p.name == name)
            .collect())
    }

    /// First property named `name`.
    fn property(&self, name: &str) -> Result<Option<&Property>> {
        Ok(self.properties_named(name)?.into_iter().next())
    }

    /// Property with an exact key and name, optionally pinned to a visibility.
    fn property_with_key(
        &self,
        key: &str,
        name: &str,
        visibility: Option<&Visibility>,
    ) -> Result<Option<&Property>> {
        Ok(self
            .properties_named(name)?
            .into_iter()
            .find(|p| p.key == key && visibility.map_or(true, |v| &p.visibility == v)))
    }

    /// Value of the first property named `name`.
    fn property_value(&self, name: &str) -> Result<Option<&PropValue>> {
        self.property_value_at(name, 0)
    }

    /// Value at position `index` in the canonical ordering of properties named `name`.
    fn property_value_at(&self, name: &str, index: usize) -> Result<Option<&PropValue>> {
        Ok(self
            .properties_named(name)?
            .into_iter()
            .nth(index)
            .map(|p| &p.value))
    }

    /// Values of every property named `name`, in canonical order.
    fn property_values(&self, name: &str) -> Result<Vec<&PropValue>> {
        Ok(self
            .properties_named(name)?
            .into_iter()
            .map(|p| &p.value)
            .collect())
    }

    /// Visibilities the element has been hidden for.
    fn hidden_visibilities(&self) -> &[Visibility] {
        &self.base().hidden_visibilities
    }

    /// Returns `true` when hidden for a visibility `auths` satisfies.
    fn is_hidden(&self, auths: &Authorizations) -> bool {
        self.base()
            .hidden_visibilities
            .iter()
            .any(|v| v.evaluate(auths))
    }

    /// Names of the extended-data tables holding readable rows for this element.
    fn extended_data_table_names(&self) -> Result<&[String]> {
        if !self.base().hints.includes_extended_data_table_names() {
            return Err(GraphError::FetchHintViolation("extended data table names"));
        }
        Ok(&self.base().extended_tables)
    }
}

/// Edge reference materialized on a vertex.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgeInfo {
    pub(crate) edge_id: Option<String>,
    pub(crate) label: String,
    pub(crate) vertex_id: Option<String>,
    pub(crate) direction: Direction,
}

impl EdgeInfo {
    /// Edge id; requires edge ids in the fetch hints.
    pub fn edge_id(&self) -> Result<&str> {
        self.edge_id
            .as_deref()
            .ok_or(GraphError::FetchHintViolation("edge ids"))
    }

    /// Opposite vertex id; requires edge vertex ids in the fetch hints.
    pub fn vertex_id(&self) -> Result<&str> {
        self.vertex_id
            .as_deref()
            .ok_or(GraphError::FetchHintViolation("edge vertex ids"))
    }

    /// Edge label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Direction relative to the owning vertex (`Out` or `In`).
    pub fn direction(&self) -> Direction {
        self.direction
    }
}

/// A vertex as materialized for one caller.
#[derive(Clone, Debug)]
pub struct Vertex {
    pub(crate) base: ElementBase,
    pub(crate) concept_type: String,
    pub(crate) out_refs: Option<Vec<EdgeInfo>>,
    pub(crate) in_refs: Option<Vec<EdgeInfo>>,
}

impl GraphElement for Vertex {
    fn base(&self) -> &ElementBase {
        &self.base
    }
}

impl Vertex {
    /// Concept type of the vertex.
    pub fn concept_type(&self) -> &str {
        &self.concept_type
    }

    /// Edge references in `direction`.
    pub fn edge_infos(&self, direction: Direction) -> Result<Vec<&EdgeInfo>> {
        let mut out = Vec::new();
        if direction.covers(Direction::Out) {
            let refs = self
                .out_refs
                .as_ref()
                .ok_or(GraphError::FetchHintViolation("outgoing edge references"))?;
            out.extend(refs.iter());
        }
        if direction.covers(Direction::In) {
            let refs = self
                .in_refs
                .as_ref()
                .ok_or(GraphError::FetchHintViolation("incoming edge references"))?;
            out.extend(refs.iter());
        }
        Ok(out)
    }

    /// Distinct ids of readable edges in `direction`.
    pub fn edge_ids(&self, direction: Direction) -> Result<Vec<&str>> {
        self.edge_ids_matching(direction, |_| true)
    }

    /// Distinct ids of readable edges in `direction` whose label is in `labels`.
    pub fn edge_ids_with_labels(&self, direction: Direction, labels: &[&str]) -> Result<Vec<&str>> {
        self.edge_ids_matching(direction, |info| labels.contains(&info.label.as_str()))
    }

    fn edge_ids_matching(
        &self,
        direction: Direction,
        keep: impl Fn(&EdgeInfo) -> bool,
    ) -> Result<Vec<&str>> {
        if !self.base.hints.includes_edge_ids() {
            return Err(GraphError::FetchHintViolation("edge ids"));
        }
        let mut seen = BTreeSet::new();
        let mut ids = Vec::new();
        for info in self.edge_infos(direction)? {
            if !keep(info) {
                continue;
            }
            let id = info.edge_id()?;
            if seen.insert(id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Opposite vertex ids of readable edges in `direction`, one per edge.
    pub fn vertex_ids(&self, direction: Direction) -> Result<Vec<&str>> {
        if !self.base.hints.includes_edge_vertex_ids() {
            return Err(GraphError::FetchHintViolation("edge vertex ids"));
        }
        self.edge_infos(direction)?
            .into_iter()
            .map(EdgeInfo::vertex_id)
            .collect()
    }

    /// Number of readable edge references in `direction`.
    pub fn edge_count(&self, direction: Direction) -> Result<usize> {
        Ok(self.edge_infos(direction)?.len())
    }

    /// Distinct labels of readable edges in `direction`.
    pub fn edge_labels(&self, direction: Direction) -> Result<BTreeSet<&str>> {
        Ok(self
            .edge_infos(direction)?
            .into_iter()
            .map(|info| info.label.as_str())
            .collect())
    }
}

/// An edge as materialized for one caller.
#[derive(Clone, Debug)]
pub struct Edge {
    pub(crate) base: ElementBase,
    pub(crate) out_vertex_id: String,
    pub(crate) in_vertex_id: String,
    pub(crate) label: String,
}

impl GraphElement for Edge {
    fn base(&self) -> &ElementBase {
        &self.base
    }
}

impl Edge {
    /// Edge label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Id of the vertex the edge leaves.
    pub fn out_vertex_id(&self) -> &str {
        &self.out_vertex_id
    }

    /// Id of the vertex the edge arrives at.
    pub fn in_vertex_id(&self) -> &str {
        &self.in_vertex_id
    }

    /// Endpoint on the given side; `Both` is rejected.
    pub fn vertex_id(&self, direction: Direction) -> Result<&str> {
        match direction {
            Direction::Out => Ok(&self.out_vertex_id),
            Direction::In => Ok(&self.in_vertex_id),
            Direction::Both => Err(GraphError::InvalidArgument(
                "an edge endpoint must be Out or In".into(),
            )),
        }
    }

    /// Endpoint opposite to `vertex_id`, if the edge touches it.
    pub fn other_vertex_id(&self, vertex_id: &str) -> Option<&str> {
        if self.out_vertex_id == vertex_id {
            Some(&self.in_vertex_id)
        } else if self.in_vertex_id == vertex_id {
            Some(&self.out_vertex_id)
        } else {
            None
        }
    }
}

impl From<&Edge> for RelatedEdge {
    fn from(edge: &Edge) -> Self {
        RelatedEdge {
            edge_id: edge.base.id.id.clone(),
            label: edge.label.clone(),
            out_vertex_id: edge.out_vertex_id.clone(),
            in_vertex_id: edge.in_vertex_id.clone(),
        }
    }
}

/// Property-free summary of an edge.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelatedEdge {
    /// Edge id.
    pub edge_id: String,
    /// Edge label.
    pub label: String,
    /// Vertex the edge leaves.
    pub out_vertex_id: String,
    /// Vertex the edge arrives at.
    pub in_vertex_id: String,
}

/// Ordered, non-repeating sequence of vertex ids.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path {
    vertex_ids: Vec<String>,
}

impl Path {
    pub(crate) fn new(vertex_ids: Vec<String>) -> Self {
        Self { vertex_ids }
    }

    /// Vertex ids from source to target.
    pub fn vertex_ids(&self) -> &[String] {
        &self.vertex_ids
    }

    /// Number of edges traversed.
    pub fn hops(&self) -> usize {
        self.vertex_ids.len().saturating_sub(1)
    }

    /// Number of vertices on the path.
    pub fn len(&self) -> usize {
        self.vertex_ids.len()
    }

    /// Returns `true` for an empty path.
    pub fn is_empty(&self) -> bool {
        self.vertex_ids.is_empty()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.vertex_ids.join(", "))
    }
}
