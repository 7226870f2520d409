//! Element, property and extended-data model plus fetch hints.

mod element;
mod extended;
mod fetch_hints;
mod history;
mod property;
mod value;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use element::{Edge, EdgeInfo, ElementBase, GraphElement, Path, RelatedEdge, Vertex};
pub(crate) use element::sort_properties;
pub use extended::{ExtendedDataCell, ExtendedDataRow, ExtendedDataRowId, IdRange};
pub use fetch_hints::{FetchHints, FetchHintsBuilder};
pub use history::{HistoricalPropertyValue, HistoryFilter};
pub use property::{Metadata, MetadataEntry, Property, PropertyKey, DEFAULT_KEY};
pub use value::PropValue;

/// Kind of graph element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    /// A vertex.
    Vertex,
    /// An edge.
    Edge,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Vertex => f.write_str("vertex"),
            ElementKind::Edge => f.write_str("edge"),
        }
    }
}

/// Identity of an element: its kind plus id.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementId {
    /// Vertex or edge.
    pub kind: ElementKind,
    /// Caller-visible id.
    pub id: String,
}

impl ElementId {
    /// Identity of a vertex.
    pub fn vertex(id: impl Into<String>) -> Self {
        Self {
            kind: ElementKind::Vertex,
            id: id.into(),
        }
    }

    /// Identity of an edge.
    pub fn edge(id: impl Into<String>) -> Self {
        Self {
            kind: ElementKind::Edge,
            id: id.into(),
        }
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Edge direction relative to a vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Edges leaving the vertex.
    Out,
    /// Edges arriving at the vertex.
    In,
    /// Both directions.
    Both,
}

impl Direction {
    /// Returns `true` when `self` covers `other` (`Both` covers everything).
    pub fn covers(self, other: Direction) -> bool {
        self == Direction::Both || self == other
    }
}
