//! Search index contract, a no-op default and an in-memory reference index.
//!
//! The graph pushes committed state to the index as denormalized
//! [`IndexDocument`]s. An index must apply the same visibility and hidden
//! rules as the graph to everything it returns.

mod memory;
mod query;

pub use memory::MemorySearchIndex;
pub use query::{GraphQuery, QueryResults};

use crate::error::Result;
use crate::model::{ElementId, ElementKind, ExtendedDataCell, ExtendedDataRowId, PropValue};
use crate::security::{Authorizations, Visibility};
use crate::storage::ElementRecord;

/// One property as the index sees it.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexedProperty {
    /// Property name.
    pub name: String,
    /// Multivalue key.
    pub key: String,
    /// Current value.
    pub value: PropValue,
    /// Property visibility.
    pub visibility: Visibility,
    /// Visibilities the property is hidden for.
    pub hidden_visibilities: Vec<Visibility>,
}

/// Denormalized live state of one element.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexDocument {
    /// Element identity.
    pub id: ElementId,
    /// Element visibility.
    pub visibility: Visibility,
    /// Visibilities the element is hidden for.
    pub hidden_visibilities: Vec<Visibility>,
    /// Concept type (vertex) or label (edge).
    pub type_name: String,
    /// Live properties.
    pub properties: Vec<IndexedProperty>,
}

impl IndexDocument {
    pub(crate) fn from_record(record: &ElementRecord) -> Self {
        Self {
            id: record.id.clone(),
            visibility: record.visibility.clone(),
            hidden_visibilities: record.hidden.hidden_visibilities(i64::MAX),
            type_name: record.type_name.clone(),
            properties: record
                .properties
                .values()
                .map(|p| IndexedProperty {
                    name: p.key.name.clone(),
                    key: p.key.key.clone(),
                    value: p.value.clone(),
                    visibility: p.key.visibility.clone(),
                    hidden_visibilities: record.property_hidden_visibilities(&p.key, i64::MAX),
                })
                .collect(),
        }
    }
}

/// What a search returns hits for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SearchTarget {
    /// Vertices and edges.
    #[default]
    Elements,
    /// Only elements of one kind.
    Kind(ElementKind),
    /// Extended-data rows.
    ExtendedData,
}

/// Property predicate applied by the index.
#[derive(Clone, Debug, PartialEq)]
pub enum HasFilter {
    /// Some readable property `name` equals the value.
    Equal(String, PropValue),
    /// A readable property `name` exists.
    Exists(String),
    /// No readable property `name` exists.
    Missing(String),
}

/// Index query.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchRequest {
    /// `*` matches everything; otherwise every whitespace-separated term must
    /// appear, case-insensitively, as a word of some readable string value.
    pub text: String,
    /// Predicates, all of which must hold.
    pub filters: Vec<HasFilter>,
    /// Result kind.
    pub target: SearchTarget,
    /// Whether hidden elements and properties still match.
    pub include_hidden: bool,
    /// Hits to skip.
    pub skip: usize,
    /// Maximum hits to return.
    pub limit: usize,
}

/// Identity of one hit.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SearchHit {
    /// A vertex or edge.
    Element(ElementId),
    /// An extended-data row.
    ExtendedDataRow(ExtendedDataRowId),
}

/// One page of hits plus the caller-visible total.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchHits {
    /// Hits in the requested window.
    pub hits: Vec<SearchHit>,
    /// Total matching hits irrespective of `skip`/`limit`.
    pub total_hits: u64,
}

/// External secondary index fed by the graph after each commit.
pub trait SearchIndex: Send + Sync {
    /// Indexes (or re-indexes) one element.
    fn add_element(&self, document: IndexDocument) -> Result<()>;

    /// Indexes several elements.
    fn add_elements(&self, documents: Vec<IndexDocument>) -> Result<()> {
        for document in documents {
            self.add_element(document)?;
        }
        Ok(())
    }

    /// Removes an element and everything indexed for it.
    fn remove_element(&self, id: &ElementId) -> Result<()>;

    /// Indexes (or re-indexes) one extended-data row with all of its cells.
    fn add_extended_data(&self, row: &ExtendedDataRowId, cells: &[ExtendedDataCell]) -> Result<()>;

    /// Removes an extended-data row.
    fn remove_extended_data(&self, row: &ExtendedDataRowId) -> Result<()>;

    /// Runs a query as `auths`.
    fn search(&self, request: &SearchRequest, auths: &Authorizations) -> Result<SearchHits>;

    /// Makes earlier writes searchable.
    fn flush(&self) -> Result<()>;

    /// Removes the index entirely.
    fn drop_index(&self) -> Result<()>;

    /// Removes every document, keeping the index.
    fn truncate(&self) -> Result<()>;
}

/// Index that stores nothing and finds nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSearchIndex;

impl SearchIndex for NoopSearchIndex {
    fn add_element(&self, _document: IndexDocument) -> Result<()> {
        Ok(())
    }

    fn remove_element(&self, _id: &ElementId) -> Result<()> {
        Ok(())
    }

    fn add_extended_data(&self, _row: &ExtendedDataRowId, _cells: &[ExtendedDataCell]) -> Result<()> {
        Ok(())
    }

    fn remove_extended_data(&self, _row: &ExtendedDataRowId) -> Result<()> {
        Ok(())
    }

    fn search(&self, _request: &SearchRequest, _auths: &Authorizations) -> Result<SearchHits> {
        Ok(SearchHits::default())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn drop_index(&self) -> Result<()> {
        Ok(())
    }

    fn truncate(&self) -> Result<()> {
        Ok(())
    }
}
