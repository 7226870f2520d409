use std::collections::BTreeMap;

use parking_lot::RwLock;
use tracing::debug;

use super::{
    HasFilter, IndexDocument, SearchHit, SearchHits, SearchIndex, SearchRequest, SearchTarget,
};
use crate::error::Result;
use crate::model::{ElementId, ExtendedDataCell, ExtendedDataRowId, PropValue};
use crate::security::{Authorizations, Visibility};

#[derive(Default)]
struct Documents {
    elements: BTreeMap<ElementId, IndexDocument>,
    rows: BTreeMap<ExtendedDataRowId, Vec<ExtendedDataCell>>,
}

/// In-process [`SearchIndex`] that evaluates visibility itself.
#[derive(Default)]
pub struct MemorySearchIndex {
    docs: RwLock<Documents>,
}

impl MemorySearchIndex {
    /// Empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed elements.
    pub fn element_count(&self) -> usize {
        self.docs.read().elements.len()
    }

    /// Number of indexed extended-data rows.
    pub fn extended_data_count(&self) -> usize {
        self.docs.read().rows.len()
    }
}

fn hidden_for(hidden: &[Visibility], auths: &Authorizations) -> bool {
    hidden.iter().any(|v| v.evaluate(auths))
}

fn words(value: &PropValue) -> Vec<String> {
    match value {
        PropValue::Str(s) => s
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect(),
        _ => Vec::new(),
    }
}

/// Checks text and filters against `(name, value)` pairs the caller may read.
fn matches(request: &SearchRequest, fields: &[(&str, &PropValue)]) -> bool {
    let text = request.text.trim();
    if !text.is_empty() && text != "*" {
        let indexed: Vec<String> = fields.iter().flat_map(|(_, v)| words(v)).collect();
        let all_terms = text
            .split_whitespace()
            .map(str::to_lowercase)
            .all(|term| indexed.iter().any(|w| w == &term));
        if !all_terms {
            return false;
        }
    }
    request.filters.iter().all(|filter| match filter {
        HasFilter::Equal(name, value) => fields
            .iter()
            .any(|(n, v)| *n == name.as_str() && *v == value),
        HasFilter::Exists(name) => fields.iter().any(|(n, _)| *n == name.as_str()),
        HasFilter::Missing(name) => !fields.iter().any(|(n, _)| *n == name.as_str()),
    })
}

fn page(mut hits: Vec<SearchHit>, request: &SearchRequest) -> SearchHits {
    let total_hits = hits.len() as u64;
    hits = hits
        .into_iter()
        .skip(request.skip)
        .take(request.limit)
        .collect();
    SearchHits { hits, total_hits }
}

impl SearchIndex for MemorySearchIndex {
    fn add_element(&self, document: IndexDocument) -> Result<()> {
        self.docs
            .write()
            .elements
            .insert(document.id.clone(), document);
        Ok(())
    }

    fn remove_element(&self, id: &ElementId) -> Result<()> {
        let mut docs = self.docs.write();
        docs.elements.remove(id);
        docs.rows
            .retain(|row, _| !(row.element_kind == id.kind && row.element_id == id.id));
        Ok(())
    }

    fn add_extended_data(&self, row: &ExtendedDataRowId, cells: &[ExtendedDataCell]) -> Result<()> {
        let mut docs = self.docs.write();
        if cells.is_empty() {
            docs.rows.remove(row);
        } else {
            docs.rows.insert(row.clone(), cells.to_vec());
        }
        Ok(())
    }

    fn remove_extended_data(&self, row: &ExtendedDataRowId) -> Result<()> {
        self.docs.write().rows.remove(row);
        Ok(())
    }

    fn search(&self, request: &SearchRequest, auths: &Authorizations) -> Result<SearchHits> {
        let docs = self.docs.read();
        let hits: Vec<SearchHit> = match request.target {
            SearchTarget::ExtendedData => docs
                .rows
                .iter()
                .filter_map(|(id, cells)| {
                    let fields: Vec<(&str, &PropValue)> = cells
                        .iter()
                        .filter(|c| c.visibility.evaluate(auths))
                        .map(|c| (c.name.as_str(), &c.value))
                        .collect();
                    (!fields.is_empty() && matches(request, &fields))
                        .then(|| SearchHit::ExtendedDataRow(id.clone()))
                })
                .collect(),
            SearchTarget::Elements | SearchTarget::Kind(_) => docs
                .elements
                .values()
                .filter(|doc| match request.target {
                    SearchTarget::Kind(kind) => doc.id.kind == kind,
                    _ => true,
                })
                .filter(|doc| doc.visibility.evaluate(auths))
                .filter(|doc| request.include_hidden || !hidden_for(&doc.hidden_visibilities, auths))
                .filter_map(|doc| {
                    let fields: Vec<(&str, &PropValue)> = doc
                        .properties
                        .iter()
                        .filter(|p| p.visibility.evaluate(auths))
                        .filter(|p| {
                            request.include_hidden || !hidden_for(&p.hidden_visibilities, auths)
                        })
                        .map(|p| (p.name.as_str(), &p.value))
                        .collect();
                    matches(request, &fields).then(|| SearchHit::Element(doc.id.clone()))
                })
                .collect(),
        };
        debug!(text = %request.text, total = hits.len(), "search.memory.query");
        Ok(page(hits, request))
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn drop_index(&self) -> Result<()> {
        *self.docs.write() = Documents::default();
        Ok(())
    }

    fn truncate(&self) -> Result<()> {
        let mut docs = self.docs.write();
        docs.elements.clear();
        docs.rows.clear();
        Ok(())
    }
}
