use crate::error::Result;
use crate::graph::Graph;
use crate::model::{Edge, ElementId, ElementKind, ExtendedDataRow, FetchHints, PropValue, Vertex};
use crate::search::{HasFilter, SearchHit, SearchRequest, SearchTarget};
use crate::security::Authorizations;

/// One page of resolved query results.
#[derive(Clone, Debug)]
pub struct QueryResults<T> {
    /// Items in the requested window that the caller can still read.
    pub items: Vec<T>,
    /// Caller-visible matches irrespective of paging.
    pub total_hits: u64,
}

impl<T> QueryResults<T> {
    /// Number of items on this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` when the page is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> IntoIterator for QueryResults<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Search builder bound to a graph and a caller.
///
/// Hits come from the search index and are re-read through the graph, so
/// anything the graph would not return to the caller is dropped from the page.
#[must_use]
pub struct GraphQuery<'g> {
    graph: &'g Graph,
    auths: Authorizations,
    request: SearchRequest,
    hints: FetchHints,
}

impl<'g> GraphQuery<'g> {
    pub(crate) fn new(graph: &'g Graph, text: &str, auths: Authorizations, limit: usize) -> Self {
        let text = text.trim();
        Self {
            graph,
            auths,
            request: SearchRequest {
                text: if text.is_empty() { "*".into() } else { text.to_owned() },
                filters: Vec::new(),
                target: SearchTarget::Elements,
                include_hidden: false,
                skip: 0,
                limit,
            },
            hints: FetchHints::ALL,
        }
    }

    /// Requires a readable property `name` equal to `value`.
    pub fn has(mut self, name: &str, value: impl Into<PropValue>) -> Self {
        self.request
            .filters
            .push(HasFilter::Equal(name.to_owned(), value.into()));
        self
    }

    /// Requires a readable property `name`.
    pub fn has_property(mut self, name: &str) -> Self {
        self.request.filters.push(HasFilter::Exists(name.to_owned()));
        self
    }

    /// Requires that no readable property `name` exists.
    pub fn has_not_property(mut self, name: &str) -> Self {
        self.request.filters.push(HasFilter::Missing(name.to_owned()));
        self
    }

    /// Skips the first `skip` hits.
    pub fn skip(mut self, skip: usize) -> Self {
        self.request.skip = skip;
        self
    }

    /// Returns at most `limit` hits.
    pub fn limit(mut self, limit: usize) -> Self {
        self.request.limit = limit;
        self
    }

    /// Hints used when resolving hits.
    pub fn fetch_hints(mut self, hints: FetchHints) -> Self {
        self.hints = hints;
        self
    }

    /// Lets hidden elements and properties match. Resolution still follows
    /// the fetch hints.
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.request.include_hidden = include;
        self
    }

    fn run(&self, target: SearchTarget) -> Result<(Vec<SearchHit>, u64)> {
        self.graph.check_authorizations(&self.auths)?;
        let request = SearchRequest {
            target,
            ..self.request.clone()
        };
        let hits = self.graph.search_index().search(&request, &self.auths)?;
        Ok((hits.hits, hits.total_hits))
    }

    /// Matching vertices.
    pub fn vertices(self) -> Result<QueryResults<Vertex>> {
        let (hits, total_hits) = self.run(SearchTarget::Kind(ElementKind::Vertex))?;
        let mut items = Vec::with_capacity(hits.len());
        for hit in hits {
            if let SearchHit::Element(id) = hit {
                if let Some(vertex) = self.graph.get_vertex(&id.id, &self.hints, &self.auths)? {
                    items.push(vertex);
                }
            }
        }
        Ok(QueryResults { items, total_hits })
    }

    /// Matching edges.
    pub fn edges(self) -> Result<QueryResults<Edge>> {
        let (hits, total_hits) = self.run(SearchTarget::Kind(ElementKind::Edge))?;
        let mut items = Vec::with_capacity(hits.len());
        for hit in hits {
            if let SearchHit::Element(id) = hit {
                if let Some(edge) = self.graph.get_edge(&id.id, &self.hints, &self.auths)? {
                    items.push(edge);
                }
            }
        }
        Ok(QueryResults { items, total_hits })
    }

    /// Ids of matching vertices and edges.
    pub fn element_ids(self) -> Result<QueryResults<ElementId>> {
        let (hits, total_hits) = self.run(SearchTarget::Elements)?;
        let mut items = Vec::with_capacity(hits.len());
        for hit in hits {
            let SearchHit::Element(id) = hit else {
                continue;
            };
            let readable = match id.kind {
                ElementKind::Vertex => self
                    .graph
                    .get_vertex(&id.id, &self.hints, &self.auths)?
                    .is_some(),
                ElementKind::Edge => self
                    .graph
                    .get_edge(&id.id, &self.hints, &self.auths)?
                    .is_some(),
            };
            if readable {
                items.push(id);
            }
        }
        Ok(QueryResults { items, total_hits })
    }

    /// Matching extended-data rows.
    pub fn extended_data_rows(self) -> Result<QueryResults<ExtendedDataRow>> {
        let (hits, total_hits) = self.run(SearchTarget::ExtendedData)?;
        let mut items = Vec::with_capacity(hits.len());
        for hit in hits {
            if let SearchHit::ExtendedDataRow(row) = hit {
                if let Some(found) = self.graph.get_extended_data_row(&row, &self.auths)? {
                    items.push(found);
                }
            }
        }
        Ok(QueryResults { items, total_hits })
    }
}
