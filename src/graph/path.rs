use std::collections::BTreeSet;
use std::time::Instant;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use super::Graph;
use crate::error::{GraphError, Result};
use crate::model::{Direction, ElementId, Path, RelatedEdge};
use crate::security::Authorizations;
use crate::storage::ElementRecord;

/// Default cap on partial paths held between two BFS levels.
const DEFAULT_MAX_FRONTIER: usize = 100_000;

/// Parameters of a path search between two vertices.
#[derive(Clone, Debug)]
pub struct FindPathOptions {
    source: String,
    target: String,
    max_hops: usize,
    any_path_only: bool,
    labels: Option<Vec<String>>,
    exclude_labels: Vec<String>,
    direction: Direction,
    max_frontier: usize,
}

impl FindPathOptions {
    /// Paths from `source` to `target` of at most `max_hops` edges, following
    /// edges in either direction.
    pub fn new(source: impl Into<String>, target: impl Into<String>, max_hops: usize) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            max_hops,
            any_path_only: false,
            labels: None,
            exclude_labels: Vec::new(),
            direction: Direction::Both,
            max_frontier: DEFAULT_MAX_FRONTIER,
        }
    }

    /// Stop at the first path found.
    pub fn any_path_only(mut self, any: bool) -> Self {
        self.any_path_only = any;
        self
    }

    /// Only traverse edges with one of these labels.
    pub fn labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    /// Never traverse edges with one of these labels.
    pub fn exclude_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Restricts the edge direction followed from each vertex.
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Caps the partial paths carried into the next hop; a search that would
    /// exceed it fails instead of growing without bound.
    pub fn max_frontier(mut self, max_frontier: usize) -> Self {
        self.max_frontier = max_frontier;
        self
    }

    /// Source vertex id.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Target vertex id.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Maximum number of edges on a returned path.
    pub fn max_hops(&self) -> usize {
        self.max_hops
    }

    fn allows_label(&self, label: &str) -> bool {
        if self.exclude_labels.iter().any(|l| l == label) {
            return false;
        }
        self.labels
            .as_ref()
            .map_or(true, |allowed| allowed.iter().any(|l| l == label))
    }
}

/// Readable, not soft-deleted and not hidden from `auths` at `as_of`.
fn traversable(record: &ElementRecord, as_of: Option<i64>, auths: &Authorizations) -> bool {
    let Some(state) = record.state_at(as_of) else {
        return false;
    };
    state.visibility.evaluate(auths)
        && !record
            .hidden
            .is_hidden_for(auths, as_of.unwrap_or(i64::MAX))
}

/// Per-search cache of which vertices can be entered and where they lead.
struct Expansion<'a> {
    graph: &'a Graph,
    options: &'a FindPathOptions,
    auths: &'a Authorizations,
    vertices: FxHashMap<String, bool>,
    neighbours: FxHashMap<String, Vec<String>>,
}

impl<'a> Expansion<'a> {
    fn new(graph: &'a Graph, options: &'a FindPathOptions, auths: &'a Authorizations) -> Self {
        Self {
            graph,
            options,
            auths,
            vertices: FxHashMap::default(),
            neighbours: FxHashMap::default(),
        }
    }

    fn vertex_visible(&mut self, id: &str) -> Result<bool> {
        if let Some(visible) = self.vertices.get(id) {
            return Ok(*visible);
        }
        let visible = match self.graph.store.get(&ElementId::vertex(id))? {
            Some(record) => traversable(&record, None, self.auths),
            None => false,
        };
        self.vertices.insert(id.to_owned(), visible);
        Ok(visible)
    }

    /// Visible neighbours of a visible vertex, sorted and deduplicated.
    fn neighbours(&mut self, id: &str) -> Result<Vec<String>> {
        if let Some(cached) = self.neighbours.get(id) {
            return Ok(cached.clone());
        }
        let mut found = BTreeSet::new();
        if let Some(record) = self.graph.store.get(&ElementId::vertex(id))? {
            for edge_ref in record
                .edge_refs
                .values()
                .filter(|r| self.options.direction.covers(r.direction))
            {
                if found.contains(&edge_ref.other_vertex_id) {
                    continue;
                }
                let Some(edge) = self.graph.store.get(&ElementId::edge(edge_ref.edge_id.clone()))? else {
                    continue;
                };
                if !traversable(&edge, None, self.auths) {
                    continue;
                }
                let label = edge.state_at(None).map(|s| s.type_name).unwrap_or_default();
                if !self.options.allows_label(label) {
                    continue;
                }
                if self.vertex_visible(&edge_ref.other_vertex_id)? {
                    found.insert(edge_ref.other_vertex_id.clone());
                }
            }
        }
        let found: Vec<String> = found.into_iter().collect();
        self.neighbours.insert(id.to_owned(), found.clone());
        Ok(found)
    }
}

impl Graph {
    /// Distinct simple paths from source to target, shortest first.
    ///
    /// Expansion only crosses edges and vertices the caller can currently see.
    /// A path ends as soon as it reaches the target, so the target never
    /// appears in the middle of a path.
    pub fn find_paths(&self, options: &FindPathOptions, auths: &Authorizations) -> Result<Vec<Path>> {
        self.check_authorizations(auths)?;
        if options.max_hops > self.max_path_hops {
            return Err(GraphError::InvalidArgument(format!(
                "max_hops {} exceeds the configured limit of {}",
                options.max_hops, self.max_path_hops
            )));
        }
        let started = Instant::now();
        let mut found: Vec<Path> = Vec::new();
        let mut expansion = Expansion::new(self, options, auths);

        if options.source != options.target
            && options.max_hops > 0
            && expansion.vertex_visible(&options.source)?
            && expansion.vertex_visible(&options.target)?
        {
            let mut level: Vec<Vec<String>> = vec![vec![options.source.clone()]];
            'levels: for hop in 1..=options.max_hops {
                let mut next = Vec::new();
                for path in &level {
                    let Some(last) = path.last() else {
                        continue;
                    };
                    for neighbour in expansion.neighbours(last)? {
                        if path.contains(&neighbour) {
                            continue;
                        }
                        let mut extended = path.clone();
                        extended.push(neighbour);
                        if extended.last() == Some(&options.target) {
                            found.push(Path::new(extended));
                            if options.any_path_only {
                                break 'levels;
                            }
                        } else if hop < options.max_hops {
                            if next.len() == options.max_frontier {
                                return Err(GraphError::InvalidArgument(format!(
                                    "path search from '{}' to '{}' exceeded {} partial paths at hop {}",
                                    options.source, options.target, options.max_frontier, hop
                                )));
                            }
                            next.push(extended);
                        }
                    }
                }
                if next.is_empty() {
                    break;
                }
                level = next;
            }
        }

        found.sort_by(|a, b| a.hops().cmp(&b.hops()).then_with(|| a.cmp(b)));
        found.dedup();
        self.metrics.path_search(found.len());
        debug!(
            source = %options.source,
            target = %options.target,
            max_hops = options.max_hops,
            paths = found.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "path.find.done"
        );
        Ok(found)
    }

    /// Ids of readable edges whose both endpoints are in `vertex_ids`.
    pub fn find_related_edge_ids(
        &self,
        vertex_ids: &[&str],
        as_of: Option<i64>,
        auths: &Authorizations,
    ) -> Result<Vec<String>> {
        Ok(self
            .find_related_edge_summary(vertex_ids, as_of, auths)?
            .into_iter()
            .map(|e| e.edge_id)
            .collect())
    }

    /// Summaries of readable edges whose both endpoints are in `vertex_ids`,
    /// ordered by edge id.
    pub fn find_related_edge_summary(
        &self,
        vertex_ids: &[&str],
        as_of: Option<i64>,
        auths: &Authorizations,
    ) -> Result<Vec<RelatedEdge>> {
        self.check_authorizations(auths)?;
        let members: FxHashSet<&str> = vertex_ids.iter().copied().collect();
        let mut related: Vec<RelatedEdge> = Vec::new();
        let mut seen: FxHashSet<String> = FxHashSet::default();
        for vertex_id in &members {
            let Some(vertex) = self.store.get(&ElementId::vertex(*vertex_id))? else {
                continue;
            };
            if !traversable(&vertex, as_of, auths) {
                continue;
            }
            for edge_ref in vertex.edge_refs.values() {
                if edge_ref.direction != Direction::Out
                    || !members.contains(edge_ref.other_vertex_id.as_str())
                    || seen.contains(&edge_ref.edge_id)
                {
                    continue;
                }
                let Some(edge) = self.store.get(&ElementId::edge(edge_ref.edge_id.clone()))? else {
                    continue;
                };
                if !traversable(&edge, as_of, auths) {
                    continue;
                }
                let Some(other) = self.store.get(&ElementId::vertex(edge_ref.other_vertex_id.clone()))? else {
                    continue;
                };
                if !traversable(&other, as_of, auths) {
                    continue;
                }
                seen.insert(edge_ref.edge_id.clone());
                related.push(RelatedEdge {
                    edge_id: edge_ref.edge_id.clone(),
                    label: edge
                        .state_at(as_of)
                        .map(|s| s.type_name.to_owned())
                        .unwrap_or_default(),
                    out_vertex_id: (*vertex_id).to_owned(),
                    in_vertex_id: edge_ref.other_vertex_id.clone(),
                });
            }
        }
        related.sort_by(|a, b| a.edge_id.cmp(&b.edge_id));
        Ok(related)
    }
}
