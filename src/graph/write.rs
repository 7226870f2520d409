use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::Graph;
use crate::clock::check_explicit_timestamp;
use crate::error::{GraphError, Result};
use crate::events::{order_commit_events, GraphEvent};
use crate::model::{Direction, ElementId, ElementKind, ExtendedDataRowId, PropertyKey};
use crate::mutation::apply::{apply, delete_property, ApplyContext, Applied, ExtendedChange};
use crate::mutation::{IndexHint, MutationPlan, MutationTarget};
use crate::search::IndexDocument;
use crate::security::{Authorizations, Visibility};
use crate::storage::ElementRecord;

/// Edge-creation inputs checked before anything is staged.
struct NewEdge<'a> {
    id: &'a str,
    out_vertex_id: &'a str,
    in_vertex_id: &'a str,
    label: &'a str,
    visibility: &'a Visibility,
    timestamp: i64,
}

impl Graph {
    /// Commits one mutation atomically and returns the committed record.
    pub(crate) fn commit_plan(&self, plan: MutationPlan, auths: &Authorizations) -> Result<Arc<ElementRecord>> {
        self.check_authorizations(auths)?;
        let MutationPlan {
            target,
            ops,
            index_hint,
        } = plan;

        let _guard = self.commit_lock.lock();
        let now = self.clock.tick();
        let ctx = ApplyContext {
            auths,
            strict_write_visibility: self.strict_write_visibility,
            now,
        };
        let mut events = Vec::new();
        let mut companions: Vec<ElementRecord> = Vec::new();

        let staged = match &target {
            MutationTarget::NewVertex {
                id,
                visibility,
                concept_type,
                timestamp,
            } => {
                check_explicit_timestamp(*timestamp)?;
                if let Some(ts) = timestamp {
                    self.clock.observe(*ts);
                }
                self.stage_vertex(id, visibility, concept_type, timestamp.unwrap_or(now), &ctx, &mut events)?
            }
            MutationTarget::NewEdge {
                id,
                out_vertex_id,
                in_vertex_id,
                label,
                visibility,
                timestamp,
            } => {
                check_explicit_timestamp(*timestamp)?;
                if let Some(ts) = timestamp {
                    self.clock.observe(*ts);
                }
                let edge = NewEdge {
                    id,
                    out_vertex_id,
                    in_vertex_id,
                    label,
                    visibility,
                    timestamp: timestamp.unwrap_or(now),
                };
                self.stage_edge(&edge, &ctx, &mut events, &mut companions)?
            }
            MutationTarget::Existing(id) => self.stage_existing(id, auths)?,
        };

        let Applied {
            record,
            events: op_events,
            extended,
            property_writes,
            max_explicit_timestamp,
        } = apply(staged, &ops, &ctx)?;
        if let Some(ts) = max_explicit_timestamp {
            self.clock.observe(ts);
        }
        events.extend(op_events);

        let record = Arc::new(record);
        let mut publish = Vec::with_capacity(1 + companions.len());
        publish.push(Arc::clone(&record));
        publish.extend(companions.into_iter().map(Arc::new));
        self.store.put_all(publish)?;

        let touched_rows = self.apply_extended(extended, &mut events);
        if index_hint == IndexHint::Index {
            self.index_element(&record);
            for row in &touched_rows {
                self.index_row(row);
            }
        }

        self.metrics.element_saved(record.kind());
        for _ in 0..property_writes {
            self.metrics.property_written();
        }
        order_commit_events(&mut events);
        self.listeners.dispatch(&events);
        debug!(
            element = %record.id,
            ops = ops.len(),
            events = events.len(),
            "graph.commit"
        );
        Ok(record)
    }

    fn stage_vertex(
        &self,
        id: &str,
        visibility: &Visibility,
        concept_type: &str,
        timestamp: i64,
        ctx: &ApplyContext<'_>,
        events: &mut Vec<GraphEvent>,
    ) -> Result<ElementRecord> {
        if id.is_empty() {
            return Err(GraphError::InvalidArgument("vertex id cannot be empty".into()));
        }
        ctx.ensure_writable(visibility)?;
        let created = GraphEvent::AddVertex {
            vertex_id: id.to_owned(),
        };
        match self.store.get(&ElementId::vertex(id))? {
            Some(existing) if existing.is_live() => {
                let mut record = existing.as_ref().clone();
                let type_name = if concept_type.is_empty() {
                    record.type_name.clone()
                } else {
                    concept_type.to_owned()
                };
                if &record.visibility != visibility || record.type_name != type_name {
                    record.push_version(visibility.clone(), type_name, false, timestamp);
                }
                Ok(record)
            }
            Some(tombstone) => {
                let mut record = tombstone.as_ref().clone();
                record.clear_overlays(timestamp);
                record.push_version(visibility.clone(), concept_type.to_owned(), false, timestamp);
                events.push(created);
                Ok(record)
            }
            None => {
                events.push(created);
                Ok(ElementRecord::new_vertex(id, visibility.clone(), concept_type, timestamp))
            }
        }
    }

    fn stage_edge(
        &self,
        edge: &NewEdge<'_>,
        ctx: &ApplyContext<'_>,
        events: &mut Vec<GraphEvent>,
        companions: &mut Vec<ElementRecord>,
    ) -> Result<ElementRecord> {
        let id = edge.id;
        if id.is_empty() {
            return Err(GraphError::InvalidArgument("edge id cannot be empty".into()));
        }
        if edge.out_vertex_id.is_empty() {
            return Err(GraphError::InvalidArgument(format!(
                "edge '{id}' requires an out vertex id"
            )));
        }
        if edge.in_vertex_id.is_empty() {
            return Err(GraphError::InvalidArgument(format!(
                "edge '{id}' requires an in vertex id"
            )));
        }
        if edge.label.is_empty() {
            return Err(GraphError::InvalidArgument(format!("edge '{id}' requires a label")));
        }
        ctx.ensure_writable(edge.visibility)?;

        let existing = self.store.get(&ElementId::edge(id))?;
        if let Some(endpoints) = existing.as_ref().and_then(|e| e.endpoints.as_ref()) {
            if endpoints.out_vertex_id != edge.out_vertex_id || endpoints.in_vertex_id != edge.in_vertex_id {
                return Err(GraphError::InvalidArgument(format!(
                    "edge '{id}' already connects '{}' -> '{}'",
                    endpoints.out_vertex_id, endpoints.in_vertex_id
                )));
            }
        }
        if let Some(live) = existing.as_ref().filter(|e| e.is_live()) {
            let mut record = live.as_ref().clone();
            if &record.visibility != edge.visibility || record.type_name != edge.label {
                record.push_version(edge.visibility.clone(), edge.label.to_owned(), false, edge.timestamp);
            }
            return Ok(record);
        }

        let mut out_vertex = self.live_record(&ElementId::vertex(edge.out_vertex_id))?;
        out_vertex.add_edge_ref(Direction::Out, id, edge.in_vertex_id);
        if edge.out_vertex_id == edge.in_vertex_id {
            out_vertex.add_edge_ref(Direction::In, id, edge.out_vertex_id);
            companions.push(out_vertex);
        } else {
            let mut in_vertex = self.live_record(&ElementId::vertex(edge.in_vertex_id))?;
            in_vertex.add_edge_ref(Direction::In, id, edge.out_vertex_id);
            companions.push(out_vertex);
            companions.push(in_vertex);
        }

        let record = match existing {
            Some(tombstone) => {
                let mut record = tombstone.as_ref().clone();
                record.clear_overlays(edge.timestamp);
                record.push_version(edge.visibility.clone(), edge.label.to_owned(), false, edge.timestamp);
                record
            }
            None => ElementRecord::new_edge(
                id,
                edge.out_vertex_id,
                edge.in_vertex_id,
                edge.label,
                edge.visibility.clone(),
                edge.timestamp,
            ),
        };
        events.push(GraphEvent::AddEdge {
            edge_id: id.to_owned(),
            out_vertex_id: edge.out_vertex_id.to_owned(),
            in_vertex_id: edge.in_vertex_id.to_owned(),
            label: edge.label.to_owned(),
        });
        Ok(record)
    }

    fn stage_existing(&self, id: &ElementId, auths: &Authorizations) -> Result<ElementRecord> {
        let record = self.live_record(id)?;
        if !record.visibility.evaluate(auths) {
            return Err(GraphError::not_found(id.kind, id.id.clone()));
        }
        Ok(record)
    }

    /// Detached copy of a live record.
    fn live_record(&self, id: &ElementId) -> Result<ElementRecord> {
        match self.store.get(id)? {
            Some(record) if record.is_live() => Ok(record.as_ref().clone()),
            _ => Err(GraphError::not_found(id.kind, id.id.clone())),
        }
    }

    fn apply_extended(&self, changes: Vec<ExtendedChange>, events: &mut Vec<GraphEvent>) -> BTreeSet<ExtendedDataRowId> {
        let mut touched = BTreeSet::new();
        for change in changes {
            match change {
                ExtendedChange::Write { row, cell } => {
                    events.push(GraphEvent::AddExtendedData {
                        row: row.clone(),
                        column: cell.name.clone(),
                        key: cell.key.clone(),
                        value: cell.value.clone(),
                        visibility: cell.visibility.clone(),
                    });
                    self.extended.write_cell(&row, cell);
                    touched.insert(row);
                }
                ExtendedChange::DeleteCell {
                    row,
                    column,
                    key,
                    visibility,
                } => {
                    if self.extended.delete_cell(&row, &column, &key, &visibility) {
                        events.push(GraphEvent::DeleteExtendedData {
                            row: row.clone(),
                            column: Some(column),
                        });
                        touched.insert(row);
                    }
                }
                ExtendedChange::DeleteRow(row) => {
                    if self.extended.delete_row(&row) {
                        events.push(GraphEvent::DeleteExtendedData {
                            row: row.clone(),
                            column: None,
                        });
                        touched.insert(row);
                    }
                }
            }
        }
        touched
    }

    fn index_element(&self, record: &ElementRecord) {
        let result = if record.is_live() {
            self.index.add_element(IndexDocument::from_record(record))
        } else {
            self.index.remove_element(&record.id)
        };
        if let Err(err) = result {
            warn!(element = %record.id, error = %err, "graph.index.element_failed");
        }
    }

    fn index_row(&self, row: &ExtendedDataRowId) {
        let cells = self.extended.raw_cells(row);
        let result = if cells.is_empty() {
            self.index.remove_extended_data(row)
        } else {
            self.index.add_extended_data(row, &cells)
        };
        if let Err(err) = result {
            warn!(row = %row, error = %err, "graph.index.extended_data_failed");
        }
    }

    fn unindex_element(&self, id: &ElementId, rows: &[ExtendedDataRowId]) {
        for row in rows {
            if let Err(err) = self.index.remove_extended_data(row) {
                warn!(row = %row, error = %err, "graph.index.extended_data_failed");
            }
        }
        if let Err(err) = self.index.remove_element(id) {
            warn!(element = %id, error = %err, "graph.index.element_failed");
        }
    }

    /// Drops an element's extended-data rows, recording events and index removals.
    fn cascade_extended(&self, id: &ElementId, events: &mut Vec<GraphEvent>) {
        let rows = self.extended.delete_element_rows(id.kind, &id.id);
        for row in &rows {
            events.push(GraphEvent::DeleteExtendedData {
                row: row.clone(),
                column: None,
            });
        }
        self.unindex_element(id, &rows);
    }

    /// Commits several mutations; each element succeeds or fails on its own.
    pub fn save_element_mutations(&self, plans: Vec<MutationPlan>, auths: &Authorizations) -> Vec<Result<ElementId>> {
        plans
            .into_iter()
            .map(|plan| {
                let id = plan.element_id();
                let result = self.commit_plan(plan, auths).map(|record| record.id.clone());
                if let Err(err) = &result {
                    warn!(element = %id, error = %err, "graph.batch.element_failed");
                }
                result
            })
            .collect()
    }

    /// Returns `true` when `auths` may delete the record: readable now, or
    /// readable at some point for a tombstone.
    fn deletable(record: &ElementRecord, auths: &Authorizations) -> bool {
        if record.is_live() {
            record.visibility.evaluate(auths)
        } else {
            record.ever_visible_to(auths)
        }
    }

    /// Tombstone copy of a live record: every property gets a delete marker
    /// and the element gets a deleted version.
    fn tombstone(record: &ElementRecord, timestamp: i64) -> ElementRecord {
        let mut next = record.clone();
        let keys: Vec<PropertyKey> = next.properties.keys().cloned().collect();
        let mut discarded = Vec::new();
        for key in keys {
            delete_property(&mut next, &key, true, timestamp, &mut discarded);
        }
        let visibility = next.visibility.clone();
        let type_name = next.type_name.clone();
        next.push_version(visibility, type_name, true, timestamp);
        next
    }

    fn delete_timestamp(&self, timestamp: Option<i64>) -> Result<i64> {
        check_explicit_timestamp(timestamp)?;
        Ok(match timestamp {
            Some(ts) => {
                self.clock.observe(ts);
                ts
            }
            None => self.clock.tick(),
        })
    }

    /// Soft-deletes a vertex and every live edge touching it. History is kept
    /// for time-travel reads; extended data is removed. Absent, deleted or
    /// unreadable vertices are a no-op.
    pub fn soft_delete_vertex(&self, id: &str, timestamp: Option<i64>, auths: &Authorizations) -> Result<()> {
        self.check_authorizations(auths)?;
        let _guard = self.commit_lock.lock();
        let vertex_id = ElementId::vertex(id);
        let Some(record) = self.store.get(&vertex_id)? else {
            debug!(vertex_id = id, "graph.soft_delete.missing");
            return Ok(());
        };
        if !record.is_live() || !record.visibility.evaluate(auths) {
            debug!(vertex_id = id, "graph.soft_delete.skipped");
            return Ok(());
        }
        let ts = self.delete_timestamp(timestamp)?;
        let mut events = Vec::new();
        let mut publish = Vec::new();
        let edge_ids: BTreeSet<&str> = record.edge_refs.values().map(|r| r.edge_id.as_str()).collect();
        let mut deleted_edges = Vec::new();
        for edge_id in edge_ids {
            let edge_key = ElementId::edge(edge_id);
            match self.store.get(&edge_key)? {
                Some(edge) if edge.is_live() => {
                    publish.push(Arc::new(Self::tombstone(&edge, ts)));
                    events.push(GraphEvent::DeleteEdge {
                        edge_id: edge_id.to_owned(),
                        soft: true,
                    });
                    deleted_edges.push(edge_key);
                }
                _ => {}
            }
        }
        publish.push(Arc::new(Self::tombstone(&record, ts)));
        events.push(GraphEvent::DeleteVertex {
            vertex_id: id.to_owned(),
            soft: true,
        });
        self.store.put_all(publish)?;

        for edge in &deleted_edges {
            self.cascade_extended(edge, &mut events);
            self.metrics.element_deleted(ElementKind::Edge, true);
        }
        self.cascade_extended(&vertex_id, &mut events);
        self.metrics.element_deleted(ElementKind::Vertex, true);
        order_commit_events(&mut events);
        self.listeners.dispatch(&events);
        info!(vertex_id = id, edges = deleted_edges.len(), timestamp = ts, "graph.soft_delete");
        Ok(())
    }

    /// Soft-deletes an edge. Its adjacency entries stay on both vertices so
    /// time-travel reads still see it.
    pub fn soft_delete_edge(&self, id: &str, timestamp: Option<i64>, auths: &Authorizations) -> Result<()> {
        self.check_authorizations(auths)?;
        let _guard = self.commit_lock.lock();
        let edge_id = ElementId::edge(id);
        let Some(record) = self.store.get(&edge_id)? else {
            debug!(edge_id = id, "graph.soft_delete.missing");
            return Ok(());
        };
        if !record.is_live() || !record.visibility.evaluate(auths) {
            debug!(edge_id = id, "graph.soft_delete.skipped");
            return Ok(());
        }
        let ts = self.delete_timestamp(timestamp)?;
        self.store.put(Arc::new(Self::tombstone(&record, ts)))?;
        let mut events = vec![GraphEvent::DeleteEdge {
            edge_id: id.to_owned(),
            soft: true,
        }];
        self.cascade_extended(&edge_id, &mut events);
        self.metrics.element_deleted(ElementKind::Edge, true);
        order_commit_events(&mut events);
        self.listeners.dispatch(&events);
        info!(edge_id = id, timestamp = ts, "graph.soft_delete");
        Ok(())
    }

    /// Permanently removes a vertex, its history, every edge touching it and
    /// all their extended data.
    pub fn delete_vertex(&self, id: &str, auths: &Authorizations) -> Result<()> {
        self.check_authorizations(auths)?;
        let _guard = self.commit_lock.lock();
        let vertex_id = ElementId::vertex(id);
        let Some(record) = self.store.get(&vertex_id)? else {
            return Ok(());
        };
        if !Self::deletable(&record, auths) {
            debug!(vertex_id = id, "graph.delete.skipped");
            return Ok(());
        }
        let mut events = Vec::new();
        let mut neighbours: BTreeMap<String, ElementRecord> = BTreeMap::new();
        let edge_refs: BTreeSet<(String, String)> = record
            .edge_refs
            .values()
            .map(|r| (r.edge_id.clone(), r.other_vertex_id.clone()))
            .collect();
        for (edge_id, other) in &edge_refs {
            let edge_key = ElementId::edge(edge_id.clone());
            if let Some(edge) = self.store.remove(&edge_key)? {
                if edge.is_live() {
                    events.push(GraphEvent::DeleteEdge {
                        edge_id: edge_id.clone(),
                        soft: false,
                    });
                    self.metrics.element_deleted(ElementKind::Edge, false);
                }
                self.cascade_extended(&edge_key, &mut events);
            }
            if other == id {
                continue;
            }
            if !neighbours.contains_key(other) {
                if let Some(neighbour) = self.store.get(&ElementId::vertex(other.clone()))? {
                    neighbours.insert(other.clone(), neighbour.as_ref().clone());
                }
            }
            if let Some(neighbour) = neighbours.get_mut(other) {
                neighbour.remove_edge_refs(edge_id);
            }
        }
        self.store
            .put_all(neighbours.into_values().map(Arc::new).collect())?;
        self.store.remove(&vertex_id)?;
        if record.is_live() {
            events.push(GraphEvent::DeleteVertex {
                vertex_id: id.to_owned(),
                soft: false,
            });
            self.metrics.element_deleted(ElementKind::Vertex, false);
        }
        self.cascade_extended(&vertex_id, &mut events);
        order_commit_events(&mut events);
        self.listeners.dispatch(&events);
        info!(vertex_id = id, edges = edge_refs.len(), "graph.delete");
        Ok(())
    }

    /// Permanently removes an edge, its history and its extended data.
    pub fn delete_edge(&self, id: &str, auths: &Authorizations) -> Result<()> {
        self.check_authorizations(auths)?;
        let _guard = self.commit_lock.lock();
        let edge_id = ElementId::edge(id);
        let Some(record) = self.store.get(&edge_id)? else {
            return Ok(());
        };
        if !Self::deletable(&record, auths) {
            debug!(edge_id = id, "graph.delete.skipped");
            return Ok(());
        }
        let mut updated = Vec::new();
        if let Some(endpoints) = &record.endpoints {
            let mut ends = vec![endpoints.out_vertex_id.as_str()];
            if endpoints.in_vertex_id != endpoints.out_vertex_id {
                ends.push(endpoints.in_vertex_id.as_str());
            }
            for vertex in ends {
                if let Some(v) = self.store.get(&ElementId::vertex(vertex))? {
                    let mut v = v.as_ref().clone();
                    if v.remove_edge_refs(id) {
                        updated.push(Arc::new(v));
                    }
                }
            }
        }
        self.store.put_all(updated)?;
        self.store.remove(&edge_id)?;
        let mut events = Vec::new();
        if record.is_live() {
            events.push(GraphEvent::DeleteEdge {
                edge_id: id.to_owned(),
                soft: false,
            });
            self.metrics.element_deleted(ElementKind::Edge, false);
        }
        self.cascade_extended(&edge_id, &mut events);
        order_commit_events(&mut events);
        self.listeners.dispatch(&events);
        info!(edge_id = id, "graph.delete");
        Ok(())
    }

    /// Hard-deletes each element in turn; stops at the first error.
    pub fn delete_elements<I>(&self, ids: I, auths: &Authorizations) -> Result<()>
    where
        I: IntoIterator<Item = ElementId>,
    {
        for id in ids {
            match id.kind {
                ElementKind::Vertex => self.delete_vertex(&id.id, auths)?,
                ElementKind::Edge => self.delete_edge(&id.id, auths)?,
            }
        }
        Ok(())
    }

    /// Hides a vertex for readers satisfying `visibility`.
    pub fn mark_vertex_hidden(&self, id: &str, visibility: &Visibility, auths: &Authorizations) -> Result<()> {
        self.commit_plan(self.mutate_vertex(id).mark_hidden(visibility).into_plan(), auths)
            .map(|_| ())
    }

    /// Reverses [`Graph::mark_vertex_hidden`].
    pub fn mark_vertex_visible(&self, id: &str, visibility: &Visibility, auths: &Authorizations) -> Result<()> {
        self.commit_plan(self.mutate_vertex(id).mark_visible(visibility).into_plan(), auths)
            .map(|_| ())
    }

    /// Hides an edge for readers satisfying `visibility`.
    pub fn mark_edge_hidden(&self, id: &str, visibility: &Visibility, auths: &Authorizations) -> Result<()> {
        self.commit_plan(self.mutate_edge(id).mark_hidden(visibility).into_plan(), auths)
            .map(|_| ())
    }

    /// Reverses [`Graph::mark_edge_hidden`].
    pub fn mark_edge_visible(&self, id: &str, visibility: &Visibility, auths: &Authorizations) -> Result<()> {
        self.commit_plan(self.mutate_edge(id).mark_visible(visibility).into_plan(), auths)
            .map(|_| ())
    }
}
