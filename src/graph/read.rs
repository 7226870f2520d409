use std::collections::BTreeSet;
use std::sync::Arc;

use super::Graph;
use crate::error::{GraphError, Result};
use crate::model::{
    sort_properties, Direction, Edge, EdgeInfo, ElementBase, ElementId, ElementKind,
    ExtendedDataRow, ExtendedDataRowId, FetchHints, HistoricalPropertyValue, HistoryFilter,
    IdRange, Property, Vertex,
};
use crate::security::Authorizations;
use crate::storage::{ElementRecord, ExtendedDataScan, StoredProperty};

/// How a record is turned into a caller view.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ReadMode {
    /// `None` for current state.
    pub(crate) as_of: Option<i64>,
    /// Writers reading back their own commit skip the element-level check.
    pub(crate) check_visibility: bool,
}

impl ReadMode {
    pub(crate) const CURRENT: ReadMode = ReadMode {
        as_of: None,
        check_visibility: true,
    };

    const SAVED: ReadMode = ReadMode {
        as_of: None,
        check_visibility: false,
    };

    pub(crate) fn at(as_of: Option<i64>) -> Self {
        Self {
            as_of,
            check_visibility: true,
        }
    }

    fn overlay_time(self) -> i64 {
        self.as_of.unwrap_or(i64::MAX)
    }
}

impl Graph {
    fn element_base(
        &self,
        record: &ElementRecord,
        hints: &Arc<FetchHints>,
        mode: ReadMode,
        auths: &Authorizations,
    ) -> Option<ElementBase> {
        let state = record.state_at(mode.as_of)?;
        if mode.check_visibility && !state.visibility.evaluate(auths) {
            return None;
        }
        let at = mode.overlay_time();
        let hidden_visibilities = record.hidden.hidden_visibilities(at);
        if !hints.includes_hidden() && hidden_visibilities.iter().any(|v| v.evaluate(auths)) {
            return None;
        }

        let mut properties = Vec::new();
        if hints.includes_properties() {
            for stored in record.properties_at(mode.as_of) {
                let StoredProperty {
                    key,
                    value,
                    metadata,
                    timestamp,
                } = stored;
                if !hints.includes_property(&key.name) || !key.visibility.evaluate(auths) {
                    continue;
                }
                let hidden = record.property_hidden_visibilities(&key, at);
                if !hints.includes_hidden() && hidden.iter().any(|v| v.evaluate(auths)) {
                    continue;
                }
                properties.push(Property {
                    key: key.key,
                    name: key.name,
                    value,
                    visibility: key.visibility,
                    timestamp,
                    metadata: hints
                        .includes_property_metadata()
                        .then(|| metadata.visible_to(auths)),
                    hidden_visibilities: hidden,
                });
            }
            sort_properties(&mut properties);
        }

        let extended_tables = if hints.includes_extended_data_table_names() {
            self.extended
                .table_names(record.kind(), &record.id.id, auths)
        } else {
            Vec::new()
        };

        Some(ElementBase {
            id: record.id.clone(),
            visibility: state.visibility.clone(),
            timestamp: state.timestamp,
            hints: Arc::clone(hints),
            properties,
            hidden_visibilities,
            extended_tables,
        })
    }

    fn edge_infos(
        &self,
        record: &ElementRecord,
        direction: Direction,
        hints: &FetchHints,
        mode: ReadMode,
        auths: &Authorizations,
    ) -> Result<Option<Vec<EdgeInfo>>> {
        if !hints.includes_edge_refs(direction) {
            return Ok(None);
        }
        let mut infos = Vec::new();
        for edge_ref in record.edge_refs.values().filter(|r| r.direction == direction) {
            let Some(edge) = self.store.get(&ElementId::edge(edge_ref.edge_id.clone()))? else {
                continue;
            };
            let Some(state) = edge.state_at(mode.as_of) else {
                continue;
            };
            if !state.visibility.evaluate(auths) || !hints.includes_edge_label(state.type_name) {
                continue;
            }
            if !hints.includes_hidden() && edge.hidden.is_hidden_for(auths, mode.overlay_time()) {
                continue;
            }
            infos.push(EdgeInfo {
                edge_id: hints
                    .includes_edge_ids()
                    .then(|| edge_ref.edge_id.clone()),
                label: state.type_name.to_owned(),
                vertex_id: hints
                    .includes_edge_vertex_ids()
                    .then(|| edge_ref.other_vertex_id.clone()),
                direction,
            });
        }
        Ok(Some(infos))
    }

    pub(crate) fn materialize_vertex(
        &self,
        record: &ElementRecord,
        hints: &Arc<FetchHints>,
        mode: ReadMode,
        auths: &Authorizations,
    ) -> Result<Option<Vertex>> {
        let Some(base) = self.element_base(record, hints, mode, auths) else {
            return Ok(None);
        };
        let concept_type = record
            .state_at(mode.as_of)
            .map(|s| s.type_name.to_owned())
            .unwrap_or_default();
        Ok(Some(Vertex {
            base,
            concept_type,
            out_refs: self.edge_infos(record, Direction::Out, hints, mode, auths)?,
            in_refs: self.edge_infos(record, Direction::In, hints, mode, auths)?,
        }))
    }

    pub(crate) fn materialize_edge(
        &self,
        record: &ElementRecord,
        hints: &Arc<FetchHints>,
        mode: ReadMode,
        auths: &Authorizations,
    ) -> Result<Option<Edge>> {
        let Some(endpoints) = &record.endpoints else {
            return Err(GraphError::Corruption(format!(
                "edge record '{}' has no endpoints",
                record.id.id
            )));
        };
        let Some(base) = self.element_base(record, hints, mode, auths) else {
            return Ok(None);
        };
        let label = record
            .state_at(mode.as_of)
            .map(|s| s.type_name.to_owned())
            .unwrap_or_default();
        Ok(Some(Edge {
            base,
            out_vertex_id: endpoints.out_vertex_id.clone(),
            in_vertex_id: endpoints.in_vertex_id.clone(),
            label,
        }))
    }

    fn read_vertex(
        &self,
        id: &str,
        hints: &Arc<FetchHints>,
        mode: ReadMode,
        auths: &Authorizations,
    ) -> Result<Option<Vertex>> {
        match self.store.get(&ElementId::vertex(id))? {
            Some(record) => self.materialize_vertex(&record, hints, mode, auths),
            None => Ok(None),
        }
    }

    fn read_edge(
        &self,
        id: &str,
        hints: &Arc<FetchHints>,
        mode: ReadMode,
        auths: &Authorizations,
    ) -> Result<Option<Edge>> {
        match self.store.get(&ElementId::edge(id))? {
            Some(record) => self.materialize_edge(&record, hints, mode, auths),
            None => Ok(None),
        }
    }

    /// Current view of a vertex, or `None` when it is absent, soft-deleted,
    /// unreadable or hidden (unless `hints` include hidden).
    pub fn get_vertex(&self, id: &str, hints: &FetchHints, auths: &Authorizations) -> Result<Option<Vertex>> {
        self.get_vertex_at(id, hints, None, auths)
    }

    /// View of a vertex as of a timestamp, reconstructed from its history.
    pub fn get_vertex_at(
        &self,
        id: &str,
        hints: &FetchHints,
        as_of: Option<i64>,
        auths: &Authorizations,
    ) -> Result<Option<Vertex>> {
        self.check_authorizations(auths)?;
        self.read_vertex(id, &Arc::new(hints.clone()), ReadMode::at(as_of), auths)
    }

    /// Current view of an edge.
    pub fn get_edge(&self, id: &str, hints: &FetchHints, auths: &Authorizations) -> Result<Option<Edge>> {
        self.get_edge_at(id, hints, None, auths)
    }

    /// View of an edge as of a timestamp.
    pub fn get_edge_at(
        &self,
        id: &str,
        hints: &FetchHints,
        as_of: Option<i64>,
        auths: &Authorizations,
    ) -> Result<Option<Edge>> {
        self.check_authorizations(auths)?;
        self.read_edge(id, &Arc::new(hints.clone()), ReadMode::at(as_of), auths)
    }

    /// Readable vertices among `ids`, in the order given; missing ids are skipped.
    pub fn get_vertices(&self, ids: &[&str], hints: &FetchHints, auths: &Authorizations) -> Result<Vec<Vertex>> {
        self.check_authorizations(auths)?;
        let hints = Arc::new(hints.clone());
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(vertex) = self.read_vertex(id, &hints, ReadMode::CURRENT, auths)? {
                out.push(vertex);
            }
        }
        Ok(out)
    }

    /// Readable edges among `ids`, in the order given.
    pub fn get_edges(&self, ids: &[&str], hints: &FetchHints, auths: &Authorizations) -> Result<Vec<Edge>> {
        self.check_authorizations(auths)?;
        let hints = Arc::new(hints.clone());
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(edge) = self.read_edge(id, &hints, ReadMode::CURRENT, auths)? {
                out.push(edge);
            }
        }
        Ok(out)
    }

    /// Every readable vertex, ordered by id.
    pub fn get_all_vertices(&self, hints: &FetchHints, auths: &Authorizations) -> Result<Vec<Vertex>> {
        self.check_authorizations(auths)?;
        let hints = Arc::new(hints.clone());
        let mut out = Vec::new();
        for record in self.store.scan(ElementKind::Vertex)? {
            if let Some(vertex) = self.materialize_vertex(&record, &hints, ReadMode::CURRENT, auths)? {
                out.push(vertex);
            }
        }
        Ok(out)
    }

    /// Every readable edge, ordered by id.
    pub fn get_all_edges(&self, hints: &FetchHints, auths: &Authorizations) -> Result<Vec<Edge>> {
        self.check_authorizations(auths)?;
        let hints = Arc::new(hints.clone());
        let mut out = Vec::new();
        for record in self.store.scan(ElementKind::Edge)? {
            if let Some(edge) = self.materialize_edge(&record, &hints, ReadMode::CURRENT, auths)? {
                out.push(edge);
            }
        }
        Ok(out)
    }

    /// Returns `true` when the vertex is readable right now.
    pub fn does_vertex_exist(&self, id: &str, auths: &Authorizations) -> Result<bool> {
        Ok(self.get_vertex(id, &FetchHints::NONE, auths)?.is_some())
    }

    /// Returns `true` when the edge is readable right now.
    pub fn does_edge_exist(&self, id: &str, auths: &Authorizations) -> Result<bool> {
        Ok(self.get_edge(id, &FetchHints::NONE, auths)?.is_some())
    }

    /// Readable edges touching a readable vertex in `direction`, ordered by id.
    pub fn get_vertex_edges(
        &self,
        vertex_id: &str,
        direction: Direction,
        hints: &FetchHints,
        auths: &Authorizations,
    ) -> Result<Vec<Edge>> {
        self.check_authorizations(auths)?;
        let Some(record) = self.store.get(&ElementId::vertex(vertex_id))? else {
            return Ok(Vec::new());
        };
        let probe = Arc::new(FetchHints::NONE);
        if self
            .element_base(&record, &probe, ReadMode::CURRENT, auths)
            .is_none()
        {
            return Ok(Vec::new());
        }
        let edge_ids: BTreeSet<&str> = record
            .edge_refs
            .values()
            .filter(|r| direction.covers(r.direction))
            .map(|r| r.edge_id.as_str())
            .collect();
        let hints = Arc::new(hints.clone());
        let mut out = Vec::new();
        for id in edge_ids {
            if let Some(edge) = self.read_edge(id, &hints, ReadMode::CURRENT, auths)? {
                out.push(edge);
            }
        }
        Ok(out)
    }

    /// History entries of an element's properties readable by `auths`,
    /// newest first. Soft-deleted elements keep their history.
    pub fn get_historical_property_values(
        &self,
        element: &ElementId,
        filter: &HistoryFilter,
        auths: &Authorizations,
    ) -> Result<Vec<HistoricalPropertyValue>> {
        self.check_authorizations(auths)?;
        let Some(record) = self.store.get(element)? else {
            return Ok(Vec::new());
        };
        if !record.ever_visible_to(auths) {
            return Ok(Vec::new());
        }
        let mut entries: Vec<HistoricalPropertyValue> = record
            .history
            .iter()
            .rev()
            .filter(|e| e.visibility.evaluate(auths) && filter.matches(e))
            .map(|e| HistoricalPropertyValue {
                metadata: e.metadata.visible_to(auths),
                ..e.clone()
            })
            .collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }

    /// Extended-data rows narrowed positionally by kind, element id and table.
    ///
    /// Supplying a later parameter without the earlier ones is rejected.
    pub fn get_extended_data(
        &self,
        kind: Option<ElementKind>,
        element_id: Option<&str>,
        table: Option<&str>,
        auths: &Authorizations,
    ) -> Result<Vec<ExtendedDataRow>> {
        self.check_authorizations(auths)?;
        let scan = ExtendedDataScan::new(kind, element_id, table)?;
        Ok(self.extended.scan(&scan, auths))
    }

    /// Extended-data rows matching a prepared scan.
    pub fn scan_extended_data(&self, scan: &ExtendedDataScan, auths: &Authorizations) -> Result<Vec<ExtendedDataRow>> {
        self.check_authorizations(auths)?;
        Ok(self.extended.scan(scan, auths))
    }

    /// Extended-data rows of every element of `kind` whose id is in `range`.
    pub fn get_extended_data_in_range(
        &self,
        kind: ElementKind,
        range: IdRange,
        auths: &Authorizations,
    ) -> Result<Vec<ExtendedDataRow>> {
        self.check_authorizations(auths)?;
        let scan = ExtendedDataScan::element_range(kind, range);
        Ok(self.extended.scan(&scan, auths))
    }

    /// One extended-data row, if any of its cells is readable.
    pub fn get_extended_data_row(
        &self,
        row: &ExtendedDataRowId,
        auths: &Authorizations,
    ) -> Result<Option<ExtendedDataRow>> {
        self.check_authorizations(auths)?;
        Ok(self.extended.row(row, auths))
    }

    /// View of a record as just committed, independent of later commits.
    pub(crate) fn saved_vertex(&self, record: &ElementRecord, auths: &Authorizations) -> Result<Vertex> {
        let hints = Arc::new(FetchHints::ALL_INCLUDING_HIDDEN);
        self.materialize_vertex(record, &hints, ReadMode::SAVED, auths)?
            .ok_or_else(|| GraphError::not_found(ElementKind::Vertex, &record.id.id))
    }

    pub(crate) fn saved_edge(&self, record: &ElementRecord, auths: &Authorizations) -> Result<Edge> {
        let hints = Arc::new(FetchHints::ALL_INCLUDING_HIDDEN);
        self.materialize_edge(record, &hints, ReadMode::SAVED, auths)?
            .ok_or_else(|| GraphError::not_found(ElementKind::Edge, &record.id.id))
    }
}
