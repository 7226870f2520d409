use std::collections::BTreeMap;
use std::ops::Bound;

use parking_lot::RwLock;

use crate::error::{GraphError, Result};
use crate::model::{ElementKind, ExtendedDataCell, ExtendedDataRow, ExtendedDataRowId, IdRange, PropertyKey};
use crate::security::{Authorizations, Visibility};

/// Narrowing parameters for an extended-data read.
///
/// Parameters are positional: a table requires an element id, which requires
/// an element kind.
#[derive(Clone, Debug, Default)]
pub struct ExtendedDataScan {
    element_kind: Option<ElementKind>,
    element_id: Option<String>,
    table_name: Option<String>,
    element_range: IdRange,
    row_range: IdRange,
}

impl ExtendedDataScan {
    /// Validates and builds a scan.
    pub fn new(
        element_kind: Option<ElementKind>,
        element_id: Option<&str>,
        table_name: Option<&str>,
    ) -> Result<Self> {
        if (table_name.is_some() && element_id.is_none())
            || (element_id.is_some() && element_kind.is_none())
        {
            return Err(GraphError::InvalidArgument(
                "nulls to the left of a value is not allowed".into(),
            ));
        }
        Ok(Self {
            element_kind,
            element_id: element_id.map(str::to_owned),
            table_name: table_name.map(str::to_owned),
            element_range: IdRange::all(),
            row_range: IdRange::all(),
        })
    }

    /// Scan over every element of `kind` whose id falls in `range`.
    pub fn element_range(kind: ElementKind, range: IdRange) -> Self {
        Self {
            element_kind: Some(kind),
            element_range: range,
            ..Self::default()
        }
    }

    /// Further narrows by row id.
    pub fn rows(mut self, range: IdRange) -> Self {
        self.row_range = range;
        self
    }

    fn lower_bound(&self) -> Option<ExtendedDataRowId> {
        let kind = self.element_kind?;
        Some(ExtendedDataRowId::new(
            kind,
            self.element_id.clone().unwrap_or_default(),
            self.table_name.clone().unwrap_or_default(),
            String::new(),
        ))
    }

    /// Returns `false` once ids sort past the scanned prefix.
    fn in_prefix(&self, id: &ExtendedDataRowId) -> bool {
        self.element_kind.map_or(true, |k| k == id.element_kind)
            && self.element_id.as_ref().map_or(true, |e| e == &id.element_id)
            && self.table_name.as_ref().map_or(true, |t| t == &id.table_name)
    }

    fn matches(&self, id: &ExtendedDataRowId) -> bool {
        self.element_range.contains(&id.element_id) && self.row_range.contains(&id.row_id)
    }
}

#[derive(Clone, Debug, Default)]
struct StoredRow {
    cells: BTreeMap<PropertyKey, ExtendedDataCell>,
}

impl StoredRow {
    fn visible(&self, id: &ExtendedDataRowId, auths: &Authorizations) -> Option<ExtendedDataRow> {
        let cells: Vec<ExtendedDataCell> = self
            .cells
            .values()
            .filter(|c| c.visibility.evaluate(auths))
            .cloned()
            .collect();
        (!cells.is_empty()).then(|| ExtendedDataRow {
            id: id.clone(),
            cells,
        })
    }
}

/// Sparse per-element tables of cells, each cell with its own visibility.
///
/// Rows are ordered by `(element kind, element id, table, row id)`. A row is
/// visible when at least one of its cells is readable.
#[derive(Default)]
pub struct ExtendedDataStore {
    rows: RwLock<BTreeMap<ExtendedDataRowId, StoredRow>>,
}

impl ExtendedDataStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a cell; an older timestamp never overwrites a newer value.
    pub fn write_cell(&self, row: &ExtendedDataRowId, cell: ExtendedDataCell) {
        let key = PropertyKey::new(cell.key.clone(), cell.name.clone(), cell.visibility.clone());
        let mut rows = self.rows.write();
        let stored = rows.entry(row.clone()).or_default();
        match stored.cells.get(&key) {
            Some(existing) if existing.timestamp > cell.timestamp => {}
            _ => {
                stored.cells.insert(key, cell);
            }
        }
    }

    /// Deletes one cell; returns whether it existed. Empty rows disappear.
    pub fn delete_cell(&self, row: &ExtendedDataRowId, name: &str, key: &str, visibility: &Visibility) -> bool {
        let mut rows = self.rows.write();
        let Some(stored) = rows.get_mut(row) else {
            return false;
        };
        let removed = stored
            .cells
            .remove(&PropertyKey::new(key, name, visibility.clone()))
            .is_some();
        if stored.cells.is_empty() {
            rows.remove(row);
        }
        removed
    }

    /// Deletes a whole row; returns whether it existed.
    pub fn delete_row(&self, row: &ExtendedDataRowId) -> bool {
        self.rows.write().remove(row).is_some()
    }

    /// Deletes every row owned by an element, returning their ids.
    pub fn delete_element_rows(&self, kind: ElementKind, element_id: &str) -> Vec<ExtendedDataRowId> {
        let mut rows = self.rows.write();
        let ids: Vec<ExtendedDataRowId> = rows
            .keys()
            .filter(|id| id.element_kind == kind && id.element_id == element_id)
            .cloned()
            .collect();
        for id in &ids {
            rows.remove(id);
        }
        ids
    }

    /// One row as seen by `auths`.
    pub fn row(&self, id: &ExtendedDataRowId, auths: &Authorizations) -> Option<ExtendedDataRow> {
        self.rows.read().get(id)?.visible(id, auths)
    }

    /// Every cell of a row regardless of visibility, for indexing.
    pub(crate) fn raw_cells(&self, id: &ExtendedDataRowId) -> Vec<ExtendedDataCell> {
        self.rows
            .read()
            .get(id)
            .map(|row| row.cells.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Names of tables holding at least one readable row for an element.
    pub fn table_names(&self, kind: ElementKind, element_id: &str, auths: &Authorizations) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let start = ExtendedDataRowId::new(kind, element_id, "", "");
        let rows = self.rows.read();
        for (id, row) in rows.range((Bound::Included(start), Bound::Unbounded)) {
            if id.element_kind != kind || id.element_id != element_id {
                break;
            }
            if names.last() == Some(&id.table_name) {
                continue;
            }
            if row.cells.values().any(|c| c.visibility.evaluate(auths)) {
                names.push(id.table_name.clone());
            }
        }
        names
    }

    /// Readable rows matching `scan`, in row order.
    pub fn scan(&self, scan: &ExtendedDataScan, auths: &Authorizations) -> Vec<ExtendedDataRow> {
        let rows = self.rows.read();
        let lower = match scan.lower_bound() {
            Some(start) => Bound::Included(start),
            None => Bound::Unbounded,
        };
        rows.range((lower, Bound::Unbounded))
            .take_while(|(id, _)| scan.in_prefix(id))
            .filter(|(id, _)| scan.matches(id))
            .filter_map(|(id, row)| row.visible(id, auths))
            .collect()
    }

    /// Removes every row.
    pub fn clear(&self) {
        self.rows.write().clear();
    }
}
