use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ElementKind, PropValue};
use crate::security::Visibility;

/// Identity of an extended-data row.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExtendedDataRowId {
    /// Kind of the owning element.
    pub element_kind: ElementKind,
    /// Id of the owning element.
    pub element_id: String,
    /// Table name.
    pub table_name: String,
    /// Row id within the table.
    pub row_id: String,
}

impl ExtendedDataRowId {
    /// Builds a row identity.
    pub fn new(
        element_kind: ElementKind,
        element_id: impl Into<String>,
        table_name: impl Into<String>,
        row_id: impl Into<String>,
    ) -> Self {
        Self {
            element_kind,
            element_id: element_id.into(),
            table_name: table_name.into(),
            row_id: row_id.into(),
        }
    }
}

impl fmt::Display for ExtendedDataRowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}/{}/{}",
            self.element_kind, self.element_id, self.table_name, self.row_id
        )
    }
}

/// One column value of an extended-data row, keyed by `(name, key, visibility)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtendedDataCell {
    /// Column name.
    pub name: String,
    /// Multivalue key.
    pub key: String,
    /// Cell value.
    pub value: PropValue,
    /// Cell visibility.
    pub visibility: Visibility,
    /// Time of the write.
    pub timestamp: i64,
}

/// Extended-data row as seen by one caller: only readable cells are present.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtendedDataRow {
    pub(crate) id: ExtendedDataRowId,
    pub(crate) cells: Vec<ExtendedDataCell>,
}

impl ExtendedDataRow {
    /// Row identity.
    pub fn id(&self) -> &ExtendedDataRowId {
        &self.id
    }

    /// Readable cells ordered by name, key, visibility.
    pub fn cells(&self) -> &[ExtendedDataCell] {
        &self.cells
    }

    /// First readable value in column `name`.
    pub fn property_value(&self, name: &str) -> Option<&PropValue> {
        self.cells.iter().find(|c| c.name == name).map(|c| &c.value)
    }

    /// Every readable value in column `name`.
    pub fn property_values(&self, name: &str) -> Vec<&PropValue> {
        self.cells
            .iter()
            .filter(|c| c.name == name)
            .map(|c| &c.value)
            .collect()
    }

    /// Distinct readable column names.
    pub fn column_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.cells.iter().map(|c| c.name.as_str()).collect();
        names.dedup();
        names
    }
}

/// Half-open id range `[start, end)`, optionally narrowed to a prefix.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdRange {
    start: Option<String>,
    end: Option<String>,
    prefix: Option<String>,
}

impl IdRange {
    /// Matches every id.
    pub fn all() -> Self {
        Self::default()
    }

    /// Ids in `[start, end)`; either bound may be open.
    pub fn new(start: Option<&str>, end: Option<&str>) -> Self {
        Self {
            start: start.map(str::to_owned),
            end: end.map(str::to_owned),
            prefix: None,
        }
    }

    /// Ids starting with `prefix`.
    pub fn prefix(prefix: &str) -> Self {
        Self {
            start: None,
            end: None,
            prefix: Some(prefix.to_owned()),
        }
    }

    /// Returns `true` when `id` falls in the range.
    pub fn contains(&self, id: &str) -> bool {
        self.start.as_deref().map_or(true, |s| id >= s)
            && self.end.as_deref().map_or(true, |e| id < e)
            && self.prefix.as_deref().map_or(true, |p| id.starts_with(p))
    }
}
