use std::collections::BTreeSet;

use super::Direction;
use crate::error::{GraphError, Result};

/// Declarative description of which parts of an element a read materializes.
///
/// Accessors on a materialized element whose backing data was not requested
/// fail with [`GraphError::FetchHintViolation`] instead of returning empty data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchHints {
    include_all_properties: bool,
    property_names: Option<BTreeSet<String>>,
    include_property_metadata: bool,
    include_hidden: bool,
    include_out_edge_refs: bool,
    include_in_edge_refs: bool,
    edge_labels: Option<BTreeSet<String>>,
    include_edge_ids: bool,
    include_edge_vertex_ids: bool,
    include_extended_data_table_names: bool,
}

impl FetchHints {
    /// Identity and visibility only.
    pub const NONE: FetchHints = FetchHints {
        include_all_properties: false,
        property_names: None,
        include_property_metadata: false,
        include_hidden: false,
        include_out_edge_refs: false,
        include_in_edge_refs: false,
        edge_labels: None,
        include_edge_ids: true,
        include_edge_vertex_ids: true,
        include_extended_data_table_names: false,
    };

    /// Everything except hidden data.
    pub const ALL: FetchHints = FetchHints {
        include_all_properties: true,
        property_names: None,
        include_property_metadata: true,
        include_hidden: false,
        include_out_edge_refs: true,
        include_in_edge_refs: true,
        edge_labels: None,
        include_edge_ids: true,
        include_edge_vertex_ids: true,
        include_extended_data_table_names: true,
    };

    /// Everything, hidden data included.
    pub const ALL_INCLUDING_HIDDEN: FetchHints = FetchHints {
        include_all_properties: true,
        property_names: None,
        include_property_metadata: true,
        include_hidden: true,
        include_out_edge_refs: true,
        include_in_edge_refs: true,
        edge_labels: None,
        include_edge_ids: true,
        include_edge_vertex_ids: true,
        include_extended_data_table_names: true,
    };

    /// Properties and their metadata, no edge references.
    pub const PROPERTIES: FetchHints = FetchHints {
        include_all_properties: true,
        property_names: None,
        include_property_metadata: true,
        include_hidden: false,
        include_out_edge_refs: false,
        include_in_edge_refs: false,
        edge_labels: None,
        include_edge_ids: true,
        include_edge_vertex_ids: true,
        include_extended_data_table_names: false,
    };

    /// Edge references in both directions, no properties.
    pub const EDGE_REFS: FetchHints = FetchHints {
        include_all_properties: false,
        property_names: None,
        include_property_metadata: false,
        include_hidden: false,
        include_out_edge_refs: true,
        include_in_edge_refs: true,
        edge_labels: None,
        include_edge_ids: true,
        include_edge_vertex_ids: true,
        include_extended_data_table_names: false,
    };

    /// Starts a builder with nothing included.
    pub fn builder() -> FetchHintsBuilder {
        FetchHintsBuilder::new()
    }

    /// Returns `true` when any property may be materialized.
    pub fn includes_properties(&self) -> bool {
        self.include_all_properties || self.property_names.is_some()
    }

    /// Returns `true` when every property is materialized.
    pub fn includes_all_properties(&self) -> bool {
        self.include_all_properties
    }

    /// Returns `true` when properties named `name` are materialized.
    pub fn includes_property(&self, name: &str) -> bool {
        self.include_all_properties
            || self
                .property_names
                .as_ref()
                .is_some_and(|names| names.contains(name))
    }

    /// Returns `true` when property metadata is materialized.
    pub fn includes_property_metadata(&self) -> bool {
        self.include_property_metadata
    }

    /// Returns `true` when hidden elements and properties are returned.
    pub fn includes_hidden(&self) -> bool {
        self.include_hidden
    }

    /// Returns `true` when edge references in `direction` are materialized.
    pub fn includes_edge_refs(&self, direction: Direction) -> bool {
        match direction {
            Direction::Out => self.include_out_edge_refs,
            Direction::In => self.include_in_edge_refs,
            Direction::Both => self.include_out_edge_refs && self.include_in_edge_refs,
        }
    }

    /// Returns `true` when any edge reference is materialized.
    pub fn includes_any_edge_refs(&self) -> bool {
        self.include_out_edge_refs || self.include_in_edge_refs
    }

    /// Returns `true` when edge references with `label` are materialized.
    pub fn includes_edge_label(&self, label: &str) -> bool {
        self.edge_labels
            .as_ref()
            .map_or(true, |labels| labels.contains(label))
    }

    /// Returns `true` when edge references carry the edge id.
    pub fn includes_edge_ids(&self) -> bool {
        self.include_edge_ids
    }

    /// Returns `true` when edge references carry the opposite vertex id.
    pub fn includes_edge_vertex_ids(&self) -> bool {
        self.include_edge_vertex_ids
    }

    /// Returns `true` when extended-data table names are materialized.
    pub fn includes_extended_data_table_names(&self) -> bool {
        self.include_extended_data_table_names
    }
}

impl Default for FetchHints {
    fn default() -> Self {
        FetchHints::ALL
    }
}

/// Builder for [`FetchHints`]; [`FetchHintsBuilder::build`] validates the combination.
#[derive(Clone, Debug)]
pub struct FetchHintsBuilder {
    hints: FetchHints,
}

impl FetchHintsBuilder {
    /// Starts from [`FetchHints::NONE`].
    pub fn new() -> Self {
        Self {
            hints: FetchHints::NONE,
        }
    }

    /// Starts from an existing set of hints.
    pub fn from_hints(hints: &FetchHints) -> Self {
        Self {
            hints: hints.clone(),
        }
    }

    /// Materializes every property.
    pub fn include_all_properties(mut self, include: bool) -> Self {
        self.hints.include_all_properties = include;
        self
    }

    /// Materializes properties with the given names.
    pub fn property_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hints.property_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Materializes property metadata.
    pub fn include_property_metadata(mut self, include: bool) -> Self {
        self.hints.include_property_metadata = include;
        self
    }

    /// Returns hidden elements and properties.
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.hints.include_hidden = include;
        self
    }

    /// Materializes outgoing and incoming edge references.
    pub fn include_all_edge_refs(mut self, include: bool) -> Self {
        self.hints.include_out_edge_refs = include;
        self.hints.include_in_edge_refs = include;
        self
    }

    /// Materializes outgoing edge references.
    pub fn include_out_edge_refs(mut self, include: bool) -> Self {
        self.hints.include_out_edge_refs = include;
        self
    }

    /// Materializes incoming edge references.
    pub fn include_in_edge_refs(mut self, include: bool) -> Self {
        self.hints.include_in_edge_refs = include;
        self
    }

    /// Restricts edge references to the given labels.
    pub fn edge_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hints.edge_labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    /// Carries edge ids on edge references.
    pub fn include_edge_ids(mut self, include: bool) -> Self {
        self.hints.include_edge_ids = include;
        self
    }

    /// Carries opposite vertex ids on edge references.
    pub fn include_edge_vertex_ids(mut self, include: bool) -> Self {
        self.hints.include_edge_vertex_ids = include;
        self
    }

    /// Materializes extended-data table names.
    pub fn include_extended_data_table_names(mut self, include: bool) -> Self {
        self.hints.include_extended_data_table_names = include;
        self
    }

    /// Validates and freezes the hints.
    pub fn build(self) -> Result<FetchHints> {
        if !self.hints.include_edge_ids && !self.hints.include_edge_vertex_ids {
            return Err(GraphError::InvalidArgument(
                "fetch hints cannot exclude both edge ids and edge vertex ids".into(),
            ));
        }
        Ok(self.hints)
    }
}

impl Default for FetchHintsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
