use std::marker::PhantomData;

use super::ops::{IndexHint, MutationOp, MutationPlan, MutationTarget};
use crate::error::Result;
use crate::graph::Graph;
use crate::model::{Edge, ElementId, Metadata, PropValue, Vertex, DEFAULT_KEY};
use crate::security::{Authorizations, Visibility};

mod sealed {
    pub trait Sealed {}
}

/// Element kind a mutation builder produces.
pub trait MutationKind: sealed::Sealed {
    /// Element returned by `save`.
    type Output;

    #[doc(hidden)]
    fn commit(graph: &Graph, plan: MutationPlan, auths: &Authorizations) -> Result<Self::Output>;
}

/// Marker for vertex mutations.
#[derive(Debug)]
pub enum VertexKind {}

/// Marker for edge mutations.
#[derive(Debug)]
pub enum EdgeKind {}

impl sealed::Sealed for VertexKind {}
impl sealed::Sealed for EdgeKind {}

impl MutationKind for VertexKind {
    type Output = Vertex;

    fn commit(graph: &Graph, plan: MutationPlan, auths: &Authorizations) -> Result<Vertex> {
        let record = graph.commit_plan(plan, auths)?;
        graph.saved_vertex(&record, auths)
    }
}

impl MutationKind for EdgeKind {
    type Output = Edge;

    fn commit(graph: &Graph, plan: MutationPlan, auths: &Authorizations) -> Result<Edge> {
        let record = graph.commit_plan(plan, auths)?;
        graph.saved_edge(&record, auths)
    }
}

/// Staged, copy-on-write changes to one element.
///
/// Nothing touches the graph until [`ElementMutation::save`]; operations then
/// apply in declaration order and commit atomically.
#[must_use = "mutations do nothing until saved"]
pub struct ElementMutation<'g, K: MutationKind> {
    graph: &'g Graph,
    plan: MutationPlan,
    _kind: PhantomData<K>,
}

/// Mutation producing a [`Vertex`].
pub type VertexMutation<'g> = ElementMutation<'g, VertexKind>;

/// Mutation producing an [`Edge`].
pub type EdgeMutation<'g> = ElementMutation<'g, EdgeKind>;

impl<'g, K: MutationKind> ElementMutation<'g, K> {
    pub(crate) fn new(graph: &'g Graph, target: MutationTarget) -> Self {
        Self {
            graph,
            plan: MutationPlan {
                target,
                ops: Vec::new(),
                index_hint: IndexHint::Index,
            },
            _kind: PhantomData,
        }
    }

    fn push(mut self, op: MutationOp) -> Self {
        self.plan.ops.push(op);
        self
    }

    /// Element being mutated.
    pub fn element_id(&self) -> ElementId {
        self.plan.element_id()
    }

    /// Sets the default-key property `name`, replacing its value and metadata.
    pub fn set_property(self, name: &str, value: impl Into<PropValue>, visibility: &Visibility) -> Self {
        self.set_property_with_metadata(name, value, Metadata::new(), visibility)
    }

    /// Sets the default-key property `name` with new metadata.
    pub fn set_property_with_metadata(
        self,
        name: &str,
        value: impl Into<PropValue>,
        metadata: Metadata,
        visibility: &Visibility,
    ) -> Self {
        self.push(MutationOp::WriteProperty {
            key: DEFAULT_KEY.to_owned(),
            name: name.to_owned(),
            value: value.into(),
            visibility: visibility.clone(),
            metadata: Some(metadata),
            timestamp: None,
            replace_metadata: true,
        })
    }

    /// Adds or updates the `(key, name, visibility)` property, keeping its metadata.
    pub fn add_property_value(
        self,
        key: &str,
        name: &str,
        value: impl Into<PropValue>,
        visibility: &Visibility,
    ) -> Self {
        self.add_property_value_with(key, name, value, None, None, visibility)
    }

    /// [`ElementMutation::add_property_value`] with optional metadata and timestamp.
    pub fn add_property_value_with(
        self,
        key: &str,
        name: &str,
        value: impl Into<PropValue>,
        metadata: Option<Metadata>,
        timestamp: Option<i64>,
        visibility: &Visibility,
    ) -> Self {
        self.push(MutationOp::WriteProperty {
            key: key.to_owned(),
            name: name.to_owned(),
            value: value.into(),
            visibility: visibility.clone(),
            metadata,
            timestamp,
            replace_metadata: false,
        })
    }

    /// Deletes the property with `key` and `name`; every readable visibility when
    /// `visibility` is `None`.
    pub fn delete_property(self, key: &str, name: &str, visibility: Option<&Visibility>) -> Self {
        self.push(MutationOp::DeleteProperty {
            key: key.to_owned(),
            name: name.to_owned(),
            visibility: visibility.cloned(),
            soft: false,
        })
    }

    /// Deletes every readable property named `name`.
    pub fn delete_properties(self, name: &str) -> Self {
        self.push(MutationOp::DeleteProperties {
            name: name.to_owned(),
            soft: false,
        })
    }

    /// Soft-deletes the property with `key` and `name`.
    pub fn soft_delete_property(self, key: &str, name: &str, visibility: Option<&Visibility>) -> Self {
        self.push(MutationOp::DeleteProperty {
            key: key.to_owned(),
            name: name.to_owned(),
            visibility: visibility.cloned(),
            soft: true,
        })
    }

    /// Soft-deletes every readable property named `name`.
    pub fn soft_delete_properties(self, name: &str) -> Self {
        self.push(MutationOp::DeleteProperties {
            name: name.to_owned(),
            soft: true,
        })
    }

    /// Hides a property for readers satisfying `visibility`.
    pub fn mark_property_hidden(
        self,
        key: &str,
        name: &str,
        property_visibility: &Visibility,
        visibility: &Visibility,
    ) -> Self {
        self.push(MutationOp::SetPropertyHidden {
            key: key.to_owned(),
            name: name.to_owned(),
            property_visibility: property_visibility.clone(),
            visibility: visibility.clone(),
            hidden: true,
        })
    }

    /// Reverses [`ElementMutation::mark_property_hidden`].
    pub fn mark_property_visible(
        self,
        key: &str,
        name: &str,
        property_visibility: &Visibility,
        visibility: &Visibility,
    ) -> Self {
        self.push(MutationOp::SetPropertyHidden {
            key: key.to_owned(),
            name: name.to_owned(),
            property_visibility: property_visibility.clone(),
            visibility: visibility.clone(),
            hidden: false,
        })
    }

    /// Moves a property to a new visibility. With `old_visibility` unset the
    /// first readable property with `key` and `name` moves.
    pub fn alter_property_visibility(
        self,
        key: &str,
        name: &str,
        old_visibility: Option<&Visibility>,
        new_visibility: &Visibility,
    ) -> Self {
        self.push(MutationOp::AlterPropertyVisibility {
            key: key.to_owned(),
            name: name.to_owned(),
            old_visibility: old_visibility.cloned(),
            new_visibility: new_visibility.clone(),
        })
    }

    /// Sets one metadata entry without touching the property's value or history.
    pub fn set_property_metadata(
        self,
        key: &str,
        name: &str,
        property_visibility: &Visibility,
        metadata_key: &str,
        value: impl Into<PropValue>,
        metadata_visibility: &Visibility,
    ) -> Self {
        self.push(MutationOp::SetPropertyMetadata {
            key: key.to_owned(),
            name: name.to_owned(),
            property_visibility: property_visibility.clone(),
            metadata_key: metadata_key.to_owned(),
            value: value.into(),
            metadata_visibility: metadata_visibility.clone(),
        })
    }

    /// Changes the element's visibility.
    pub fn alter_element_visibility(self, visibility: &Visibility) -> Self {
        self.push(MutationOp::AlterElementVisibility(visibility.clone()))
    }

    /// Hides the element for readers satisfying `visibility`.
    pub fn mark_hidden(self, visibility: &Visibility) -> Self {
        self.push(MutationOp::SetElementHidden {
            visibility: visibility.clone(),
            hidden: true,
        })
    }

    /// Reverses [`ElementMutation::mark_hidden`].
    pub fn mark_visible(self, visibility: &Visibility) -> Self {
        self.push(MutationOp::SetElementHidden {
            visibility: visibility.clone(),
            hidden: false,
        })
    }

    /// Writes an extended-data cell with the default key.
    pub fn add_extended_data(
        self,
        table: &str,
        row: &str,
        column: &str,
        value: impl Into<PropValue>,
        visibility: &Visibility,
    ) -> Self {
        self.add_extended_data_with(table, row, column, DEFAULT_KEY, value, None, visibility)
    }

    /// Writes an extended-data cell with an explicit key and optional timestamp.
    #[allow(clippy::too_many_arguments)]
    pub fn add_extended_data_with(
        self,
        table: &str,
        row: &str,
        column: &str,
        key: &str,
        value: impl Into<PropValue>,
        timestamp: Option<i64>,
        visibility: &Visibility,
    ) -> Self {
        self.push(MutationOp::AddExtendedData {
            table: table.to_owned(),
            row: row.to_owned(),
            column: column.to_owned(),
            key: key.to_owned(),
            value: value.into(),
            visibility: visibility.clone(),
            timestamp,
        })
    }

    /// Deletes one extended-data cell.
    pub fn delete_extended_data(
        self,
        table: &str,
        row: &str,
        column: &str,
        key: &str,
        visibility: &Visibility,
    ) -> Self {
        self.push(MutationOp::DeleteExtendedData {
            table: table.to_owned(),
            row: row.to_owned(),
            column: column.to_owned(),
            key: key.to_owned(),
            visibility: visibility.clone(),
        })
    }

    /// Deletes a whole extended-data row.
    pub fn delete_extended_data_row(self, table: &str, row: &str) -> Self {
        self.push(MutationOp::DeleteExtendedDataRow {
            table: table.to_owned(),
            row: row.to_owned(),
        })
    }

    /// Controls whether this commit reaches the search index.
    pub fn index_hint(mut self, hint: IndexHint) -> Self {
        self.plan.index_hint = hint;
        self
    }

    /// Detaches the staged changes for a batch commit.
    pub fn into_plan(self) -> MutationPlan {
        self.plan
    }

    /// Commits the staged changes and returns the element as the writer now sees it,
    /// hidden state included.
    pub fn save(self, auths: &Authorizations) -> Result<K::Output> {
        K::commit(self.graph, self.plan, auths)
    }
}

impl<'g> ElementMutation<'g, VertexKind> {
    /// Changes the vertex's concept type.
    pub fn alter_concept_type(self, concept_type: &str) -> Self {
        self.push(MutationOp::AlterTypeName(concept_type.to_owned()))
    }
}

impl<'g> ElementMutation<'g, EdgeKind> {
    /// Changes the edge's label.
    pub fn alter_edge_label(self, label: &str) -> Self {
        self.push(MutationOp::AlterTypeName(label.to_owned()))
    }
}
