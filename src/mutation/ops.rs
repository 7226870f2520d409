use crate::model::{ElementId, Metadata, PropValue};
use crate::security::Visibility;

/// One staged change. Applied in declaration order by [`super::apply`].
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum MutationOp {
    /// Writes a value. `replace_metadata` drops prior metadata when no new
    /// metadata is given; otherwise prior metadata is kept.
    WriteProperty {
        key: String,
        name: String,
        value: PropValue,
        visibility: Visibility,
        metadata: Option<Metadata>,
        timestamp: Option<i64>,
        replace_metadata: bool,
    },
    /// Deletes properties matching key and name; all readable visibilities when
    /// `visibility` is `None`.
    DeleteProperty {
        key: String,
        name: String,
        visibility: Option<Visibility>,
        soft: bool,
    },
    /// Deletes every readable property with a name.
    DeleteProperties { name: String, soft: bool },
    SetPropertyHidden {
        key: String,
        name: String,
        property_visibility: Visibility,
        visibility: Visibility,
        hidden: bool,
    },
    AlterPropertyVisibility {
        key: String,
        name: String,
        old_visibility: Option<Visibility>,
        new_visibility: Visibility,
    },
    SetPropertyMetadata {
        key: String,
        name: String,
        property_visibility: Visibility,
        metadata_key: String,
        value: PropValue,
        metadata_visibility: Visibility,
    },
    AlterElementVisibility(Visibility),
    SetElementHidden { visibility: Visibility, hidden: bool },
    /// Concept type for vertices, label for edges.
    AlterTypeName(String),
    AddExtendedData {
        table: String,
        row: String,
        column: String,
        key: String,
        value: PropValue,
        visibility: Visibility,
        timestamp: Option<i64>,
    },
    DeleteExtendedData {
        table: String,
        row: String,
        column: String,
        key: String,
        visibility: Visibility,
    },
    DeleteExtendedDataRow { table: String, row: String },
}

/// Element a mutation applies to.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum MutationTarget {
    NewVertex {
        id: String,
        visibility: Visibility,
        concept_type: String,
        timestamp: Option<i64>,
    },
    NewEdge {
        id: String,
        out_vertex_id: String,
        in_vertex_id: String,
        label: String,
        visibility: Visibility,
        timestamp: Option<i64>,
    },
    Existing(ElementId),
}

impl MutationTarget {
    pub(crate) fn element_id(&self) -> ElementId {
        match self {
            MutationTarget::NewVertex { id, .. } => ElementId::vertex(id.clone()),
            MutationTarget::NewEdge { id, .. } => ElementId::edge(id.clone()),
            MutationTarget::Existing(id) => id.clone(),
        }
    }
}

/// Whether a commit is pushed to the search index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IndexHint {
    /// Push the committed state to the index.
    #[default]
    Index,
    /// Skip the index for this commit.
    DoNotIndex,
}

/// A detached mutation, committed through [`crate::Graph::save_element_mutations`].
#[derive(Clone, Debug, PartialEq)]
pub struct MutationPlan {
    pub(crate) target: MutationTarget,
    pub(crate) ops: Vec<MutationOp>,
    pub(crate) index_hint: IndexHint,
}

impl MutationPlan {
    /// Element the plan applies to.
    pub fn element_id(&self) -> ElementId {
        self.target.element_id()
    }

    /// Number of staged operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns `true` when nothing is staged beyond the element itself.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
