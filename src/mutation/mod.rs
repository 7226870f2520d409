//! Staged element mutations and the pure function that applies them.

pub(crate) mod apply;
mod builder;
mod ops;

pub use builder::{EdgeKind, EdgeMutation, ElementMutation, MutationKind, VertexKind, VertexMutation};
pub(crate) use ops::MutationTarget;
pub use ops::{IndexHint, MutationPlan};
