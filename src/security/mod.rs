//! Cell-level security: visibility expressions and caller authorizations.

mod authorizations;
mod visibility;

pub use authorizations::Authorizations;
pub use visibility::Visibility;
