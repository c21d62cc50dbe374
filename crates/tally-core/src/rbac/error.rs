//! RBAC-specific error types.

use thiserror::Error;

/// Errors from role registration.
///
/// Permission checks never produce errors; see the module docs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum RbacError {
    /// A role with this name is already registered.
    #[error("role already registered: {name}")]
    DuplicateRole {
        /// The conflicting role name.
        name: String,
    },

    /// An unknown relation string was parsed.
    #[error("unknown relation: {value}")]
    UnknownRelation {
        /// The invalid value provided.
        value: String,
    },
}
