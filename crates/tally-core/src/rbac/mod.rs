//! Role-based access control.
//!
//! This module holds the process-wide role configuration and answers
//! permission questions for the excluded HTTP layer. Roles are registered
//! once at startup and immutable afterwards; [`RoleManager::can`] is a pure
//! function over that configuration and the caller-supplied role set, so
//! concurrent reads need no locking.
//!
//! # Default deny
//!
//! Absence of permission is expressed as `false`, never as an error. An
//! unknown entity type, action, or relation simply fails to match.
//!
//! # Relation resolution
//!
//! Computing which [`Relation`] applies to a caller/resource pair (is this
//! the caller's own record, a record of their organ, ...) is the calling
//! collaborator's responsibility. It arrives here as a value.

mod definition;
mod error;
mod manager;

pub use definition::{AttributeSet, PermissionEntry, Relation, RoleDefinition, RoleDefinitionBuilder};
pub use error::RbacError;
pub use manager::RoleManager;
