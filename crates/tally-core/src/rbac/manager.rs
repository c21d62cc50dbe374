//! The role registry and permission evaluation.

use std::collections::HashMap;

use tracing::debug;

use super::definition::{Relation, RoleDefinition};
use super::error::RbacError;
use crate::store::User;

/// Holds every registered role and answers permission questions.
///
/// Registration happens once at startup; afterwards the manager is shared
/// behind `&self` and evaluated concurrently without locking.
#[derive(Debug, Default)]
pub struct RoleManager {
    roles: HashMap<String, RoleDefinition>,
}

impl RoleManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a role definition.
    ///
    /// # Errors
    ///
    /// Returns [`RbacError::DuplicateRole`] if a role with the same name is
    /// already registered.
    pub fn register(&mut self, definition: RoleDefinition) -> Result<(), RbacError> {
        let name = definition.name().to_string();
        if self.roles.contains_key(&name) {
            return Err(RbacError::DuplicateRole { name });
        }
        debug!(role = %name, "registered role");
        self.roles.insert(name, definition);
        Ok(())
    }

    /// Decides whether any of the caller's roles permits the request.
    ///
    /// For each role the caller holds, the permission entry for
    /// `(entity_type, action)` is looked up; the request is granted if
    /// `relation` is present in the entry and the requested attributes are
    /// a subset of the permitted set. The first satisfying role wins.
    ///
    /// Unknown role names, entity types, and actions do not match and never
    /// produce an error: absence of permission is `false`.
    #[must_use]
    pub fn can<R: AsRef<str>>(
        &self,
        caller_roles: &[R],
        action: &str,
        relation: Relation,
        entity_type: &str,
        attributes: &[&str],
    ) -> bool {
        caller_roles.iter().any(|role_name| {
            let Some(role) = self.roles.get(role_name.as_ref()) else {
                return false;
            };
            let Some(entry) = role.entry(entity_type, action) else {
                return false;
            };
            entry
                .get(&relation)
                .is_some_and(|attrs| attrs.permits(attributes))
        })
    }

    /// Returns the names of all roles whose assignment predicate matches
    /// the user, sorted for deterministic output.
    #[must_use]
    pub fn assigned_roles(&self, user: &User) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .roles
            .values()
            .filter(|role| role.assigned_to(user))
            .map(RoleDefinition::name)
            .collect();
        names.sort_unstable();
        names
    }

    /// The number of registered roles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Returns `true` if no roles are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}
