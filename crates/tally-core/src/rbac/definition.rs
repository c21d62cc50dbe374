//! Role definitions and the permission matrix.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::RbacError;
use crate::store::User;

/// The caller's relationship to a resource.
///
/// A more specific relation never implies a broader one: `own` access to an
/// entity does not grant `all` access, and vice versa. Each must be granted
/// independently in the permission matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Relation {
    /// The resource belongs to the caller.
    Own,
    /// The resource belongs to an organ the caller is a member of.
    Organ,
    /// The resource is publicly visible.
    Public,
    /// Unrestricted: any resource of the entity type.
    All,
}

impl Relation {
    /// Parses a relation from its wire string.
    ///
    /// # Errors
    ///
    /// Returns [`RbacError::UnknownRelation`] for anything but the four
    /// defined relations.
    pub fn parse(s: &str) -> Result<Self, RbacError> {
        match s.to_lowercase().as_str() {
            "own" => Ok(Self::Own),
            "organ" => Ok(Self::Organ),
            "public" => Ok(Self::Public),
            "all" => Ok(Self::All),
            _ => Err(RbacError::UnknownRelation {
                value: s.to_string(),
            }),
        }
    }

    /// Returns the string representation of this relation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Own => "own",
            Self::Organ => "organ",
            Self::Public => "public",
            Self::All => "all",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The attributes a permission entry exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeSet {
    /// Wildcard: every attribute, including ones added later.
    All,
    /// An explicit set of attribute names.
    Named(BTreeSet<String>),
}

impl AttributeSet {
    /// Builds an attribute set from a list of names.
    ///
    /// The wildcard marker `"*"` anywhere in the list produces
    /// [`AttributeSet::All`].
    #[must_use]
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = BTreeSet::new();
        for name in names {
            let name = name.into();
            if name == "*" {
                return Self::All;
            }
            set.insert(name);
        }
        Self::Named(set)
    }

    /// Returns `true` if every requested attribute is permitted.
    ///
    /// An empty request is trivially permitted.
    #[must_use]
    pub fn permits(&self, requested: &[&str]) -> bool {
        match self {
            Self::All => true,
            Self::Named(named) => requested.iter().all(|attr| named.contains(*attr)),
        }
    }
}

/// Granted relations and their attribute sets for one (entity, action) pair.
pub type PermissionEntry = HashMap<Relation, AttributeSet>;

/// Predicate deciding whether a role applies to a user.
pub type AssignmentPredicate = Arc<dyn Fn(&User) -> bool + Send + Sync>;

/// A role: unique name, permission matrix, and assignment predicate.
///
/// Construct with [`RoleDefinition::builder`].
#[derive(Clone)]
pub struct RoleDefinition {
    name: String,
    /// Entity type to action to granted relations.
    permissions: HashMap<String, HashMap<String, PermissionEntry>>,
    assignment: AssignmentPredicate,
}

impl RoleDefinition {
    /// Starts building a role with the given unique name.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> RoleDefinitionBuilder {
        RoleDefinitionBuilder {
            name: name.into(),
            permissions: HashMap::new(),
            assignment: None,
        }
    }

    /// The role's unique name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up the permission entry for an (entity type, action) pair.
    #[must_use]
    pub fn entry(&self, entity_type: &str, action: &str) -> Option<&PermissionEntry> {
        self.permissions.get(entity_type)?.get(action)
    }

    /// Evaluates the assignment predicate against a user.
    #[must_use]
    pub fn assigned_to(&self, user: &User) -> bool {
        (self.assignment)(user)
    }
}

impl fmt::Debug for RoleDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleDefinition")
            .field("name", &self.name)
            .field("entries", &self.permissions.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`RoleDefinition`].
pub struct RoleDefinitionBuilder {
    name: String,
    permissions: HashMap<String, HashMap<String, PermissionEntry>>,
    assignment: Option<AssignmentPredicate>,
}

impl RoleDefinitionBuilder {
    /// Grants `relation` on `(entity_type, action)` with the given
    /// attributes.
    ///
    /// `"*"` among the attributes grants the wildcard. Granting the same
    /// relation twice replaces the earlier attribute set.
    #[must_use]
    pub fn grant<I, S>(
        mut self,
        entity_type: impl Into<String>,
        action: impl Into<String>,
        relation: Relation,
        attributes: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions
            .entry(entity_type.into())
            .or_default()
            .entry(action.into())
            .or_default()
            .insert(relation, AttributeSet::from_names(attributes));
        self
    }

    /// Sets the assignment predicate.
    ///
    /// Unset, the role is assigned to nobody automatically and only ever
    /// arrives in a caller's role set from the session context.
    #[must_use]
    pub fn assign_when(mut self, predicate: impl Fn(&User) -> bool + Send + Sync + 'static) -> Self {
        self.assignment = Some(Arc::new(predicate));
        self
    }

    /// Finishes the definition.
    #[must_use]
    pub fn build(self) -> RoleDefinition {
        RoleDefinition {
            name: self.name,
            permissions: self.permissions,
            assignment: self.assignment.unwrap_or_else(|| Arc::new(|_| false)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_parse() {
        assert_eq!(Relation::parse("own").unwrap(), Relation::Own);
        assert_eq!(Relation::parse("ORGAN").unwrap(), Relation::Organ);
        assert_eq!(Relation::parse("public").unwrap(), Relation::Public);
        assert_eq!(Relation::parse("all").unwrap(), Relation::All);
    }

    #[test]
    fn test_relation_parse_invalid() {
        let result = Relation::parse("other");
        assert!(matches!(result, Err(RbacError::UnknownRelation { .. })));
    }

    #[test]
    fn test_relation_as_str() {
        assert_eq!(Relation::Own.as_str(), "own");
        assert_eq!(Relation::Organ.as_str(), "organ");
        assert_eq!(Relation::Public.as_str(), "public");
        assert_eq!(Relation::All.as_str(), "all");
    }

    #[test]
    fn test_attribute_set_wildcard() {
        let set = AttributeSet::from_names(["id", "*", "balance"]);
        assert_eq!(set, AttributeSet::All);
        assert!(set.permits(&["anything"]));
    }

    #[test]
    fn test_attribute_set_named() {
        let set = AttributeSet::from_names(["id", "balance"]);
        assert!(set.permits(&["id"]));
        assert!(set.permits(&["id", "balance"]));
        assert!(!set.permits(&["id", "email"]));
        assert!(set.permits(&[]));
    }

    #[test]
    fn test_builder_grants_are_independent_per_relation() {
        let role = RoleDefinition::builder("treasurer")
            .grant("Fine", "get", Relation::All, ["*"])
            .grant("Fine", "get", Relation::Own, ["id"])
            .build();

        let entry = role.entry("Fine", "get").unwrap();
        assert_eq!(entry.get(&Relation::All), Some(&AttributeSet::All));
        assert_eq!(
            entry.get(&Relation::Own),
            Some(&AttributeSet::from_names(["id"]))
        );
        assert!(entry.get(&Relation::Organ).is_none());
    }

    #[test]
    fn test_regrant_replaces_attribute_set() {
        let role = RoleDefinition::builder("clerk")
            .grant("User", "update", Relation::Own, ["name"])
            .grant("User", "update", Relation::Own, ["name", "email"])
            .build();

        let entry = role.entry("User", "update").unwrap();
        assert_eq!(
            entry.get(&Relation::Own),
            Some(&AttributeSet::from_names(["name", "email"]))
        );
    }

    #[test]
    fn test_default_assignment_matches_nobody() {
        use crate::store::{User, UserType};

        let role = RoleDefinition::builder("ghost").build();
        let user = User::new(1, "someone", UserType::Member);
        assert!(!role.assigned_to(&user));
    }
}
