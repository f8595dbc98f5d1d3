//! Roles, group kinds and entity kinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A member's fixed position inside its group.
///
/// The set is closed: one primary, one partner, and numbered dependents starting at 1.
/// `Dependent(0)` has no text form and is rejected when a population is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Role {
    Primary,
    Partner,
    Dependent(u8),
}

impl Role {
    pub fn is_dependent(self) -> bool {
        matches!(self, Role::Dependent(_))
    }

    /// `Dependent(1) ..= Dependent(max)`.
    pub fn dependents(max: u8) -> Vec<Role> {
        (1..=max).map(Role::Dependent).collect()
    }

    /// Primary and partner.
    pub fn adults() -> [Role; 2] {
        [Role::Primary, Role::Partner]
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Primary => f.write_str("primary"),
            Role::Partner => f.write_str("partner"),
            Role::Dependent(n) => write!(f, "dependent-{}", n),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(Role::Primary),
            "partner" => Ok(Role::Partner),
            other => other
                .strip_prefix("dependent-")
                .and_then(|n| n.parse::<u8>().ok())
                .filter(|n| *n >= 1)
                .map(Role::Dependent)
                .ok_or_else(|| format!("unknown role '{}'", other)),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.to_string()
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Name of a kind of group entity, e.g. `household` or `tax_unit`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupKind(pub String);

impl GroupKind {
    pub fn new(name: impl Into<String>) -> Self { Self(name.into()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl From<&str> for GroupKind {
    fn from(name: &str) -> Self { Self(name.to_string()) }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The entity a variable is defined over: one slot per person, or one per group of a kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Person,
    Group(GroupKind),
}

impl EntityKind {
    pub fn group(kind: impl Into<String>) -> Self {
        EntityKind::Group(GroupKind::new(kind))
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Person => f.write_str("person"),
            EntityKind::Group(kind) => write!(f, "group '{}'", kind),
        }
    }
}
