use super::{GroupKind, Role};
use crate::store::ValueType;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PopulationError {
    #[error("Person {person} is out of range (population has {persons})")]
    UnknownPerson { person: usize, persons: usize },
    #[error("Person {person} already belongs to a '{kind}' group")]
    AlreadyAssigned { person: usize, kind: GroupKind },
    #[error("Person {person} belongs to no '{kind}' group")]
    Unassigned { person: usize, kind: GroupKind },
    #[error("Role {role} appears twice in '{kind}' group {group}")]
    DuplicateRole { kind: GroupKind, group: usize, role: Role },
    #[error("Role {role} in '{kind}' group {group} is invalid: dependents are numbered from 1")]
    InvalidRole { kind: GroupKind, group: usize, role: Role },
    #[error("'{kind}' group {group} has no members")]
    EmptyGroup { kind: GroupKind, group: usize },
    #[error("Population has no '{kind}' groups")]
    UnknownGroupKind { kind: GroupKind },
    #[error("Expected {expected} values for '{kind}' projection, got {actual}")]
    LengthMismatch { kind: GroupKind, expected: usize, actual: usize },
    #[error("Aggregation {aggregation} does not apply to {value_type} values")]
    UnsupportedAggregation { aggregation: String, value_type: ValueType },
}
