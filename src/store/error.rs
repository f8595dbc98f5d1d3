use super::ValueType;
use crate::entity::EntityKind;
use crate::period::Period;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Variable '{name}' is already registered")]
    DuplicateVariable { name: String },
    #[error("Variable '{name}' has overlapping variants starting {first} and {second}")]
    OverlappingVariant { name: String, first: NaiveDate, second: NaiveDate },
    #[error("Variable names must not be empty")]
    EmptyName,
    #[error("Variable '{name}' is neither an input nor has any variant")]
    NoVariants { name: String },
    #[error("Variable '{name}' has an active window ending {stop} before it starts {start}")]
    InvalidWindow { name: String, start: NaiveDate, stop: NaiveDate },
    #[error("Variant of '{name}' ends {stop} before it starts {start}")]
    InvertedVariant { name: String, start: NaiveDate, stop: NaiveDate },
    #[error("Default of '{name}' is {actual} but the variable holds {expected} values")]
    DefaultTypeMismatch { name: String, expected: ValueType, actual: ValueType },
    #[error("Variable '{name}' is defined over {actual}, but its projection needs {expected}")]
    ProjectionEntityMismatch { name: String, expected: EntityKind, actual: EntityKind },
    #[error("Unknown variable '{name}'")]
    UnknownVariable { name: String },
    #[error("Variable '{name}' has no variant in force at {period}")]
    NoApplicableVariant { name: String, period: Period },
}
