//! ledger.rs
//! Per-run store of computed values keyed by (variable, period).

use crate::entity::{EntityKind, PopulationError};
use crate::legislation::ParameterError;
use crate::period::{Period, PeriodError, PeriodUnit};
use crate::store::{RegistryError, Scalar, ValueType, VariableId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub use self::error::{ComputationError, CycleFrame};
mod error {
    use super::*;
    use thiserror::Error;

    /// One (variable, period) request on the evaluation stack.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct CycleFrame {
        pub variable: String,
        pub period: Period,
    }

    impl fmt::Display for CycleFrame {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}<{}>", self.variable, self.period)
        }
    }

    fn render_cycle(cycle: &[CycleFrame]) -> String {
        cycle.iter().map(ToString::to_string).collect::<Vec<_>>().join(" -> ")
    }

    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum ComputationError {
        #[error(transparent)]
        Registry(#[from] RegistryError),
        #[error(transparent)]
        Parameter(#[from] ParameterError),
        #[error(transparent)]
        Period(#[from] PeriodError),
        #[error(transparent)]
        Population(#[from] PopulationError),
        #[error("Variable '{variable}' has no variant in force at {period}")]
        NoApplicableVariant { variable: String, period: Period },
        #[error("Cyclic dependency: {}", render_cycle(.cycle))]
        CyclicDependency { cycle: Vec<CycleFrame> },
        #[error("Dependency chain exceeds {depth} frames at '{variable}' over {period}")]
        RecursionLimit { depth: usize, variable: String, period: Period },
        #[error("Variable '{variable}' is defined per {unit} and cannot be computed over {period}")]
        PeriodMismatch { variable: String, period: Period, unit: PeriodUnit },
        #[error("Variable '{variable}' expects {expected} values, got {actual}")]
        ShapeMismatch { variable: String, expected: usize, actual: usize },
        #[error("Variable '{variable}' holds {expected} values, got {actual}")]
        TypeMismatch { variable: String, expected: ValueType, actual: ValueType },
        #[error("Variable '{variable}' is defined over {entity}, which the population lacks")]
        UnknownEntity { variable: String, entity: EntityKind },
        #[error("Value of '{variable}' over {period} is already set")]
        InputConflict { variable: String, period: Period },
        #[error("Formula error: {message}")]
        Formula { message: String },
    }

    impl ComputationError {
        /// An error raised by formula code itself.
        pub fn formula(message: impl Into<String>) -> Self {
            ComputationError::Formula { message: message.into() }
        }
    }
}

/// A population-sized array: one slot per person or per group.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Float(Arc<[f64]>),
    Bool(Arc<[bool]>),
}

impl Value {
    pub fn filled(value: Scalar, len: usize) -> Self {
        match value {
            Scalar::Float(v) => Value::Float(vec![v; len].into()),
            Scalar::Bool(v) => Value::Bool(vec![v; len].into()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Value::Float(v) => v.len(),
            Value::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Float(_) => ValueType::Float,
            Value::Bool(_) => ValueType::Bool,
        }
    }

    pub fn as_floats(&self) -> Option<&Arc<[f64]>> {
        match self {
            Value::Float(v) => Some(v),
            Value::Bool(_) => None,
        }
    }

    pub fn as_bools(&self) -> Option<&Arc<[bool]>> {
        match self {
            Value::Bool(v) => Some(v),
            Value::Float(_) => None,
        }
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self { Value::Float(v.into()) }
}

impl From<Vec<bool>> for Value {
    fn from(v: Vec<bool>) -> Self { Value::Bool(v.into()) }
}

impl From<&[f64]> for Value {
    fn from(v: &[f64]) -> Self { Value::Float(v.into()) }
}

impl From<&[bool]> for Value {
    fn from(v: &[bool]) -> Self { Value::Bool(v.into()) }
}

/// Identifies one computation: a variable over one normalized period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub variable: VariableId,
    pub period: Period,
}

impl CacheKey {
    pub fn new(variable: VariableId, period: Period) -> Self {
        Self { variable, period }
    }
}

/// How a ledger entry came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Supplied by the host before the run.
    Input,
    /// Produced by a variant.
    Formula,
    /// The variable's default, for an unset input or outside its variants.
    Default,
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    origin: Origin,
}

/// Write-once cache for a single run. Failed computations are never stored.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    values: HashMap<CacheKey, Entry>,
}

impl Ledger {
    pub fn new() -> Self { Self::default() }
    pub fn len(&self) -> usize { self.values.len() }
    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    #[inline(always)]
    pub fn get(&self, key: &CacheKey) -> Option<&Value> {
        self.values.get(key).map(|e| &e.value)
    }

    pub fn origin(&self, key: &CacheKey) -> Option<Origin> {
        self.values.get(key).map(|e| e.origin)
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.values.contains_key(key)
    }

    /// Stores `value` unless the slot is taken. Returns whether it was stored.
    pub fn insert(&mut self, key: CacheKey, value: Value, origin: Origin) -> bool {
        use std::collections::hash_map::Entry as Slot;
        match self.values.entry(key) {
            Slot::Occupied(_) => false,
            Slot::Vacant(slot) => {
                slot.insert(Entry { value, origin });
                true
            }
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &CacheKey> {
        self.values.keys()
    }
}
