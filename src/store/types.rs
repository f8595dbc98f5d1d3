use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed request token for a registered variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct VariableId(pub u32);

impl VariableId {
    #[inline(always)]
    pub fn index(&self) -> usize { self.0 as usize }
    pub fn new(idx: usize) -> Self { Self(idx as u32) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Float,
    Bool,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Float => f.write_str("float"),
            ValueType::Bool => f.write_str("bool"),
        }
    }
}

/// A single cell, used for defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Float(f64),
    Bool(bool),
}

impl Scalar {
    pub fn value_type(&self) -> ValueType {
        match self {
            Scalar::Float(_) => ValueType::Float,
            Scalar::Bool(_) => ValueType::Bool,
        }
    }

    /// The zero of a type: `0.0` or `false`.
    pub fn zero(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Float => Scalar::Float(0.0),
            ValueType::Bool => Scalar::Bool(false),
        }
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self { Scalar::Float(v) }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self { Scalar::Bool(v) }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Float(v) => write!(f, "{:.3}", v),
            Scalar::Bool(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableMeta {
    pub name: String,
    pub label: Option<String>,
    /// Where the rule comes from, e.g. a statute article.
    pub reference: Option<String>,
}
