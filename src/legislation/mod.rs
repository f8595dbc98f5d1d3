//! Legislation parameter store: a read-only, time-indexed tree of policy numbers.
pub mod error;
pub mod store;
pub mod tree;

pub use error::ParameterError;
pub use store::{Legislation, LegislationAt, LegislationBuilder};
pub use tree::{ParameterEntry, ParameterNode};
