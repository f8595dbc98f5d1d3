//! Entity model: persons, group entities and role-aware projections between them.
pub mod error;
pub mod population;
pub mod projection;
pub mod role;

pub use error::PopulationError;
pub use population::{GroupStructure, Population, PopulationBuilder};
pub use projection::{Aggregation, Projection};
pub use role::{EntityKind, GroupKind, Role};
