//! Variable registry: names, entities, defaults and dated variants.
pub mod error;
pub mod registry;
pub mod types;
pub mod variable;
pub mod variant;

pub use error::RegistryError;
pub use registry::{Dispatch, Registry, VariableRef};
pub use types::{Scalar, ValueType, VariableId, VariableMeta};
pub use variable::{OutsidePolicy, Variable};
pub use variant::{Formula, Variant, VariantBody};
