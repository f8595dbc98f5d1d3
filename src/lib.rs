//! Evaluation engine for versioned, period-scoped, parameter-driven formulas.
//!
//! Hosts register variables once in a [`Registry`], build the [`Legislation`] parameter
//! tree once, and then open a [`Simulation`] per [`Population`] to ask for values:
//!
//! ```
//! use chrono::NaiveDate;
//! use levy_core::{EngineConfig, EntityKind, Legislation, Period, PeriodUnit, Population, Registry, Role, Simulation, Value, Variable};
//!
//! let start = NaiveDate::from_ymd_opt(2010, 1, 1).unwrap();
//! let mut registry = Registry::new();
//! registry.register(Variable::float("salary", EntityKind::Person, PeriodUnit::Month).input()).unwrap();
//! registry
//!     .register(Variable::float("contribution", EntityKind::Person, PeriodUnit::Year).variant(start, None, |ctx, p| {
//!         let rate = ctx.parameter("social.rate", p.start())?;
//!         let salary = ctx.floats_add("salary", p)?;
//!         Ok((p, Value::from(salary.iter().map(|s| s * rate).collect::<Vec<_>>())))
//!     }))
//!     .unwrap();
//!
//! let legislation = Legislation::builder().set("social.rate", start, 0.1).build().unwrap();
//! let population = Population::builder(1).group("household", [(0, Role::Primary)]).build().unwrap();
//!
//! let mut sim = Simulation::new(&registry, &legislation, &population, EngineConfig::default());
//! for month in Period::year(2013).unwrap().decompose(PeriodUnit::Month).unwrap() {
//!     sim.set_input("salary", month, vec![1000.0]).unwrap();
//! }
//! let contribution = sim.calculate("contribution", Period::year(2013).unwrap()).unwrap();
//! assert_eq!(contribution, Value::from(vec![1200.0]));
//! ```

pub mod analysis;
pub mod compute;
pub mod config;
pub mod display;
pub mod entity;
pub mod legislation;
pub mod period;
pub mod store;

pub use compute::{CacheKey, ComputationError, FormulaContext, Request, RequestMode, Simulation, Value};
pub use config::{ConfigError, EngineConfig};
pub use entity::{Aggregation, EntityKind, GroupKind, Population, PopulationError, Role};
pub use legislation::{Legislation, ParameterError};
pub use period::{Period, PeriodError, PeriodUnit};
pub use store::{RegistryError, Registry, Scalar, ValueType, Variable, VariableId};
