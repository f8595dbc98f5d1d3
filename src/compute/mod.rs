//! Evaluation of variables for one run: cache, scheduler, formula handle and helpers.
pub mod batch;
pub mod context;
pub mod engine;
pub mod kernel;
pub mod ledger;

pub use batch::{run_batch, Input, Job, JobReport};
pub use context::FormulaContext;
pub use engine::{Request, RequestMode, Simulation};
pub use ledger::{CacheKey, ComputationError, CycleFrame, Ledger, Origin, Value};
