//! Queries over the dependencies a run recorded.
pub mod topology;

pub use topology::DependencyGraph;
