//! Human-readable renderings of a run.
pub mod trace;

pub use trace::format_trace;
