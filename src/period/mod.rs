//! Period algebra: dated, unit-sized accounting intervals.
pub mod decompose;
pub mod error;
pub mod interval;
mod parse;
pub mod unit;

pub use decompose::SubPeriods;
pub use error::PeriodError;
pub use interval::Period;
pub use unit::PeriodUnit;
