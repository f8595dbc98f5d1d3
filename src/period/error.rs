use super::{Period, PeriodUnit};
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PeriodError {
    #[error("Period size must be at least 1")]
    EmptyPeriod,
    #[error("Period of {size} {unit}(s) starting {start} leaves the calendar range")]
    OutOfRange { start: NaiveDate, unit: PeriodUnit, size: i64 },
    #[error("Period {period} cannot be decomposed into whole {unit} periods")]
    InvalidDecomposition { period: Period, unit: PeriodUnit },
    #[error("Period {period} is longer than one {unit}")]
    LongerThanUnit { period: Period, unit: PeriodUnit },
    #[error("Cannot parse period '{input}'")]
    Parse { input: String },
}
