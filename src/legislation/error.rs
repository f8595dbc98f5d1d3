use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Parameter '{path}' does not exist")]
    NotFound { path: String },
    #[error("Parameter '{path}' is not in effect on {date} (first effective {first})")]
    NotEffectiveYet { path: String, date: NaiveDate, first: NaiveDate },
    #[error("Parameter '{path}' was repealed on {since} and is not in force on {date}")]
    NotInForce { path: String, date: NaiveDate, since: NaiveDate },
    #[error("Parameter '{path}' is a branch, not a scalar")]
    NotAScalar { path: String },
    #[error("Parameter '{path}' is a scalar series, not a branch")]
    NotABranch { path: String },
    #[error("Parameter '{path}' declares {date} twice")]
    DuplicateEffectiveDate { path: String, date: NaiveDate },
    #[error("Parameter '{path}' has no entries")]
    EmptySeries { path: String },
    #[error("Parameter path '{path}' is used both as a branch and as a scalar")]
    PathConflict { path: String },
    #[error("Parameter path '{path}' is malformed")]
    InvalidPath { path: String },
}
