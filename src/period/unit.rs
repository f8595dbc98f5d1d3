//! Calendar units and the date arithmetic behind them.

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Granularity of a period. Ordered from finest to coarsest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodUnit {
    Day,
    Month,
    Year,
}

impl PeriodUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            PeriodUnit::Day => "day",
            PeriodUnit::Month => "month",
            PeriodUnit::Year => "year",
        }
    }

    /// First day of the unit-sized calendar period containing `date`.
    pub fn floor(self, date: NaiveDate) -> NaiveDate {
        match self {
            PeriodUnit::Day => date,
            PeriodUnit::Month => date - Days::new(u64::from(date.day0())),
            PeriodUnit::Year => date - Days::new(u64::from(date.ordinal0())),
        }
    }

    pub fn is_aligned(self, date: NaiveDate) -> bool {
        self.floor(date) == date
    }

    /// Moves `date` by `n` units. `None` when the result leaves chrono's calendar range.
    pub fn shift(self, date: NaiveDate, n: i64) -> Option<NaiveDate> {
        match self {
            PeriodUnit::Day => {
                let days = Days::new(n.unsigned_abs());
                if n >= 0 { date.checked_add_days(days) } else { date.checked_sub_days(days) }
            }
            PeriodUnit::Month => shift_months(date, n),
            PeriodUnit::Year => shift_months(date, n.checked_mul(12)?),
        }
    }
}

fn shift_months(date: NaiveDate, n: i64) -> Option<NaiveDate> {
    let months = Months::new(u32::try_from(n.unsigned_abs()).ok()?);
    if n >= 0 { date.checked_add_months(months) } else { date.checked_sub_months(months) }
}

impl fmt::Display for PeriodUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PeriodUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(PeriodUnit::Day),
            "month" => Ok(PeriodUnit::Month),
            "year" => Ok(PeriodUnit::Year),
            other => Err(format!("unknown period unit '{}'", other)),
        }
    }
}
