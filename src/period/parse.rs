//! Text form of periods: `2013`, `2013-04`, `2013-04-15`, `month:2013-04:3`.

use super::{Period, PeriodError, PeriodUnit};
use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::str::FromStr;

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (start, unit, size) = self.canonical();
        let aligned = unit.is_aligned(start);
        let date = match unit {
            PeriodUnit::Year if aligned => format!("{}", start.year()),
            PeriodUnit::Month if aligned => format!("{:04}-{:02}", start.year(), start.month()),
            _ => start.format("%Y-%m-%d").to_string(),
        };
        if size == 1 && aligned {
            f.write_str(&date)
        } else {
            write!(f, "{}:{}:{}", unit, date, size)
        }
    }
}

fn parse_date(text: &str) -> Option<(PeriodUnit, NaiveDate)> {
    let parts: Vec<&str> = text.split('-').collect();
    let year: i32 = parts.first()?.parse().ok()?;
    match parts.len() {
        1 => Some((PeriodUnit::Year, NaiveDate::from_ymd_opt(year, 1, 1)?)),
        2 => Some((PeriodUnit::Month, NaiveDate::from_ymd_opt(year, parts[1].parse().ok()?, 1)?)),
        3 => {
            let date = NaiveDate::from_ymd_opt(year, parts[1].parse().ok()?, parts[2].parse().ok()?)?;
            Some((PeriodUnit::Day, date))
        }
        _ => None,
    }
}

impl FromStr for Period {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || PeriodError::Parse { input: s.to_string() };
        let parts: Vec<&str> = s.trim().split(':').collect();
        let (unit, start, size) = match parts.as_slice() {
            [date] => {
                let (unit, start) = parse_date(date).ok_or_else(err)?;
                (unit, start, 1)
            }
            [unit, date] => (unit.parse().map_err(|_| err())?, parse_date(date).ok_or_else(err)?.1, 1),
            [unit, date, size] => (
                unit.parse().map_err(|_| err())?,
                parse_date(date).ok_or_else(err)?.1,
                size.parse().map_err(|_| err())?,
            ),
            _ => return Err(err()),
        };
        Period::new(unit, start, size)
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.to_string()
    }
}

impl TryFrom<String> for Period {
    type Error = PeriodError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
