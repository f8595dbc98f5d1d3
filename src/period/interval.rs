//! The `Period` value type and its algebra.

use super::{PeriodError, PeriodUnit, SubPeriods};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// A dated accounting interval: `size` consecutive `unit`s starting at `start`.
///
/// Equality, ordering and hashing go through the canonical form, so twelve months
/// starting on 1 January are the same period as that calendar year.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Period {
    unit: PeriodUnit,
    start: NaiveDate,
    size: u32,
}

impl Period {
    pub fn new(unit: PeriodUnit, start: NaiveDate, size: u32) -> Result<Self, PeriodError> {
        if size == 0 {
            return Err(PeriodError::EmptyPeriod);
        }
        unit.shift(start, i64::from(size))
            .ok_or(PeriodError::OutOfRange { start, unit, size: i64::from(size) })?;
        Ok(Self { unit, start, size })
    }

    /// A single `unit` starting at `start`. Callers guarantee the range is representable.
    pub(crate) fn single(unit: PeriodUnit, start: NaiveDate) -> Self {
        Self { unit, start, size: 1 }
    }

    pub fn year(year: i32) -> Result<Self, PeriodError> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| PeriodError::Parse { input: year.to_string() })?;
        Self::new(PeriodUnit::Year, start, 1)
    }

    pub fn month(year: i32, month: u32) -> Result<Self, PeriodError> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| PeriodError::Parse { input: format!("{}-{}", year, month) })?;
        Self::new(PeriodUnit::Month, start, 1)
    }

    pub fn day(date: NaiveDate) -> Self {
        Self::single(PeriodUnit::Day, date)
    }

    pub fn unit(&self) -> PeriodUnit { self.unit }
    pub fn start(&self) -> NaiveDate { self.start }
    pub fn size(&self) -> u32 { self.size }

    /// First day after the period, if representable.
    fn end(&self) -> Option<NaiveDate> {
        self.unit.shift(self.start, i64::from(self.size))
    }

    /// Last day of the period (inclusive).
    pub fn stop(&self) -> NaiveDate {
        self.end().and_then(|d| d.pred_opt()).unwrap_or(NaiveDate::MAX)
    }

    pub fn days(&self) -> i64 {
        (self.stop() - self.start).num_days() + 1
    }

    pub fn contains(&self, other: &Period) -> bool {
        self.start <= other.start && other.stop() <= self.stop()
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.stop()
    }

    /// The calendar `unit` enclosing the start of this period.
    pub fn first_of(&self, unit: PeriodUnit) -> Period {
        Self::single(unit, unit.floor(self.start))
    }

    /// The calendar year enclosing the start, whatever the requested length.
    pub fn normalize_to_year(&self) -> Period {
        self.first_of(PeriodUnit::Year)
    }

    pub fn this_year(&self) -> Period {
        self.normalize_to_year()
    }

    pub fn this_month(&self) -> Period {
        self.first_of(PeriodUnit::Month)
    }

    /// Normalizes a request against a variable defined per `unit`: the enclosing unit
    /// when the period fits inside it, an error when the period spills past it.
    pub fn fit_to(&self, unit: PeriodUnit) -> Result<Period, PeriodError> {
        let enclosing = self.first_of(unit);
        if self.stop() <= enclosing.stop() {
            Ok(enclosing)
        } else {
            Err(PeriodError::LongerThanUnit { period: *self, unit })
        }
    }

    /// Shifts by `n` periods of the same shape (`offset(-1)` is the previous period).
    pub fn offset(&self, n: i64) -> Result<Period, PeriodError> {
        let steps = n.saturating_mul(i64::from(self.size));
        let start = self.unit.shift(self.start, steps)
            .ok_or(PeriodError::OutOfRange { start: self.start, unit: self.unit, size: steps })?;
        Self::new(self.unit, start, self.size)
    }

    /// The `n` whole months preceding the month this period starts in.
    pub fn last_months(&self, n: u32) -> Result<Period, PeriodError> {
        let this_month = PeriodUnit::Month.floor(self.start);
        let start = PeriodUnit::Month.shift(this_month, -i64::from(n))
            .ok_or(PeriodError::OutOfRange { start: this_month, unit: PeriodUnit::Month, size: -i64::from(n) })?;
        Self::new(PeriodUnit::Month, start, n)
    }

    /// Splits the period into consecutive single-`unit` sub-periods.
    ///
    /// Fails unless the period starts on a `unit` boundary and spans a whole number of `unit`s.
    pub fn decompose(&self, unit: PeriodUnit) -> Result<SubPeriods, PeriodError> {
        let invalid = PeriodError::InvalidDecomposition { period: *self, unit };
        if !unit.is_aligned(self.start) {
            return Err(invalid);
        }
        let end = self.end().ok_or_else(|| invalid.clone())?;
        let count = match unit {
            _ if unit == self.unit => i64::from(self.size),
            PeriodUnit::Day => self.days(),
            PeriodUnit::Month if PeriodUnit::Month.is_aligned(end) => months_between(self.start, end),
            PeriodUnit::Year if PeriodUnit::Year.is_aligned(end) => i64::from(end.year() - self.start.year()),
            _ => return Err(invalid),
        };
        let count = u32::try_from(count).ok().filter(|c| *c > 0).ok_or(invalid)?;
        Ok(SubPeriods::new(unit, self.start, count))
    }

    /// Unit and size after folding whole months into years and whole-month day runs into months.
    pub(crate) fn canonical(&self) -> (NaiveDate, PeriodUnit, u32) {
        let (mut unit, mut size) = (self.unit, self.size);
        if unit == PeriodUnit::Day && PeriodUnit::Month.is_aligned(self.start) {
            if let Some(months) = self.whole_months() {
                unit = PeriodUnit::Month;
                size = months;
            }
        }
        if unit == PeriodUnit::Month && PeriodUnit::Year.is_aligned(self.start) && size % 12 == 0 {
            unit = PeriodUnit::Year;
            size /= 12;
        }
        (self.start, unit, size)
    }

    fn whole_months(&self) -> Option<u32> {
        let end = self.end()?;
        if !PeriodUnit::Month.is_aligned(end) {
            return None;
        }
        u32::try_from(months_between(self.start, end)).ok().filter(|m| *m > 0)
    }
}

fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    i64::from(to.year() - from.year()) * 12 + i64::from(to.month()) - i64::from(from.month())
}

impl PartialEq for Period {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for Period {}

impl Hash for Period {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl PartialOrd for Period {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Period {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical().cmp(&other.canonical())
    }
}
