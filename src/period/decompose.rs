use super::{Period, PeriodUnit};
use chrono::NaiveDate;
use std::iter::FusedIterator;

/// Lazy sequence of consecutive single-unit periods produced by [`Period::decompose`].
///
/// Cloning yields an independent cursor, so a decomposition can be walked more than once.
#[derive(Debug, Clone)]
pub struct SubPeriods {
    unit: PeriodUnit,
    origin: NaiveDate,
    index: u32,
    count: u32,
}

impl SubPeriods {
    pub(super) fn new(unit: PeriodUnit, origin: NaiveDate, count: u32) -> Self {
        Self { unit, origin, index: 0, count }
    }

    pub fn unit(&self) -> PeriodUnit { self.unit }
}

impl Iterator for SubPeriods {
    type Item = Period;

    fn next(&mut self) -> Option<Period> {
        if self.index >= self.count {
            return None;
        }
        // Always shift from the origin so month lengths never accumulate drift.
        let start = self.unit.shift(self.origin, i64::from(self.index))?;
        self.index += 1;
        Some(Period::single(self.unit, start))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.count - self.index) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for SubPeriods {}
impl FusedIterator for SubPeriods {}
