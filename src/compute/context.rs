//! The handle a formula receives: recursive requests, parameters and projections, nothing else.

use crate::compute::engine::Simulation;
use crate::compute::ledger::{ComputationError, Value};
use crate::entity::{EntityKind, GroupKind, Population, Projection};
use crate::legislation::{Legislation, LegislationAt};
use crate::period::Period;
use crate::store::{Scalar, ValueType, VariableRef};
use chrono::NaiveDate;
use std::sync::Arc;

pub struct FormulaContext<'s, 'a> {
    sim: &'s mut Simulation<'a>,
}

impl<'s, 'a> FormulaContext<'s, 'a> {
    pub(crate) fn new(sim: &'s mut Simulation<'a>) -> Self {
        Self { sim }
    }

    pub fn calculate<R: VariableRef>(&mut self, variable: R, period: Period) -> Result<Value, ComputationError> {
        self.sim.calculate(variable, period)
    }

    pub fn calculate_add<R: VariableRef>(&mut self, variable: R, period: Period) -> Result<Value, ComputationError> {
        self.sim.calculate_add(variable, period)
    }

    pub fn calculate_divide<R: VariableRef>(&mut self, variable: R, period: Period) -> Result<Value, ComputationError> {
        self.sim.calculate_divide(variable, period)
    }

    pub fn calculate_add_divide<R: VariableRef>(&mut self, variable: R, period: Period) -> Result<Value, ComputationError> {
        self.sim.calculate_add_divide(variable, period)
    }

    /// [`calculate`](Self::calculate) for a numeric variable.
    pub fn floats<R: VariableRef>(&mut self, variable: R, period: Period) -> Result<Arc<[f64]>, ComputationError> {
        let value = self.sim.calculate(variable, period)?;
        expect_floats(value)
    }

    /// [`calculate_add`](Self::calculate_add) for a numeric variable.
    pub fn floats_add<R: VariableRef>(&mut self, variable: R, period: Period) -> Result<Arc<[f64]>, ComputationError> {
        let value = self.sim.calculate_add(variable, period)?;
        expect_floats(value)
    }

    pub fn bools<R: VariableRef>(&mut self, variable: R, period: Period) -> Result<Arc<[bool]>, ComputationError> {
        match self.sim.calculate(variable, period)? {
            Value::Bool(v) => Ok(v),
            other => Err(ComputationError::formula(format!(
                "expected {} values, got {}",
                ValueType::Bool,
                other.value_type()
            ))),
        }
    }

    /// The parameter at `path` in force on `date`.
    pub fn parameter(&self, path: &str, date: NaiveDate) -> Result<f64, ComputationError> {
        Ok(self.sim.legislation().resolve(path, date)?)
    }

    /// The legislation as it stood on `date`.
    pub fn legislation_at(&self, date: NaiveDate) -> LegislationAt<'a> {
        self.sim.legislation().at(date)
    }

    pub fn legislation(&self) -> &'a Legislation { self.sim.legislation() }
    pub fn population(&self) -> &'a Population { self.sim.population() }
    pub fn persons(&self) -> usize { self.sim.population().persons() }

    pub fn projection(&self, kind: &str) -> Result<Projection<'a>, ComputationError> {
        Ok(self.sim.population().projection(&GroupKind::from(kind))?)
    }

    /// Number of slots of `entity`, e.g. to size a literal array.
    pub fn count(&self, entity: &EntityKind) -> Result<usize, ComputationError> {
        self.sim.population().count(entity).ok_or_else(|| {
            ComputationError::formula(format!("population has no {}", entity))
        })
    }

    /// An array over `entity` with every slot set to `value`.
    pub fn filled(&self, entity: &EntityKind, value: impl Into<Scalar>) -> Result<Value, ComputationError> {
        Ok(Value::filled(value.into(), self.count(entity)?))
    }
}

fn expect_floats(value: Value) -> Result<Arc<[f64]>, ComputationError> {
    match value {
        Value::Float(v) => Ok(v),
        other => Err(ComputationError::formula(format!(
            "expected {} values, got {}",
            ValueType::Float,
            other.value_type()
        ))),
    }
}
