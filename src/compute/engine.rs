//! A synchronous, single-threaded evaluator for one simulation run.
use crate::analysis::topology::DependencyGraph;
use crate::compute::context::FormulaContext;
use crate::compute::ledger::{CacheKey, ComputationError, CycleFrame, Ledger, Origin, Value};
use crate::config::EngineConfig;
use crate::entity::Population;
use crate::legislation::Legislation;
use crate::period::{Period, PeriodError};
use crate::store::{Dispatch, Registry, RegistryError, Scalar, ValueType, Variable, VariableId, VariableRef, VariantBody};
use std::collections::HashSet;
use tracing::{debug, trace, warn};

/// How a request combines values of the variable's natural period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// Exactly one natural period.
    #[default]
    Calculate,
    /// Sum over the natural periods covering the request.
    Add,
    /// Share of the enclosing natural period.
    Divide,
    /// Piecewise add or divide over the request's own unit.
    AddDivide,
}

/// One host query.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub variable: String,
    pub period: Period,
    pub mode: RequestMode,
}

impl Request {
    pub fn new(variable: impl Into<String>, period: Period) -> Self {
        Self { variable: variable.into(), period, mode: RequestMode::Calculate }
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }
}

/// A run: the shared definitions, the borrowed population, and the run's own cache and stack.
pub struct Simulation<'a> {
    registry: &'a Registry,
    legislation: &'a Legislation,
    population: &'a Population,
    config: EngineConfig,
    ledger: Ledger,
    stack: Vec<CacheKey>,
    in_flight: HashSet<CacheKey>,
    topology: DependencyGraph,
}

impl<'a> Simulation<'a> {
    pub fn new(
        registry: &'a Registry,
        legislation: &'a Legislation,
        population: &'a Population,
        config: EngineConfig,
    ) -> Self {
        debug!(variables = registry.len(), persons = population.persons(), "starting simulation");
        Self {
            registry,
            legislation,
            population,
            config,
            ledger: Ledger::new(),
            stack: Vec::new(),
            in_flight: HashSet::new(),
            topology: DependencyGraph::new(),
        }
    }

    pub fn registry(&self) -> &'a Registry { self.registry }
    pub fn legislation(&self) -> &'a Legislation { self.legislation }
    pub fn population(&self) -> &'a Population { self.population }
    pub fn config(&self) -> &EngineConfig { &self.config }
    pub fn ledger(&self) -> &Ledger { &self.ledger }
    pub fn topology(&self) -> &DependencyGraph { &self.topology }
    pub fn depth(&self) -> usize { self.stack.len() }

    /// The key a request for `variable` over `period` is cached under.
    pub fn cache_key<R: VariableRef>(&self, variable: R, period: Period) -> Result<CacheKey, ComputationError> {
        let registry = self.registry;
        let (id, var) = registry.lookup(&variable)?;
        Ok(CacheKey::new(id, Self::natural_period(var, period)?))
    }

    /// Seeds the value of `variable` over one of its natural periods.
    pub fn set_input<R: VariableRef>(
        &mut self,
        variable: R,
        period: Period,
        value: impl Into<Value>,
    ) -> Result<(), ComputationError> {
        let registry = self.registry;
        let (id, var) = registry.lookup(&variable)?;
        let natural = Self::natural_period(var, period)?;
        if natural != period {
            return Err(ComputationError::PeriodMismatch {
                variable: var.name().to_string(),
                period,
                unit: var.unit(),
            });
        }
        let value = value.into();
        self.validate(var, &value)?;
        if !self.ledger.insert(CacheKey::new(id, period), value, Origin::Input) {
            return Err(ComputationError::InputConflict { variable: var.name().to_string(), period });
        }
        trace!(variable = %var.name(), period = %period, "seeded input");
        Ok(())
    }

    /// The value of `variable` over the natural period enclosing `period`, computed at most once per run.
    pub fn calculate<R: VariableRef>(&mut self, variable: R, period: Period) -> Result<Value, ComputationError> {
        let registry = self.registry;
        let (id, var) = registry.lookup(&variable)?;
        let key = CacheKey::new(id, Self::natural_period(var, period)?);

        if let Some(value) = self.ledger.get(&key) {
            trace!(variable = %var.name(), period = %key.period, "cache hit");
            let value = value.clone();
            self.record_dependency(key);
            return Ok(value);
        }
        if self.in_flight.contains(&key) {
            return Err(ComputationError::CyclicDependency { cycle: self.cycle_through(key) });
        }
        if self.stack.len() >= self.config.max_depth {
            return Err(ComputationError::RecursionLimit {
                depth: self.config.max_depth,
                variable: var.name().to_string(),
                period: key.period,
            });
        }

        self.stack.push(key);
        self.in_flight.insert(key);
        let result = self.evaluate(id, var, key.period);
        self.stack.pop();
        self.in_flight.remove(&key);

        let (origin, returned, value) = result?;
        self.store(key, var, returned, value.clone(), origin);
        self.record_dependency(key);
        Ok(value)
    }

    /// Sum of the variable over every natural period covering `period`.
    pub fn calculate_add<R: VariableRef>(&mut self, variable: R, period: Period) -> Result<Value, ComputationError> {
        let registry = self.registry;
        let (id, var) = registry.lookup(&variable)?;
        self.expect_floats(var)?;
        let mut total = vec![0.0; self.slot_count(var)?];
        for part in period.decompose(var.unit())? {
            let value = self.calculate(id, part)?;
            let floats = self.floats_of(var, &value)?;
            for (t, v) in total.iter_mut().zip(floats.iter()) {
                *t += v;
            }
        }
        Ok(total.into())
    }

    /// A coarser variable over one sub-unit: the enclosing natural value split evenly.
    pub fn calculate_divide<R: VariableRef>(&mut self, variable: R, period: Period) -> Result<Value, ComputationError> {
        let registry = self.registry;
        let (id, var) = registry.lookup(&variable)?;
        self.expect_floats(var)?;
        if period.size() != 1 {
            return Err(PeriodError::InvalidDecomposition { period, unit: period.unit() }.into());
        }
        let enclosing = period.first_of(var.unit());
        let parts = enclosing.decompose(period.unit())?.len() as f64;
        let value = self.calculate(id, enclosing)?;
        let floats = self.floats_of(var, &value)?;
        Ok(floats.iter().map(|v| v / parts).collect::<Vec<f64>>().into())
    }

    /// Cuts `period` into pieces of its own unit and adds or divides per piece as the
    /// variable's unit requires.
    pub fn calculate_add_divide<R: VariableRef>(&mut self, variable: R, period: Period) -> Result<Value, ComputationError> {
        let registry = self.registry;
        let (id, var) = registry.lookup(&variable)?;
        self.expect_floats(var)?;
        let mut total = vec![0.0; self.slot_count(var)?];
        for piece in period.decompose(period.unit())? {
            let value = if var.unit() <= piece.unit() {
                self.calculate_add(id, piece)?
            } else {
                self.calculate_divide(id, piece)?
            };
            for (t, v) in total.iter_mut().zip(self.floats_of(var, &value)?.iter()) {
                *t += v;
            }
        }
        Ok(total.into())
    }

    pub fn run(&mut self, request: &Request) -> Result<Value, ComputationError> {
        let variable = request.variable.as_str();
        match request.mode {
            RequestMode::Calculate => self.calculate(variable, request.period),
            RequestMode::Add => self.calculate_add(variable, request.period),
            RequestMode::Divide => self.calculate_divide(variable, request.period),
            RequestMode::AddDivide => self.calculate_add_divide(variable, request.period),
        }
    }

    /// Runs every request; a failure is reported in its slot and does not stop the others.
    pub fn calculate_many(&mut self, requests: &[Request]) -> Vec<Result<Value, ComputationError>> {
        requests.iter().map(|r| self.run(r)).collect()
    }

    // --- Internals ---

    fn natural_period(var: &Variable, period: Period) -> Result<Period, ComputationError> {
        period.fit_to(var.unit()).map_err(|_| ComputationError::PeriodMismatch {
            variable: var.name().to_string(),
            period,
            unit: var.unit(),
        })
    }

    fn evaluate(
        &mut self,
        id: VariableId,
        var: &'a Variable,
        period: Period,
    ) -> Result<(Origin, Period, Value), ComputationError> {
        let registry = self.registry;
        let (origin, returned, value) = match registry.dispatch(id, period) {
            Dispatch::Input | Dispatch::Default => {
                (Origin::Default, period, Value::filled(var.default_value(), self.slot_count(var)?))
            }
            Dispatch::Missing => {
                return Err(ComputationError::NoApplicableVariant { variable: var.name().to_string(), period });
            }
            Dispatch::Variant(variant) => {
                debug!(variable = %var.name(), period = %period, variant = %variant.start(), "dispatching");
                if let VariantBody::EntityToPerson { source, .. } | VariantBody::PersonToEntity { source, .. } =
                    variant.body()
                {
                    let (_, source_var) = registry.lookup(source.as_str())?;
                    if let Some(expected) = variant.body().source_entity().filter(|e| e != source_var.entity()) {
                        return Err(RegistryError::ProjectionEntityMismatch {
                            name: source_var.name().to_string(),
                            expected,
                            actual: source_var.entity().clone(),
                        }
                        .into());
                    }
                }
                match variant.body() {
                    VariantBody::Formula(formula) => {
                        let (returned, value) = formula.compute(&mut FormulaContext::new(self), period)?;
                        (Origin::Formula, returned, value)
                    }
                    VariantBody::EntityToPerson { source, group, role } => {
                        let source = self.calculate(source.as_str(), period)?;
                        let projection = self.population.projection(group)?;
                        let value: Value = match (&source, var.default_value()) {
                            (Value::Float(v), Scalar::Float(d)) => {
                                projection.project_entity_to_person(&v[..], *role, d)?.into()
                            }
                            (Value::Bool(v), Scalar::Bool(d)) => {
                                projection.project_entity_to_person(&v[..], *role, d)?.into()
                            }
                            (other, _) => {
                                return Err(ComputationError::TypeMismatch {
                                    variable: var.name().to_string(),
                                    expected: var.value_type(),
                                    actual: other.value_type(),
                                })
                            }
                        };
                        (Origin::Formula, period, value)
                    }
                    VariantBody::PersonToEntity { source, group, aggregation, roles } => {
                        let source = self.calculate(source.as_str(), period)?;
                        let value = self
                            .population
                            .projection(group)?
                            .project_person_to_entity(&source, *aggregation, roles.as_deref())?;
                        (Origin::Formula, period, value)
                    }
                }
            }
        };
        self.validate(var, &value)?;
        Ok((origin, returned, value))
    }

    /// Files a fresh result under the requested key, and under the period the variant
    /// reported when that is a different natural period with a free slot.
    fn store(&mut self, key: CacheKey, var: &Variable, returned: Period, value: Value, origin: Origin) {
        if returned != key.period {
            let natural = returned.fit_to(var.unit()).map_or(false, |p| p == returned);
            let alias = CacheKey::new(key.variable, returned);
            if natural && !self.ledger.contains(&alias) && !self.in_flight.contains(&alias) {
                self.ledger.insert(alias, value.clone(), origin);
            } else {
                warn!(
                    variable = %var.name(),
                    requested = %key.period,
                    returned = %returned,
                    "variant result not stored under its returned period"
                );
            }
        }
        if !self.ledger.insert(key, value, origin) {
            warn!(variable = %var.name(), period = %key.period, "result already cached; keeping the first");
        }
    }

    fn record_dependency(&mut self, key: CacheKey) {
        if !self.config.record_dependencies {
            return;
        }
        match self.stack.last() {
            Some(&consumer) => self.topology.record(consumer, key),
            None => self.topology.add_key(key),
        }
    }

    fn cycle_through(&self, key: CacheKey) -> Vec<CycleFrame> {
        let start = self.stack.iter().position(|k| *k == key).unwrap_or(0);
        self.stack[start..]
            .iter()
            .chain(std::iter::once(&key))
            .map(|k| CycleFrame {
                variable: self.registry.get(k.variable).map_or_else(String::new, |v| v.name().to_string()),
                period: k.period,
            })
            .collect()
    }

    pub(crate) fn slot_count(&self, var: &Variable) -> Result<usize, ComputationError> {
        self.population.count(var.entity()).ok_or_else(|| ComputationError::UnknownEntity {
            variable: var.name().to_string(),
            entity: var.entity().clone(),
        })
    }

    fn validate(&self, var: &Variable, value: &Value) -> Result<(), ComputationError> {
        if value.value_type() != var.value_type() {
            return Err(ComputationError::TypeMismatch {
                variable: var.name().to_string(),
                expected: var.value_type(),
                actual: value.value_type(),
            });
        }
        let expected = self.slot_count(var)?;
        if value.len() != expected {
            return Err(ComputationError::ShapeMismatch {
                variable: var.name().to_string(),
                expected,
                actual: value.len(),
            });
        }
        Ok(())
    }

    fn expect_floats(&self, var: &Variable) -> Result<(), ComputationError> {
        match var.value_type() {
            ValueType::Float => Ok(()),
            actual => Err(ComputationError::TypeMismatch {
                variable: var.name().to_string(),
                expected: ValueType::Float,
                actual,
            }),
        }
    }

    fn floats_of<'v>(&self, var: &Variable, value: &'v Value) -> Result<&'v [f64], ComputationError> {
        value.as_floats().map(|v| &v[..]).ok_or_else(|| ComputationError::TypeMismatch {
            variable: var.name().to_string(),
            expected: ValueType::Float,
            actual: value.value_type(),
        })
    }
}
