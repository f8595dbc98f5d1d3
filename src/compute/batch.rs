//! Independent runs over shared definitions, spread across the rayon pool.

use crate::compute::engine::{Request, Simulation};
use crate::compute::ledger::{ComputationError, Value};
use crate::config::EngineConfig;
use crate::entity::Population;
use crate::legislation::Legislation;
use crate::period::Period;
use crate::store::Registry;
use rayon::prelude::*;
use tracing::debug;

/// A value supplied by the host before a run.
#[derive(Debug, Clone)]
pub struct Input {
    pub variable: String,
    pub period: Period,
    pub value: Value,
}

impl Input {
    pub fn new(variable: impl Into<String>, period: Period, value: impl Into<Value>) -> Self {
        Self { variable: variable.into(), period, value: value.into() }
    }
}

/// One simulation run: a population, its inputs and the queries to answer.
#[derive(Debug, Clone)]
pub struct Job {
    pub population: Population,
    pub inputs: Vec<Input>,
    pub requests: Vec<Request>,
}

/// Per-request results, or the input error that kept the run from starting.
pub type JobReport = Result<Vec<Result<Value, ComputationError>>, ComputationError>;

/// Runs one job on the current thread.
pub fn run_job(registry: &Registry, legislation: &Legislation, job: &Job, config: &EngineConfig) -> JobReport {
    let mut sim = Simulation::new(registry, legislation, &job.population, config.clone());
    for input in &job.inputs {
        sim.set_input(input.variable.as_str(), input.period, input.value.clone())?;
    }
    Ok(sim.calculate_many(&job.requests))
}

/// Runs every job in parallel. Each run owns its ledger and stack; only the registry
/// and legislation are shared.
pub fn run_batch(registry: &Registry, legislation: &Legislation, jobs: &[Job], config: &EngineConfig) -> Vec<JobReport> {
    debug!(jobs = jobs.len(), "running batch");
    jobs.par_iter()
        .map(|job| run_job(registry, legislation, job, config))
        .collect()
}
