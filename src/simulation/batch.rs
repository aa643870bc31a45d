//! Running several scenarios and repetitions as independent parallel runs.
use super::{SimulationResult, run};
use crate::model::Model;
use crate::scenario::ScenarioConfig;
use anyhow::Result;
use log::info;
use rayon::prelude::*;
use std::ops::RangeInclusive;

/// A single scenario run within a batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRun {
    /// The scenario, with the seed for this repetition
    pub scenario: ScenarioConfig,
    /// Zero-based repetition number
    pub repetition: u32,
}

/// Plan the runs for a batch.
///
/// Repetition `i` of a scenario uses the scenario's seed plus `i`. Runs are ordered by scenario,
/// then repetition.
pub fn plan_runs(scenarios: &[&ScenarioConfig], repetitions: u32) -> Vec<BatchRun> {
    scenarios
        .iter()
        .flat_map(|scenario| {
            (0..repetitions).map(move |repetition| BatchRun {
                scenario: scenario
                    .with_seed(scenario.random_seed.wrapping_add(u64::from(repetition))),
                repetition,
            })
        })
        .collect()
}

/// Run every planned run in parallel.
///
/// Results are returned in the same order as `runs`. The first error aborts the batch.
pub fn run_batch(
    model: &Model,
    runs: &[BatchRun],
    years: RangeInclusive<u32>,
) -> Result<Vec<SimulationResult>> {
    info!("Running {} scenario runs", runs.len());
    runs.par_iter()
        .map(|batch_run| run(model, &batch_run.scenario, years.clone()))
        .collect()
}
