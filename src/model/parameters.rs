//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::input::{input_err_msg, read_toml};
use crate::scenario::ScenarioConfig;
use anyhow::{Context, Result, bail, ensure};
use itertools::Itertools;
use serde::Deserialize;
use std::ops::RangeInclusive;
use std::path::Path;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

/// Represents the contents of the entire model file.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct ModelParameters {
    /// The first simulated year, which reports the starting fleet
    pub start_year: u32,
    /// The last simulated year
    pub end_year: u32,
    /// Scenarios which can be run with this model
    pub scenarios: Vec<ScenarioConfig>,
}

/// Check that the horizon is valid
fn check_horizon(start_year: u32, end_year: u32) -> Result<()> {
    ensure!(
        start_year < end_year,
        "start_year must be before end_year (got {start_year} and {end_year})"
    );

    Ok(())
}

/// Check that at least one scenario is defined and that scenario names are unique
fn check_scenario_names(scenarios: &[ScenarioConfig]) -> Result<()> {
    ensure!(!scenarios.is_empty(), "At least one scenario must be defined");

    if let Some(name) = scenarios.iter().map(|s| s.name.as_str()).duplicates().next() {
        bail!("Duplicate scenario name: {name}");
    }

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// All simulated years
    pub fn horizon(&self) -> RangeInclusive<u32> {
        self.start_year..=self.end_year
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        check_horizon(self.start_year, self.end_year)?;
        check_scenario_names(&self.scenarios)?;

        for scenario in &self.scenarios {
            scenario
                .validate()
                .with_context(|| format!("Invalid scenario {}", scenario.name))?;

            if let Some(year) = scenario.net_zero_year {
                ensure!(
                    self.horizon().contains(&year),
                    "net_zero_year for scenario {} is outside the model horizon",
                    scenario.name
                );
            }

            // Nothing is decided in the first year, so events then would never fire
            for event in &scenario.events {
                ensure!(
                    event.year > self.start_year && event.year <= self.end_year,
                    "Event in {} for scenario {} must fall between {} and {}",
                    event.year,
                    scenario.name,
                    self.start_year + 1,
                    self.end_year
                );
            }
        }

        Ok(())
    }
}
