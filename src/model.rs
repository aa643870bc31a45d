//! The model represents the static input data provided by the user.
use crate::plant::PlantMap;
use crate::reference::ReferenceTables;
use crate::region::RegionMap;
use crate::scenario::ScenarioConfig;
use crate::technology::TechnologyMap;
use anyhow::{Context, Result};
use std::ops::RangeInclusive;
use std::path::PathBuf;

pub mod parameters;
pub use parameters::ModelParameters;

/// Model definition
#[derive(Debug, Clone)]
pub struct Model {
    /// Path to model folder
    pub model_dir: PathBuf,
    /// Parameters from the model TOML file
    pub parameters: ModelParameters,
    /// Regions for the model
    pub regions: RegionMap,
    /// Technology archetypes
    pub technologies: TechnologyMap,
    /// The starting plant roster, sorted by ID
    pub plants: PlantMap,
    /// Cost and emissions reference data
    pub reference_tables: ReferenceTables,
}

/// Which part of the model horizon to simulate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum HorizonSelection {
    /// Every year from start to end
    #[default]
    Full,
    /// From the start year to the midpoint
    FirstHalf,
    /// From the year after the midpoint to the end year. Earlier years are still simulated but
    /// not reported.
    SecondHalf,
}

impl Model {
    /// All years of the model horizon
    pub fn horizon(&self) -> RangeInclusive<u32> {
        self.parameters.horizon()
    }

    /// The years to simulate for the given horizon selection
    pub fn select_horizon(&self, selection: HorizonSelection) -> RangeInclusive<u32> {
        let (start, end) = (self.parameters.start_year, self.parameters.end_year);
        let midpoint = start + (end - start) / 2;
        match selection {
            HorizonSelection::Full => start..=end,
            HorizonSelection::FirstHalf => start..=midpoint,
            HorizonSelection::SecondHalf => (midpoint + 1)..=end,
        }
    }

    /// Get the scenario with the given name
    pub fn scenario(&self, name: &str) -> Result<&ScenarioConfig> {
        self.parameters
            .scenarios
            .iter()
            .find(|scenario| scenario.name == name)
            .with_context(|| format!("No scenario named {name} in model"))
    }

    /// Select scenarios by name, or every scenario for "all"
    pub fn select_scenarios(&self, name: &str) -> Result<Vec<&ScenarioConfig>> {
        if name.eq_ignore_ascii_case("all") {
            return Ok(self.parameters.scenarios.iter().collect());
        }

        Ok(vec![self.scenario(name)?])
    }
}
