//! The module responsible for writing output data to disk.
use crate::plant::PlantID;
use crate::region::RegionID;
use crate::simulation::SimulationResult;
use crate::simulation::decision::{DecisionRecord, DecisionTrigger, Rationale};
use crate::simulation::emissions::{FleetSnapshot, PlantEmissions};
use crate::technology::TechnologyID;
use crate::units::{
    Capacity, Emissions, EmissionsPerProduction, Money, MoneyPerProduction, Production,
};
use anyhow::{Context, Result, ensure};
use serde::Serialize;
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

pub mod metadata;
use metadata::write_metadata;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "steel_transition_results";

/// The output file name for decisions
const DECISIONS_FILE_NAME: &str = "decisions.csv";

/// The output file name for candidate appraisals
const DECISION_CANDIDATES_FILE_NAME: &str = "decision_candidates.csv";

/// The output file name for fleet snapshots
const FLEET_SNAPSHOTS_FILE_NAME: &str = "fleet_snapshots.csv";

/// The output file name for fleet capacity by technology and region
const FLEET_CAPACITY_FILE_NAME: &str = "fleet_capacity.csv";

/// The output file name for plant emissions
const PLANT_EMISSIONS_FILE_NAME: &str = "plant_emissions.csv";

/// The output file name for unresolved plants
const UNRESOLVED_PLANTS_FILE_NAME: &str = "unresolved_plants.csv";

/// Get the default output directory for the model in the specified directory
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Canonicalise in case the user has specified "."
    let model_dir = model_dir
        .canonicalize()
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory.
///
/// If the directory already exists and isn't empty, it is only replaced if `overwrite` is set.
///
/// # Returns
///
/// True if an existing directory was replaced
pub fn create_output_directory(output_dir: &Path, overwrite: bool) -> Result<bool> {
    let is_nonempty = output_dir.is_dir() && fs::read_dir(output_dir)?.next().is_some();
    if is_nonempty {
        ensure!(
            overwrite,
            "Output folder already exists and is not empty. Use --overwrite to replace it."
        );
        fs::remove_dir_all(output_dir)?;
    }

    fs::create_dir_all(output_dir)?;

    Ok(is_nonempty)
}

/// The folder for a single run within a batch.
///
/// Runs are placed in a subfolder named after the scenario when several scenarios are run, and
/// in a further subfolder per repetition when there is more than one.
pub fn get_run_dir(
    output_dir: &Path,
    scenario_name: &str,
    repetition: u32,
    multiple_scenarios: bool,
    multiple_repetitions: bool,
) -> PathBuf {
    let mut path = output_dir.to_path_buf();
    if multiple_scenarios {
        path.push(scenario_name);
    }
    if multiple_repetitions {
        path.push(format!("repetition_{repetition}"));
    }

    path
}

/// Represents a row in the decisions CSV file
#[derive(Serialize, Debug, PartialEq)]
struct DecisionRow {
    year: u32,
    plant_id: PlantID,
    trigger: DecisionTrigger,
    prior_technology: TechnologyID,
    chosen_technology: Option<TechnologyID>,
    rationale: Rationale,
    capex_spent: Money,
}

impl DecisionRow {
    fn new(decision: &DecisionRecord) -> Self {
        Self {
            year: decision.year,
            plant_id: decision.plant_id.clone(),
            trigger: decision.trigger,
            prior_technology: decision.prior_technology.clone(),
            chosen_technology: decision.chosen_technology.clone(),
            rationale: decision.rationale,
            capex_spent: decision.capex_spent,
        }
    }
}

/// Represents a row in the decision candidates CSV file
#[derive(Serialize, Debug, PartialEq)]
struct CandidateRow {
    year: u32,
    plant_id: PlantID,
    rank: usize,
    technology_id: TechnologyID,
    tco: MoneyPerProduction,
    emissions: EmissionsPerProduction,
    cycle_length: u32,
    exclusion: Option<String>,
}

/// Represents a row in the fleet snapshots CSV file
#[derive(Serialize, Debug, PartialEq)]
struct SnapshotRow {
    year: u32,
    production: Production,
    operating_cost: Money,
    capex: Money,
    total_cost: Money,
    scope1: Emissions,
    scope2: Emissions,
    scope3: Emissions,
    baseline_emissions: Emissions,
    annual_abatement: Emissions,
    cumulative_abatement: Emissions,
}

impl SnapshotRow {
    fn new(snapshot: &FleetSnapshot) -> Self {
        Self {
            year: snapshot.year,
            production: snapshot.production,
            operating_cost: snapshot.operating_cost,
            capex: snapshot.capex,
            total_cost: snapshot.total_cost(),
            scope1: snapshot.scope1,
            scope2: snapshot.scope2,
            scope3: snapshot.scope3,
            baseline_emissions: snapshot.baseline_emissions,
            annual_abatement: snapshot.annual_abatement,
            cumulative_abatement: snapshot.cumulative_abatement,
        }
    }
}

/// Represents a row in the fleet capacity CSV file
#[derive(Serialize, Debug, PartialEq)]
struct CapacityRow {
    year: u32,
    technology_id: TechnologyID,
    region_id: RegionID,
    capacity: Capacity,
}

/// Represents a row in the plant emissions CSV file
#[derive(Serialize, Debug, PartialEq)]
struct PlantEmissionsRow {
    year: u32,
    plant_id: PlantID,
    technology_id: TechnologyID,
    region_id: RegionID,
    production: Production,
    scope1: Emissions,
    scope2: Emissions,
    scope3: Emissions,
}

impl PlantEmissionsRow {
    fn new(emissions: &PlantEmissions) -> Self {
        Self {
            year: emissions.year,
            plant_id: emissions.plant_id.clone(),
            technology_id: emissions.technology_id.clone(),
            region_id: emissions.region_id.clone(),
            production: emissions.production,
            scope1: emissions.scope1,
            scope2: emissions.scope2,
            scope3: emissions.scope3,
        }
    }
}

/// Represents a row in the unresolved plants CSV file
#[derive(Serialize, Debug, PartialEq)]
struct UnresolvedRow {
    year: u32,
    plant_id: PlantID,
    technology_id: TechnologyID,
}

/// For writing extra debug information about the model
struct DebugDataWriter {
    candidates_writer: csv::Writer<File>,
}

impl DebugDataWriter {
    /// Open CSV files to write debug info to
    fn create(output_path: &Path) -> Result<Self> {
        let file_path = output_path.join(DECISION_CANDIDATES_FILE_NAME);
        Ok(Self {
            candidates_writer: csv::Writer::from_path(file_path)?,
        })
    }

    /// Write every candidate considered in each decision
    fn write_candidates<'a, I>(&mut self, decisions: I) -> Result<()>
    where
        I: Iterator<Item = &'a DecisionRecord>,
    {
        for decision in decisions {
            for (rank, candidate) in decision.candidates.iter().enumerate() {
                let row = CandidateRow {
                    year: decision.year,
                    plant_id: decision.plant_id.clone(),
                    rank: rank + 1,
                    technology_id: candidate.technology_id.clone(),
                    tco: candidate.tco,
                    emissions: candidate.emissions,
                    cycle_length: candidate.cycle_length,
                    exclusion: candidate.exclusion.as_ref().map(ToString::to_string),
                };
                self.candidates_writer.serialize(row)?;
            }
        }

        Ok(())
    }

    /// Flush the underlying streams
    fn flush(&mut self) -> Result<()> {
        self.candidates_writer.flush()?;

        Ok(())
    }
}

/// An object for writing the results of a scenario run to file
pub struct DataWriter {
    decisions_writer: csv::Writer<File>,
    snapshots_writer: csv::Writer<File>,
    capacity_writer: csv::Writer<File>,
    plant_emissions_writer: csv::Writer<File>,
    unresolved_writer: csv::Writer<File>,
    debug_writer: Option<DebugDataWriter>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    /// * `save_debug_info` - Whether to include extra CSV files for debugging model
    pub fn create(output_path: &Path, save_debug_info: bool) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        let debug_writer = if save_debug_info {
            Some(DebugDataWriter::create(output_path)?)
        } else {
            None
        };

        Ok(Self {
            decisions_writer: new_writer(DECISIONS_FILE_NAME)?,
            snapshots_writer: new_writer(FLEET_SNAPSHOTS_FILE_NAME)?,
            capacity_writer: new_writer(FLEET_CAPACITY_FILE_NAME)?,
            plant_emissions_writer: new_writer(PLANT_EMISSIONS_FILE_NAME)?,
            unresolved_writer: new_writer(UNRESOLVED_PLANTS_FILE_NAME)?,
            debug_writer,
        })
    }

    /// Write decisions to a CSV file
    pub fn write_decisions<'a, I>(&mut self, decisions: I) -> Result<()>
    where
        I: Iterator<Item = &'a DecisionRecord> + Clone,
    {
        for decision in decisions.clone() {
            self.decisions_writer.serialize(DecisionRow::new(decision))?;
        }

        if let Some(ref mut wtr) = self.debug_writer {
            wtr.write_candidates(decisions)?;
        }

        Ok(())
    }

    /// Write fleet snapshots and capacity to CSV files
    pub fn write_snapshots<'a, I>(&mut self, snapshots: I) -> Result<()>
    where
        I: Iterator<Item = &'a FleetSnapshot>,
    {
        for snapshot in snapshots {
            self.snapshots_writer.serialize(SnapshotRow::new(snapshot))?;
            for ((technology_id, region_id), capacity) in &snapshot.capacity {
                let row = CapacityRow {
                    year: snapshot.year,
                    technology_id: technology_id.clone(),
                    region_id: region_id.clone(),
                    capacity: *capacity,
                };
                self.capacity_writer.serialize(row)?;
            }
        }

        Ok(())
    }

    /// Write plant emissions to a CSV file
    pub fn write_plant_emissions<'a, I>(&mut self, emissions: I) -> Result<()>
    where
        I: Iterator<Item = &'a PlantEmissions>,
    {
        for plant_emissions in emissions {
            self.plant_emissions_writer
                .serialize(PlantEmissionsRow::new(plant_emissions))?;
        }

        Ok(())
    }

    /// Write every part of a scenario run's results
    pub fn write_result(&mut self, result: &SimulationResult) -> Result<()> {
        self.write_decisions(result.decisions.iter())?;
        self.write_snapshots(result.snapshots.iter())?;
        self.write_plant_emissions(result.plant_emissions.iter())?;
        for unresolved in &result.unresolved {
            let row = UnresolvedRow {
                year: unresolved.year,
                plant_id: unresolved.plant_id.clone(),
                technology_id: unresolved.technology_id.clone(),
            };
            self.unresolved_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.decisions_writer.flush()?;
        self.snapshots_writer.flush()?;
        self.capacity_writer.flush()?;
        self.plant_emissions_writer.flush()?;
        self.unresolved_writer.flush()?;
        if let Some(ref mut wtr) = self.debug_writer {
            wtr.flush()?;
        }

        Ok(())
    }
}

/// Write the results of a scenario run, along with run metadata, to `output_path`
pub fn write_run_output(
    output_path: &Path,
    model_path: &Path,
    result: &SimulationResult,
    save_debug_info: bool,
) -> Result<()> {
    fs::create_dir_all(output_path)?;
    let mut writer = DataWriter::create(output_path, save_debug_info)?;
    writer.write_result(result)?;
    writer.flush()?;
    write_metadata(output_path, model_path, &result.scenario_name, result.random_seed)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::decision::{CandidateAppraisal, ExclusionReason};
    use indexmap::indexmap;
    use std::io::Read;
    use tempfile::tempdir;

    fn decision() -> DecisionRecord {
        DecisionRecord {
            plant_id: "P1".into(),
            year: 2030,
            trigger: DecisionTrigger::MainCycle,
            prior_technology: "BF-BOF".into(),
            chosen_technology: Some("H2-DRI".into()),
            candidates: vec![
                CandidateAppraisal {
                    technology_id: "H2-DRI".into(),
                    tco: MoneyPerProduction(350.0),
                    emissions: EmissionsPerProduction(0.1),
                    cycle_length: 20,
                    exclusion: None,
                },
                CandidateAppraisal {
                    technology_id: "BF-BOF".into(),
                    tco: MoneyPerProduction(300.0),
                    emissions: EmissionsPerProduction(2.0),
                    cycle_length: 22,
                    exclusion: Some(ExclusionReason::Moratorium),
                },
            ],
            rationale: Rationale::ConstraintForced,
            capex_spent: Money(1000.0),
        }
    }

    fn read_file(path: &Path) -> String {
        let mut contents = String::new();
        File::open(path)
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        contents
    }

    #[test]
    fn test_write_decisions() {
        let dir = tempdir().unwrap();
        let decision = decision();
        {
            let mut writer = DataWriter::create(dir.path(), false).unwrap();
            writer.write_decisions(std::iter::once(&decision)).unwrap();
            writer.flush().unwrap();
        }

        assert_eq!(
            read_file(&dir.path().join(DECISIONS_FILE_NAME)),
            "year,plant_id,trigger,prior_technology,chosen_technology,rationale,capex_spent\n\
            2030,P1,main_cycle,BF-BOF,H2-DRI,constraint-forced,1000.0\n"
        );
        assert!(!dir.path().join(DECISION_CANDIDATES_FILE_NAME).exists());
    }

    #[test]
    fn test_write_candidates() {
        let dir = tempdir().unwrap();
        let decision = decision();
        {
            let mut writer = DataWriter::create(dir.path(), true).unwrap();
            writer.write_decisions(std::iter::once(&decision)).unwrap();
            writer.flush().unwrap();
        }

        assert_eq!(
            read_file(&dir.path().join(DECISION_CANDIDATES_FILE_NAME)),
            "year,plant_id,rank,technology_id,tco,emissions,cycle_length,exclusion\n\
            2030,P1,1,H2-DRI,350.0,0.1,20,\n\
            2030,P1,2,BF-BOF,300.0,2.0,22,moratorium\n"
        );
    }

    #[test]
    fn test_write_snapshots() {
        let snapshot = FleetSnapshot {
            year: 2030,
            production: Production(950.0),
            capacity: indexmap! {("BF-BOF".into(), "EUR".into()) => Capacity(1000.0)},
            operating_cost: Money(10.0),
            capex: Money(5.0),
            scope1: Emissions(1.0),
            scope2: Emissions(2.0),
            scope3: Emissions(3.0),
            baseline_emissions: Emissions(4.0),
            annual_abatement: Emissions(1.0),
            cumulative_abatement: Emissions(2.0),
        };

        let dir = tempdir().unwrap();
        {
            let mut writer = DataWriter::create(dir.path(), false).unwrap();
            writer.write_snapshots(std::iter::once(&snapshot)).unwrap();
            writer.flush().unwrap();
        }

        assert_eq!(
            read_file(&dir.path().join(FLEET_CAPACITY_FILE_NAME)),
            "year,technology_id,region_id,capacity\n2030,BF-BOF,EUR,1000.0\n"
        );
        let snapshots = read_file(&dir.path().join(FLEET_SNAPSHOTS_FILE_NAME));
        assert!(snapshots.contains("2030,950.0,10.0,5.0,15.0,1.0,2.0,3.0,4.0,1.0,2.0"));
    }

    #[test]
    fn test_create_output_directory() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("results");

        // New directory
        assert!(!create_output_directory(&output_dir, false).unwrap());

        // Existing but empty
        assert!(!create_output_directory(&output_dir, false).unwrap());

        // Existing and non-empty
        fs::write(output_dir.join("file.txt"), "contents").unwrap();
        assert!(create_output_directory(&output_dir, false).is_err());
        assert!(create_output_directory(&output_dir, true).unwrap());
        assert!(!output_dir.join("file.txt").exists());
    }

    #[test]
    fn test_get_run_dir() {
        let output_dir = Path::new("results");
        assert_eq!(
            get_run_dir(output_dir, "reference", 0, false, false),
            output_dir
        );
        assert_eq!(
            get_run_dir(output_dir, "reference", 2, true, true),
            output_dir.join("reference").join("repetition_2")
        );
    }
}
