//! Code for reading the cost and emissions reference tables.
use super::*;
use crate::reference::{
    CostEntry, DataGap, EmissionsEntry, ReferenceKey, ReferenceTable, ReferenceTables,
};
use crate::region::{RegionID, parse_region_str};
use crate::technology::TechnologyID;
use crate::units::{EmissionsPerProduction, MoneyPerCapacity, MoneyPerProduction};
use crate::year::parse_year_str;
use indexmap::IndexSet;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::ops::RangeInclusive;
use std::path::Path;

const COSTS_FILE_NAME: &str = "technology_costs.csv";
const EMISSIONS_FILE_NAME: &str = "technology_emissions.csv";

/// Fields common to rows of both reference tables
trait ReferenceRow: DeserializeOwned {
    type Entry: Copy;

    fn technology_id(&self) -> &TechnologyID;
    fn regions(&self) -> &str;
    fn years(&self) -> &str;
    fn to_entry(&self) -> Result<Self::Entry>;
}

#[derive(PartialEq, Debug, Deserialize)]
struct CostRaw {
    technology_id: TechnologyID,
    regions: String,
    years: String,
    capex: MoneyPerCapacity,
    opex: MoneyPerProduction,
}

impl ReferenceRow for CostRaw {
    type Entry = CostEntry;

    fn technology_id(&self) -> &TechnologyID {
        &self.technology_id
    }

    fn regions(&self) -> &str {
        &self.regions
    }

    fn years(&self) -> &str {
        &self.years
    }

    fn to_entry(&self) -> Result<CostEntry> {
        ensure!(
            self.capex.is_finite() && self.capex >= MoneyPerCapacity(0.0),
            "capex must be a finite number greater than or equal to zero"
        );
        ensure!(self.opex.is_finite(), "opex must be a finite number");

        Ok(CostEntry {
            capex: self.capex,
            opex: self.opex,
        })
    }
}

#[derive(PartialEq, Debug, Deserialize)]
struct EmissionsRaw {
    technology_id: TechnologyID,
    regions: String,
    years: String,
    scope1: EmissionsPerProduction,
    scope2: EmissionsPerProduction,
    scope3: EmissionsPerProduction,
}

impl ReferenceRow for EmissionsRaw {
    type Entry = EmissionsEntry;

    fn technology_id(&self) -> &TechnologyID {
        &self.technology_id
    }

    fn regions(&self) -> &str {
        &self.regions
    }

    fn years(&self) -> &str {
        &self.years
    }

    fn to_entry(&self) -> Result<EmissionsEntry> {
        for (scope, value) in [
            ("scope1", self.scope1),
            ("scope2", self.scope2),
            ("scope3", self.scope3),
        ] {
            ensure!(
                value.is_finite() && value >= EmissionsPerProduction(0.0),
                "{scope} must be a finite number greater than or equal to zero"
            );
        }

        Ok(EmissionsEntry {
            scope1: self.scope1,
            scope2: self.scope2,
            scope3: self.scope3,
        })
    }
}

/// Expand rows with region and year selections into a map with one entry per key
fn expand_rows<R, I>(
    rows: I,
    region_ids: &IndexSet<RegionID>,
    horizon: &RangeInclusive<u32>,
) -> Result<HashMap<ReferenceKey, R::Entry>>
where
    R: ReferenceRow,
    I: IntoIterator<Item = R>,
{
    let mut map = HashMap::new();
    for row in rows {
        let regions = parse_region_str(row.regions(), region_ids)?;
        let years = parse_year_str(row.years(), horizon)?;
        let entry = row
            .to_entry()
            .with_context(|| format!("Invalid entry for technology {}", row.technology_id()))?;

        for region_id in &regions {
            for &year in &years {
                let key = (row.technology_id().clone(), region_id.clone(), year);
                ensure!(
                    map.insert(key, entry).is_none(),
                    "Duplicate entry for technology {}, region {region_id} and year {year}",
                    row.technology_id()
                );
            }
        }
    }

    Ok(map)
}

/// Check that every technology/region pair in the table covers every year of the horizon
fn check_coverage<T>(
    map: &HashMap<ReferenceKey, T>,
    table: ReferenceTable,
    horizon: &RangeInclusive<u32>,
) -> Result<()> {
    let mut pairs: Vec<_> = map
        .keys()
        .map(|(technology_id, region_id, _)| (technology_id, region_id))
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    pairs.sort();

    for (technology_id, region_id) in pairs {
        for year in horizon.clone() {
            if !map.contains_key(&(technology_id.clone(), region_id.clone(), year)) {
                Err(DataGap {
                    table,
                    technology_id: technology_id.clone(),
                    region_id: region_id.clone(),
                    year,
                })?;
            }
        }
    }

    Ok(())
}

fn read_reference_file<R: ReferenceRow>(
    file_path: &Path,
    table: ReferenceTable,
    region_ids: &IndexSet<RegionID>,
    horizon: &RangeInclusive<u32>,
) -> Result<HashMap<ReferenceKey, R::Entry>> {
    let rows = read_csv::<R>(file_path)?;
    let map = expand_rows(rows, region_ids, horizon).with_context(|| input_err_msg(file_path))?;
    check_coverage(&map, table, horizon).with_context(|| input_err_msg(file_path))?;

    Ok(map)
}

/// Check that costs and emissions are provided for the same technologies and regions
fn check_tables_consistent(
    costs: &HashMap<ReferenceKey, CostEntry>,
    emissions: &HashMap<ReferenceKey, EmissionsEntry>,
) -> Result<()> {
    let mut cost_keys: Vec<_> = costs.keys().collect();
    cost_keys.sort();
    for key in cost_keys {
        ensure!(
            emissions.contains_key(key),
            DataGap {
                table: ReferenceTable::Emissions,
                technology_id: key.0.clone(),
                region_id: key.1.clone(),
                year: key.2,
            }
        );
    }

    let mut emissions_keys: Vec<_> = emissions.keys().collect();
    emissions_keys.sort();
    for key in emissions_keys {
        ensure!(
            costs.contains_key(key),
            DataGap {
                table: ReferenceTable::Cost,
                technology_id: key.0.clone(),
                region_id: key.1.clone(),
                year: key.2,
            }
        );
    }

    Ok(())
}

/// Read the cost and emissions reference tables.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `region_ids` - All possible region IDs
/// * `horizon` - The years of the simulation
///
/// # Returns
///
/// Reference tables which cover every horizon year for each technology/region pair present.
pub fn read_reference_tables(
    model_dir: &Path,
    region_ids: &IndexSet<RegionID>,
    horizon: &RangeInclusive<u32>,
) -> Result<ReferenceTables> {
    let costs = read_reference_file::<CostRaw>(
        &model_dir.join(COSTS_FILE_NAME),
        ReferenceTable::Cost,
        region_ids,
        horizon,
    )?;
    let emissions = read_reference_file::<EmissionsRaw>(
        &model_dir.join(EMISSIONS_FILE_NAME),
        ReferenceTable::Emissions,
        region_ids,
        horizon,
    )?;
    check_tables_consistent(&costs, &emissions)?;

    Ok(ReferenceTables::new(costs, emissions))
}
