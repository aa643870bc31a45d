//! Code for reading the plant roster.
use super::*;
use crate::id::IDCollection;
use crate::plant::{Plant, PlantID, PlantMap};
use crate::region::RegionID;
use crate::technology::TechnologyMap;
use crate::units::Capacity;
use indexmap::IndexSet;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

const PLANTS_FILE_NAME: &str = "plants.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct PlantRaw {
    id: PlantID,
    region_id: String,
    technology_id: String,
    capacity: Capacity,
    commissioning_year: u32,
}
crate::id::define_id_getter! {PlantRaw, PlantID}

fn create_plant(
    raw: PlantRaw,
    region_ids: &IndexSet<RegionID>,
    technologies: &TechnologyMap,
) -> Result<Plant> {
    let region_id = region_ids.get_id_by_str(&raw.region_id)?;
    let technology = technologies
        .get(raw.technology_id.as_str())
        .with_context(|| format!("Unknown technology {} for plant {}", raw.technology_id, raw.id))?;
    ensure!(
        raw.capacity.is_finite() && raw.capacity > Capacity(0.0),
        "Capacity of plant {} must be a finite number greater than zero",
        raw.id
    );
    ensure!(
        technology.closure || technology.operates_in(&region_id),
        "Plant {} operates technology {} which has no reference data for region {region_id}",
        raw.id,
        technology.id
    );

    Ok(Plant {
        id: raw.id,
        region_id,
        technology: Arc::clone(technology),
        capacity: raw.capacity,
        commissioning_year: raw.commissioning_year,
    })
}

/// Read the plant roster from the specified model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `region_ids` - All possible region IDs
/// * `technologies` - All technologies
///
/// # Returns
///
/// A map of plants sorted by ID, which is the order in which plants make their decisions.
pub fn read_plants(
    model_dir: &Path,
    region_ids: &IndexSet<RegionID>,
    technologies: &TechnologyMap,
) -> Result<PlantMap> {
    let file_path = model_dir.join(PLANTS_FILE_NAME);
    let raw = read_csv_id_file::<PlantRaw, PlantID>(&file_path)?;

    let mut plants: PlantMap = raw
        .into_values()
        .map(|raw| -> Result<_> {
            let plant = create_plant(raw, region_ids, technologies)?;
            Ok((plant.id.clone(), plant))
        })
        .process_results(|iter| iter.collect())
        .with_context(|| input_err_msg(&file_path))?;
    plants.sort_keys();

    Ok(plants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, region_ids, technologies};
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn raw(region_id: &str, technology_id: &str, capacity: f64) -> PlantRaw {
        PlantRaw {
            id: "P1".into(),
            region_id: region_id.into(),
            technology_id: technology_id.into(),
            capacity: Capacity(capacity),
            commissioning_year: 2000,
        }
    }

    #[rstest]
    fn test_read_plants_sorted(region_ids: IndexSet<RegionID>, technologies: TechnologyMap) {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(PLANTS_FILE_NAME)).unwrap();
            writeln!(
                file,
                "id,region_id,technology_id,capacity,commissioning_year
plant_b,EUR,BF-BOF,1000,1995
plant_a,EUR,BF-BOF,2000,2005"
            )
            .unwrap();
        }

        let plants = read_plants(dir.path(), &region_ids, &technologies).unwrap();
        assert_eq!(
            plants.keys().collect_vec(),
            [&PlantID::new("plant_a"), &PlantID::new("plant_b")]
        );
        assert_eq!(plants["plant_a"].capacity, Capacity(2000.0));
    }

    #[rstest]
    #[case(raw("USA", "BF-BOF", 1.0), "Unknown ID USA found")]
    #[case(raw("EUR", "EAF", 1.0), "Unknown technology EAF for plant P1")]
    #[case(
        raw("EUR", "BF-BOF", 0.0),
        "Capacity of plant P1 must be a finite number greater than zero"
    )]
    #[case(
        raw("CHN", "BF-BOF", 1.0),
        "Plant P1 operates technology BF-BOF which has no reference data for region CHN"
    )]
    fn test_create_plant_invalid(
        region_ids: IndexSet<RegionID>,
        technologies: TechnologyMap,
        #[case] raw: PlantRaw,
        #[case] msg: &str,
    ) {
        assert_error!(create_plant(raw, &region_ids, &technologies), msg);
    }
}
