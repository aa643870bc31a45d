//! Code for reading technology archetypes and their resource usage.
use super::*;
use crate::id::IDCollection;
use crate::reference::ReferenceTables;
use crate::technology::{
    Phase, ResourceID, ResourceUsageMap, Technology, TechnologyID, TechnologyMap,
};
use crate::units::ResourcePerProduction;
use indexmap::IndexSet;
use log::warn;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

const TECHNOLOGIES_FILE_NAME: &str = "technologies.csv";
const TECHNOLOGY_RESOURCES_FILE_NAME: &str = "technology_resources.csv";
const TECHNOLOGY_SWITCHES_FILE_NAME: &str = "technology_switches.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct TechnologyRaw {
    id: TechnologyID,
    description: String,
    trl: u32,
    phase: Phase,
    investment_cycle: u32,
    available_from: Option<u32>,
    #[serde(default)]
    closure: bool,
}
crate::id::define_id_getter! {TechnologyRaw, TechnologyID}

#[derive(PartialEq, Debug, Deserialize)]
struct TechnologyResourceRaw {
    technology_id: String,
    resource_id: ResourceID,
    usage: ResourcePerProduction,
}

#[derive(PartialEq, Debug, Deserialize)]
struct TechnologySwitchRaw {
    from_technology_id: String,
    to_technology_id: String,
}

fn validate_technology(tech: &TechnologyRaw) -> Result<()> {
    ensure!(
        (1..=9).contains(&tech.trl),
        "TRL for technology {} must be between 1 and 9",
        tech.id
    );
    ensure!(
        tech.closure || tech.investment_cycle > 0,
        "Investment cycle for technology {} must be greater than zero",
        tech.id
    );

    Ok(())
}

/// Read the resource usage for each technology.
///
/// The file is optional; technologies not listed use no constrained resources.
fn read_technology_resources(
    file_path: &Path,
    technologies: &IndexMap<TechnologyID, TechnologyRaw>,
) -> Result<HashMap<TechnologyID, ResourceUsageMap>> {
    let technology_ids: IndexSet<_> = technologies.keys().cloned().collect();
    let mut map: HashMap<TechnologyID, ResourceUsageMap> = HashMap::new();
    for record in read_csv_optional::<TechnologyResourceRaw>(file_path)? {
        let id = technology_ids.get_id_by_str(&record.technology_id)?;
        ensure!(
            record.usage.is_finite() && record.usage > ResourcePerProduction(0.0),
            "Usage of resource {} by technology {id} must be a finite number greater than zero",
            record.resource_id
        );
        ensure!(
            !technologies[&id].closure,
            "Closure technology {id} cannot use resources"
        );

        let existing = map
            .entry(id.clone())
            .or_default()
            .insert(record.resource_id.clone(), record.usage)
            .is_some();
        ensure!(
            !existing,
            "Duplicate usage of resource {} by technology {id}",
            record.resource_id
        );
    }

    Ok(map)
}

/// Read the switches allowed from each technology.
///
/// The file is optional. Technologies with no entries may switch to any other technology.
fn read_technology_switches(
    file_path: &Path,
    technologies: &IndexMap<TechnologyID, TechnologyRaw>,
) -> Result<HashMap<TechnologyID, IndexSet<TechnologyID>>> {
    let technology_ids: IndexSet<_> = technologies.keys().cloned().collect();
    let mut map: HashMap<TechnologyID, IndexSet<TechnologyID>> = HashMap::new();
    for record in read_csv_optional::<TechnologySwitchRaw>(file_path)? {
        let from = technology_ids.get_id_by_str(&record.from_technology_id)?;
        let to = technology_ids.get_id_by_str(&record.to_technology_id)?;
        ensure!(from != to, "Technology {from} cannot list a switch to itself");
        ensure!(
            !technologies[&from].closure && !technologies[&to].closure,
            "Switch from {from} to {to} involves a closure technology"
        );

        let inserted = map.entry(from.clone()).or_default().insert(to.clone());
        ensure!(inserted, "Duplicate switch from {from} to {to}");
    }

    Ok(map)
}

/// Read technology archetypes from the specified model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `reference_tables` - Cost and emissions data, used to determine where each technology operates
///
/// # Returns
///
/// A map of technologies in file order, keyed by ID.
pub fn read_technologies(
    model_dir: &Path,
    reference_tables: &ReferenceTables,
) -> Result<TechnologyMap> {
    let file_path = model_dir.join(TECHNOLOGIES_FILE_NAME);
    let raw = read_csv_id_file::<TechnologyRaw, TechnologyID>(&file_path)?;
    for tech in raw.values() {
        validate_technology(tech).with_context(|| input_err_msg(&file_path))?;
    }

    // Every technology in the reference tables must be defined
    for (technology_id, _, _) in reference_tables.cost_keys() {
        ensure!(
            raw.contains_key(technology_id),
            "Reference data provided for unknown technology {technology_id}"
        );
    }

    let resources_path = model_dir.join(TECHNOLOGY_RESOURCES_FILE_NAME);
    let mut resources = read_technology_resources(&resources_path, &raw)
        .with_context(|| input_err_msg(&resources_path))?;

    let switches_path = model_dir.join(TECHNOLOGY_SWITCHES_FILE_NAME);
    let mut switches = read_technology_switches(&switches_path, &raw)
        .with_context(|| input_err_msg(&switches_path))?;

    let mut regions: HashMap<TechnologyID, IndexSet<_>> = HashMap::new();
    let mut keys: Vec<_> = reference_tables.cost_keys().collect();
    keys.sort();
    for (technology_id, region_id, _) in keys {
        regions
            .entry(technology_id.clone())
            .or_default()
            .insert(region_id.clone());
    }

    let technologies = raw
        .into_values()
        .map(|tech| {
            let regions = regions.remove(&tech.id).unwrap_or_default();
            if regions.is_empty() && !tech.closure {
                warn!(
                    "Technology {} has no reference data in any region and will never be adopted",
                    tech.id
                );
            }

            let technology = Technology {
                resource_usage: resources.remove(&tech.id).unwrap_or_default(),
                allowed_switches: switches.remove(&tech.id),
                id: tech.id,
                description: tech.description,
                trl: tech.trl,
                phase: tech.phase,
                investment_cycle: tech.investment_cycle,
                available_from: tech.available_from,
                closure: tech.closure,
                regions,
            };

            (technology.id.clone(), Arc::new(technology))
        })
        .collect();

    Ok(technologies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, reference_tables};
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_file(dir_path: &Path, file_name: &str, contents: &str) {
        let mut file = File::create(dir_path.join(file_name)).unwrap();
        writeln!(file, "{contents}").unwrap();
    }

    #[rstest]
    fn test_read_technologies(reference_tables: ReferenceTables) {
        let dir = tempdir().unwrap();
        write_file(
            dir.path(),
            TECHNOLOGIES_FILE_NAME,
            "id,description,trl,phase,investment_cycle,available_from,closure
BF-BOF,Blast furnace,9,initial,20,,false
H2-DRI,Hydrogen DRI,7,end_state,20,2030,false
Closed,Closed plant,9,end_state,0,,true",
        );
        write_file(
            dir.path(),
            TECHNOLOGY_RESOURCES_FILE_NAME,
            "technology_id,resource_id,usage
H2-DRI,hydrogen,0.05",
        );

        let technologies = read_technologies(dir.path(), &reference_tables).unwrap();
        assert_eq!(technologies.len(), 3);

        let bf = &technologies["BF-BOF"];
        assert_eq!(bf.phase, Phase::Initial);
        assert!(bf.operates_in(&"EUR".into()));
        assert!(bf.resource_usage.is_empty());

        let h2 = &technologies["H2-DRI"];
        assert_eq!(h2.available_from, Some(2030));
        assert_eq!(
            h2.resource_usage["hydrogen"],
            ResourcePerProduction(0.05)
        );

        assert!(technologies["Closed"].closure);
        assert!(technologies["BF-BOF"].allowed_switches.is_none());
    }

    fn write_switch_technologies(dir_path: &Path) {
        write_file(
            dir_path,
            TECHNOLOGIES_FILE_NAME,
            "id,description,trl,phase,investment_cycle,available_from,closure
BF-BOF,Blast furnace,9,initial,20,,false
H2-DRI,Hydrogen DRI,7,end_state,20,,false
Scrap-EAF,Scrap EAF,9,end_state,20,,false
Closed,Closed plant,9,end_state,0,,true",
        );
    }

    #[rstest]
    fn test_read_technology_switches(reference_tables: ReferenceTables) {
        let dir = tempdir().unwrap();
        write_switch_technologies(dir.path());
        write_file(
            dir.path(),
            TECHNOLOGY_SWITCHES_FILE_NAME,
            "from_technology_id,to_technology_id
Scrap-EAF,H2-DRI",
        );

        let technologies = read_technologies(dir.path(), &reference_tables).unwrap();
        let eaf = &technologies["Scrap-EAF"];
        assert_eq!(
            eaf.allowed_switches,
            Some(IndexSet::from_iter([TechnologyID::new("H2-DRI")]))
        );
        assert!(!eaf.can_switch_to(&"BF-BOF".into()));
        assert!(technologies["BF-BOF"].can_switch_to(&"Scrap-EAF".into()));
    }

    #[rstest]
    #[case("Scrap-EAF,Scrap-EAF", "Technology Scrap-EAF cannot list a switch to itself")]
    #[case("BF-BOF,Closed", "Switch from BF-BOF to Closed involves a closure technology")]
    #[case(
        "Scrap-EAF,H2-DRI\nScrap-EAF,H2-DRI",
        "Duplicate switch from Scrap-EAF to H2-DRI"
    )]
    fn test_read_technology_switches_invalid(
        #[case] rows: &str,
        #[case] msg: &str,
    ) {
        let dir = tempdir().unwrap();
        write_switch_technologies(dir.path());
        let technologies = read_csv_id_file::<TechnologyRaw, TechnologyID>(
            &dir.path().join(TECHNOLOGIES_FILE_NAME),
        )
        .unwrap();
        write_file(
            dir.path(),
            TECHNOLOGY_SWITCHES_FILE_NAME,
            &format!("from_technology_id,to_technology_id\n{rows}"),
        );
        assert_error!(
            read_technology_switches(
                &dir.path().join(TECHNOLOGY_SWITCHES_FILE_NAME),
                &technologies
            ),
            msg
        );
    }

    #[rstest]
    fn test_read_technologies_unknown_reference(reference_tables: ReferenceTables) {
        let dir = tempdir().unwrap();
        write_file(
            dir.path(),
            TECHNOLOGIES_FILE_NAME,
            "id,description,trl,phase,investment_cycle,available_from,closure
H2-DRI,Hydrogen DRI,7,end_state,20,,false",
        );
        assert_error!(
            read_technologies(dir.path(), &reference_tables),
            "Reference data provided for unknown technology BF-BOF"
        );
    }

    #[rstest]
    #[case(0, 20, false, "TRL for technology T must be between 1 and 9")]
    #[case(10, 20, false, "TRL for technology T must be between 1 and 9")]
    #[case(9, 0, false, "Investment cycle for technology T must be greater than zero")]
    fn test_validate_technology_invalid(
        #[case] trl: u32,
        #[case] investment_cycle: u32,
        #[case] closure: bool,
        #[case] msg: &str,
    ) {
        let tech = TechnologyRaw {
            id: "T".into(),
            description: String::new(),
            trl,
            phase: Phase::Initial,
            investment_cycle,
            available_from: None,
            closure,
        };
        assert_error!(validate_technology(&tech), msg);
    }
}
