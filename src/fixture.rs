//! Fixtures for tests

use crate::model::{Model, ModelParameters};
use crate::plant::{Plant, PlantMap};
use crate::reference::{CostEntry, EmissionsEntry, ReferenceKey, ReferenceTables};
use crate::region::{Region, RegionID, RegionMap};
use crate::scenario::ScenarioConfig;
use crate::simulation::investment_cycle::CycleSettings;
use crate::technology::{Phase, Technology, TechnologyMap};
use crate::units::{Capacity, EmissionsPerProduction, MoneyPerCapacity, MoneyPerProduction};
use indexmap::{IndexMap, IndexSet, indexmap, indexset};
use rstest::fixture;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

#[fixture]
pub fn region_ids() -> IndexSet<RegionID> {
    indexset! {"EUR".into(), "CHN".into()}
}

#[fixture]
pub fn regions(region_ids: IndexSet<RegionID>) -> RegionMap {
    region_ids
        .into_iter()
        .map(|id| {
            let region = Region {
                id: id.clone(),
                description: format!("Region {id}"),
            };
            (id, region)
        })
        .collect()
}

#[fixture]
pub fn technology() -> Technology {
    Technology {
        id: "BF-BOF".into(),
        description: "Blast furnace with basic oxygen furnace".into(),
        trl: 9,
        phase: Phase::Initial,
        investment_cycle: 20,
        available_from: None,
        closure: false,
        regions: indexset! {"EUR".into()},
        resource_usage: IndexMap::new(),
        allowed_switches: None,
    }
}

#[fixture]
pub fn technologies(technology: Technology) -> TechnologyMap {
    indexmap! {technology.id.clone() => Arc::new(technology)}
}

#[fixture]
pub fn plant(technology: Technology) -> Plant {
    Plant {
        id: "P1".into(),
        region_id: "EUR".into(),
        technology: Arc::new(technology),
        capacity: Capacity(1000.0),
        commissioning_year: 2010,
    }
}

#[fixture]
pub fn reference_tables() -> ReferenceTables {
    let keys: Vec<ReferenceKey> = (2025..=2035)
        .map(|year| ("BF-BOF".into(), "EUR".into(), year))
        .collect();
    let cost = CostEntry {
        capex: MoneyPerCapacity(2000.0),
        opex: MoneyPerProduction(300.0),
    };
    let emissions = EmissionsEntry {
        scope1: EmissionsPerProduction(1.8),
        scope2: EmissionsPerProduction(0.2),
        scope3: EmissionsPerProduction(0.1),
    };

    let costs: HashMap<_, _> = keys.iter().map(|key| (key.clone(), cost)).collect();
    let emissions = keys.into_iter().map(|key| (key, emissions)).collect();
    ReferenceTables::new(costs, emissions)
}

#[fixture]
pub fn scenario() -> ScenarioConfig {
    toml::from_str("name = \"reference\"").unwrap()
}

#[fixture]
pub fn cycle_settings() -> CycleSettings {
    CycleSettings {
        random_seed: 42,
        variance: 3,
        buffer_top: 3,
        buffer_tail: 8,
        net_zero_year: None,
        net_zero_variance: 3,
        start_year: 2025,
    }
}

#[fixture]
pub fn model(
    regions: RegionMap,
    technologies: TechnologyMap,
    plant: Plant,
    reference_tables: ReferenceTables,
    scenario: ScenarioConfig,
) -> Model {
    let plants: PlantMap = indexmap! {plant.id.clone() => plant};

    Model {
        model_dir: PathBuf::from("model"),
        parameters: ModelParameters {
            start_year: 2025,
            end_year: 2035,
            scenarios: vec![scenario],
        },
        regions,
        technologies,
        plants,
        reference_tables,
    }
}
