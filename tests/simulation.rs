//! Integration tests for scenario runs, driven through the library API.
use std::fs;
use std::path::{Path, PathBuf};
use steel_transition::input::load_model;
use steel_transition::model::HorizonSelection;
use steel_transition::simulation::decision::{DecisionTrigger, ExclusionReason, Rationale};
use steel_transition::simulation::run;
use steel_transition::units::{Emissions, Production};
use tempfile::tempdir;

/// Get the path to the example model.
fn get_model_dir() -> PathBuf {
    PathBuf::from("demos/simple")
}

/// Write a two-plant model in which both plants want a technology that only one can have
fn write_contention_model(dir: &Path) {
    let files = [
        (
            "model.toml",
            "start_year = 2020
end_year = 2030

[[scenarios]]
name = \"contention\"
investment_cycle_variance = 0
resource_caps = [{resource = \"ore\", region = \"R1\", limit = 150.0}]
",
        ),
        ("regions.csv", "id,description\nR1,Region one\n"),
        (
            "technologies.csv",
            "id,description,trl,phase,investment_cycle,available_from,closure
TechX,Incumbent X,9,initial,20,,false
TechY,Incumbent Y,9,initial,20,,false
TechZ,Newcomer,9,end_state,20,,false
",
        ),
        (
            "technology_resources.csv",
            "technology_id,resource_id,usage\nTechZ,ore,1.0\n",
        ),
        (
            "technology_costs.csv",
            "technology_id,regions,years,capex,opex
TechX,R1,all,100,100
TechY,R1,all,100,80
TechZ,R1,all,100,50
",
        ),
        (
            "technology_emissions.csv",
            "technology_id,regions,years,scope1,scope2,scope3
TechX,R1,all,2.0,0.1,0.1
TechY,R1,all,2.0,0.1,0.1
TechZ,R1,all,0.1,0.1,0.1
",
        ),
        (
            "plants.csv",
            "id,region_id,technology_id,capacity,commissioning_year
B,R1,TechY,100,2005
A,R1,TechX,100,2005
",
        ),
    ];

    for (name, contents) in files {
        fs::write(dir.join(name), contents).unwrap();
    }
}

/// Only the first plant (by ID) gets the capped technology; the other falls back
#[test]
fn test_resource_contention() {
    let dir = tempdir().unwrap();
    write_contention_model(dir.path());
    let model = load_model(dir.path()).unwrap();
    let scenario = model.scenario("contention").unwrap();
    let result = run(&model, scenario, model.horizon()).unwrap();

    let decisions: Vec<_> = result.decisions.iter().filter(|d| d.year == 2025).collect();
    assert_eq!(decisions.len(), 2);

    let a = decisions[0];
    assert_eq!(a.plant_id, "A".into());
    assert_eq!(a.trigger, DecisionTrigger::MainCycle);
    assert_eq!(a.chosen_technology, Some("TechZ".into()));
    assert_eq!(a.rationale, Rationale::CostDriven);

    let b = decisions[1];
    assert_eq!(b.plant_id, "B".into());
    assert_eq!(b.chosen_technology, Some("TechY".into()));
    assert_eq!(b.rationale, Rationale::ConstraintForced);
    let rejected = b
        .candidates
        .iter()
        .find(|candidate| candidate.technology_id == "TechZ".into())
        .unwrap();
    assert_eq!(
        rejected.exclusion,
        Some(ExclusionReason::ResourceCap("ore".into()))
    );

    // No one else decides before the next cycle
    assert!(result.decisions.iter().all(|d| d.year == 2025));
    assert!(result.unresolved.is_empty());
}

/// Running the same scenario twice gives identical results
#[test]
fn test_demo_is_deterministic() {
    let model = load_model(get_model_dir()).unwrap();
    for scenario in &model.parameters.scenarios {
        let a = run(&model, scenario, model.horizon()).unwrap();
        let b = run(&model, scenario, model.horizon()).unwrap();
        assert_eq!(a.decisions, b.decisions);
        assert_eq!(a.snapshots, b.snapshots);
        assert_eq!(a.plant_emissions, b.plant_emissions);
    }
}

/// Under the net-zero scenario no plant keeps a blast furnace past its post-moratorium decision
#[test]
fn test_net_zero_scenario() {
    let model = load_model(get_model_dir()).unwrap();
    let scenario = model.scenario("net_zero").unwrap();
    let result = run(&model, scenario, model.horizon()).unwrap();

    for decision in result
        .decisions
        .iter()
        .filter(|d| d.year >= 2030 && d.trigger == DecisionTrigger::MainCycle)
    {
        assert_ne!(decision.chosen_technology, Some("BF-BOF".into()));
    }

    // The retired plant produces and emits nothing
    let retired: Vec<_> = result
        .plant_emissions
        .iter()
        .filter(|e| e.plant_id == "CHN-02".into() && e.year >= 2040)
        .collect();
    assert!(!retired.is_empty());
    for emissions in retired {
        assert_eq!(emissions.production, Production(0.0));
        assert_eq!(emissions.scope1, Emissions(0.0));
    }

    let first = result.snapshots.first().unwrap();
    assert_eq!(first.annual_abatement, Emissions(0.0));
    let last = result.snapshots.last().unwrap();
    assert!(last.annual_abatement > Emissions(0.0));
    assert!(last.cumulative_abatement >= last.annual_abatement);
}

/// A run over the second half of the horizon reports what a full run reports for those years
#[test]
fn test_second_half_resumes_full_run() {
    let model = load_model(get_model_dir()).unwrap();
    let scenario = model.scenario("net_zero").unwrap();
    let full = run(&model, scenario, model.horizon()).unwrap();
    let years = model.select_horizon(HorizonSelection::SecondHalf);
    let second = run(&model, scenario, years.clone()).unwrap();

    let first_year = *years.start();
    assert_eq!(first_year, 2038);
    assert_eq!(
        second.snapshots,
        full.snapshots
            .iter()
            .filter(|s| s.year >= first_year)
            .cloned()
            .collect::<Vec<_>>()
    );
    assert_eq!(
        second.decisions,
        full.decisions
            .iter()
            .filter(|d| d.year >= first_year)
            .cloned()
            .collect::<Vec<_>>()
    );
    assert_eq!(
        second.plant_emissions,
        full.plant_emissions
            .iter()
            .filter(|e| e.year >= first_year)
            .cloned()
            .collect::<Vec<_>>()
    );
    assert_eq!(
        second.snapshots.last().unwrap().cumulative_abatement,
        full.snapshots.last().unwrap().cumulative_abatement
    );
}

/// Write a model in which growing demand pushes a plant's use of a capped resource over the cap
fn write_cap_overflow_model(dir: &Path) {
    let files = [
        (
            "model.toml",
            "start_year = 2020
end_year = 2030

[[scenarios]]
name = \"overflow\"
investment_cycle_variance = 0
demand_growth_path = [{year = 2025, value = 1.0}, {year = 2030, value = 1.05}]
resource_caps = [{resource = \"ore\", limit = 96.0}]
",
        ),
        ("regions.csv", "id,description\nR1,Region one\n"),
        (
            "technologies.csv",
            "id,description,trl,phase,investment_cycle,available_from,closure
TechX,Fallback,9,initial,20,,false
TechZ,Ore user,9,end_state,20,,false
",
        ),
        (
            "technology_resources.csv",
            "technology_id,resource_id,usage\nTechZ,ore,1.0\n",
        ),
        (
            "technology_costs.csv",
            "technology_id,regions,years,capex,opex
TechX,R1,all,100,100
TechZ,R1,all,100,50
",
        ),
        (
            "technology_emissions.csv",
            "technology_id,regions,years,scope1,scope2,scope3
TechX,R1,all,2.0,0.1,0.1
TechZ,R1,all,0.1,0.1,0.1
",
        ),
        (
            "plants.csv",
            "id,region_id,technology_id,capacity,commissioning_year
P,R1,TechZ,100,2005
",
        ),
    ];

    for (name, contents) in files {
        fs::write(dir.join(name), contents).unwrap();
    }
}

/// A plant whose locked-in use outgrows a cap is forced to choose again
#[test]
fn test_cap_never_exceeded() {
    let dir = tempdir().unwrap();
    write_cap_overflow_model(dir.path());
    let model = load_model(dir.path()).unwrap();
    let scenario = model.scenario("overflow").unwrap();
    let result = run(&model, scenario, model.horizon()).unwrap();

    for year in model.horizon() {
        let ore: f64 = result
            .plant_emissions
            .iter()
            .filter(|e| e.year == year && e.technology_id == "TechZ".into())
            .map(|e| e.production.value())
            .sum();
        assert!(ore <= 96.0, "ore use of {ore} in {year} exceeds the cap");
    }

    // 95 t in 2025 fits, but 96.9 t in 2027 doesn't
    let decisions: Vec<_> = result.decisions.iter().collect();
    assert_eq!(decisions.len(), 2);
    assert_eq!(decisions[0].year, 2025);
    assert_eq!(decisions[0].chosen_technology, Some("TechZ".into()));
    assert_eq!(decisions[1].year, 2027);
    assert_eq!(decisions[1].trigger, DecisionTrigger::Forced);
    assert_eq!(decisions[1].chosen_technology, Some("TechX".into()));
    assert_eq!(decisions[1].rationale, Rationale::ConstraintForced);
}

/// Write a model of identical plants whose cleaner options get cheaper as carbon gets dearer
fn write_abatement_model(dir: &Path) {
    let files = [
        (
            "model.toml",
            "start_year = 2025
end_year = 2060

[[scenarios]]
name = \"abatement\"
random_seed = 3
carbon_price_path = [{year = 2025, value = 0.0}, {year = 2060, value = 400.0}]
",
        ),
        ("regions.csv", "id,description\nR1,Region one\n"),
        (
            "technologies.csv",
            "id,description,trl,phase,investment_cycle,available_from,closure
Dirty,Dirty,9,initial,15,,false
Mid,Mid,9,transitional,15,,false
Clean,Clean,9,end_state,15,,false
",
        ),
        (
            "technology_costs.csv",
            "technology_id,regions,years,capex,opex
Dirty,R1,all,200,100
Mid,R1,all,200,150
Clean,R1,all,200,250
",
        ),
        (
            "technology_emissions.csv",
            "technology_id,regions,years,scope1,scope2,scope3
Dirty,R1,all,1.8,0.2,0.1
Mid,R1,all,0.8,0.2,0.1
Clean,R1,all,0.1,0.1,0.1
",
        ),
        (
            "plants.csv",
            "id,region_id,technology_id,capacity,commissioning_year
P1,R1,Dirty,1000,2000
P2,R1,Dirty,1000,2005
P3,R1,Dirty,1000,2010
P4,R1,Dirty,1000,2015
",
        ),
    ];

    for (name, contents) in files {
        fs::write(dir.join(name), contents).unwrap();
    }
}

/// With constant capacity and a rising carbon price, fleet emissions never go up
#[test]
fn test_emissions_monotonic_under_abatement() {
    let dir = tempdir().unwrap();
    write_abatement_model(dir.path());
    let model = load_model(dir.path()).unwrap();
    let scenario = model.scenario("abatement").unwrap();
    let result = run(&model, scenario, model.horizon()).unwrap();

    for (previous, current) in result.snapshots.iter().zip(result.snapshots.iter().skip(1)) {
        assert!(
            current.emissions() <= previous.emissions(),
            "emissions rose in {}",
            current.year
        );
        assert_eq!(current.production, previous.production);
    }

    let first = result.snapshots.first().unwrap();
    let last = result.snapshots.last().unwrap();
    assert!(last.emissions() < first.emissions());
    assert!(result.plants.values().all(|plant| plant.technology.id != "Dirty".into()));
}
