//! Functionality for running a scenario over the model horizon.
use crate::model::Model;
use crate::plant::{Plant, PlantMap};
use crate::scenario::{EventAction, ScenarioConfig, ScenarioEvent};
use crate::units::{Emissions, Money};
use anyhow::{Context, Result, bail, ensure};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::ops::RangeInclusive;
use std::sync::Arc;

pub mod batch;
pub mod decision;
use decision::{DecisionRecord, DecisionTrigger, Rationale, UnresolvedPlant};
pub mod emissions;
use emissions::{
    FleetSnapshot, PlantEmissions, SnapshotBuilder, fleet_emissions, operating_cost,
    plant_emissions, plant_production,
};
pub mod investment_cycle;
use investment_cycle::{CyclePhase, CycleSettings, InvestmentCycle};
pub mod ledger;
use ledger::ResourceLedger;
pub mod ranking;
use ranking::constraints::build_constraints;
use ranking::{PlantAppraisal, RankingContext, appraise_plant, select_technology};

/// A plant together with its investment cycle
#[derive(Debug, Clone)]
pub struct PlantState {
    /// The plant
    pub plant: Plant,
    /// Where the plant is in its investment cycle
    pub cycle: InvestmentCycle,
}

/// Everything produced by a single scenario run
#[derive(Debug, Clone)]
pub struct SimulationResult {
    /// The scenario which was run
    pub scenario_name: String,
    /// The random seed used for investment cycles
    pub random_seed: u64,
    /// Every decision made, in the order they were made
    pub decisions: Vec<DecisionRecord>,
    /// One snapshot per simulated year
    pub snapshots: Vec<FleetSnapshot>,
    /// Production and emissions of every plant in every year
    pub plant_emissions: Vec<PlantEmissions>,
    /// Plants for which no feasible technology could be found
    pub unresolved: Vec<UnresolvedPlant>,
    /// The state of the fleet at the end of the run
    pub plants: PlantMap,
}

/// Run a scenario and report the given years.
///
/// The fleet is always simulated from the start of the model horizon, so a run over a later
/// range of years reports exactly what a full run would for those years. No decisions are made
/// in the model's first year, which only records the starting fleet.
///
/// # Arguments
///
/// * `model` - The model to run
/// * `scenario` - The scenario to run it under
/// * `years` - The years to report, which must lie within the model horizon
pub fn run(
    model: &Model,
    scenario: &ScenarioConfig,
    years: RangeInclusive<u32>,
) -> Result<SimulationResult> {
    let horizon = model.horizon();
    ensure!(
        !years.is_empty() && horizon.contains(years.start()) && horizon.contains(years.end()),
        "Years {}-{} are not within the model horizon {}-{}",
        years.start(),
        years.end(),
        horizon.start(),
        horizon.end()
    );

    let start_year = model.parameters.start_year;
    let settings = CycleSettings::new(scenario, start_year);
    let constraints = build_constraints(scenario);
    let ctx = RankingContext {
        reference_tables: &model.reference_tables,
        technologies: &model.technologies,
        scenario,
        constraints: &constraints,
        cycle_settings: &settings,
        horizon_end: model.parameters.end_year,
    };

    let mut states: Vec<_> = model
        .plants
        .values()
        .map(|plant| {
            let mut cycle = InvestmentCycle::new(
                &settings,
                &plant.id,
                plant.commissioning_year,
                plant.technology.investment_cycle,
            );
            if plant.is_closed() {
                cycle.close();
            }
            PlantState {
                plant: plant.clone(),
                cycle,
            }
        })
        .collect();

    let mut result = SimulationResult {
        scenario_name: scenario.name.clone(),
        random_seed: scenario.random_seed,
        decisions: Vec::new(),
        snapshots: Vec::new(),
        plant_emissions: Vec::new(),
        unresolved: Vec::new(),
        plants: PlantMap::new(),
    };

    let mut cumulative_abatement = Emissions(0.0);
    for year in start_year..=*years.end() {
        if years.contains(&year) {
            info!("Scenario {}: year {year}", scenario.name);
        } else {
            debug!("Scenario {}: year {year} (not reported)", scenario.name);
        }

        let snapshot = simulate_year(model, &ctx, &mut states, year, &mut result)
            .with_context(|| format!("Scenario {} failed in year {year}", scenario.name))?
            .finish(cumulative_abatement);
        cumulative_abatement = snapshot.cumulative_abatement;
        result.snapshots.push(snapshot);
    }

    let first_year = *years.start();
    result.decisions.retain(|decision| decision.year >= first_year);
    result.snapshots.retain(|snapshot| snapshot.year >= first_year);
    result.plant_emissions.retain(|emissions| emissions.year >= first_year);
    result.unresolved.retain(|unresolved| unresolved.year >= first_year);

    result.plants = states
        .into_iter()
        .map(|state| (state.plant.id.clone(), state.plant))
        .collect();

    Ok(result)
}

/// Simulate a single year, returning the unfinished snapshot
fn simulate_year(
    model: &Model,
    ctx: &RankingContext,
    states: &mut [PlantState],
    year: u32,
    result: &mut SimulationResult,
) -> Result<SnapshotBuilder> {
    let capex = if year > ctx.cycle_settings.start_year {
        step_year(ctx, states, year, result)?
    } else {
        Money(0.0)
    };

    account_year(model, ctx, states, year, capex, result)
}

/// Make the year's decisions, returning the capital spent
fn step_year(
    ctx: &RankingContext,
    states: &mut [PlantState],
    year: u32,
    result: &mut SimulationResult,
) -> Result<Money> {
    let scenario = ctx.scenario;
    let mut capex = Money(0.0);

    for event in scenario.iter_events(year) {
        apply_event(ctx, event, states, year, result)?;
    }

    for state in states.iter_mut() {
        state.cycle.advance(year);
    }

    // Plants which aren't choosing a technology have first claim on capped resources. Any which
    // no longer fit under a cap must choose again.
    let mut ledger = ResourceLedger::new(&scenario.resource_caps, year);
    for state in states.iter_mut() {
        if state.cycle.phase() == CyclePhase::MainCycleDue || state.plant.is_closed() {
            continue;
        }

        let plant = &state.plant;
        let production = plant_production(plant, scenario, year)?;
        if let Err(resource) =
            ledger.reserve(&plant.region_id, &plant.technology.resource_usage, production)
        {
            warn!(
                "Plant {} exceeds the cap on {resource} with {} in {year}; forcing a decision",
                plant.id, plant.technology.id
            );
            state.cycle.force();
        }
    }

    let due: Vec<_> = states
        .iter()
        .enumerate()
        .filter(|(_, state)| state.cycle.phase() == CyclePhase::MainCycleDue)
        .map(|(idx, _)| idx)
        .collect();
    debug!("{} plants due a main decision in {year}", due.len());

    let appraisals = due
        .par_iter()
        .map(|&idx| appraise_plant(ctx, &states[idx].plant, &states[idx].cycle, year))
        .collect::<Result<Vec<_>>>()?;

    for (idx, appraisal) in due.into_iter().zip(appraisals) {
        capex += commit_decision(ctx, &mut ledger, &mut states[idx], appraisal, year, result)?;
    }

    for state in states
        .iter_mut()
        .filter(|state| state.cycle.phase() == CyclePhase::TransitionalRepairDue)
    {
        capex += commit_repair(ctx, state, year, result)?;
    }

    Ok(capex)
}

/// Apply a scenario event to the plants it selects
fn apply_event(
    ctx: &RankingContext,
    event: &ScenarioEvent,
    states: &mut [PlantState],
    year: u32,
    result: &mut SimulationResult,
) -> Result<()> {
    let selected = states
        .iter_mut()
        .filter(|state| !state.plant.is_closed() && event.selects(&state.plant.id));
    match event.action {
        EventAction::Review => {
            for state in selected {
                debug!("Review forced for plant {} in {year}", state.plant.id);
                state.cycle.force();
            }
        }
        EventAction::Retire => {
            let technology_id = event
                .technology
                .as_ref()
                .with_context(|| format!("retire event in {year} has no closure technology"))?;
            let technology = ctx
                .technologies
                .get(technology_id)
                .with_context(|| format!("Unknown closure technology {technology_id}"))?;

            for state in selected {
                info!("Plant {} retired in {year}", state.plant.id);
                let prior_technology = state.plant.technology.id.clone();
                state.plant.technology = Arc::clone(technology);
                state.cycle.close();
                result.decisions.push(DecisionRecord {
                    plant_id: state.plant.id.clone(),
                    year,
                    trigger: DecisionTrigger::Forced,
                    prior_technology,
                    chosen_technology: Some(technology_id.clone()),
                    candidates: Vec::new(),
                    rationale: Rationale::ConstraintForced,
                    capex_spent: Money(0.0),
                });
            }
        }
    }

    Ok(())
}

/// Choose and commit a technology for a plant making a main decision
fn commit_decision(
    ctx: &RankingContext,
    ledger: &mut ResourceLedger,
    state: &mut PlantState,
    appraisal: PlantAppraisal,
    year: u32,
    result: &mut SimulationResult,
) -> Result<Money> {
    let scenario = ctx.scenario;
    let plant = &mut state.plant;
    let production = plant_production(plant, scenario, year)?;
    let prior_technology = plant.technology.id.clone();
    let trigger = if state.cycle.is_forced() {
        DecisionTrigger::Forced
    } else {
        DecisionTrigger::MainCycle
    };

    let selection = select_technology(
        appraisal,
        &prior_technology,
        scenario.switching_inertia_margin,
        ledger,
        &plant.region_id,
        production,
    );

    // Overrides are tagged as such whatever the outcome of the ranking
    let rationale = match (trigger, selection.rationale) {
        (DecisionTrigger::Forced, rationale) if rationale != Rationale::Unresolved => {
            Rationale::ConstraintForced
        }
        (_, rationale) => rationale,
    };

    let mut capex_spent = Money(0.0);
    let chosen_technology = match selection.chosen {
        Some((technology, cycle_length)) => {
            let cost = ctx
                .reference_tables
                .cost(&technology.id, &plant.region_id, year)?;
            capex_spent = cost.capex * plant.capacity;
            debug!(
                "Plant {} chose {} in {year} ({})",
                plant.id, technology.id, rationale
            );
            plant.technology = technology;
            state
                .cycle
                .commit(ctx.cycle_settings, year, cycle_length);
            Some(plant.technology.id.clone())
        }
        None => {
            warn!(
                "No feasible technology for plant {} in {year}; it will keep operating {}",
                plant.id, prior_technology
            );
            if let Err(resource) =
                ledger.reserve(&plant.region_id, &plant.technology.resource_usage, production)
            {
                bail!(
                    "Integrity fault: plant {} cannot keep operating {} within the cap on \
                    {resource} in {year}",
                    plant.id,
                    prior_technology
                );
            }
            state.cycle.defer(year);
            result.unresolved.push(UnresolvedPlant {
                plant_id: plant.id.clone(),
                year,
                technology_id: prior_technology.clone(),
            });
            None
        }
    };

    result.decisions.push(DecisionRecord {
        plant_id: plant.id.clone(),
        year,
        trigger,
        prior_technology,
        chosen_technology,
        candidates: selection.candidates,
        rationale,
        capex_spent,
    });

    Ok(capex_spent)
}

/// Record a transitional repair, returning its capital cost
fn commit_repair(
    ctx: &RankingContext,
    state: &mut PlantState,
    year: u32,
    result: &mut SimulationResult,
) -> Result<Money> {
    let plant = &state.plant;
    let cost = ctx
        .reference_tables
        .cost(&plant.technology.id, &plant.region_id, year)?;
    let capex_spent = ctx.scenario.repair_capex_share * (cost.capex * plant.capacity);
    state.cycle.complete_repair();

    result.decisions.push(DecisionRecord {
        plant_id: plant.id.clone(),
        year,
        trigger: DecisionTrigger::TransitionalRepair,
        prior_technology: plant.technology.id.clone(),
        chosen_technology: Some(plant.technology.id.clone()),
        candidates: Vec::new(),
        rationale: Rationale::NoChange,
        capex_spent,
    });

    Ok(capex_spent)
}

/// Account for the fleet's production, emissions and costs in a year
fn account_year(
    model: &Model,
    ctx: &RankingContext,
    states: &[PlantState],
    year: u32,
    capex: Money,
    result: &mut SimulationResult,
) -> Result<SnapshotBuilder> {
    let scenario = ctx.scenario;
    let baseline = fleet_emissions(
        ctx.reference_tables,
        scenario,
        model.plants.values(),
        year,
    )?;

    let mut builder = SnapshotBuilder::new(year, capex, baseline);
    for state in states {
        let production = plant_production(&state.plant, scenario, year)?;
        let emissions = plant_emissions(ctx.reference_tables, &state.plant, production, year)?;
        let cost = operating_cost(ctx.reference_tables, scenario, &emissions)?;
        builder.add_plant(&state.plant, &emissions, cost);
        result.plant_emissions.push(emissions);
    }

    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, model};
    use crate::model::HorizonSelection;
    use crate::scenario::MoratoriumRule;
    use rstest::rstest;

    #[rstest]
    fn test_run_covers_every_year(model: Model) {
        let scenario = model.scenario("reference").unwrap();
        let result = run(&model, scenario, model.horizon()).unwrap();
        let years: Vec<_> = result.snapshots.iter().map(|s| s.year).collect();
        assert_eq!(years, (2025..=2035).collect::<Vec<_>>());
        assert_eq!(result.plants.len(), model.plants.len());
        assert!(result.decisions.iter().all(|d| d.year > 2025));
    }

    #[rstest]
    fn test_run_is_deterministic(model: Model) {
        let scenario = model.scenario("reference").unwrap();
        let a = run(&model, scenario, model.horizon()).unwrap();
        let b = run(&model, scenario, model.horizon()).unwrap();
        assert_eq!(a.decisions, b.decisions);
        assert_eq!(a.snapshots, b.snapshots);
        assert_eq!(a.plants, b.plants);
    }

    #[rstest]
    fn test_single_technology_matches_baseline(model: Model) {
        assert_eq!(model.technologies.len(), 1);
        let scenario = model.scenario("reference").unwrap();
        let result = run(&model, scenario, model.horizon()).unwrap();
        for snapshot in &result.snapshots {
            assert_eq!(snapshot.annual_abatement, Emissions(0.0));
            assert_eq!(snapshot.emissions(), snapshot.baseline_emissions);
        }
    }

    #[rstest]
    fn test_moratorium_on_every_technology(mut model: Model) {
        let ids: Vec<_> = model.technologies.keys().cloned().collect();
        let scenario = &mut model.parameters.scenarios[0];
        scenario.moratorium_rules = ids
            .into_iter()
            .map(|id| MoratoriumRule {
                technology: Some(id),
                phase: None,
                from_year: 2025,
            })
            .collect();
        let scenario = scenario.clone();

        let result = run(&model, &scenario, model.horizon()).unwrap();
        assert!(!result.unresolved.is_empty());
        for decision in result
            .decisions
            .iter()
            .filter(|d| d.trigger == DecisionTrigger::MainCycle)
        {
            assert_eq!(decision.rationale, Rationale::Unresolved);
            assert!(decision.chosen_technology.is_none());
        }
        assert_eq!(
            result.unresolved.len(),
            result
                .decisions
                .iter()
                .filter(|d| d.rationale == Rationale::Unresolved)
                .count()
        );
    }

    #[rstest]
    fn test_second_half_matches_full_run(model: Model) {
        let scenario = model.scenario("reference").unwrap();
        let full = run(&model, scenario, model.horizon()).unwrap();
        let years = model.select_horizon(HorizonSelection::SecondHalf);
        let second = run(&model, scenario, years.clone()).unwrap();

        let first_year = *years.start();
        let tail = |year: u32| year >= first_year;
        let snapshots: Vec<_> = full.snapshots.iter().filter(|s| tail(s.year)).collect();
        assert_eq!(second.snapshots.iter().collect::<Vec<_>>(), snapshots);
        let decisions: Vec<_> = full.decisions.iter().filter(|d| tail(d.year)).collect();
        assert_eq!(second.decisions.iter().collect::<Vec<_>>(), decisions);
        assert_eq!(second.snapshots.first().unwrap().year, first_year);
        assert_eq!(second.plants, full.plants);
    }

    #[rstest]
    fn test_years_outside_horizon(model: Model) {
        let scenario = model.scenario("reference").unwrap();
        assert_error!(
            run(&model, scenario, 2020..=2030),
            "Years 2020-2030 are not within the model horizon 2025-2035"
        );
    }

    #[rstest]
    fn test_review_event_forces_decision(mut model: Model) {
        let scenario = &mut model.parameters.scenarios[0];
        scenario.investment_cycle_variance = 0;
        scenario.events.push(ScenarioEvent {
            year: 2027,
            action: EventAction::Review,
            plants: "P1".into(),
            technology: None,
        });
        let scenario = scenario.clone();

        // Without the event the plant's first decision would be in 2030
        let result = run(&model, &scenario, model.horizon()).unwrap();
        let decision = result.decisions.first().unwrap();
        assert_eq!(decision.year, 2027);
        assert_eq!(decision.trigger, DecisionTrigger::Forced);
        assert_eq!(decision.rationale, Rationale::ConstraintForced);
        assert_eq!(decision.chosen_technology, Some("BF-BOF".into()));
        assert!(
            result
                .decisions
                .iter()
                .all(|d| d.trigger != DecisionTrigger::MainCycle)
        );
    }
}
