//! Appraisal and ranking of candidate technologies for plants making a main-cycle decision.
//!
//! Appraisal is a pure function of the model, scenario and plant state, so plants can be
//! appraised in parallel. Selection draws on the year's resource ledger and must be done serially
//! in ascending plant ID order.
use super::decision::{CandidateAppraisal, ExclusionReason, Rationale};
use super::investment_cycle::{CycleSettings, InvestmentCycle};
use super::ledger::ResourceLedger;
use crate::finance::{annual_capital_cost_per_production, levelised_cost};
use crate::plant::Plant;
use crate::reference::ReferenceTables;
use crate::region::RegionID;
use crate::scenario::{ScenarioConfig, SolverLogic};
use crate::technology::{Technology, TechnologyID, TechnologyMap};
use crate::units::{Dimensionless, MoneyPerProduction, Production};
use anyhow::{Result, ensure};
use std::cmp::Ordering;
use std::sync::Arc;

pub mod constraints;
use constraints::{ConstraintPredicate, evaluate_constraints};

/// Everything needed to appraise candidates in a given scenario
pub struct RankingContext<'a> {
    /// Cost and emissions reference data
    pub reference_tables: &'a ReferenceTables,
    /// All technologies in the model
    pub technologies: &'a TechnologyMap,
    /// The scenario being run
    pub scenario: &'a ScenarioConfig,
    /// Policy predicates for the scenario
    pub constraints: &'a [Box<dyn ConstraintPredicate>],
    /// Investment cycle settings for the scenario
    pub cycle_settings: &'a CycleSettings,
    /// The last year of the model horizon. Lookups beyond this year use this year's data.
    pub horizon_end: u32,
}

/// Levelised total cost of ownership for a technology adopted in `year`.
///
/// The yearly cost is the annualised capex plus opex plus the carbon cost of taxable emissions,
/// evaluated for each year of the cycle and levelised with the scenario discount rate.
pub fn levelised_tco(
    ctx: &RankingContext,
    technology_id: &TechnologyID,
    region_id: &RegionID,
    year: u32,
    cycle_length: u32,
) -> Result<MoneyPerProduction> {
    let scenario = ctx.scenario;
    let capex = ctx
        .reference_tables
        .cost(technology_id, region_id, year)?
        .capex;
    let capital_cost = annual_capital_cost_per_production(
        capex,
        cycle_length,
        scenario.discount_rate,
        scenario.utilisation,
    );

    let yearly_costs = (0..cycle_length)
        .map(|years_after| -> Result<MoneyPerProduction> {
            let lookup_year = (year + years_after).min(ctx.horizon_end);
            let cost = ctx
                .reference_tables
                .cost(technology_id, region_id, lookup_year)?;
            let emissions = ctx
                .reference_tables
                .emissions(technology_id, region_id, lookup_year)?;
            let carbon_cost = emissions.taxable() * scenario.carbon_price(lookup_year);
            Ok(capital_cost + cost.opex + carbon_cost)
        })
        .collect::<Result<Vec<_>>>()?;

    let tco = levelised_cost(yearly_costs, scenario.discount_rate);
    ensure!(
        tco.is_finite() && tco >= MoneyPerProduction(0.0),
        "Integrity fault: TCO of technology {technology_id} in region {region_id} for {year} is \
        {tco}"
    );

    Ok(tco)
}

/// How candidates are scored against each other. Lower scores are better.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingWeights {
    /// How each metric is normalised before weighting
    pub logic: SolverLogic,
    /// Weight given to TCO
    pub tco: Dimensionless,
    /// Weight given to emissions intensity
    pub emissions: Dimensionless,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            logic: SolverLogic::Scaled,
            tco: Dimensionless(1.0),
            emissions: Dimensionless(0.0),
        }
    }
}

impl From<&ScenarioConfig> for RankingWeights {
    fn from(scenario: &ScenarioConfig) -> Self {
        Self {
            logic: scenario.solver_logic,
            tco: scenario.tco_weight,
            emissions: scenario.emissions_weight,
        }
    }
}

/// Normalise `values` for scoring. `None` entries are left out and get `None`.
fn normalise(values: &[Option<f64>], logic: SolverLogic) -> Vec<Option<f64>> {
    let present = || values.iter().flatten().copied();
    let scale = |value: f64| match logic {
        SolverLogic::Scaled => {
            let min = present().fold(f64::INFINITY, f64::min);
            let max = present().fold(f64::NEG_INFINITY, f64::max);
            if max > min {
                (value - min) / (max - min)
            } else {
                0.0
            }
        }
        SolverLogic::Ranked => (1 + present().filter(|&other| other < value).count()) as f64,
    };

    values.iter().map(|value| value.map(scale)).collect()
}

/// Score each candidate against the other policy-feasible candidates.
///
/// Candidates excluded by policy are not scored and get an infinite score.
fn score_candidates(candidates: &[&CandidateAppraisal], weights: &RankingWeights) -> Vec<f64> {
    let metric = |get: fn(&CandidateAppraisal) -> f64| -> Vec<Option<f64>> {
        let values: Vec<_> = candidates
            .iter()
            .map(|candidate| candidate.is_policy_feasible().then(|| get(candidate)))
            .collect();
        normalise(&values, weights.logic)
    };
    let tco = metric(|candidate: &CandidateAppraisal| candidate.tco.value());
    let emissions = metric(|candidate: &CandidateAppraisal| candidate.emissions.value());

    tco.into_iter()
        .zip(emissions)
        .map(|scores| match scores {
            (Some(tco), Some(emissions)) => {
                weights.tco.value() * tco + weights.emissions.value() * emissions
            }
            _ => f64::INFINITY,
        })
        .collect()
}

/// Break ties between equally-scored candidates: by ascending TCO, then by ID
fn compare_candidates(a: &CandidateAppraisal, b: &CandidateAppraisal) -> Ordering {
    a.tco
        .value()
        .total_cmp(&b.tco.value())
        .then_with(|| a.technology_id.cmp(&b.technology_id))
}

/// The appraised candidates for a single plant, in rank order
#[derive(Debug, Clone)]
pub struct PlantAppraisal {
    candidates: Vec<(Arc<Technology>, CandidateAppraisal)>,
}

impl PlantAppraisal {
    /// Rank appraised candidates: policy-feasible first, then by ascending score
    pub fn new(
        candidates: Vec<(Arc<Technology>, CandidateAppraisal)>,
        weights: &RankingWeights,
    ) -> Self {
        let appraisals: Vec<_> = candidates.iter().map(|(_, candidate)| candidate).collect();
        let scores = score_candidates(&appraisals, weights);

        let mut scored: Vec<_> = scores.into_iter().zip(candidates).collect();
        scored.sort_by(|(score_a, (_, a)), (score_b, (_, b))| {
            b.is_policy_feasible()
                .cmp(&a.is_policy_feasible())
                .then_with(|| score_a.total_cmp(score_b))
                .then_with(|| compare_candidates(a, b))
        });

        Self {
            candidates: scored.into_iter().map(|(_, candidate)| candidate).collect(),
        }
    }
}

/// Appraise every candidate technology for a plant making a main decision in `year`
pub fn appraise_plant(
    ctx: &RankingContext,
    plant: &Plant,
    cycle: &InvestmentCycle,
    year: u32,
) -> Result<PlantAppraisal> {
    let candidates = Technology::iter_candidates(ctx.technologies, &plant.region_id)
        .map(|technology| -> Result<_> {
            let cycle_length =
                cycle.next_cycle_length(ctx.cycle_settings, &plant.id, technology.investment_cycle);
            let tco = levelised_tco(ctx, &technology.id, &plant.region_id, year, cycle_length)?;
            let emissions = ctx
                .reference_tables
                .emissions(&technology.id, &plant.region_id, year)?
                .taxable();
            let exclusion =
                evaluate_constraints(ctx.constraints, technology, &plant.technology, year);
            let appraisal = CandidateAppraisal {
                technology_id: technology.id.clone(),
                tco,
                emissions,
                cycle_length,
                exclusion,
            };
            Ok((Arc::clone(technology), appraisal))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(PlantAppraisal::new(
        candidates,
        &RankingWeights::from(ctx.scenario),
    ))
}

/// The outcome of a main-cycle decision
#[derive(Debug, Clone)]
pub struct Selection {
    /// The chosen technology and the length of the cycle it starts, if any was feasible
    pub chosen: Option<(Arc<Technology>, u32)>,
    /// Why the outcome was reached
    pub rationale: Rationale,
    /// Every candidate, in rank order, with ledger rejections recorded
    pub candidates: Vec<CandidateAppraisal>,
}

/// Whether the best candidate is no more than `margin` cheaper than the incumbent.
///
/// A best candidate which costs more than the incumbent was ranked first on emissions, so the
/// margin doesn't protect the incumbent against it.
fn within_margin(
    incumbent: MoneyPerProduction,
    best: MoneyPerProduction,
    margin: Dimensionless,
) -> bool {
    best <= incumbent && incumbent - best <= margin * incumbent
}

/// Choose a technology for a plant, reserving its constrained resources in the ledger.
///
/// The preferred candidate is the best-ranked policy-feasible one, unless the incumbent is
/// feasible and its TCO is within `margin` of the preferred candidate's, in which case the plant
/// stays put. The incumbent is compared with the best-ranked candidate only, so it beats any
/// number of challengers inside the margin. If the ledger can't accommodate the choice it is
/// rejected and the choice is repeated among the remaining candidates.
pub fn select_technology(
    appraisal: PlantAppraisal,
    incumbent_id: &TechnologyID,
    margin: Dimensionless,
    ledger: &mut ResourceLedger,
    region_id: &RegionID,
    production: Production,
) -> Selection {
    let mut candidates = appraisal.candidates;
    let incumbent_idx = candidates
        .iter()
        .position(|(_, candidate)| candidate.technology_id == *incumbent_id);
    let incumbent_excluded =
        incumbent_idx.is_none_or(|idx| !candidates[idx].1.is_policy_feasible());

    // Indexes of candidates still in the running, in rank order
    let mut remaining: Vec<usize> = candidates
        .iter()
        .enumerate()
        .filter(|(_, (_, candidate))| candidate.is_policy_feasible())
        .map(|(idx, _)| idx)
        .collect();
    let mut rejected = false;

    while let Some(&best_idx) = remaining.first() {
        let choice = match incumbent_idx {
            Some(idx)
                if remaining.contains(&idx)
                    && within_margin(
                        candidates[idx].1.tco,
                        candidates[best_idx].1.tco,
                        margin,
                    ) =>
            {
                idx
            }
            _ => best_idx,
        };

        let (technology, candidate) = &mut candidates[choice];
        match ledger.reserve(region_id, &technology.resource_usage, production) {
            Ok(()) => {
                let rationale = if rejected || (incumbent_excluded && incumbent_idx != Some(choice))
                {
                    Rationale::ConstraintForced
                } else if incumbent_idx == Some(choice) {
                    Rationale::NoChange
                } else {
                    Rationale::CostDriven
                };
                let chosen = (Arc::clone(technology), candidate.cycle_length);
                return Selection {
                    chosen: Some(chosen),
                    rationale,
                    candidates: candidates.into_iter().map(|(_, c)| c).collect(),
                };
            }
            Err(resource) => {
                candidate.exclusion = Some(ExclusionReason::ResourceCap(resource));
                remaining.retain(|&idx| idx != choice);
                rejected = true;
            }
        }
    }

    Selection {
        chosen: None,
        rationale: Rationale::Unresolved,
        candidates: candidates.into_iter().map(|(_, c)| c).collect(),
    }
}
