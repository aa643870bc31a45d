//! Scenario configurations: the policy and economic assumptions under which the fleet evolves.
use crate::input::{deserialise_proportion, deserialise_proportion_nonzero, is_sorted_and_unique};
use crate::plant::{PlantID, PlantMap};
use crate::region::{RegionID, RegionMap};
use crate::technology::{Phase, ResourceID, Technology, TechnologyID, TechnologyMap};
use crate::units::{Dimensionless, MoneyPerEmissions, ResourceQuantity};
use anyhow::{Context, Result, ensure};
use indexmap::IndexSet;
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_param_default!(default_carbon_price_path, YearPath, YearPath::constant(0.0));
define_param_default!(default_demand_growth_path, YearPath, YearPath::constant(1.0));
define_param_default!(default_switching_inertia_margin, Dimensionless, Dimensionless(0.1));
define_param_default!(default_discount_rate, Dimensionless, Dimensionless(0.07));
define_param_default!(default_investment_cycle_variance, u32, 3);
define_param_default!(default_offcycle_buffer_top, u32, 3);
define_param_default!(default_offcycle_buffer_tail, u32, 8);
define_param_default!(default_net_zero_variance, u32, 3);
define_param_default!(default_utilisation, Dimensionless, Dimensionless(0.95));
define_param_default!(default_repair_capex_share, Dimensionless, Dimensionless(0.1));
define_param_default!(default_plant_selection, String, "all".into());
define_param_default!(default_tco_weight, Dimensionless, Dimensionless(1.0));
define_param_default!(default_emissions_weight, Dimensionless, Dimensionless(0.0));

/// A value at a given year
#[derive(PartialEq, Debug, Clone, Copy, Deserialize)]
pub struct YearPoint {
    /// The year
    pub year: u32,
    /// The value in that year
    pub value: f64,
}

/// A series of values over time.
///
/// Values are linearly interpolated between points and held flat beyond either end.
#[derive(PartialEq, Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct YearPath(Vec<YearPoint>);

impl YearPath {
    /// A path with the same value in every year
    pub fn constant(value: f64) -> Self {
        Self(vec![YearPoint { year: 0, value }])
    }

    /// Get the value of the path in the given year
    pub fn value_at(&self, year: u32) -> f64 {
        let Some(first) = self.0.first() else {
            return 0.0;
        };
        if year <= first.year {
            return first.value;
        }

        for (a, b) in self.0.iter().zip(self.0.iter().skip(1)) {
            if year <= b.year {
                let fraction = f64::from(year - a.year) / f64::from(b.year - a.year);
                return a.value + fraction * (b.value - a.value);
            }
        }

        self.0.last().map_or(0.0, |last| last.value)
    }

    /// Check that the path is non-empty, ordered, finite and non-negative
    fn validate(&self) -> Result<()> {
        ensure!(!self.0.is_empty(), "Path must contain at least one point");
        ensure!(
            is_sorted_and_unique(self.0.iter().map(|point| point.year)),
            "Path years must be in order and unique"
        );
        for point in &self.0 {
            ensure!(
                point.value.is_finite() && point.value >= 0.0,
                "Invalid value {} for year {}",
                point.value,
                point.year
            );
        }

        Ok(())
    }
}

/// A minimum technology readiness level applying from a given year
#[derive(PartialEq, Debug, Clone, Copy, Deserialize)]
pub struct TrlThreshold {
    /// The first year the threshold applies
    pub year: u32,
    /// Technologies with a lower TRL are excluded
    pub min_trl: u32,
}

/// Bans adoption of a technology, or every technology in a phase, from a given year
#[derive(PartialEq, Debug, Clone, Deserialize)]
pub struct MoratoriumRule {
    /// The banned technology
    pub technology: Option<TechnologyID>,
    /// The banned phase
    pub phase: Option<Phase>,
    /// The first year of the ban
    pub from_year: u32,
}

impl MoratoriumRule {
    /// Whether the rule bans the technology in the given year
    pub fn bans(&self, technology: &Technology, year: u32) -> bool {
        if year < self.from_year {
            return false;
        }

        self.technology.as_ref() == Some(&technology.id) || self.phase == Some(technology.phase)
    }
}

/// A limit on the use of a resource in each year, globally or in a single region
#[derive(PartialEq, Debug, Clone, Deserialize)]
pub struct ResourceCap {
    /// The capped resource
    pub resource: ResourceID,
    /// The region the cap applies to. If omitted the cap is global.
    pub region: Option<RegionID>,
    /// The first year the cap applies (defaults to the start of the horizon)
    pub from_year: Option<u32>,
    /// The last year the cap applies (defaults to the end of the horizon)
    pub until_year: Option<u32>,
    /// Maximum quantity of the resource which can be used in a year
    pub limit: ResourceQuantity,
}

impl ResourceCap {
    /// Whether the cap is in force in the given year
    pub fn applies_in(&self, year: u32) -> bool {
        self.from_year.is_none_or(|from| year >= from)
            && self.until_year.is_none_or(|until| year <= until)
    }

    /// Whether resource used in the given region counts towards this cap
    pub fn covers_region(&self, region_id: &RegionID) -> bool {
        self.region.as_ref().is_none_or(|region| region == region_id)
    }
}

/// The kind of intervention applied by a [`ScenarioEvent`]
#[derive(PartialEq, Eq, Debug, Clone, Copy, DeserializeLabeledStringEnum)]
pub enum EventAction {
    /// Force a main-cycle decision ahead of schedule
    #[string = "review"]
    Review,
    /// Force plants onto a closure technology
    #[string = "retire"]
    Retire,
}

/// An exogenous intervention applied to a selection of plants in a given year
#[derive(PartialEq, Debug, Clone, Deserialize)]
pub struct ScenarioEvent {
    /// The year in which the event occurs
    pub year: u32,
    /// What happens to the selected plants
    pub action: EventAction,
    /// Either "all" or a semicolon-separated list of plant IDs
    #[serde(default = "default_plant_selection")]
    pub plants: String,
    /// The closure technology for `retire` events
    pub technology: Option<TechnologyID>,
}

impl ScenarioEvent {
    /// Whether the event applies to the given plant
    pub fn selects(&self, plant_id: &PlantID) -> bool {
        let plants = self.plants.trim();
        plants.eq_ignore_ascii_case("all")
            || plants.split(';').any(|id| id.trim() == &*plant_id.0)
    }
}

/// How TCO and emissions are combined into a single score when ranking candidates
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default, DeserializeLabeledStringEnum)]
pub enum SolverLogic {
    /// Each metric is min-max scaled across the feasible candidates
    #[default]
    #[string = "scaled"]
    Scaled,
    /// Each metric is replaced by its rank among the feasible candidates
    #[string = "ranked"]
    Ranked,
}

/// The policy and economic assumptions for a single scenario run
#[derive(PartialEq, Debug, Clone, Deserialize)]
pub struct ScenarioConfig {
    /// A unique name for the scenario
    pub name: String,
    /// Carbon price per tonne of CO2e over time
    #[serde(default = "default_carbon_price_path")]
    pub carbon_price_path: YearPath,
    /// Technology bans
    #[serde(default)]
    pub moratorium_rules: Vec<MoratoriumRule>,
    /// Limits on constrained resources
    #[serde(default)]
    pub resource_caps: Vec<ResourceCap>,
    /// Steel demand relative to the starting year, applied to utilisation
    #[serde(default = "default_demand_growth_path")]
    pub demand_growth_path: YearPath,
    /// Relative TCO advantage a candidate needs before a plant abandons its incumbent
    #[serde(default = "default_switching_inertia_margin")]
    #[serde(deserialize_with = "deserialise_proportion")]
    pub switching_inertia_margin: Dimensionless,
    /// How candidates are scored
    #[serde(default)]
    pub solver_logic: SolverLogic,
    /// Weight given to TCO when scoring candidates
    #[serde(default = "default_tco_weight")]
    pub tco_weight: Dimensionless,
    /// Weight given to emissions intensity when scoring candidates
    #[serde(default = "default_emissions_weight")]
    pub emissions_weight: Dimensionless,
    /// Seed for investment cycle draws
    #[serde(default)]
    pub random_seed: u64,
    /// Discount rate for TCO calculations
    #[serde(default = "default_discount_rate")]
    pub discount_rate: Dimensionless,
    /// Maximum deviation of a drawn cycle length from the technology's typical cycle
    #[serde(default = "default_investment_cycle_variance")]
    pub investment_cycle_variance: u32,
    /// Minimum years after a main decision before a transitional repair
    #[serde(default = "default_offcycle_buffer_top")]
    pub offcycle_buffer_top: u32,
    /// Minimum years between a transitional repair and the next main decision
    #[serde(default = "default_offcycle_buffer_tail")]
    pub offcycle_buffer_tail: u32,
    /// Main decisions falling shortly after this year are brought forward to the year before
    pub net_zero_year: Option<u32>,
    /// How many years after `net_zero_year` decisions are brought forward
    #[serde(default = "default_net_zero_variance")]
    pub net_zero_variance: u32,
    /// Proportion of capacity used for production
    #[serde(default = "default_utilisation")]
    #[serde(deserialize_with = "deserialise_proportion_nonzero")]
    pub utilisation: Dimensionless,
    /// Proportion of capex spent on a transitional repair
    #[serde(default = "default_repair_capex_share")]
    #[serde(deserialize_with = "deserialise_proportion")]
    pub repair_capex_share: Dimensionless,
    /// Minimum technology readiness level over time
    #[serde(default)]
    pub min_trl: Vec<TrlThreshold>,
    /// Exogenous interventions
    #[serde(default)]
    pub events: Vec<ScenarioEvent>,
}

impl ScenarioConfig {
    /// Carbon price in the given year
    pub fn carbon_price(&self, year: u32) -> MoneyPerEmissions {
        MoneyPerEmissions(self.carbon_price_path.value_at(year))
    }

    /// Demand relative to the starting year
    pub fn demand_index(&self, year: u32) -> Dimensionless {
        Dimensionless(self.demand_growth_path.value_at(year))
    }

    /// Iterate over the events occurring in the given year
    pub fn iter_events(&self, year: u32) -> impl Iterator<Item = &ScenarioEvent> {
        self.events.iter().filter(move |event| event.year == year)
    }

    /// A copy of this scenario with a different random seed
    pub fn with_seed(&self, random_seed: u64) -> Self {
        Self {
            random_seed,
            ..self.clone()
        }
    }

    /// Validate parameters which don't depend on other model data
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.name.trim().is_empty(), "Scenario name cannot be empty");

        self.carbon_price_path
            .validate()
            .context("Invalid carbon_price_path")?;
        self.demand_growth_path
            .validate()
            .context("Invalid demand_growth_path")?;

        ensure!(
            self.discount_rate.value().is_finite() && self.discount_rate >= Dimensionless(0.0),
            "discount_rate must be a finite number greater than or equal to zero"
        );

        for (name, weight) in [
            ("tco_weight", self.tco_weight),
            ("emissions_weight", self.emissions_weight),
        ] {
            ensure!(
                weight.value().is_finite() && weight >= Dimensionless(0.0),
                "{name} must be a finite number greater than or equal to zero"
            );
        }
        ensure!(
            self.tco_weight + self.emissions_weight > Dimensionless(0.0),
            "At least one of tco_weight and emissions_weight must be greater than zero"
        );

        for rule in &self.moratorium_rules {
            ensure!(
                rule.technology.is_some() != rule.phase.is_some(),
                "Moratorium rules must specify exactly one of technology or phase"
            );
        }

        for cap in &self.resource_caps {
            ensure!(
                cap.limit.is_finite() && cap.limit >= ResourceQuantity(0.0),
                "Cap on resource {} must be a finite number greater than or equal to zero",
                cap.resource
            );
            if let (Some(from), Some(until)) = (cap.from_year, cap.until_year) {
                ensure!(
                    from <= until,
                    "Cap on resource {} ends before it starts",
                    cap.resource
                );
            }
        }

        ensure!(
            is_sorted_and_unique(self.min_trl.iter().map(|threshold| threshold.year)),
            "min_trl years must be in order and unique"
        );
        for threshold in &self.min_trl {
            ensure!(
                (1..=9).contains(&threshold.min_trl),
                "min_trl must be between 1 and 9"
            );
        }

        for event in &self.events {
            ensure!(
                event.action != EventAction::Retire || event.technology.is_some(),
                "retire event in {} must specify a closure technology",
                event.year
            );
        }

        Ok(())
    }

    /// Check that the scenario is consistent with the rest of the model
    pub fn validate_references(
        &self,
        technologies: &TechnologyMap,
        regions: &RegionMap,
        plants: &PlantMap,
    ) -> Result<()> {
        for tech in technologies.values().filter(|tech| !tech.closure) {
            ensure!(
                tech.investment_cycle > self.investment_cycle_variance,
                "Technology {} has investment cycle {} which must exceed the cycle variance ({})",
                tech.id,
                tech.investment_cycle,
                self.investment_cycle_variance
            );
        }

        for rule in &self.moratorium_rules {
            if let Some(id) = &rule.technology {
                ensure!(
                    technologies.contains_key(id),
                    "Moratorium on unknown technology {id}"
                );
            }
        }

        let resources: IndexSet<_> = technologies
            .values()
            .flat_map(|tech| tech.resource_usage.keys())
            .collect();
        for cap in &self.resource_caps {
            ensure!(
                resources.contains(&cap.resource),
                "Cap on resource {} which no technology uses",
                cap.resource
            );
            if let Some(region) = &cap.region {
                ensure!(
                    regions.contains_key(region),
                    "Cap on resource {} in unknown region {region}",
                    cap.resource
                );
            }
        }

        for event in &self.events {
            let plants_str = event.plants.trim();
            if !plants_str.eq_ignore_ascii_case("all") {
                for id in plants_str.split(';') {
                    ensure!(
                        plants.contains_key(id.trim()),
                        "Event in {} refers to unknown plant {}",
                        event.year,
                        id.trim()
                    );
                }
            }

            if let Some(id) = &event.technology {
                let tech = technologies
                    .get(id)
                    .with_context(|| format!("Event in {} refers to unknown technology {id}", event.year))?;
                ensure!(
                    event.action != EventAction::Retire || tech.closure,
                    "retire event in {} must use a closure technology, but {id} is not one",
                    event.year
                );
            }
        }

        Ok(())
    }
}
