//! Production, emissions and cost accounting for plants and the fleet as a whole.
use crate::plant::{Plant, PlantID};
use crate::reference::ReferenceTables;
use crate::region::RegionID;
use crate::scenario::ScenarioConfig;
use crate::technology::TechnologyID;
use crate::units::{Capacity, Dimensionless, Emissions, Money, Production};
use anyhow::{Result, ensure};
use indexmap::IndexMap;

/// A plant's production and emissions in a single year
#[derive(Debug, Clone, PartialEq)]
pub struct PlantEmissions {
    /// The plant
    pub plant_id: PlantID,
    /// The year
    pub year: u32,
    /// The technology operated in that year
    pub technology_id: TechnologyID,
    /// The plant's region
    pub region_id: RegionID,
    /// Steel produced
    pub production: Production,
    /// Direct emissions
    pub scope1: Emissions,
    /// Emissions from purchased energy
    pub scope2: Emissions,
    /// Other value chain emissions
    pub scope3: Emissions,
}

impl PlantEmissions {
    /// Emissions subject to the carbon price
    pub fn taxable(&self) -> Emissions {
        self.scope1 + self.scope2
    }
}

/// Capacity aggregated by technology and region
pub type CapacityMap = IndexMap<(TechnologyID, RegionID), Capacity>;

/// Fleet-wide totals for a single year
#[derive(Debug, Clone, PartialEq)]
pub struct FleetSnapshot {
    /// The year
    pub year: u32,
    /// Total steel produced
    pub production: Production,
    /// Capacity by technology and region, in ascending key order
    pub capacity: CapacityMap,
    /// Opex plus carbon costs
    pub operating_cost: Money,
    /// Capital spent on decisions and repairs this year
    pub capex: Money,
    /// Direct emissions
    pub scope1: Emissions,
    /// Emissions from purchased energy
    pub scope2: Emissions,
    /// Other value chain emissions
    pub scope3: Emissions,
    /// Scope 1 and 2 emissions of the frozen starting fleet
    pub baseline_emissions: Emissions,
    /// Baseline emissions minus this year's scope 1 and 2 emissions
    pub annual_abatement: Emissions,
    /// Running total of annual abatement
    pub cumulative_abatement: Emissions,
}

impl FleetSnapshot {
    /// Scope 1 and 2 emissions
    pub fn emissions(&self) -> Emissions {
        self.scope1 + self.scope2
    }

    /// Operating cost plus capex
    pub fn total_cost(&self) -> Money {
        self.operating_cost + self.capex
    }
}

/// Steel produced by a plant in `year`, given the scenario's utilisation and demand path
pub fn plant_production(plant: &Plant, scenario: &ScenarioConfig, year: u32) -> Result<Production> {
    let load_factor = scenario.utilisation * scenario.demand_index(year);
    let production = plant.production(load_factor);
    ensure!(
        production / plant.capacity <= Dimensionless(1.0),
        "Integrity fault: production of plant {} in {year} ({production}) exceeds its capacity \
        ({})",
        plant.id,
        plant.capacity
    );

    Ok(production)
}

/// Calculate a plant's emissions in `year`. Closed plants emit nothing.
pub fn plant_emissions(
    reference_tables: &ReferenceTables,
    plant: &Plant,
    production: Production,
    year: u32,
) -> Result<PlantEmissions> {
    let mut emissions = PlantEmissions {
        plant_id: plant.id.clone(),
        year,
        technology_id: plant.technology.id.clone(),
        region_id: plant.region_id.clone(),
        production,
        scope1: Emissions(0.0),
        scope2: Emissions(0.0),
        scope3: Emissions(0.0),
    };
    if plant.is_closed() {
        return Ok(emissions);
    }

    let intensity = reference_tables.emissions(&plant.technology.id, &plant.region_id, year)?;
    emissions.scope1 = intensity.scope1 * production;
    emissions.scope2 = intensity.scope2 * production;
    emissions.scope3 = intensity.scope3 * production;

    Ok(emissions)
}

/// Opex plus carbon cost for a plant's production in `year`
pub fn operating_cost(
    reference_tables: &ReferenceTables,
    scenario: &ScenarioConfig,
    emissions: &PlantEmissions,
) -> Result<Money> {
    if emissions.production == Production(0.0) {
        return Ok(Money(0.0));
    }

    let cost = reference_tables.cost(
        &emissions.technology_id,
        &emissions.region_id,
        emissions.year,
    )?;
    let carbon_cost = emissions.taxable().value() * scenario.carbon_price(emissions.year).value();

    Ok(cost.opex * emissions.production + Money(carbon_cost))
}

/// Scope 1 and 2 emissions of a set of plants in `year`
pub fn fleet_emissions<'a, I>(
    reference_tables: &ReferenceTables,
    scenario: &ScenarioConfig,
    plants: I,
    year: u32,
) -> Result<Emissions>
where
    I: IntoIterator<Item = &'a Plant>,
{
    let mut total = Emissions(0.0);
    for plant in plants {
        let production = plant_production(plant, scenario, year)?;
        total += plant_emissions(reference_tables, plant, production, year)?.taxable();
    }

    Ok(total)
}

/// Accumulates the year's plant-level results into a [`FleetSnapshot`]
pub struct SnapshotBuilder {
    snapshot: FleetSnapshot,
}

impl SnapshotBuilder {
    /// Start a snapshot for `year`
    pub fn new(year: u32, capex: Money, baseline_emissions: Emissions) -> Self {
        Self {
            snapshot: FleetSnapshot {
                year,
                production: Production(0.0),
                capacity: CapacityMap::new(),
                operating_cost: Money(0.0),
                capex,
                scope1: Emissions(0.0),
                scope2: Emissions(0.0),
                scope3: Emissions(0.0),
                baseline_emissions,
                annual_abatement: Emissions(0.0),
                cumulative_abatement: Emissions(0.0),
            },
        }
    }

    /// Add a plant's results
    pub fn add_plant(&mut self, plant: &Plant, emissions: &PlantEmissions, operating_cost: Money) {
        let snapshot = &mut self.snapshot;
        snapshot.production += emissions.production;
        snapshot.operating_cost += operating_cost;
        snapshot.scope1 += emissions.scope1;
        snapshot.scope2 += emissions.scope2;
        snapshot.scope3 += emissions.scope3;
        *snapshot
            .capacity
            .entry((plant.technology.id.clone(), plant.region_id.clone()))
            .or_default() += plant.capacity;
    }

    /// Finalise the snapshot, given the cumulative abatement up to the previous year
    pub fn finish(mut self, previous_cumulative: Emissions) -> FleetSnapshot {
        let snapshot = &mut self.snapshot;
        snapshot.capacity.sort_keys();
        snapshot.annual_abatement = snapshot.baseline_emissions - snapshot.emissions();
        snapshot.cumulative_abatement = previous_cumulative + snapshot.annual_abatement;
        self.snapshot
    }
}
