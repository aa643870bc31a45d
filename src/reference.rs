//! Cost and emissions reference tables, keyed by technology, region and year.
//!
//! These are pure lookups. A missing entry is reported as a [`DataGap`], which callers can
//! recover from the [`anyhow::Error`] chain with `downcast_ref`.
use crate::region::RegionID;
use crate::technology::TechnologyID;
use crate::units::{EmissionsPerProduction, MoneyPerCapacity, MoneyPerProduction};
use std::collections::HashMap;
use std::fmt;

/// Capital and operating costs for a technology in a region and year
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct CostEntry {
    /// Capital cost per tonne of capacity
    pub capex: MoneyPerCapacity,
    /// Region-adjusted operating cost per tonne of steel
    pub opex: MoneyPerProduction,
}

/// Emissions intensities by scope for a technology in a region and year
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct EmissionsEntry {
    /// Direct emissions
    pub scope1: EmissionsPerProduction,
    /// Indirect emissions from purchased energy
    pub scope2: EmissionsPerProduction,
    /// Other indirect emissions along the value chain
    pub scope3: EmissionsPerProduction,
}

impl EmissionsEntry {
    /// Emissions subject to the carbon price (scopes 1 and 2)
    pub fn taxable(&self) -> EmissionsPerProduction {
        self.scope1 + self.scope2
    }
}

/// Key used for reference table lookups
pub type ReferenceKey = (TechnologyID, RegionID, u32);

/// The reference table a [`DataGap`] occurred in
#[derive(PartialEq, Eq, Debug, Clone, Copy, strum::Display)]
pub enum ReferenceTable {
    /// Capex and opex
    #[strum(serialize = "cost")]
    Cost,
    /// Emissions by scope
    #[strum(serialize = "emissions")]
    Emissions,
}

/// A lookup into a reference table for which no data exists
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct DataGap {
    /// The table which was queried
    pub table: ReferenceTable,
    /// The technology
    pub technology_id: TechnologyID,
    /// The region
    pub region_id: RegionID,
    /// The year
    pub year: u32,
}

impl fmt::Display for DataGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "No {} data for technology {} in region {} for year {}",
            self.table, self.technology_id, self.region_id, self.year
        )
    }
}

impl std::error::Error for DataGap {}

/// Cost and emissions reference data for every technology, region and year
#[derive(PartialEq, Debug, Default, Clone)]
pub struct ReferenceTables {
    costs: HashMap<ReferenceKey, CostEntry>,
    emissions: HashMap<ReferenceKey, EmissionsEntry>,
}

fn lookup<T: Copy>(
    map: &HashMap<ReferenceKey, T>,
    table: ReferenceTable,
    technology_id: &TechnologyID,
    region_id: &RegionID,
    year: u32,
) -> Result<T, DataGap> {
    map.get(&(technology_id.clone(), region_id.clone(), year))
        .copied()
        .ok_or_else(|| DataGap {
            table,
            technology_id: technology_id.clone(),
            region_id: region_id.clone(),
            year,
        })
}

impl ReferenceTables {
    /// Create reference tables from cost and emissions maps
    pub fn new(
        costs: HashMap<ReferenceKey, CostEntry>,
        emissions: HashMap<ReferenceKey, EmissionsEntry>,
    ) -> Self {
        Self { costs, emissions }
    }

    /// Look up capex and opex
    pub fn cost(
        &self,
        technology_id: &TechnologyID,
        region_id: &RegionID,
        year: u32,
    ) -> Result<CostEntry, DataGap> {
        lookup(
            &self.costs,
            ReferenceTable::Cost,
            technology_id,
            region_id,
            year,
        )
    }

    /// Look up emissions intensities by scope
    pub fn emissions(
        &self,
        technology_id: &TechnologyID,
        region_id: &RegionID,
        year: u32,
    ) -> Result<EmissionsEntry, DataGap> {
        lookup(
            &self.emissions,
            ReferenceTable::Emissions,
            technology_id,
            region_id,
            year,
        )
    }

    /// Whether any cost data exists for the technology in the region
    pub fn has_cost_data(&self, technology_id: &TechnologyID, region_id: &RegionID) -> bool {
        self.costs
            .keys()
            .any(|(tech, region, _)| tech == technology_id && region == region_id)
    }

    /// Iterate over the cost table's keys
    pub fn cost_keys(&self) -> impl Iterator<Item = &ReferenceKey> {
        self.costs.keys()
    }

    /// Iterate over the emissions table's keys
    pub fn emissions_keys(&self) -> impl Iterator<Item = &ReferenceKey> {
        self.emissions.keys()
    }
}
