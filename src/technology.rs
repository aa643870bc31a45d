//! Technology archetypes are the steel production routes a plant can operate (e.g. a
//! conventional blast furnace or hydrogen-based direct reduction).
use crate::id::{define_id_getter, define_id_type};
use crate::region::RegionID;
use crate::units::ResourcePerProduction;
use indexmap::{IndexMap, IndexSet};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::sync::Arc;

define_id_type! {TechnologyID}
define_id_type! {ResourceID}

/// A map of [`Technology`]s, keyed by technology ID
pub type TechnologyMap = IndexMap<TechnologyID, Arc<Technology>>;

/// Resource consumption per tonne of steel, keyed by resource ID
pub type ResourceUsageMap = IndexMap<ResourceID, ResourcePerProduction>;

/// Where a technology sits on the decarbonisation pathway
#[derive(
    PartialEq,
    Eq,
    Copy,
    Clone,
    Debug,
    DeserializeLabeledStringEnum,
    SerializeLabeledStringEnum,
)]
pub enum Phase {
    /// Conventional, carbon-intensive routes
    #[string = "initial"]
    Initial,
    /// Routes which reduce but don't eliminate emissions (e.g. partial CCUS)
    #[string = "transitional"]
    Transitional,
    /// Near-zero emission routes
    #[string = "end_state"]
    EndState,
}

/// A steel production route shared by all plants operating it
#[derive(PartialEq, Debug, Clone)]
pub struct Technology {
    /// A unique identifier for the technology (e.g. "BF-BOF")
    pub id: TechnologyID,
    /// A human-readable description
    pub description: String,
    /// Technology readiness level (1-9)
    pub trl: u32,
    /// Position on the decarbonisation pathway
    pub phase: Phase,
    /// Typical number of years between main investment decisions
    pub investment_cycle: u32,
    /// The first year in which the technology can be adopted, if restricted
    pub available_from: Option<u32>,
    /// Whether this technology represents a closed plant
    pub closure: bool,
    /// Regions for which reference data exists
    pub regions: IndexSet<RegionID>,
    /// Constrained resources consumed per tonne of steel
    pub resource_usage: ResourceUsageMap,
    /// Technologies a plant operating this one may switch to. `None` means any.
    pub allowed_switches: Option<IndexSet<TechnologyID>>,
}
define_id_getter! {Technology, TechnologyID}

impl Technology {
    /// Whether the technology can be adopted in the given year, ignoring scenario policy
    pub fn is_available_in(&self, year: u32) -> bool {
        self.available_from.is_none_or(|from| year >= from)
    }

    /// Whether reference data exists for this technology in the given region
    pub fn operates_in(&self, region_id: &RegionID) -> bool {
        self.regions.contains(region_id)
    }

    /// Whether a plant operating this technology may switch to `other`. Staying put is always
    /// allowed.
    pub fn can_switch_to(&self, other: &TechnologyID) -> bool {
        *other == self.id
            || self
                .allowed_switches
                .as_ref()
                .is_none_or(|allowed| allowed.contains(other))
    }

    /// Iterate over the technologies a plant could switch to (i.e. everything except closure)
    pub fn iter_candidates<'a>(
        technologies: &'a TechnologyMap,
        region_id: &'a RegionID,
    ) -> impl Iterator<Item = &'a Arc<Technology>> + 'a {
        technologies
            .values()
            .filter(move |tech| !tech.closure && tech.operates_in(region_id))
    }
}
