//! Regions group plants that share cost and emissions reference data.
use crate::id::{IDCollection, define_id_getter, define_id_type};
use anyhow::{Result, ensure};
use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;

define_id_type! {RegionID}

/// A map of [`Region`]s, keyed by region ID
pub type RegionMap = IndexMap<RegionID, Region>;

/// Represents a region with an ID and a longer description.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct Region {
    /// A unique identifier for a region (e.g. "EUR").
    pub id: RegionID,
    /// A text description of the region (e.g. "Europe").
    pub description: String,
}
define_id_getter! {Region, RegionID}

/// Parse a string of regions separated by semicolons into a set of [`RegionID`]s.
///
/// The string can be either "all" (case-insensitive), a single region, or a semicolon-separated
/// list of regions (e.g. "EUR;CHN;USA" or "EUR; CHN; USA"). The returned set preserves the order
/// of `region_ids` for "all" and the order given otherwise.
pub fn parse_region_str(s: &str, region_ids: &IndexSet<RegionID>) -> Result<IndexSet<RegionID>> {
    let s = s.trim();
    ensure!(!s.is_empty(), "No regions provided");

    if s.eq_ignore_ascii_case("all") {
        return Ok(region_ids.clone());
    }

    let mut regions = IndexSet::new();
    for region in s.split(';') {
        let id = region_ids.get_id_by_str(region.trim())?;
        ensure!(regions.insert(id), "Region {} specified more than once", region.trim());
    }

    Ok(regions)
}
