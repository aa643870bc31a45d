//! A per-year ledger of constrained resource use.
//!
//! The ledger is created afresh for each simulated year and only mutated through
//! [`ResourceLedger::reserve`], which the solver calls in ascending plant ID order: first for
//! plants carrying on with their technology, then for plants making a decision. Allocations can
//! never exceed a cap.
use crate::region::RegionID;
use crate::scenario::ResourceCap;
use crate::technology::{ResourceID, ResourceUsageMap};
use crate::units::{Production, ResourceQuantity};

/// Usage of a single resource cap
#[derive(Debug, Clone, PartialEq)]
struct CapUsage {
    /// The cap
    cap: ResourceCap,
    /// Quantity of the resource allocated so far this year
    used: ResourceQuantity,
}

impl CapUsage {
    /// Quantity still available under the cap
    fn remaining(&self) -> ResourceQuantity {
        self.cap.limit - self.used
    }
}

/// Allocation of capped resources to plants in a single year
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceLedger {
    caps: Vec<CapUsage>,
}

/// The amount of each resource a plant in `region_id` would draw against each cap
fn demands<'a>(
    caps: &'a [CapUsage],
    region_id: &'a RegionID,
    usage: &'a ResourceUsageMap,
    production: Production,
) -> impl Iterator<Item = (usize, ResourceQuantity)> + 'a {
    caps.iter().enumerate().filter_map(move |(idx, cap_usage)| {
        let cap = &cap_usage.cap;
        let per_tonne = usage.get(&cap.resource)?;
        cap.covers_region(region_id)
            .then_some((idx, *per_tonne * production))
    })
}

impl ResourceLedger {
    /// Create an empty ledger with the caps which apply in `year`
    pub fn new(caps: &[ResourceCap], year: u32) -> Self {
        let caps = caps
            .iter()
            .filter(|cap| cap.applies_in(year))
            .map(|cap| CapUsage {
                cap: cap.clone(),
                used: ResourceQuantity(0.0),
            })
            .collect();

        Self { caps }
    }

    /// Check whether a reservation would fit under every applicable cap.
    ///
    /// # Returns
    ///
    /// `None` if the reservation fits, otherwise the first resource whose cap would be exceeded.
    fn check(
        &self,
        region_id: &RegionID,
        usage: &ResourceUsageMap,
        production: Production,
    ) -> Option<ResourceID> {
        demands(&self.caps, region_id, usage, production)
            .find(|&(idx, amount)| amount > self.caps[idx].remaining())
            .map(|(idx, _)| self.caps[idx].cap.resource.clone())
    }

    /// Reserve resources for a plant's production, either for every applicable cap or not at all.
    ///
    /// # Returns
    ///
    /// `Ok(())` if successful, otherwise the first resource whose cap would be exceeded.
    pub fn reserve(
        &mut self,
        region_id: &RegionID,
        usage: &ResourceUsageMap,
        production: Production,
    ) -> Result<(), ResourceID> {
        if let Some(resource) = self.check(region_id, usage, production) {
            return Err(resource);
        }

        let allocations: Vec<_> = demands(&self.caps, region_id, usage, production).collect();
        for (idx, amount) in allocations {
            self.caps[idx].used += amount;
        }

        Ok(())
    }
}
