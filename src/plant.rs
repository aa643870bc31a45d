//! Plants are the individual steelworks making up the fleet.
use crate::id::{define_id_getter, define_id_type};
use crate::region::RegionID;
use crate::technology::Technology;
use crate::units::{Capacity, Dimensionless, Production};
use indexmap::IndexMap;
use std::sync::Arc;

define_id_type! {PlantID}

/// A map of [`Plant`]s, keyed by plant ID and sorted in ascending ID order
pub type PlantMap = IndexMap<PlantID, Plant>;

/// A steel plant operating exactly one technology at a time
#[derive(Debug, Clone, PartialEq)]
pub struct Plant {
    /// A unique identifier for the plant
    pub id: PlantID,
    /// The region in which the plant is located
    pub region_id: RegionID,
    /// The technology currently operated by the plant
    pub technology: Arc<Technology>,
    /// Production capacity (tonnes of steel per year)
    pub capacity: Capacity,
    /// The year the plant was first commissioned
    pub commissioning_year: u32,
}
define_id_getter! {Plant, PlantID}

impl Plant {
    /// Whether the plant has been closed
    pub fn is_closed(&self) -> bool {
        self.technology.closure
    }

    /// Steel produced in a year for the given load factor (zero for closed plants)
    pub fn production(&self, load_factor: Dimensionless) -> Production {
        if self.is_closed() {
            return Production(0.0);
        }

        self.capacity.production(load_factor)
    }
}
