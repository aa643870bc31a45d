//! The investment cycle decides when each plant is allowed to make a technology decision.
//!
//! Each plant alternates between long locked periods and decision points. Main decisions allow a
//! full technology switch; a transitional repair part-way through a cycle is a minor capex event
//! with no switch. Cycle lengths are drawn from a seeded stream keyed by plant and cycle index,
//! so a plant's schedule doesn't depend on which other plants exist or the order they are
//! processed in.
use crate::plant::PlantID;
use crate::scenario::ScenarioConfig;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Where a plant is in its investment cycle in the current year
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    /// Mid-cycle: no decision possible
    Locked,
    /// A full technology decision is due
    MainCycleDue,
    /// A minor capex event is due; the technology can't change
    TransitionalRepairDue,
}

/// Scenario options governing investment cycles
#[derive(Debug, Clone, PartialEq)]
pub struct CycleSettings {
    /// Seed for cycle length draws
    pub random_seed: u64,
    /// Maximum deviation of a drawn cycle length from the typical length
    pub variance: u32,
    /// Minimum years between a main decision and a transitional repair
    pub buffer_top: u32,
    /// Minimum years between a transitional repair and the next main decision
    pub buffer_tail: u32,
    /// Decisions shortly after this year are brought forward to the year before
    pub net_zero_year: Option<u32>,
    /// How many years after `net_zero_year` are brought forward
    pub net_zero_variance: u32,
    /// The first simulated year, in which no decisions are made
    pub start_year: u32,
}

impl CycleSettings {
    /// Cycle settings for a scenario simulated from `start_year`
    pub fn new(scenario: &ScenarioConfig, start_year: u32) -> Self {
        Self {
            random_seed: scenario.random_seed,
            variance: scenario.investment_cycle_variance,
            buffer_top: scenario.offcycle_buffer_top,
            buffer_tail: scenario.offcycle_buffer_tail,
            net_zero_year: scenario.net_zero_year,
            net_zero_variance: scenario.net_zero_variance,
            start_year,
        }
    }

    /// Move a decision year falling just after the net zero year to the year before it.
    ///
    /// The adjusted year must stay strictly after `previous`; otherwise the year is unchanged.
    fn bring_forward(&self, year: u32, previous: u32) -> u32 {
        let Some(net_zero_year) = self.net_zero_year else {
            return year;
        };

        let window = net_zero_year..=net_zero_year + self.net_zero_variance;
        if window.contains(&year) && net_zero_year > 0 && net_zero_year - 1 > previous {
            return net_zero_year - 1;
        }

        year
    }
}

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a hash of a string
fn fnv1a(s: &str) -> u64 {
    s.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// SplitMix64 finaliser, used to decorrelate nearby inputs
fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Seed for the random stream of a given plant and cycle
fn stream_seed(random_seed: u64, plant_id: &PlantID, cycle_index: u32) -> u64 {
    let index_hash = splitmix64(u64::from(cycle_index));
    splitmix64(fnv1a(&plant_id.0) ^ splitmix64(random_seed ^ index_hash))
}

/// Draw a cycle length uniformly from `[typical - variance, typical + variance]`.
///
/// The same `(seed, plant, cycle index)` always gives the same offset from the typical length,
/// whichever technology is being considered.
pub fn draw_cycle_length(
    settings: &CycleSettings,
    plant_id: &PlantID,
    cycle_index: u32,
    typical: u32,
) -> u32 {
    let variance = settings.variance.min(typical.saturating_sub(1));
    let seed = stream_seed(settings.random_seed, plant_id, cycle_index);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let offset = rng.gen_range(0..=2 * variance);

    typical - variance + offset
}

/// The investment cycle state of a single plant
#[derive(Debug, Clone, PartialEq)]
pub struct InvestmentCycle {
    phase: CyclePhase,
    cycle_index: u32,
    cycle_start: u32,
    next_decision_year: u32,
    repair_year: Option<u32>,
    forced: bool,
    closed: bool,
}

impl InvestmentCycle {
    /// Schedule the first main decision for a plant.
    ///
    /// The first decision is the earliest `commissioning_year + k * length` (k >= 1) which is at
    /// or after the start year, and never in the start year itself.
    pub fn new(
        settings: &CycleSettings,
        plant_id: &PlantID,
        commissioning_year: u32,
        typical: u32,
    ) -> Self {
        let cycle_length = draw_cycle_length(settings, plant_id, 0, typical).max(1);
        let start = settings.start_year;

        let mut first_decision = commissioning_year + cycle_length;
        if first_decision < start {
            let cycles_behind = (start - first_decision).div_ceil(cycle_length);
            first_decision += cycles_behind * cycle_length;
        }
        if first_decision == start {
            first_decision += 1;
        }
        let first_decision = settings.bring_forward(first_decision, start);
        let cycle_start = first_decision.saturating_sub(cycle_length);

        let mut cycle = Self {
            phase: CyclePhase::Locked,
            cycle_index: 0,
            cycle_start,
            next_decision_year: first_decision,
            repair_year: None,
            forced: false,
            closed: false,
        };
        cycle.schedule_repair(settings);
        cycle
    }

    /// Pick the repair year for the current cycle, if the cycle is long enough for one
    fn schedule_repair(&mut self, settings: &CycleSettings) {
        let midpoint = self.cycle_start + (self.next_decision_year - self.cycle_start) / 2;
        let valid = midpoint >= self.cycle_start + settings.buffer_top
            && midpoint + settings.buffer_tail <= self.next_decision_year
            && midpoint > settings.start_year;
        self.repair_year = valid.then_some(midpoint);
    }

    /// The current phase
    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    /// Whether the current main decision was forced by a scenario event
    pub fn is_forced(&self) -> bool {
        self.forced
    }

    /// The length the next cycle would have for a technology with the given typical cycle
    pub fn next_cycle_length(
        &self,
        settings: &CycleSettings,
        plant_id: &PlantID,
        typical: u32,
    ) -> u32 {
        draw_cycle_length(settings, plant_id, self.cycle_index + 1, typical)
    }

    /// Update the phase for a new year
    pub fn advance(&mut self, year: u32) -> CyclePhase {
        if self.closed {
            self.phase = CyclePhase::Locked;
        } else if self.forced || year >= self.next_decision_year {
            self.phase = CyclePhase::MainCycleDue;
        } else if self.repair_year == Some(year) {
            self.phase = CyclePhase::TransitionalRepairDue;
        } else {
            self.phase = CyclePhase::Locked;
        }

        self.phase
    }

    /// Force a main decision ahead of schedule
    pub fn force(&mut self) {
        if !self.closed {
            self.forced = true;
            self.phase = CyclePhase::MainCycleDue;
        }
    }

    /// Start a new cycle after a main decision made in `year`
    pub fn commit(&mut self, settings: &CycleSettings, year: u32, new_length: u32) {
        let new_length = new_length.max(1);
        self.cycle_index += 1;
        self.cycle_start = year;
        self.next_decision_year = settings.bring_forward(year + new_length, year);
        self.phase = CyclePhase::Locked;
        self.forced = false;
        self.schedule_repair(settings);
    }

    /// Mark the transitional repair for this cycle as done
    pub fn complete_repair(&mut self) {
        self.repair_year = None;
        self.phase = CyclePhase::Locked;
    }

    /// Retry an unresolved main decision the following year
    pub fn defer(&mut self, year: u32) {
        self.next_decision_year = year + 1;
        self.phase = CyclePhase::Locked;
        self.forced = false;
    }

    /// Close the plant: it will never be due again
    pub fn close(&mut self) {
        self.closed = true;
        self.repair_year = None;
        self.forced = false;
        self.phase = CyclePhase::Locked;
    }
}
