//! Policy predicates deciding whether a technology may be adopted in a given year.
//!
//! Each predicate either passes a technology or gives a reason for excluding it. Candidates and
//! incumbents are evaluated against the same list, in order, and the first exclusion wins. The
//! plant's incumbent technology is passed alongside so that predicates can restrict switches.
use crate::scenario::{MoratoriumRule, ScenarioConfig, TrlThreshold};
use crate::simulation::decision::ExclusionReason;
use crate::technology::Technology;

/// A rule which can exclude a technology from being chosen
pub trait ConstraintPredicate: Send + Sync {
    /// Returns the reason `technology` is excluded in `year` for a plant currently operating
    /// `incumbent`, or `None` if it passes
    fn evaluate(
        &self,
        technology: &Technology,
        incumbent: &Technology,
        year: u32,
    ) -> Option<ExclusionReason>;
}

/// Technologies can't be adopted before their `available_from` year
pub struct Availability;

impl ConstraintPredicate for Availability {
    fn evaluate(
        &self,
        technology: &Technology,
        _: &Technology,
        year: u32,
    ) -> Option<ExclusionReason> {
        if technology.is_available_in(year) {
            return None;
        }

        technology
            .available_from
            .map(ExclusionReason::NotYetAvailable)
    }
}

/// Bans on technologies or phases from a given year
pub struct Moratorium {
    rules: Vec<MoratoriumRule>,
}

impl ConstraintPredicate for Moratorium {
    fn evaluate(
        &self,
        technology: &Technology,
        _: &Technology,
        year: u32,
    ) -> Option<ExclusionReason> {
        self.rules
            .iter()
            .any(|rule| rule.bans(technology, year))
            .then_some(ExclusionReason::Moratorium)
    }
}

/// Switches must be allowed from the plant's incumbent technology
pub struct AllowedSwitch;

impl ConstraintPredicate for AllowedSwitch {
    fn evaluate(
        &self,
        technology: &Technology,
        incumbent: &Technology,
        _: u32,
    ) -> Option<ExclusionReason> {
        (!incumbent.can_switch_to(&technology.id))
            .then(|| ExclusionReason::SwitchNotAllowed(incumbent.id.clone()))
    }
}

/// A minimum technology readiness level, stepping up over time
pub struct Maturity {
    thresholds: Vec<TrlThreshold>,
}

impl ConstraintPredicate for Maturity {
    fn evaluate(
        &self,
        technology: &Technology,
        _: &Technology,
        year: u32,
    ) -> Option<ExclusionReason> {
        let min_trl = self
            .thresholds
            .iter()
            .take_while(|threshold| threshold.year <= year)
            .last()?
            .min_trl;

        (technology.trl < min_trl).then_some(ExclusionReason::BelowMinimumTrl {
            trl: technology.trl,
            min_trl,
        })
    }
}

/// The list of predicates for a scenario
pub type Constraints = Vec<Box<dyn ConstraintPredicate>>;

/// Build the predicates for a scenario
pub fn build_constraints(scenario: &ScenarioConfig) -> Constraints {
    let mut constraints: Constraints = vec![Box::new(Availability), Box::new(AllowedSwitch)];
    if !scenario.moratorium_rules.is_empty() {
        constraints.push(Box::new(Moratorium {
            rules: scenario.moratorium_rules.clone(),
        }));
    }
    if !scenario.min_trl.is_empty() {
        constraints.push(Box::new(Maturity {
            thresholds: scenario.min_trl.clone(),
        }));
    }

    constraints
}

/// Evaluate every predicate, returning the first exclusion reason if any
pub fn evaluate_constraints(
    constraints: &[Box<dyn ConstraintPredicate>],
    technology: &Technology,
    incumbent: &Technology,
    year: u32,
) -> Option<ExclusionReason> {
    constraints
        .iter()
        .find_map(|constraint| constraint.evaluate(technology, incumbent, year))
}
