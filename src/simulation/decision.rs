//! Records of the technology decisions made by plants.
use crate::plant::PlantID;
use crate::technology::{ResourceID, TechnologyID};
use crate::units::{EmissionsPerProduction, Money, MoneyPerProduction};
use serde_string_enum::SerializeLabeledStringEnum;
use std::fmt;

/// What caused a plant to make a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, SerializeLabeledStringEnum)]
pub enum DecisionTrigger {
    /// The end of an investment cycle
    #[string = "main_cycle"]
    MainCycle,
    /// A scenario event
    #[string = "forced"]
    Forced,
    /// A minor capex event part-way through a cycle
    #[string = "transitional_repair"]
    TransitionalRepair,
}

/// Why a plant ended up with the technology it chose
#[derive(Debug, Clone, Copy, PartialEq, Eq, SerializeLabeledStringEnum)]
pub enum Rationale {
    /// The plant switched to the technology it preferred on cost
    #[string = "cost-driven"]
    CostDriven,
    /// Policy or resource limits prevented the plant's preferred choice
    #[string = "constraint-forced"]
    ConstraintForced,
    /// The plant kept its incumbent technology
    #[string = "no-change"]
    NoChange,
    /// No technology was feasible
    #[string = "unresolved"]
    Unresolved,
}

/// Why a candidate technology was not eligible
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionReason {
    /// The technology can't be adopted until a later year
    NotYetAvailable(u32),
    /// The technology is banned by a moratorium
    Moratorium,
    /// Plants operating the given technology can't switch to this one
    SwitchNotAllowed(TechnologyID),
    /// The technology's readiness level is below the scenario minimum
    BelowMinimumTrl {
        /// The technology's TRL
        trl: u32,
        /// The minimum TRL in force
        min_trl: u32,
    },
    /// Not enough of a capped resource was left
    ResourceCap(ResourceID),
}

impl ExclusionReason {
    /// Whether the exclusion comes from a policy rule rather than resource contention
    pub fn is_policy(&self) -> bool {
        !matches!(self, ExclusionReason::ResourceCap(_))
    }
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::NotYetAvailable(year) => write!(f, "not available until {year}"),
            ExclusionReason::Moratorium => write!(f, "moratorium"),
            ExclusionReason::SwitchNotAllowed(from) => write!(f, "switch from {from} not allowed"),
            ExclusionReason::BelowMinimumTrl { trl, min_trl } => {
                write!(f, "TRL {trl} below minimum {min_trl}")
            }
            ExclusionReason::ResourceCap(resource) => write!(f, "resource cap on {resource}"),
        }
    }
}

/// A candidate technology considered in a decision
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateAppraisal {
    /// The candidate technology
    pub technology_id: TechnologyID,
    /// Levelised total cost of ownership per tonne of steel
    pub tco: MoneyPerProduction,
    /// Taxable emissions intensity in the decision year
    pub emissions: EmissionsPerProduction,
    /// The cycle length the plant would have with this technology
    pub cycle_length: u32,
    /// Why the candidate was excluded, if it was
    pub exclusion: Option<ExclusionReason>,
}

impl CandidateAppraisal {
    /// Whether the candidate passed every policy predicate
    pub fn is_policy_feasible(&self) -> bool {
        self.exclusion.as_ref().is_none_or(|reason| !reason.is_policy())
    }
}

/// An immutable record of a single plant decision
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionRecord {
    /// The plant making the decision
    pub plant_id: PlantID,
    /// The year of the decision
    pub year: u32,
    /// What caused the decision
    pub trigger: DecisionTrigger,
    /// The technology operated before the decision
    pub prior_technology: TechnologyID,
    /// The technology chosen, or `None` if no technology was feasible
    pub chosen_technology: Option<TechnologyID>,
    /// Every candidate considered, in rank order
    pub candidates: Vec<CandidateAppraisal>,
    /// Why this outcome was reached
    pub rationale: Rationale,
    /// Capital spent as a result of the decision
    pub capex_spent: Money,
}

/// A plant for which no feasible technology was found
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedPlant {
    /// The plant
    pub plant_id: PlantID,
    /// The year of the failed decision
    pub year: u32,
    /// The technology the plant continues to operate
    pub technology_id: TechnologyID,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ExclusionReason::NotYetAvailable(2030), "not available until 2030")]
    #[case(ExclusionReason::Moratorium, "moratorium")]
    #[case(
        ExclusionReason::SwitchNotAllowed("Scrap-EAF".into()),
        "switch from Scrap-EAF not allowed"
    )]
    #[case(ExclusionReason::BelowMinimumTrl { trl: 5, min_trl: 7 }, "TRL 5 below minimum 7")]
    #[case(ExclusionReason::ResourceCap("scrap".into()), "resource cap on scrap")]
    fn test_exclusion_display(#[case] reason: ExclusionReason, #[case] expected: &str) {
        assert_eq!(reason.to_string(), expected);
    }

    #[test]
    fn test_policy_feasible() {
        let mut candidate = CandidateAppraisal {
            technology_id: "H2-DRI".into(),
            tco: MoneyPerProduction(400.0),
            emissions: EmissionsPerProduction(0.2),
            cycle_length: 20,
            exclusion: None,
        };
        assert!(candidate.is_policy_feasible());

        candidate.exclusion = Some(ExclusionReason::ResourceCap("hydrogen".into()));
        assert!(candidate.is_policy_feasible());

        candidate.exclusion = Some(ExclusionReason::Moratorium);
        assert!(!candidate.is_policy_feasible());

        candidate.exclusion = Some(ExclusionReason::SwitchNotAllowed("Scrap-EAF".into()));
        assert!(!candidate.is_policy_feasible());
    }

    #[test]
    fn test_rationale_display() {
        assert_eq!(Rationale::ConstraintForced.to_string(), "constraint-forced");
    }
}
