//! General functions related to finance.
//!
//! All present values use a year-end convention: a cash flow occurring in the `t`-th operating
//! year after a decision (counting from zero) is discounted by `(1 + r)^-(t + 1)`.
use crate::units::{Dimensionless, MoneyPerCapacity, MoneyPerProduction};

/// Calculates the capital recovery factor (CRF) for a given lifetime and discount rate.
///
/// The CRF is used to annualise capital costs over the investment cycle of a plant.
pub fn capital_recovery_factor(lifetime: u32, discount_rate: Dimensionless) -> Dimensionless {
    if lifetime == 0 {
        return Dimensionless(0.0);
    }
    if discount_rate == Dimensionless(0.0) {
        return Dimensionless(1.0) / Dimensionless(f64::from(lifetime));
    }
    let factor = (Dimensionless(1.0) + discount_rate).powf(f64::from(lifetime));
    (discount_rate * factor) / (factor - Dimensionless(1.0))
}

/// The discount factor applied to a cash flow occurring `years_after_decision` years after the
/// decision year, using the year-end convention.
pub fn discount_factor(years_after_decision: u32, discount_rate: Dimensionless) -> Dimensionless {
    (Dimensionless(1.0) + discount_rate).powf(-f64::from(years_after_decision + 1))
}

/// Capital cost annualised over the investment cycle and spread over a year's production.
///
/// # Arguments
///
/// * `capital_cost` - Capital cost per unit of capacity
/// * `lifetime` - The length of the investment cycle in years
/// * `discount_rate` - The scenario discount rate
/// * `utilisation` - The proportion of capacity which is used for production
pub fn annual_capital_cost_per_production(
    capital_cost: MoneyPerCapacity,
    lifetime: u32,
    discount_rate: Dimensionless,
    utilisation: Dimensionless,
) -> MoneyPerProduction {
    let crf = capital_recovery_factor(lifetime, discount_rate);
    MoneyPerProduction::new((capital_cost * crf).value() / utilisation.value())
}

/// Levelise a series of yearly costs per unit of production.
///
/// The first element of `yearly_costs` corresponds to the decision year. The result is the
/// discount-weighted mean, so a constant series levelises to itself regardless of discount rate.
pub fn levelised_cost<I>(yearly_costs: I, discount_rate: Dimensionless) -> MoneyPerProduction
where
    I: IntoIterator<Item = MoneyPerProduction>,
{
    let mut discounted_cost = 0.0;
    let mut total_weight = 0.0;
    for (years_after_decision, cost) in (0u32..).zip(yearly_costs) {
        let weight = discount_factor(years_after_decision, discount_rate).value();
        discounted_cost += weight * cost.value();
        total_weight += weight;
    }

    if total_weight == 0.0 {
        return MoneyPerProduction(0.0);
    }

    MoneyPerProduction(discounted_cost / total_weight)
}
