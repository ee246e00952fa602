use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{DomainError, Period, UtilityType};

/// A resident's monthly spending ceiling for one utility.
/// Unique per (resident, utility, period).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetLimit {
    pub id: i64,
    pub resident_id: i64,
    pub utility: UtilityType,
    pub period: Period,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewBudget {
    pub utility: UtilityType,
    #[validate(range(min = 2000, max = 2100))]
    pub year: i32,
    #[validate(range(min = 1, max = 12))]
    pub month: u32,
    #[validate(range(min = 0.0, max = 999.99))]
    pub value: f64,
}

impl NewBudget {
    pub fn period(&self) -> Result<Period, DomainError> {
        if self.value < 0.0 {
            return Err(DomainError::NegativeValue(self.value));
        }
        Period::new(self.year, self.month)
    }
}

/// Only the value of an existing budget can change; its period is its key
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BudgetValue {
    #[validate(range(min = 0.0, max = 999.99))]
    pub value: f64,
}

/// Sum of all limits configured for one period, across utilities
pub fn total_limit<'a>(limits: impl IntoIterator<Item = &'a BudgetLimit>, period: Period) -> f64 {
    limits
        .into_iter()
        .filter(|b| b.period == period)
        .map(|b| b.value)
        .sum()
}

/// The limit set for one (utility, period), if any
pub fn limit_for<'a>(
    limits: impl IntoIterator<Item = &'a BudgetLimit>,
    utility: UtilityType,
    period: Period,
) -> Option<f64> {
    limits
        .into_iter()
        .find(|b| b.utility == utility && b.period == period)
        .map(|b| b.value)
}
