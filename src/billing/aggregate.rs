use serde::Serialize;

use crate::domain::{ConsumptionEntry, DeviceCategory, UtilityType};

/// Sum of recorded values for one utility and device role. No matching
/// records is a valid zero, not an error.
pub fn sum_consumption<'a>(
    entries: impl IntoIterator<Item = &'a ConsumptionEntry>,
    utility: UtilityType,
    category: DeviceCategory,
) -> f64 {
    entries
        .into_iter()
        .filter(|e| e.utility == utility && e.category == category)
        .map(|e| e.value)
        .sum()
}

/// Consumer draw and generator output of one utility over a record set
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct UsageTotals {
    pub consumed: f64,
    pub generated: f64,
}

impl UsageTotals {
    pub fn collect(entries: &[ConsumptionEntry], utility: UtilityType) -> Self {
        Self {
            consumed: sum_consumption(entries, utility, DeviceCategory::Consumer),
            generated: sum_consumption(entries, utility, DeviceCategory::Generator),
        }
    }

    /// Consumption that gets billed. Only electricity is offset by
    /// generation, and never below zero: surplus generation earns no credit.
    /// Water and gas generators are not billed at all.
    pub fn billable(&self, utility: UtilityType) -> f64 {
        match utility {
            UtilityType::Electricity => (self.consumed - self.generated).max(0.0),
            UtilityType::Water | UtilityType::Gas => self.consumed,
        }
    }
}
