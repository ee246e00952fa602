use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{DeviceCategory, DomainError, Period, UtilityType};

/// One month of metered value for one device
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsumptionRecord {
    pub id: i64,
    pub device_id: i64,
    pub value: f64,
    /// Always the anchor of the record's period
    pub recorded_at: DateTime<Utc>,
}

/// A consumption record joined with the device attributes the billing core
/// filters on
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsumptionEntry {
    pub record_id: i64,
    pub device_id: i64,
    pub device_name: String,
    pub utility: UtilityType,
    pub category: DeviceCategory,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}

impl ConsumptionEntry {
    pub fn period(&self) -> Period {
        Period::containing(self.recorded_at)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewConsumption {
    pub device_id: i64,
    #[validate(range(min = 2000, max = 2100))]
    pub year: i32,
    #[validate(range(min = 1, max = 12))]
    pub month: u32,
    #[validate(range(min = 0.0))]
    pub value: f64,
}

impl NewConsumption {
    pub fn period(&self) -> Result<Period, DomainError> {
        if self.value < 0.0 {
            return Err(DomainError::NegativeValue(self.value));
        }
        Period::new(self.year, self.month)
    }
}
