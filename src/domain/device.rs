use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{DeviceCategory, DomainError, MeasurementUnit, UtilityType};

/// A metered point of consumption or generation owned by one resident
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Device {
    pub id: i64,
    pub resident_id: i64,
    pub name: String,
    pub utility: UtilityType,
    pub category: DeviceCategory,
    pub unit: MeasurementUnit,
    pub created_at: DateTime<Utc>,
    /// Only active devices accept new consumption records
    pub active: bool,
}

/// Fields a resident sets when adding or editing a device
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DeviceSpec {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub utility: UtilityType,
    pub category: DeviceCategory,
    pub unit: MeasurementUnit,
}

impl DeviceSpec {
    /// Check the unit/type rule and that the category is still offered
    pub fn check(&self, enabled_categories: &[DeviceCategory]) -> Result<(), DomainError> {
        if !enabled_categories.contains(&self.category) {
            return Err(DomainError::CategoryDisabled(self.category));
        }
        self.utility.check_unit(self.unit)
    }
}

impl Device {
    pub fn apply(&mut self, spec: DeviceSpec) {
        self.name = spec.name;
        self.utility = spec.utility;
        self.category = spec.category;
        self.unit = spec.unit;
    }
}
