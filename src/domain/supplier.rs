use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{MeasurementUnit, UtilityType};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Supplier {
    pub id: i64,
    pub name: String,
    pub tax_number: String,
    pub address: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewSupplier {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 20))]
    pub tax_number: String,
    #[validate(length(max = 255))]
    pub address: Option<String>,
}

/// A supplier's offering for one utility. Carries the tariff history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SupplierService {
    pub id: i64,
    pub supplier_id: i64,
    pub utility: UtilityType,
    pub unit: MeasurementUnit,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSupplierService {
    pub supplier_id: i64,
    pub utility: UtilityType,
    pub unit: MeasurementUnit,
}

/// Price per unit from a given moment on. History is append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TariffRecord {
    pub id: i64,
    pub service_id: i64,
    pub price: f64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewTariff {
    pub service_id: i64,
    #[validate(range(min = 0.0))]
    pub price: f64,
    /// Defaults to now
    pub recorded_at: Option<DateTime<Utc>>,
}

/// Binding of a resident to a supplier service. At most one active
/// contract exists per (resident, utility).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResidentContract {
    pub id: i64,
    pub resident_id: i64,
    pub service_id: i64,
    pub utility: UtilityType,
    pub active: bool,
    pub signed_at: DateTime<Utc>,
}
