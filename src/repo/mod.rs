//! Storage for residents, devices, consumption, suppliers, contracts and
//! budgets.
//!
//! [`Store`] is the seam between the service layer and persistence. The
//! in-memory backend is always available; PostgreSQL needs the `db` feature.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use std::sync::Arc;
use thiserror::Error;

use crate::config::{DbBackend, DbConfig};
use crate::domain::{
    BudgetLimit, ConsumptionEntry, ConsumptionRecord, Device, DeviceSpec, NewResident,
    NewSupplier, NewSupplierService, Period, ProfileUpdate, Resident, ResidentContract, Supplier,
    SupplierService, TariffRecord, UtilityType,
};

pub mod memory;
#[cfg(feature = "db")]
pub mod pg;

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// A uniqueness rule would be broken (period already used, email taken)
    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }
}

#[cfg(feature = "db")]
impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::Duplicate(db_err.message().to_string())
            }
            _ => StoreError::Backend(error.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Year and optional month restriction on timestamped rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeriodFilter {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl PeriodFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn year(year: i32) -> Self {
        Self {
            year: Some(year),
            month: None,
        }
    }

    pub fn period(period: Period) -> Self {
        Self {
            year: Some(period.year()),
            month: Some(period.month()),
        }
    }

    pub fn matches(&self, ts: DateTime<Utc>) -> bool {
        self.year.map_or(true, |y| ts.year() == y) && self.month.map_or(true, |m| ts.month() == m)
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    // residents
    async fn create_resident(&self, new: NewResident) -> StoreResult<Resident>;
    async fn resident(&self, id: i64) -> StoreResult<Option<Resident>>;
    async fn update_resident(&self, id: i64, update: ProfileUpdate) -> StoreResult<Resident>;
    async fn list_residents(&self) -> StoreResult<Vec<Resident>>;
    async fn set_resident_active(&self, id: i64, active: bool) -> StoreResult<Resident>;

    // devices
    async fn add_device(&self, resident_id: i64, spec: DeviceSpec) -> StoreResult<Device>;
    async fn device(&self, id: i64) -> StoreResult<Option<Device>>;
    async fn update_device(&self, id: i64, spec: DeviceSpec) -> StoreResult<Device>;
    async fn set_device_active(&self, id: i64, active: bool) -> StoreResult<Device>;
    async fn devices_for(&self, resident_id: i64) -> StoreResult<Vec<Device>>;
    /// Removes the device and all of its consumption records atomically.
    /// Returns the number of records removed.
    async fn delete_device(&self, id: i64) -> StoreResult<u64>;

    // consumption
    /// Fails with `Duplicate` when the device already has a record for `period`
    async fn add_consumption(
        &self,
        device_id: i64,
        period: Period,
        value: f64,
    ) -> StoreResult<ConsumptionRecord>;
    async fn update_consumption(
        &self,
        id: i64,
        device_id: i64,
        period: Period,
        value: f64,
    ) -> StoreResult<ConsumptionRecord>;
    async fn consumption_record(&self, id: i64) -> StoreResult<Option<ConsumptionRecord>>;
    async fn delete_consumption(&self, id: i64) -> StoreResult<()>;
    /// Records of the resident's devices, newest first
    async fn consumption_for(
        &self,
        resident_id: i64,
        filter: PeriodFilter,
    ) -> StoreResult<Vec<ConsumptionEntry>>;

    // suppliers, services, tariffs
    async fn add_supplier(&self, new: NewSupplier) -> StoreResult<Supplier>;
    async fn suppliers(&self, active_only: bool) -> StoreResult<Vec<Supplier>>;
    async fn add_service(&self, new: NewSupplierService) -> StoreResult<SupplierService>;
    async fn service(&self, id: i64) -> StoreResult<Option<SupplierService>>;
    async fn services_for(&self, supplier_id: i64) -> StoreResult<Vec<SupplierService>>;
    async fn add_tariff(
        &self,
        service_id: i64,
        price: f64,
        recorded_at: DateTime<Utc>,
    ) -> StoreResult<TariffRecord>;
    async fn latest_tariff(&self, service_id: i64) -> StoreResult<Option<TariffRecord>>;
    async fn tariff_history(&self, service_id: i64) -> StoreResult<Vec<TariffRecord>>;

    // contracts
    async fn active_contract(
        &self,
        resident_id: i64,
        utility: UtilityType,
    ) -> StoreResult<Option<ResidentContract>>;
    async fn active_contracts(&self, resident_id: i64) -> StoreResult<Vec<ResidentContract>>;
    /// Deactivate the resident's active contracts for the service's utility
    /// and activate a new one, as one unit. Readers see either the old or
    /// the new active contract, never both and never none.
    async fn switch_contract(
        &self,
        resident_id: i64,
        service: &SupplierService,
    ) -> StoreResult<ResidentContract>;

    // budgets
    /// Fails with `Duplicate` when (resident, utility, period) already has one
    async fn add_budget(
        &self,
        resident_id: i64,
        utility: UtilityType,
        period: Period,
        value: f64,
    ) -> StoreResult<BudgetLimit>;
    async fn budget(&self, id: i64) -> StoreResult<Option<BudgetLimit>>;
    async fn update_budget_value(&self, id: i64, value: f64) -> StoreResult<BudgetLimit>;
    async fn delete_budget(&self, id: i64) -> StoreResult<()>;
    /// Newest period first
    async fn budgets_for(
        &self,
        resident_id: i64,
        filter: PeriodFilter,
    ) -> StoreResult<Vec<BudgetLimit>>;

    async fn ping(&self) -> StoreResult<()>;
}

/// Open the configured backend
pub async fn connect(cfg: &DbConfig) -> anyhow::Result<Arc<dyn Store>> {
    match cfg.backend {
        DbBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        #[cfg(feature = "db")]
        DbBackend::Postgres => Ok(Arc::new(pg::PgRepo::connect(cfg).await?)),
        #[cfg(not(feature = "db"))]
        DbBackend::Postgres => {
            anyhow::bail!("db.backend = \"postgres\" requires building with the `db` feature")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_filter_matches() {
        let ts = Period::new(2025, 4).unwrap().anchor();
        assert!(PeriodFilter::all().matches(ts));
        assert!(PeriodFilter::year(2025).matches(ts));
        assert!(!PeriodFilter::year(2024).matches(ts));
        assert!(PeriodFilter::period(Period::new(2025, 4).unwrap()).matches(ts));
        assert!(!PeriodFilter::period(Period::new(2025, 5).unwrap()).matches(ts));
    }

    #[tokio::test]
    async fn test_connect_memory_backend() {
        let cfg = DbConfig {
            backend: DbBackend::Memory,
            url: String::new(),
            max_connections: 1,
        };
        let store = connect(&cfg).await.unwrap();
        assert!(store.ping().await.is_ok());
    }
}
