//! PostgreSQL backend. Queries are checked at runtime (`query_as::<_, Row>`)
//! so the crate builds without a live database.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::str::FromStr;
use tracing::info;

use super::{PeriodFilter, Store, StoreError, StoreResult};
use crate::config::DbConfig;
use crate::domain::{
    BudgetLimit, ConsumptionEntry, ConsumptionRecord, Device, DeviceSpec, DomainError,
    NewResident, NewSupplier, NewSupplierService, Period, ProfileUpdate, Resident,
    ResidentContract, Supplier, SupplierService, TariffRecord, UtilityType,
};

pub mod budgets;
pub mod devices;
pub mod residents;
pub mod suppliers;

pub use budgets::BudgetRepository;
pub use devices::DeviceRepository;
pub use residents::ResidentRepository;
pub use suppliers::SupplierRepository;

const SCHEMA: &str = include_str!("../../../migrations/0001_init.sql");

pub struct PgRepo {
    pub pool: PgPool,
}

impl PgRepo {
    pub async fn connect(cfg: &DbConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(cfg.max_connections)
            .connect(&cfg.url)
            .await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        info!(max_connections = cfg.max_connections, "postgres schema ready");
        Ok(Self { pool })
    }

    pub fn residents(&self) -> ResidentRepository {
        ResidentRepository::new(&self.pool)
    }

    pub fn devices(&self) -> DeviceRepository {
        DeviceRepository::new(&self.pool)
    }

    pub fn suppliers(&self) -> SupplierRepository {
        SupplierRepository::new(&self.pool)
    }

    pub fn budgets(&self) -> BudgetRepository {
        BudgetRepository::new(&self.pool)
    }
}

/// Enum columns are stored as their `Display` text
pub(crate) fn parse_column<T>(value: &str) -> StoreResult<T>
where
    T: FromStr<Err = DomainError>,
{
    value
        .parse()
        .map_err(|e: DomainError| StoreError::Backend(e.to_string()))
}

/// `(year, month)` bind values for the `period` column filters
pub(crate) fn filter_binds(filter: PeriodFilter) -> (Option<i32>, Option<i32>) {
    (filter.year, filter.month.map(|m| m as i32))
}

#[async_trait]
impl Store for PgRepo {
    async fn create_resident(&self, new: NewResident) -> StoreResult<Resident> {
        self.residents().insert(&new).await
    }

    async fn resident(&self, id: i64) -> StoreResult<Option<Resident>> {
        self.residents().find_by_id(id).await
    }

    async fn update_resident(&self, id: i64, update: ProfileUpdate) -> StoreResult<Resident> {
        self.residents().update_profile(id, &update).await
    }

    async fn list_residents(&self) -> StoreResult<Vec<Resident>> {
        self.residents().list_all().await
    }

    async fn set_resident_active(&self, id: i64, active: bool) -> StoreResult<Resident> {
        self.residents().set_active(id, active).await
    }

    async fn add_device(&self, resident_id: i64, spec: DeviceSpec) -> StoreResult<Device> {
        self.devices().insert(resident_id, &spec).await
    }

    async fn device(&self, id: i64) -> StoreResult<Option<Device>> {
        self.devices().find_by_id(id).await
    }

    async fn update_device(&self, id: i64, spec: DeviceSpec) -> StoreResult<Device> {
        self.devices().update(id, &spec).await
    }

    async fn set_device_active(&self, id: i64, active: bool) -> StoreResult<Device> {
        self.devices().set_active(id, active).await
    }

    async fn devices_for(&self, resident_id: i64) -> StoreResult<Vec<Device>> {
        self.devices().find_by_resident(resident_id).await
    }

    async fn delete_device(&self, id: i64) -> StoreResult<u64> {
        self.devices().delete_with_records(id).await
    }

    async fn add_consumption(
        &self,
        device_id: i64,
        period: Period,
        value: f64,
    ) -> StoreResult<ConsumptionRecord> {
        self.devices().insert_record(device_id, period, value).await
    }

    async fn update_consumption(
        &self,
        id: i64,
        device_id: i64,
        period: Period,
        value: f64,
    ) -> StoreResult<ConsumptionRecord> {
        self.devices().update_record(id, device_id, period, value).await
    }

    async fn consumption_record(&self, id: i64) -> StoreResult<Option<ConsumptionRecord>> {
        self.devices().find_record(id).await
    }

    async fn delete_consumption(&self, id: i64) -> StoreResult<()> {
        self.devices().delete_record(id).await
    }

    async fn consumption_for(
        &self,
        resident_id: i64,
        filter: PeriodFilter,
    ) -> StoreResult<Vec<ConsumptionEntry>> {
        self.devices().entries_for(resident_id, filter).await
    }

    async fn add_supplier(&self, new: NewSupplier) -> StoreResult<Supplier> {
        self.suppliers().insert(&new).await
    }

    async fn suppliers(&self, active_only: bool) -> StoreResult<Vec<Supplier>> {
        self.suppliers().list(active_only).await
    }

    async fn add_service(&self, new: NewSupplierService) -> StoreResult<SupplierService> {
        self.suppliers().insert_service(&new).await
    }

    async fn service(&self, id: i64) -> StoreResult<Option<SupplierService>> {
        self.suppliers().find_service(id).await
    }

    async fn services_for(&self, supplier_id: i64) -> StoreResult<Vec<SupplierService>> {
        self.suppliers().services_of(supplier_id).await
    }

    async fn add_tariff(
        &self,
        service_id: i64,
        price: f64,
        recorded_at: DateTime<Utc>,
    ) -> StoreResult<TariffRecord> {
        self.suppliers().insert_tariff(service_id, price, recorded_at).await
    }

    async fn latest_tariff(&self, service_id: i64) -> StoreResult<Option<TariffRecord>> {
        self.suppliers().latest_tariff(service_id).await
    }

    async fn tariff_history(&self, service_id: i64) -> StoreResult<Vec<TariffRecord>> {
        self.suppliers().tariff_history(service_id).await
    }

    async fn active_contract(
        &self,
        resident_id: i64,
        utility: UtilityType,
    ) -> StoreResult<Option<ResidentContract>> {
        self.suppliers().active_contract(resident_id, utility).await
    }

    async fn active_contracts(&self, resident_id: i64) -> StoreResult<Vec<ResidentContract>> {
        self.suppliers().active_contracts(resident_id).await
    }

    async fn switch_contract(
        &self,
        resident_id: i64,
        service: &SupplierService,
    ) -> StoreResult<ResidentContract> {
        self.suppliers().switch_contract(resident_id, service).await
    }

    async fn add_budget(
        &self,
        resident_id: i64,
        utility: UtilityType,
        period: Period,
        value: f64,
    ) -> StoreResult<BudgetLimit> {
        self.budgets().insert(resident_id, utility, period, value).await
    }

    async fn budget(&self, id: i64) -> StoreResult<Option<BudgetLimit>> {
        self.budgets().find_by_id(id).await
    }

    async fn update_budget_value(&self, id: i64, value: f64) -> StoreResult<BudgetLimit> {
        self.budgets().update_value(id, value).await
    }

    async fn delete_budget(&self, id: i64) -> StoreResult<()> {
        self.budgets().delete(id).await
    }

    async fn budgets_for(
        &self,
        resident_id: i64,
        filter: PeriodFilter,
    ) -> StoreResult<Vec<BudgetLimit>> {
        self.budgets().find_by_resident(resident_id, filter).await
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
