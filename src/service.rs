//! Orchestration between the store and the billing core.
//!
//! Every resident-facing operation checks that the caller exists and is
//! active, and that the rows it touches belong to them. Rows owned by
//! someone else are reported as missing.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use strum::IntoEnumIterator;
use thiserror::Error;
use tracing::{debug, info, instrument};
use validator::{Validate, ValidationErrors};

use crate::billing::{
    self, build_report, dashboard, trend, CostCalculator, Dashboard, PriceSheet, Report,
    ReportContext, ReportKind, Trend,
};
use crate::config::Config;
use crate::domain::{
    BudgetLimit, BudgetValue, ConsumptionEntry, ConsumptionRecord, Device, DeviceCategory,
    DeviceSpec, DomainError, NewBudget, NewConsumption, NewResident, NewSupplier,
    NewSupplierService, NewTariff, Period, ProfileUpdate, Resident, ResidentContract, Supplier,
    SupplierService, TariffRecord, UtilityType,
};
use crate::repo::{PeriodFilter, Store, StoreError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("unknown resident {0}")]
    UnknownResident(i64),

    #[error("resident {0} is inactive")]
    Inactive(i64),

    #[error("supplier service {0} is not available")]
    ServiceUnavailable(i64),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// A supplier service with its current price and whether the caller is
/// contracted to it
#[derive(Debug, Clone, Serialize)]
pub struct ServiceOffer {
    #[serde(flatten)]
    pub service: SupplierService,
    pub current_price: Option<f64>,
    pub contracted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SupplierListing {
    #[serde(flatten)]
    pub supplier: Supplier,
    pub services: Vec<ServiceOffer>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResidentOverview {
    #[serde(flatten)]
    pub resident: Resident,
    pub contracts: Vec<ResidentContract>,
}

pub struct UtilityService {
    store: Arc<dyn Store>,
    calculator: CostCalculator,
    enabled_categories: Vec<DeviceCategory>,
}

impl UtilityService {
    pub fn new(store: Arc<dyn Store>, cfg: &Config) -> Self {
        Self {
            store,
            calculator: CostCalculator::new(cfg.billing.fallback_unit_price),
            enabled_categories: cfg.devices.enabled_categories.clone(),
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    // ------------------------------------------------------------------
    // residents
    // ------------------------------------------------------------------

    #[instrument(skip_all, fields(email = %new.email))]
    pub async fn register(&self, new: NewResident) -> ServiceResult<Resident> {
        new.validate()?;
        let resident = self.store.create_resident(new).await?;
        info!(resident_id = resident.id, "resident registered, awaiting activation");
        Ok(resident)
    }

    /// Known residents only, active or not
    pub async fn profile(&self, resident_id: i64) -> ServiceResult<Resident> {
        self.store
            .resident(resident_id)
            .await?
            .ok_or(ServiceError::UnknownResident(resident_id))
    }

    pub async fn update_profile(
        &self,
        resident_id: i64,
        update: ProfileUpdate,
    ) -> ServiceResult<Resident> {
        update.validate()?;
        self.profile(resident_id).await?;
        Ok(self.store.update_resident(resident_id, update).await?)
    }

    async fn active_resident(&self, resident_id: i64) -> ServiceResult<Resident> {
        let resident = self.profile(resident_id).await?;
        if !resident.active {
            return Err(ServiceError::Inactive(resident_id));
        }
        Ok(resident)
    }

    // ------------------------------------------------------------------
    // devices
    // ------------------------------------------------------------------

    pub async fn devices(&self, resident_id: i64) -> ServiceResult<Vec<Device>> {
        self.active_resident(resident_id).await?;
        Ok(self.store.devices_for(resident_id).await?)
    }

    pub async fn add_device(&self, resident_id: i64, spec: DeviceSpec) -> ServiceResult<Device> {
        spec.validate()?;
        spec.check(&self.enabled_categories)?;
        self.active_resident(resident_id).await?;
        let device = self.store.add_device(resident_id, spec).await?;
        info!(resident_id, device_id = device.id, utility = %device.utility, "device added");
        Ok(device)
    }

    async fn owned_device(&self, resident_id: i64, device_id: i64) -> ServiceResult<Device> {
        match self.store.device(device_id).await? {
            Some(d) if d.resident_id == resident_id => Ok(d),
            _ => Err(StoreError::not_found("device", device_id).into()),
        }
    }

    /// Existing devices keep their category even if it was disabled since
    pub async fn update_device(
        &self,
        resident_id: i64,
        device_id: i64,
        spec: DeviceSpec,
    ) -> ServiceResult<Device> {
        spec.validate()?;
        self.active_resident(resident_id).await?;
        let current = self.owned_device(resident_id, device_id).await?;
        if spec.category != current.category {
            spec.check(&self.enabled_categories)?;
        } else {
            spec.utility.check_unit(spec.unit)?;
        }
        Ok(self.store.update_device(device_id, spec).await?)
    }

    /// Inactive devices keep their history but take no new readings
    pub async fn toggle_device(&self, resident_id: i64, device_id: i64) -> ServiceResult<Device> {
        self.active_resident(resident_id).await?;
        let device = self.owned_device(resident_id, device_id).await?;
        let updated = self.store.set_device_active(device_id, !device.active).await?;
        info!(resident_id, device_id, active = updated.active, "device status changed");
        Ok(updated)
    }

    pub async fn delete_device(&self, resident_id: i64, device_id: i64) -> ServiceResult<u64> {
        self.active_resident(resident_id).await?;
        self.owned_device(resident_id, device_id).await?;
        let removed = self.store.delete_device(device_id).await?;
        info!(resident_id, device_id, removed, "device deleted");
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // consumption
    // ------------------------------------------------------------------

    pub async fn consumption_history(
        &self,
        resident_id: i64,
        filter: PeriodFilter,
    ) -> ServiceResult<Vec<ConsumptionEntry>> {
        self.active_resident(resident_id).await?;
        Ok(self.store.consumption_for(resident_id, filter).await?)
    }

    pub async fn record_consumption(
        &self,
        resident_id: i64,
        new: NewConsumption,
    ) -> ServiceResult<ConsumptionRecord> {
        new.validate()?;
        let period = new.period()?;
        self.active_resident(resident_id).await?;
        let device = self.metering_device(resident_id, new.device_id).await?;
        let record = self.store.add_consumption(device.id, period, new.value).await?;
        debug!(resident_id, device_id = device.id, %period, value = new.value, "consumption recorded");
        Ok(record)
    }

    /// Owned and active; an inactive device is reported as missing
    async fn metering_device(&self, resident_id: i64, device_id: i64) -> ServiceResult<Device> {
        let device = self.owned_device(resident_id, device_id).await?;
        if !device.active {
            return Err(StoreError::not_found("device", device_id).into());
        }
        Ok(device)
    }

    async fn owned_record(
        &self,
        resident_id: i64,
        record_id: i64,
    ) -> ServiceResult<ConsumptionRecord> {
        let record = self
            .store
            .consumption_record(record_id)
            .await?
            .ok_or(StoreError::not_found("consumption record", record_id))?;
        self.owned_device(resident_id, record.device_id)
            .await
            .map_err(|_| StoreError::not_found("consumption record", record_id))?;
        Ok(record)
    }

    pub async fn update_consumption(
        &self,
        resident_id: i64,
        record_id: i64,
        new: NewConsumption,
    ) -> ServiceResult<ConsumptionRecord> {
        new.validate()?;
        let period = new.period()?;
        self.active_resident(resident_id).await?;
        self.owned_record(resident_id, record_id).await?;
        self.metering_device(resident_id, new.device_id).await?;
        Ok(self
            .store
            .update_consumption(record_id, new.device_id, period, new.value)
            .await?)
    }

    pub async fn delete_consumption(&self, resident_id: i64, record_id: i64) -> ServiceResult<()> {
        self.active_resident(resident_id).await?;
        self.owned_record(resident_id, record_id).await?;
        Ok(self.store.delete_consumption(record_id).await?)
    }

    // ------------------------------------------------------------------
    // budgets
    // ------------------------------------------------------------------

    pub async fn budgets(
        &self,
        resident_id: i64,
        filter: PeriodFilter,
    ) -> ServiceResult<Vec<BudgetLimit>> {
        self.active_resident(resident_id).await?;
        Ok(self.store.budgets_for(resident_id, filter).await?)
    }

    pub async fn create_budget(
        &self,
        resident_id: i64,
        new: NewBudget,
    ) -> ServiceResult<BudgetLimit> {
        new.validate()?;
        let period = new.period()?;
        self.active_resident(resident_id).await?;
        let budget = self
            .store
            .add_budget(resident_id, new.utility, period, new.value)
            .await?;
        info!(resident_id, utility = %new.utility, %period, value = new.value, "budget set");
        Ok(budget)
    }

    async fn owned_budget(&self, resident_id: i64, budget_id: i64) -> ServiceResult<BudgetLimit> {
        match self.store.budget(budget_id).await? {
            Some(b) if b.resident_id == resident_id => Ok(b),
            _ => Err(StoreError::not_found("budget", budget_id).into()),
        }
    }

    pub async fn update_budget(
        &self,
        resident_id: i64,
        budget_id: i64,
        value: BudgetValue,
    ) -> ServiceResult<BudgetLimit> {
        value.validate()?;
        self.active_resident(resident_id).await?;
        self.owned_budget(resident_id, budget_id).await?;
        Ok(self.store.update_budget_value(budget_id, value.value).await?)
    }

    pub async fn delete_budget(&self, resident_id: i64, budget_id: i64) -> ServiceResult<()> {
        self.active_resident(resident_id).await?;
        self.owned_budget(resident_id, budget_id).await?;
        Ok(self.store.delete_budget(budget_id).await?)
    }

    // ------------------------------------------------------------------
    // billing
    // ------------------------------------------------------------------

    /// Latest tariff of each active contract. Utilities without a contract
    /// or without a tariff stay on the fallback.
    pub async fn price_sheet(&self, resident_id: i64) -> ServiceResult<PriceSheet> {
        let mut sheet = PriceSheet::new();
        for utility in UtilityType::iter() {
            let Some(contract) = self.store.active_contract(resident_id, utility).await? else {
                continue;
            };
            let price = self
                .store
                .latest_tariff(contract.service_id)
                .await?
                .map(|t| t.price);
            sheet.set(utility, contract.service_id, price);
        }
        Ok(sheet)
    }

    pub async fn dashboard(&self, resident_id: i64, period: Period) -> ServiceResult<Dashboard> {
        self.active_resident(resident_id).await?;
        let filter = PeriodFilter::period(period);
        let entries = self.store.consumption_for(resident_id, filter).await?;
        let limits = self.store.budgets_for(resident_id, filter).await?;
        let prices = self.price_sheet(resident_id).await?;
        let device_count = self.store.devices_for(resident_id).await?.len();

        let ctx = ReportContext {
            entries: &entries,
            limits: &limits,
            prices: &prices,
            calculator: self.calculator,
        };
        let view = dashboard(&ctx, period, device_count);
        if view.alert.is_exceeded() {
            info!(resident_id, %period, alert = %view.alert, "monthly budget exceeded");
        }
        Ok(view)
    }

    pub async fn report(
        &self,
        resident_id: i64,
        kind: ReportKind,
        period: Period,
    ) -> ServiceResult<Report> {
        self.active_resident(resident_id).await?;
        let filter = match kind {
            ReportKind::Monthly => PeriodFilter::period(period),
            ReportKind::Annual => PeriodFilter::year(period.year()),
        };
        let entries = self.store.consumption_for(resident_id, filter).await?;
        let limits = self.store.budgets_for(resident_id, filter).await?;
        let prices = self.price_sheet(resident_id).await?;

        let ctx = ReportContext {
            entries: &entries,
            limits: &limits,
            prices: &prices,
            calculator: self.calculator,
        };
        Ok(build_report(&ctx, kind, period)?)
    }

    pub async fn trend(&self, resident_id: i64, period: Period) -> ServiceResult<Trend> {
        self.active_resident(resident_id).await?;
        let filter = PeriodFilter::year(period.year());
        let entries = self.store.consumption_for(resident_id, filter).await?;
        let prices = self.price_sheet(resident_id).await?;

        let ctx = ReportContext {
            entries: &entries,
            limits: &[],
            prices: &prices,
            calculator: self.calculator,
        };
        Ok(trend(&ctx, period)?)
    }

    // ------------------------------------------------------------------
    // suppliers and contracts
    // ------------------------------------------------------------------

    /// Active suppliers with their active services, current prices and the
    /// caller's contracts marked
    pub async fn supplier_listing(&self, resident_id: i64) -> ServiceResult<Vec<SupplierListing>> {
        self.active_resident(resident_id).await?;
        let contracts = self.store.active_contracts(resident_id).await?;
        let mut listing = Vec::new();
        for supplier in self.store.suppliers(true).await? {
            let mut services = Vec::new();
            for service in self.store.services_for(supplier.id).await? {
                if !service.active {
                    continue;
                }
                let current_price = self.store.latest_tariff(service.id).await?.map(|t| t.price);
                let contracted = billing::active_contract(&contracts, resident_id, service.utility)
                    .is_some_and(|c| c.service_id == service.id);
                services.push(ServiceOffer {
                    service,
                    current_price,
                    contracted,
                });
            }
            listing.push(SupplierListing { supplier, services });
        }
        Ok(listing)
    }

    #[instrument(skip(self))]
    pub async fn switch_contract(
        &self,
        resident_id: i64,
        service_id: i64,
    ) -> ServiceResult<ResidentContract> {
        self.active_resident(resident_id).await?;
        let service = self
            .store
            .service(service_id)
            .await?
            .filter(|s| s.active)
            .ok_or(ServiceError::ServiceUnavailable(service_id))?;
        let contract = self.store.switch_contract(resident_id, &service).await?;
        info!(resident_id, utility = %service.utility, service_id, "supplier contract switched");
        Ok(contract)
    }

    // ------------------------------------------------------------------
    // administration
    // ------------------------------------------------------------------

    pub async fn resident_overview(&self) -> ServiceResult<Vec<ResidentOverview>> {
        let mut overview = Vec::new();
        for resident in self.store.list_residents().await? {
            let contracts = self.store.active_contracts(resident.id).await?;
            overview.push(ResidentOverview {
                resident,
                contracts,
            });
        }
        Ok(overview)
    }

    pub async fn toggle_resident(&self, resident_id: i64) -> ServiceResult<Resident> {
        let resident = self.profile(resident_id).await?;
        let updated = self
            .store
            .set_resident_active(resident_id, !resident.active)
            .await?;
        info!(resident_id, active = updated.active, "resident status changed");
        Ok(updated)
    }

    /// Every supplier, including deactivated ones
    pub async fn all_suppliers(&self) -> ServiceResult<Vec<Supplier>> {
        Ok(self.store.suppliers(false).await?)
    }

    /// Price history of a service, newest first
    pub async fn tariff_history(&self, service_id: i64) -> ServiceResult<Vec<TariffRecord>> {
        if self.store.service(service_id).await?.is_none() {
            return Err(StoreError::not_found("supplier service", service_id).into());
        }
        Ok(self.store.tariff_history(service_id).await?)
    }

    pub async fn add_supplier(&self, new: NewSupplier) -> ServiceResult<Supplier> {
        new.validate()?;
        Ok(self.store.add_supplier(new).await?)
    }

    pub async fn add_service(&self, new: NewSupplierService) -> ServiceResult<SupplierService> {
        new.utility.check_unit(new.unit)?;
        Ok(self.store.add_service(new).await?)
    }

    pub async fn add_tariff(&self, new: NewTariff) -> ServiceResult<TariffRecord> {
        new.validate()?;
        let recorded_at = new.recorded_at.unwrap_or_else(Utc::now);
        let tariff = self
            .store
            .add_tariff(new.service_id, new.price, recorded_at)
            .await?;
        info!(service_id = new.service_id, price = new.price, "tariff recorded");
        Ok(tariff)
    }
}

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub service: Arc<UtilityService>,
}

impl AppState {
    pub async fn new(cfg: Config) -> anyhow::Result<Self> {
        let store = crate::repo::connect(&cfg.db).await?;
        Ok(Self::with_store(cfg, store))
    }

    pub fn with_store(cfg: Config, store: Arc<dyn Store>) -> Self {
        let service = Arc::new(UtilityService::new(store, &cfg));
        Self {
            cfg: Arc::new(cfg),
            service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MeasurementUnit;
    use crate::repo::MemoryStore;

    async fn service_with_resident() -> (UtilityService, i64) {
        let svc = UtilityService::new(Arc::new(MemoryStore::new()), &Config::for_memory("t"));
        let r = svc
            .register(NewResident {
                name: "Rita".to_string(),
                email: "rita@example.com".to_string(),
                phone: "912345678".to_string(),
                address: None,
                postal_code: None,
                city: None,
            })
            .await
            .unwrap();
        (svc, r.id)
    }

    fn gas_meter() -> DeviceSpec {
        DeviceSpec {
            name: "Boiler".to_string(),
            utility: UtilityType::Gas,
            category: DeviceCategory::Consumer,
            unit: MeasurementUnit::CubicMeter,
        }
    }

    #[tokio::test]
    async fn test_inactive_resident_is_blocked() {
        let (svc, id) = service_with_resident().await;
        assert!(matches!(
            svc.devices(id).await,
            Err(ServiceError::Inactive(_))
        ));
        svc.toggle_resident(id).await.unwrap();
        assert!(svc.devices(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_resident() {
        let (svc, _) = service_with_resident().await;
        assert!(matches!(
            svc.profile(999).await,
            Err(ServiceError::UnknownResident(999))
        ));
    }

    #[tokio::test]
    async fn test_foreign_device_looks_missing() {
        let (svc, a) = service_with_resident().await;
        let b = svc
            .register(NewResident {
                name: "Bruno".to_string(),
                email: "bruno@example.com".to_string(),
                phone: "913333333".to_string(),
                address: None,
                postal_code: None,
                city: None,
            })
            .await
            .unwrap()
            .id;
        svc.toggle_resident(a).await.unwrap();
        svc.toggle_resident(b).await.unwrap();

        let device = svc.add_device(a, gas_meter()).await.unwrap();
        let err = svc.delete_device(b, device.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Store(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_inactive_device_takes_no_readings() {
        let (svc, id) = service_with_resident().await;
        svc.toggle_resident(id).await.unwrap();
        let boiler = svc.add_device(id, gas_meter()).await.unwrap();
        let spare = svc.add_device(id, gas_meter()).await.unwrap();
        let reading = |device_id, month| NewConsumption {
            device_id,
            year: 2025,
            month,
            value: 12.0,
        };
        let record = svc.record_consumption(id, reading(boiler.id, 1)).await.unwrap();

        let spare = svc.toggle_device(id, spare.id).await.unwrap();
        assert!(!spare.active);
        assert!(matches!(
            svc.record_consumption(id, reading(spare.id, 2)).await,
            Err(ServiceError::Store(StoreError::NotFound { .. }))
        ));
        // moving an existing record onto the inactive device is refused too
        assert!(matches!(
            svc.update_consumption(id, record.id, reading(spare.id, 1)).await,
            Err(ServiceError::Store(StoreError::NotFound { .. }))
        ));

        let spare = svc.toggle_device(id, spare.id).await.unwrap();
        assert!(spare.active);
        assert!(svc.record_consumption(id, reading(spare.id, 2)).await.is_ok());
    }

    #[tokio::test]
    async fn test_device_unit_rule_enforced() {
        let (svc, id) = service_with_resident().await;
        svc.toggle_resident(id).await.unwrap();
        let mut spec = gas_meter();
        spec.unit = MeasurementUnit::KilowattHour;
        assert!(matches!(
            svc.add_device(id, spec).await,
            Err(ServiceError::Domain(DomainError::UnitMismatch { .. }))
        ));
    }

    #[tokio::test]
    async fn test_switch_to_inactive_or_missing_service() {
        let (svc, id) = service_with_resident().await;
        svc.toggle_resident(id).await.unwrap();
        assert!(matches!(
            svc.switch_contract(id, 42).await,
            Err(ServiceError::ServiceUnavailable(42))
        ));
    }

    #[tokio::test]
    async fn test_price_sheet_falls_back_without_tariff() {
        let (svc, id) = service_with_resident().await;
        svc.toggle_resident(id).await.unwrap();
        let supplier = svc
            .add_supplier(NewSupplier {
                name: "Aguas".to_string(),
                tax_number: "501".to_string(),
                address: None,
            })
            .await
            .unwrap();
        let water = svc
            .add_service(NewSupplierService {
                supplier_id: supplier.id,
                utility: UtilityType::Water,
                unit: MeasurementUnit::CubicMeter,
            })
            .await
            .unwrap();
        svc.switch_contract(id, water.id).await.unwrap();

        let sheet = svc.price_sheet(id).await.unwrap();
        assert_eq!(
            sheet.resolve(UtilityType::Water, 1.0),
            (1.0, billing::PriceSource::Fallback)
        );

        svc.add_tariff(NewTariff {
            service_id: water.id,
            price: 1.75,
            recorded_at: None,
        })
        .await
        .unwrap();
        let sheet = svc.price_sheet(id).await.unwrap();
        assert_eq!(
            sheet.resolve(UtilityType::Water, 1.0),
            (1.75, billing::PriceSource::Tariff { service_id: water.id })
        );
    }
}
