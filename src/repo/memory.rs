use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use super::{PeriodFilter, Store, StoreError, StoreResult};
use crate::billing;
use crate::domain::{
    BudgetLimit, ConsumptionEntry, ConsumptionRecord, Device, DeviceSpec, NewResident,
    NewSupplier, NewSupplierService, Period, ProfileUpdate, Resident, ResidentContract, Supplier,
    SupplierService, TariffRecord, UtilityType,
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    residents: Vec<Resident>,
    devices: Vec<Device>,
    consumption: Vec<ConsumptionRecord>,
    suppliers: Vec<Supplier>,
    services: Vec<SupplierService>,
    tariffs: Vec<TariffRecord>,
    contracts: Vec<ResidentContract>,
    budgets: Vec<BudgetLimit>,
}

impl Tables {
    fn id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn resident_mut(&mut self, id: i64) -> StoreResult<&mut Resident> {
        self.residents
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::not_found("resident", id))
    }

    fn device(&self, id: i64) -> StoreResult<&Device> {
        self.devices
            .iter()
            .find(|d| d.id == id)
            .ok_or(StoreError::not_found("device", id))
    }

    fn period_taken(&self, device_id: i64, period: Period, except: Option<i64>) -> bool {
        self.consumption.iter().any(|c| {
            c.device_id == device_id && period.contains(c.recorded_at) && Some(c.id) != except
        })
    }
}

/// Process-local store. A single lock guards every table, so multi-row
/// changes (contract switch, device deletion) are atomic to readers.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_resident(&self, new: NewResident) -> StoreResult<Resident> {
        let mut t = self.tables.write();
        if t.residents.iter().any(|r| r.email == new.email) {
            return Err(StoreError::Duplicate(format!("email {} already registered", new.email)));
        }
        if t.residents.iter().any(|r| r.phone == new.phone) {
            return Err(StoreError::Duplicate(format!("phone {} already registered", new.phone)));
        }
        let resident = Resident {
            id: t.id(),
            name: new.name,
            email: new.email,
            phone: new.phone,
            address: new.address,
            postal_code: new.postal_code,
            city: new.city,
            active: false,
            registered_at: Utc::now(),
        };
        t.residents.push(resident.clone());
        Ok(resident)
    }

    async fn resident(&self, id: i64) -> StoreResult<Option<Resident>> {
        Ok(self.tables.read().residents.iter().find(|r| r.id == id).cloned())
    }

    async fn update_resident(&self, id: i64, update: ProfileUpdate) -> StoreResult<Resident> {
        let mut t = self.tables.write();
        if t.residents.iter().any(|r| r.id != id && r.phone == update.phone) {
            return Err(StoreError::Duplicate(format!("phone {} already registered", update.phone)));
        }
        let resident = t.resident_mut(id)?;
        resident.apply(update);
        Ok(resident.clone())
    }

    async fn list_residents(&self) -> StoreResult<Vec<Resident>> {
        let mut residents = self.tables.read().residents.clone();
        residents.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(residents)
    }

    async fn set_resident_active(&self, id: i64, active: bool) -> StoreResult<Resident> {
        let mut t = self.tables.write();
        let resident = t.resident_mut(id)?;
        resident.active = active;
        Ok(resident.clone())
    }

    async fn add_device(&self, resident_id: i64, spec: DeviceSpec) -> StoreResult<Device> {
        let mut t = self.tables.write();
        t.resident_mut(resident_id)?;
        let device = Device {
            id: t.id(),
            resident_id,
            name: spec.name,
            utility: spec.utility,
            category: spec.category,
            unit: spec.unit,
            created_at: Utc::now(),
            active: true,
        };
        t.devices.push(device.clone());
        Ok(device)
    }

    async fn device(&self, id: i64) -> StoreResult<Option<Device>> {
        Ok(self.tables.read().devices.iter().find(|d| d.id == id).cloned())
    }

    async fn update_device(&self, id: i64, spec: DeviceSpec) -> StoreResult<Device> {
        let mut t = self.tables.write();
        let device = t
            .devices
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(StoreError::not_found("device", id))?;
        device.apply(spec);
        Ok(device.clone())
    }

    async fn set_device_active(&self, id: i64, active: bool) -> StoreResult<Device> {
        let mut t = self.tables.write();
        let device = t
            .devices
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(StoreError::not_found("device", id))?;
        device.active = active;
        Ok(device.clone())
    }

    async fn devices_for(&self, resident_id: i64) -> StoreResult<Vec<Device>> {
        Ok(self
            .tables
            .read()
            .devices
            .iter()
            .filter(|d| d.resident_id == resident_id)
            .cloned()
            .collect())
    }

    async fn delete_device(&self, id: i64) -> StoreResult<u64> {
        let mut t = self.tables.write();
        t.device(id)?;
        let before = t.consumption.len();
        t.consumption.retain(|c| c.device_id != id);
        let removed = (before - t.consumption.len()) as u64;
        t.devices.retain(|d| d.id != id);
        debug!(device_id = id, removed, "deleted device with its records");
        Ok(removed)
    }

    async fn add_consumption(
        &self,
        device_id: i64,
        period: Period,
        value: f64,
    ) -> StoreResult<ConsumptionRecord> {
        let mut t = self.tables.write();
        t.device(device_id)?;
        if t.period_taken(device_id, period, None) {
            return Err(StoreError::Duplicate(format!(
                "device {device_id} already has a record for {period}"
            )));
        }
        let record = ConsumptionRecord {
            id: t.id(),
            device_id,
            value,
            recorded_at: period.anchor(),
        };
        t.consumption.push(record.clone());
        Ok(record)
    }

    async fn update_consumption(
        &self,
        id: i64,
        device_id: i64,
        period: Period,
        value: f64,
    ) -> StoreResult<ConsumptionRecord> {
        let mut t = self.tables.write();
        t.device(device_id)?;
        if t.period_taken(device_id, period, Some(id)) {
            return Err(StoreError::Duplicate(format!(
                "device {device_id} already has a record for {period}"
            )));
        }
        let record = t
            .consumption
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(StoreError::not_found("consumption record", id))?;
        record.device_id = device_id;
        record.value = value;
        record.recorded_at = period.anchor();
        Ok(record.clone())
    }

    async fn consumption_record(&self, id: i64) -> StoreResult<Option<ConsumptionRecord>> {
        Ok(self.tables.read().consumption.iter().find(|c| c.id == id).cloned())
    }

    async fn delete_consumption(&self, id: i64) -> StoreResult<()> {
        let mut t = self.tables.write();
        let before = t.consumption.len();
        t.consumption.retain(|c| c.id != id);
        if t.consumption.len() == before {
            return Err(StoreError::not_found("consumption record", id));
        }
        Ok(())
    }

    async fn consumption_for(
        &self,
        resident_id: i64,
        filter: PeriodFilter,
    ) -> StoreResult<Vec<ConsumptionEntry>> {
        let t = self.tables.read();
        let mut entries: Vec<ConsumptionEntry> = t
            .consumption
            .iter()
            .filter(|c| filter.matches(c.recorded_at))
            .filter_map(|c| {
                let d = t.devices.iter().find(|d| d.id == c.device_id)?;
                (d.resident_id == resident_id).then(|| ConsumptionEntry {
                    record_id: c.id,
                    device_id: d.id,
                    device_name: d.name.clone(),
                    utility: d.utility,
                    category: d.category,
                    value: c.value,
                    recorded_at: c.recorded_at,
                })
            })
            .collect();
        entries.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at).then(b.record_id.cmp(&a.record_id)));
        Ok(entries)
    }

    async fn add_supplier(&self, new: NewSupplier) -> StoreResult<Supplier> {
        let mut t = self.tables.write();
        let supplier = Supplier {
            id: t.id(),
            name: new.name,
            tax_number: new.tax_number,
            address: new.address,
            active: true,
        };
        t.suppliers.push(supplier.clone());
        Ok(supplier)
    }

    async fn suppliers(&self, active_only: bool) -> StoreResult<Vec<Supplier>> {
        Ok(self
            .tables
            .read()
            .suppliers
            .iter()
            .filter(|s| s.active || !active_only)
            .cloned()
            .collect())
    }

    async fn add_service(&self, new: NewSupplierService) -> StoreResult<SupplierService> {
        let mut t = self.tables.write();
        if !t.suppliers.iter().any(|s| s.id == new.supplier_id) {
            return Err(StoreError::not_found("supplier", new.supplier_id));
        }
        let service = SupplierService {
            id: t.id(),
            supplier_id: new.supplier_id,
            utility: new.utility,
            unit: new.unit,
            active: true,
        };
        t.services.push(service.clone());
        Ok(service)
    }

    async fn service(&self, id: i64) -> StoreResult<Option<SupplierService>> {
        Ok(self.tables.read().services.iter().find(|s| s.id == id).cloned())
    }

    async fn services_for(&self, supplier_id: i64) -> StoreResult<Vec<SupplierService>> {
        Ok(self
            .tables
            .read()
            .services
            .iter()
            .filter(|s| s.supplier_id == supplier_id)
            .cloned()
            .collect())
    }

    async fn add_tariff(
        &self,
        service_id: i64,
        price: f64,
        recorded_at: DateTime<Utc>,
    ) -> StoreResult<TariffRecord> {
        let mut t = self.tables.write();
        if !t.services.iter().any(|s| s.id == service_id) {
            return Err(StoreError::not_found("supplier service", service_id));
        }
        let tariff = TariffRecord {
            id: t.id(),
            service_id,
            price,
            recorded_at,
        };
        t.tariffs.push(tariff.clone());
        Ok(tariff)
    }

    async fn latest_tariff(&self, service_id: i64) -> StoreResult<Option<TariffRecord>> {
        let t = self.tables.read();
        Ok(billing::latest_tariff(t.tariffs.iter().filter(|r| r.service_id == service_id)).cloned())
    }

    async fn tariff_history(&self, service_id: i64) -> StoreResult<Vec<TariffRecord>> {
        let mut history: Vec<TariffRecord> = self
            .tables
            .read()
            .tariffs
            .iter()
            .filter(|r| r.service_id == service_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at).then(b.id.cmp(&a.id)));
        Ok(history)
    }

    async fn active_contract(
        &self,
        resident_id: i64,
        utility: UtilityType,
    ) -> StoreResult<Option<ResidentContract>> {
        let t = self.tables.read();
        Ok(billing::active_contract(&t.contracts, resident_id, utility).cloned())
    }

    async fn active_contracts(&self, resident_id: i64) -> StoreResult<Vec<ResidentContract>> {
        Ok(self
            .tables
            .read()
            .contracts
            .iter()
            .filter(|c| c.active && c.resident_id == resident_id)
            .cloned()
            .collect())
    }

    async fn switch_contract(
        &self,
        resident_id: i64,
        service: &SupplierService,
    ) -> StoreResult<ResidentContract> {
        let mut t = self.tables.write();
        t.resident_mut(resident_id)?;
        let contract = ResidentContract {
            id: t.id(),
            resident_id,
            service_id: service.id,
            utility: service.utility,
            active: true,
            signed_at: Utc::now(),
        };
        let superseded = billing::supersede(&mut t.contracts, contract.clone());
        debug!(resident_id, utility = %service.utility, superseded, "contract switched");
        Ok(contract)
    }

    async fn add_budget(
        &self,
        resident_id: i64,
        utility: UtilityType,
        period: Period,
        value: f64,
    ) -> StoreResult<BudgetLimit> {
        let mut t = self.tables.write();
        let taken = t
            .budgets
            .iter()
            .any(|b| b.resident_id == resident_id && b.utility == utility && b.period == period);
        if taken {
            return Err(StoreError::Duplicate(format!(
                "budget for {utility} in {period} already exists"
            )));
        }
        let budget = BudgetLimit {
            id: t.id(),
            resident_id,
            utility,
            period,
            value,
        };
        t.budgets.push(budget.clone());
        Ok(budget)
    }

    async fn budget(&self, id: i64) -> StoreResult<Option<BudgetLimit>> {
        Ok(self.tables.read().budgets.iter().find(|b| b.id == id).cloned())
    }

    async fn update_budget_value(&self, id: i64, value: f64) -> StoreResult<BudgetLimit> {
        let mut t = self.tables.write();
        let budget = t
            .budgets
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(StoreError::not_found("budget", id))?;
        budget.value = value;
        Ok(budget.clone())
    }

    async fn delete_budget(&self, id: i64) -> StoreResult<()> {
        let mut t = self.tables.write();
        let before = t.budgets.len();
        t.budgets.retain(|b| b.id != id);
        if t.budgets.len() == before {
            return Err(StoreError::not_found("budget", id));
        }
        Ok(())
    }

    async fn budgets_for(
        &self,
        resident_id: i64,
        filter: PeriodFilter,
    ) -> StoreResult<Vec<BudgetLimit>> {
        let mut budgets: Vec<BudgetLimit> = self
            .tables
            .read()
            .budgets
            .iter()
            .filter(|b| b.resident_id == resident_id && filter.matches(b.period.anchor()))
            .cloned()
            .collect();
        budgets.sort_by(|a, b| b.period.cmp(&a.period).then(a.utility.cmp(&b.utility)));
        Ok(budgets)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
