//! End-to-end billing scenarios through the service layer and the
//! in-memory store.

use std::sync::Arc;
use tokio::task::JoinSet;

use household_utilities::billing::{AlertStatus, Report, ReportKind};
use household_utilities::config::Config;
use household_utilities::domain::{
    BudgetValue, DeviceCategory, DeviceSpec, NewBudget, NewConsumption,
    NewResident, NewSupplier, NewSupplierService, NewTariff, Period, UtilityType,
};
use household_utilities::repo::{MemoryStore, PeriodFilter, Store, StoreError};
use household_utilities::service::{ServiceError, UtilityService};

struct Household {
    svc: Arc<UtilityService>,
    resident: i64,
}

impl Household {
    async fn new() -> Self {
        let svc = Arc::new(UtilityService::new(
            Arc::new(MemoryStore::new()),
            &Config::for_memory("test-admin-token"),
        ));
        let resident = svc
            .register(NewResident {
                name: "Marta Sousa".to_string(),
                email: "marta@example.com".to_string(),
                phone: "915550000".to_string(),
                address: Some("Rua Direita 1".to_string()),
                postal_code: Some("1000-001".to_string()),
                city: Some("Lisboa".to_string()),
            })
            .await
            .unwrap()
            .id;
        svc.toggle_resident(resident).await.unwrap();
        Self { svc, resident }
    }

    async fn device(&self, utility: UtilityType, category: DeviceCategory) -> i64 {
        let unit = utility.expected_unit();
        self.svc
            .add_device(
                self.resident,
                DeviceSpec {
                    name: format!("{utility} {category}"),
                    utility,
                    category,
                    unit,
                },
            )
            .await
            .unwrap()
            .id
    }

    async fn record(&self, device_id: i64, month: u32, value: f64) {
        self.svc
            .record_consumption(
                self.resident,
                NewConsumption {
                    device_id,
                    year: 2025,
                    month,
                    value,
                },
            )
            .await
            .unwrap();
    }

    async fn budget(&self, utility: UtilityType, month: u32, value: f64) -> i64 {
        self.svc
            .create_budget(
                self.resident,
                NewBudget {
                    utility,
                    year: 2025,
                    month,
                    value,
                },
            )
            .await
            .unwrap()
            .id
    }

    /// Supplier with one service for `utility` priced at `price`; the
    /// resident is switched to it
    async fn contract(&self, utility: UtilityType, price: f64) -> i64 {
        let supplier = self
            .svc
            .add_supplier(NewSupplier {
                name: format!("{utility} supplier"),
                tax_number: "509999999".to_string(),
                address: None,
            })
            .await
            .unwrap();
        let service = self
            .svc
            .add_service(NewSupplierService {
                supplier_id: supplier.id,
                utility,
                unit: utility.expected_unit(),
            })
            .await
            .unwrap();
        self.svc
            .add_tariff(NewTariff {
                service_id: service.id,
                price,
                recorded_at: None,
            })
            .await
            .unwrap();
        self.svc
            .switch_contract(self.resident, service.id)
            .await
            .unwrap();
        service.id
    }
}

fn march() -> Period {
    Period::new(2025, 3).unwrap()
}

#[tokio::test]
async fn net_electricity_priced_by_contract_exceeds_budget() {
    let h = Household::new().await;
    let main = h.device(UtilityType::Electricity, DeviceCategory::Consumer).await;
    let heat_pump = h.device(UtilityType::Electricity, DeviceCategory::Consumer).await;
    let solar = h.device(UtilityType::Electricity, DeviceCategory::Generator).await;
    h.record(main, 3, 100.0).await;
    h.record(heat_pump, 3, 120.0).await;
    h.record(solar, 3, 30.0).await;
    h.contract(UtilityType::Electricity, 0.20).await;
    h.budget(UtilityType::Electricity, 3, 30.0).await;

    let dash = h.svc.dashboard(h.resident, march()).await.unwrap();
    assert_eq!(dash.costs[&UtilityType::Electricity], 38.0);
    assert_eq!(dash.consumption[&UtilityType::Electricity], 190.0);
    assert_eq!(dash.total_cost, 38.0);
    assert_eq!(dash.total_budget, 30.0);
    assert_eq!(dash.alert.status, AlertStatus::Exceeded);
    assert_eq!(dash.alert.overage, Some(8.0));
    assert_eq!(dash.device_count, 3);
}

#[tokio::test]
async fn water_without_contract_uses_fallback_price() {
    let h = Household::new().await;
    let tap = h.device(UtilityType::Water, DeviceCategory::Consumer).await;
    h.record(tap, 3, 10.0).await;

    let dash = h.svc.dashboard(h.resident, march()).await.unwrap();
    assert_eq!(dash.costs[&UtilityType::Water], 10.0);
    assert_eq!(dash.costs[&UtilityType::Gas], 0.0);
    assert_eq!(dash.alert.status, AlertStatus::NoBudget);
}

#[tokio::test]
async fn gas_generator_does_not_offset_gas_cost() {
    let h = Household::new().await;
    let boiler = h.device(UtilityType::Gas, DeviceCategory::Consumer).await;
    let biogas = h.device(UtilityType::Gas, DeviceCategory::Generator).await;
    h.record(boiler, 3, 40.0).await;
    h.record(biogas, 3, 15.0).await;
    h.contract(UtilityType::Gas, 0.5).await;

    let dash = h.svc.dashboard(h.resident, march()).await.unwrap();
    assert_eq!(dash.costs[&UtilityType::Gas], 20.0);
}

#[tokio::test]
async fn duplicate_month_is_rejected_before_persisting() {
    let h = Household::new().await;
    let tap = h.device(UtilityType::Water, DeviceCategory::Consumer).await;
    h.record(tap, 3, 10.0).await;

    let err = h
        .svc
        .record_consumption(
            h.resident,
            NewConsumption {
                device_id: tap,
                year: 2025,
                month: 3,
                value: 99.0,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Store(StoreError::Duplicate(_))));

    let history = h
        .svc
        .consumption_history(h.resident, PeriodFilter::period(march()))
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].value, 10.0);
}

#[tokio::test]
async fn duplicate_budget_rejected_and_value_editable() {
    let h = Household::new().await;
    let id = h.budget(UtilityType::Gas, 3, 25.0).await;
    let err = h
        .svc
        .create_budget(
            h.resident,
            NewBudget {
                utility: UtilityType::Gas,
                year: 2025,
                month: 3,
                value: 30.0,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Store(StoreError::Duplicate(_))));

    let updated = h
        .svc
        .update_budget(h.resident, id, BudgetValue { value: 30.0 })
        .await
        .unwrap();
    assert_eq!(updated.value, 30.0);
    assert_eq!(updated.period, march());
}

#[tokio::test]
async fn annual_report_skips_empty_months() {
    let h = Household::new().await;
    let meter = h.device(UtilityType::Electricity, DeviceCategory::Consumer).await;
    h.record(meter, 1, 50.0).await;
    h.record(meter, 6, 80.0).await;
    h.budget(UtilityType::Water, 9, 12.0).await;

    let report = h
        .svc
        .report(h.resident, ReportKind::Annual, march())
        .await
        .unwrap();
    let Report::Annual(annual) = report else {
        panic!("expected an annual report");
    };
    let months: Vec<u32> = annual.months.iter().map(|m| m.period.month()).collect();
    assert_eq!(months, vec![1, 6, 9]);
    assert_eq!(annual.total_cost, 130.0);
}

#[tokio::test]
async fn monthly_report_alerts_per_utility() {
    let h = Household::new().await;
    let meter = h.device(UtilityType::Electricity, DeviceCategory::Consumer).await;
    let tap = h.device(UtilityType::Water, DeviceCategory::Consumer).await;
    h.record(meter, 3, 50.0).await;
    h.record(tap, 3, 5.0).await;
    h.budget(UtilityType::Electricity, 3, 50.0).await;
    h.budget(UtilityType::Water, 3, 4.0).await;

    let Report::Monthly(monthly) = h
        .svc
        .report(h.resident, ReportKind::Monthly, march())
        .await
        .unwrap()
    else {
        panic!("expected a monthly report");
    };
    let status = |u: UtilityType| {
        monthly
            .utilities
            .iter()
            .find(|l| l.utility == u)
            .map(|l| l.alert.status)
            .unwrap()
    };
    assert_eq!(status(UtilityType::Electricity), AlertStatus::Within);
    assert_eq!(status(UtilityType::Water), AlertStatus::Exceeded);
    assert_eq!(status(UtilityType::Gas), AlertStatus::NoBudget);
    assert_eq!(monthly.total_cost, 55.0);
}

#[tokio::test]
async fn trend_lists_twelve_months() {
    let h = Household::new().await;
    let meter = h.device(UtilityType::Electricity, DeviceCategory::Consumer).await;
    h.record(meter, 2, 10.0).await;
    h.record(meter, 3, 20.0).await;

    let trend = h.svc.trend(h.resident, march()).await.unwrap();
    assert_eq!(trend.monthly_totals.len(), 12);
    assert_eq!(trend.monthly_totals[1].total_cost, 10.0);
    assert_eq!(trend.monthly_totals[2].total_cost, 20.0);
    assert_eq!(trend.distribution[&UtilityType::Electricity], 20.0);
}

#[tokio::test]
async fn deleting_device_removes_its_history() {
    let h = Household::new().await;
    let meter = h.device(UtilityType::Gas, DeviceCategory::Consumer).await;
    h.record(meter, 1, 1.0).await;
    h.record(meter, 2, 2.0).await;

    assert_eq!(h.svc.delete_device(h.resident, meter).await.unwrap(), 2);
    let history = h
        .svc
        .consumption_history(h.resident, PeriodFilter::all())
        .await
        .unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn newer_tariff_changes_cost() {
    let h = Household::new().await;
    let meter = h.device(UtilityType::Electricity, DeviceCategory::Consumer).await;
    h.record(meter, 3, 100.0).await;
    let service_id = h.contract(UtilityType::Electricity, 0.20).await;

    h.svc
        .add_tariff(NewTariff {
            service_id,
            price: 0.25,
            recorded_at: Some(chrono::Utc::now() + chrono::Duration::seconds(5)),
        })
        .await
        .unwrap();

    let dash = h.svc.dashboard(h.resident, march()).await.unwrap();
    assert_eq!(dash.costs[&UtilityType::Electricity], 25.0);
}

#[tokio::test]
async fn concurrent_switches_keep_one_active_contract() {
    let h = Household::new().await;
    let mut services = Vec::new();
    for price in [0.18, 0.19, 0.20, 0.21] {
        services.push(h.contract(UtilityType::Electricity, price).await);
    }

    let mut set = JoinSet::new();
    for i in 0..64 {
        let svc = h.svc.clone();
        let resident = h.resident;
        let service_id = services[i % services.len()];
        set.spawn(async move {
            svc.switch_contract(resident, service_id).await.unwrap();
            svc.store().active_contracts(resident).await.unwrap().len()
        });
    }
    while let Some(active) = set.join_next().await {
        assert_eq!(active.unwrap(), 1);
    }

    let listing = h.svc.supplier_listing(h.resident).await.unwrap();
    let contracted = listing
        .iter()
        .flat_map(|s| s.services.iter())
        .filter(|o| o.contracted)
        .count();
    assert_eq!(contracted, 1);
}
