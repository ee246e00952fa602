use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;

use super::parse_column;
use crate::domain::{
    NewSupplier, NewSupplierService, ResidentContract, Supplier, SupplierService, TariffRecord,
    UtilityType,
};
use crate::repo::{StoreError, StoreResult};

const SERVICE_COLUMNS: &str = "id, supplier_id, utility, unit, active";
const CONTRACT_COLUMNS: &str = "id, resident_id, service_id, utility, active, signed_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SupplierRow {
    pub id: i64,
    pub name: String,
    pub tax_number: String,
    pub address: Option<String>,
    pub active: bool,
}

impl From<SupplierRow> for Supplier {
    fn from(row: SupplierRow) -> Self {
        Supplier {
            id: row.id,
            name: row.name,
            tax_number: row.tax_number,
            address: row.address,
            active: row.active,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ServiceRow {
    pub id: i64,
    pub supplier_id: i64,
    pub utility: String,
    pub unit: String,
    pub active: bool,
}

impl TryFrom<ServiceRow> for SupplierService {
    type Error = StoreError;

    fn try_from(row: ServiceRow) -> StoreResult<Self> {
        Ok(SupplierService {
            id: row.id,
            supplier_id: row.supplier_id,
            utility: parse_column(&row.utility)?,
            unit: parse_column(&row.unit)?,
            active: row.active,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TariffRow {
    pub id: i64,
    pub service_id: i64,
    pub price: f64,
    pub recorded_at: DateTime<Utc>,
}

impl From<TariffRow> for TariffRecord {
    fn from(row: TariffRow) -> Self {
        TariffRecord {
            id: row.id,
            service_id: row.service_id,
            price: row.price,
            recorded_at: row.recorded_at,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContractRow {
    pub id: i64,
    pub resident_id: i64,
    pub service_id: i64,
    pub utility: String,
    pub active: bool,
    pub signed_at: DateTime<Utc>,
}

impl TryFrom<ContractRow> for ResidentContract {
    type Error = StoreError;

    fn try_from(row: ContractRow) -> StoreResult<Self> {
        Ok(ResidentContract {
            id: row.id,
            resident_id: row.resident_id,
            service_id: row.service_id,
            utility: parse_column(&row.utility)?,
            active: row.active,
            signed_at: row.signed_at,
        })
    }
}

/// Suppliers, their services, tariff history and resident contracts
pub struct SupplierRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SupplierRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, new: &NewSupplier) -> StoreResult<Supplier> {
        let row = sqlx::query_as::<_, SupplierRow>(
            r#"
            INSERT INTO suppliers (name, tax_number, address)
            VALUES ($1, $2, $3)
            RETURNING id, name, tax_number, address, active
            "#,
        )
        .bind(&new.name)
        .bind(&new.tax_number)
        .bind(&new.address)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    pub async fn list(&self, active_only: bool) -> StoreResult<Vec<Supplier>> {
        let rows = sqlx::query_as::<_, SupplierRow>(
            r#"
            SELECT id, name, tax_number, address, active
            FROM suppliers
            WHERE active OR NOT $1
            ORDER BY id
            "#,
        )
        .bind(active_only)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn insert_service(&self, new: &NewSupplierService) -> StoreResult<SupplierService> {
        let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM suppliers WHERE id = $1")
            .bind(new.supplier_id)
            .fetch_optional(self.pool)
            .await?;
        if exists.is_none() {
            return Err(StoreError::not_found("supplier", new.supplier_id));
        }

        let row = sqlx::query_as::<_, ServiceRow>(&format!(
            r#"
            INSERT INTO supplier_services (supplier_id, utility, unit)
            VALUES ($1, $2, $3)
            RETURNING {SERVICE_COLUMNS}
            "#
        ))
        .bind(new.supplier_id)
        .bind(new.utility.to_string())
        .bind(new.unit.to_string())
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    pub async fn find_service(&self, id: i64) -> StoreResult<Option<SupplierService>> {
        let row = sqlx::query_as::<_, ServiceRow>(&format!(
            "SELECT {SERVICE_COLUMNS} FROM supplier_services WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    pub async fn services_of(&self, supplier_id: i64) -> StoreResult<Vec<SupplierService>> {
        let rows = sqlx::query_as::<_, ServiceRow>(&format!(
            "SELECT {SERVICE_COLUMNS} FROM supplier_services WHERE supplier_id = $1 ORDER BY id"
        ))
        .bind(supplier_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    pub async fn insert_tariff(
        &self,
        service_id: i64,
        price: f64,
        recorded_at: DateTime<Utc>,
    ) -> StoreResult<TariffRecord> {
        if self.find_service(service_id).await?.is_none() {
            return Err(StoreError::not_found("supplier service", service_id));
        }
        let row = sqlx::query_as::<_, TariffRow>(
            r#"
            INSERT INTO tariffs (service_id, price, recorded_at)
            VALUES ($1, $2, $3)
            RETURNING id, service_id, price, recorded_at
            "#,
        )
        .bind(service_id)
        .bind(price)
        .bind(recorded_at)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    pub async fn latest_tariff(&self, service_id: i64) -> StoreResult<Option<TariffRecord>> {
        let row = sqlx::query_as::<_, TariffRow>(
            r#"
            SELECT id, service_id, price, recorded_at
            FROM tariffs
            WHERE service_id = $1
            ORDER BY recorded_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(service_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    pub async fn tariff_history(&self, service_id: i64) -> StoreResult<Vec<TariffRecord>> {
        let rows = sqlx::query_as::<_, TariffRow>(
            r#"
            SELECT id, service_id, price, recorded_at
            FROM tariffs
            WHERE service_id = $1
            ORDER BY recorded_at DESC, id DESC
            "#,
        )
        .bind(service_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn active_contract(
        &self,
        resident_id: i64,
        utility: UtilityType,
    ) -> StoreResult<Option<ResidentContract>> {
        let row = sqlx::query_as::<_, ContractRow>(&format!(
            r#"
            SELECT {CONTRACT_COLUMNS}
            FROM resident_contracts
            WHERE resident_id = $1 AND utility = $2 AND active
            ORDER BY signed_at DESC, id DESC
            LIMIT 1
            "#
        ))
        .bind(resident_id)
        .bind(utility.to_string())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    pub async fn active_contracts(&self, resident_id: i64) -> StoreResult<Vec<ResidentContract>> {
        let rows = sqlx::query_as::<_, ContractRow>(&format!(
            r#"
            SELECT {CONTRACT_COLUMNS}
            FROM resident_contracts
            WHERE resident_id = $1 AND active
            ORDER BY utility
            "#
        ))
        .bind(resident_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Locks the resident row so concurrent switches for the same resident
    /// serialize; the partial unique index backs this up.
    pub async fn switch_contract(
        &self,
        resident_id: i64,
        service: &SupplierService,
    ) -> StoreResult<ResidentContract> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM residents WHERE id = $1 FOR UPDATE")
                .bind(resident_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            tx.rollback().await?;
            return Err(StoreError::not_found("resident", resident_id));
        }

        let superseded = sqlx::query(
            r#"
            UPDATE resident_contracts SET active = FALSE
            WHERE resident_id = $1 AND utility = $2 AND active
            "#,
        )
        .bind(resident_id)
        .bind(service.utility.to_string())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let row = sqlx::query_as::<_, ContractRow>(&format!(
            r#"
            INSERT INTO resident_contracts (resident_id, service_id, utility, active)
            VALUES ($1, $2, $3, TRUE)
            RETURNING {CONTRACT_COLUMNS}
            "#
        ))
        .bind(resident_id)
        .bind(service.id)
        .bind(service.utility.to_string())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(resident_id, utility = %service.utility, superseded, "contract switched");
        row.try_into()
    }
}
