use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use tracing::debug;

use super::{filter_binds, parse_column};
use crate::domain::{
    ConsumptionEntry, ConsumptionRecord, Device, DeviceSpec, Period,
};
use crate::repo::{PeriodFilter, StoreError, StoreResult};

const DEVICE_COLUMNS: &str = "id, resident_id, name, utility, category, unit, active, created_at";
const RECORD_COLUMNS: &str = "id, device_id, value, recorded_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DeviceRow {
    pub id: i64,
    pub resident_id: i64,
    pub name: String,
    pub utility: String,
    pub category: String,
    pub unit: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DeviceRow> for Device {
    type Error = StoreError;

    fn try_from(row: DeviceRow) -> StoreResult<Self> {
        Ok(Device {
            id: row.id,
            resident_id: row.resident_id,
            name: row.name,
            utility: parse_column(&row.utility)?,
            category: parse_column(&row.category)?,
            unit: parse_column(&row.unit)?,
            created_at: row.created_at,
            active: row.active,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecordRow {
    pub id: i64,
    pub device_id: i64,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}

impl From<RecordRow> for ConsumptionRecord {
    fn from(row: RecordRow) -> Self {
        ConsumptionRecord {
            id: row.id,
            device_id: row.device_id,
            value: row.value,
            recorded_at: row.recorded_at,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EntryRow {
    pub record_id: i64,
    pub device_id: i64,
    pub device_name: String,
    pub utility: String,
    pub category: String,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}

impl TryFrom<EntryRow> for ConsumptionEntry {
    type Error = StoreError;

    fn try_from(row: EntryRow) -> StoreResult<Self> {
        Ok(ConsumptionEntry {
            record_id: row.record_id,
            device_id: row.device_id,
            device_name: row.device_name,
            utility: parse_column(&row.utility)?,
            category: parse_column(&row.category)?,
            value: row.value,
            recorded_at: row.recorded_at,
        })
    }
}

fn period_key(period: Period) -> StoreResult<NaiveDate> {
    NaiveDate::from_ymd_opt(period.year(), period.month(), 1)
        .ok_or_else(|| StoreError::Backend(format!("unrepresentable period {period}")))
}

/// Devices and their monthly consumption records
pub struct DeviceRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DeviceRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, resident_id: i64, spec: &DeviceSpec) -> StoreResult<Device> {
        let row = sqlx::query_as::<_, DeviceRow>(&format!(
            r#"
            INSERT INTO devices (resident_id, name, utility, category, unit)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {DEVICE_COLUMNS}
            "#
        ))
        .bind(resident_id)
        .bind(&spec.name)
        .bind(spec.utility.to_string())
        .bind(spec.category.to_string())
        .bind(spec.unit.to_string())
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    pub async fn find_by_id(&self, id: i64) -> StoreResult<Option<Device>> {
        let row = sqlx::query_as::<_, DeviceRow>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    pub async fn find_by_resident(&self, resident_id: i64) -> StoreResult<Vec<Device>> {
        let rows = sqlx::query_as::<_, DeviceRow>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices WHERE resident_id = $1 ORDER BY id"
        ))
        .bind(resident_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    pub async fn update(&self, id: i64, spec: &DeviceSpec) -> StoreResult<Device> {
        let row = sqlx::query_as::<_, DeviceRow>(&format!(
            r#"
            UPDATE devices SET name = $2, utility = $3, category = $4, unit = $5
            WHERE id = $1
            RETURNING {DEVICE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&spec.name)
        .bind(spec.utility.to_string())
        .bind(spec.category.to_string())
        .bind(spec.unit.to_string())
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(StoreError::not_found("device", id))?.try_into()
    }

    pub async fn set_active(&self, id: i64, active: bool) -> StoreResult<Device> {
        let row = sqlx::query_as::<_, DeviceRow>(&format!(
            "UPDATE devices SET active = $2 WHERE id = $1 RETURNING {DEVICE_COLUMNS}"
        ))
        .bind(id)
        .bind(active)
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(StoreError::not_found("device", id))?.try_into()
    }

    /// Records first, then the device, in one transaction
    pub async fn delete_with_records(&self, id: i64) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM consumption_records WHERE device_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let deleted = sqlx::query("DELETE FROM devices WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            tx.rollback().await?;
            return Err(StoreError::not_found("device", id));
        }

        tx.commit().await?;
        debug!(device_id = id, removed, "deleted device with its records");
        Ok(removed)
    }

    pub async fn insert_record(
        &self,
        device_id: i64,
        period: Period,
        value: f64,
    ) -> StoreResult<ConsumptionRecord> {
        if self.find_by_id(device_id).await?.is_none() {
            return Err(StoreError::not_found("device", device_id));
        }
        let row = sqlx::query_as::<_, RecordRow>(&format!(
            r#"
            INSERT INTO consumption_records (device_id, value, period, recorded_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(device_id)
        .bind(value)
        .bind(period_key(period)?)
        .bind(period.anchor())
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    pub async fn update_record(
        &self,
        id: i64,
        device_id: i64,
        period: Period,
        value: f64,
    ) -> StoreResult<ConsumptionRecord> {
        if self.find_by_id(device_id).await?.is_none() {
            return Err(StoreError::not_found("device", device_id));
        }
        let row = sqlx::query_as::<_, RecordRow>(&format!(
            r#"
            UPDATE consumption_records
            SET device_id = $2, value = $3, period = $4, recorded_at = $5
            WHERE id = $1
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(device_id)
        .bind(value)
        .bind(period_key(period)?)
        .bind(period.anchor())
        .fetch_optional(self.pool)
        .await?;

        row.map(Into::into)
            .ok_or(StoreError::not_found("consumption record", id))
    }

    pub async fn find_record(&self, id: i64) -> StoreResult<Option<ConsumptionRecord>> {
        let row = sqlx::query_as::<_, RecordRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM consumption_records WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    pub async fn delete_record(&self, id: i64) -> StoreResult<()> {
        let deleted = sqlx::query("DELETE FROM consumption_records WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(StoreError::not_found("consumption record", id));
        }
        Ok(())
    }

    pub async fn entries_for(
        &self,
        resident_id: i64,
        filter: PeriodFilter,
    ) -> StoreResult<Vec<ConsumptionEntry>> {
        let (year, month) = filter_binds(filter);
        let rows = sqlx::query_as::<_, EntryRow>(
            r#"
            SELECT c.id AS record_id, d.id AS device_id, d.name AS device_name,
                   d.utility, d.category, c.value, c.recorded_at
            FROM consumption_records c
            JOIN devices d ON d.id = c.device_id
            WHERE d.resident_id = $1
              AND ($2::INT IS NULL OR EXTRACT(YEAR FROM c.period)::INT = $2)
              AND ($3::INT IS NULL OR EXTRACT(MONTH FROM c.period)::INT = $3)
            ORDER BY c.recorded_at DESC, c.id DESC
            "#,
        )
        .bind(resident_id)
        .bind(year)
        .bind(month)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}
