use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{NewResident, ProfileUpdate, Resident};
use crate::repo::{StoreError, StoreResult};

const COLUMNS: &str =
    "id, name, email, phone, address, postal_code, city, active, registered_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ResidentRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub active: bool,
    pub registered_at: DateTime<Utc>,
}

impl From<ResidentRow> for Resident {
    fn from(row: ResidentRow) -> Self {
        Resident {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            postal_code: row.postal_code,
            city: row.city,
            active: row.active,
            registered_at: row.registered_at,
        }
    }
}

pub struct ResidentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ResidentRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, new: &NewResident) -> StoreResult<Resident> {
        let row = sqlx::query_as::<_, ResidentRow>(&format!(
            r#"
            INSERT INTO residents (name, email, phone, address, postal_code, city)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(&new.address)
        .bind(&new.postal_code)
        .bind(&new.city)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    pub async fn find_by_id(&self, id: i64) -> StoreResult<Option<Resident>> {
        let row = sqlx::query_as::<_, ResidentRow>(&format!(
            "SELECT {COLUMNS} FROM residents WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    pub async fn list_all(&self) -> StoreResult<Vec<Resident>> {
        let rows = sqlx::query_as::<_, ResidentRow>(&format!(
            "SELECT {COLUMNS} FROM residents ORDER BY name"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn update_profile(&self, id: i64, update: &ProfileUpdate) -> StoreResult<Resident> {
        let row = sqlx::query_as::<_, ResidentRow>(&format!(
            r#"
            UPDATE residents
            SET name = $2, phone = $3, address = $4, postal_code = $5, city = $6
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&update.name)
        .bind(&update.phone)
        .bind(&update.address)
        .bind(&update.postal_code)
        .bind(&update.city)
        .fetch_optional(self.pool)
        .await?;

        row.map(Into::into)
            .ok_or(StoreError::not_found("resident", id))
    }

    pub async fn set_active(&self, id: i64, active: bool) -> StoreResult<Resident> {
        let row = sqlx::query_as::<_, ResidentRow>(&format!(
            "UPDATE residents SET active = $2 WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(active)
        .fetch_optional(self.pool)
        .await?;

        row.map(Into::into)
            .ok_or(StoreError::not_found("resident", id))
    }
}
