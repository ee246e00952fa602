use chrono::{Datelike, NaiveDate};
use sqlx::PgPool;

use super::{filter_binds, parse_column};
use crate::domain::{BudgetLimit, Period, UtilityType};
use crate::repo::{PeriodFilter, StoreError, StoreResult};

const COLUMNS: &str = "id, resident_id, utility, period, value";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BudgetRow {
    pub id: i64,
    pub resident_id: i64,
    pub utility: String,
    pub period: NaiveDate,
    pub value: f64,
}

impl TryFrom<BudgetRow> for BudgetLimit {
    type Error = StoreError;

    fn try_from(row: BudgetRow) -> Result<Self, Self::Error> {
        let period = Period::new(row.period.year(), row.period.month())
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(BudgetLimit {
            id: row.id,
            resident_id: row.resident_id,
            utility: parse_column(&row.utility)?,
            period,
            value: row.value,
        })
    }
}

pub struct BudgetRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BudgetRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        resident_id: i64,
        utility: UtilityType,
        period: Period,
        value: f64,
    ) -> StoreResult<BudgetLimit> {
        let first_day = NaiveDate::from_ymd_opt(period.year(), period.month(), 1)
            .ok_or_else(|| StoreError::Backend(format!("unrepresentable period {period}")))?;
        let row = sqlx::query_as::<_, BudgetRow>(&format!(
            r#"
            INSERT INTO budget_limits (resident_id, utility, period, value)
            VALUES ($1, $2, $3, $4)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(resident_id)
        .bind(utility.to_string())
        .bind(first_day)
        .bind(value)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    pub async fn find_by_id(&self, id: i64) -> StoreResult<Option<BudgetLimit>> {
        let row = sqlx::query_as::<_, BudgetRow>(&format!(
            "SELECT {COLUMNS} FROM budget_limits WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    pub async fn update_value(&self, id: i64, value: f64) -> StoreResult<BudgetLimit> {
        let row = sqlx::query_as::<_, BudgetRow>(&format!(
            "UPDATE budget_limits SET value = $2 WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(value)
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(StoreError::not_found("budget", id))?.try_into()
    }

    pub async fn delete(&self, id: i64) -> StoreResult<()> {
        let deleted = sqlx::query("DELETE FROM budget_limits WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(StoreError::not_found("budget", id));
        }
        Ok(())
    }

    pub async fn find_by_resident(
        &self,
        resident_id: i64,
        filter: PeriodFilter,
    ) -> StoreResult<Vec<BudgetLimit>> {
        let (year, month) = filter_binds(filter);
        let rows = sqlx::query_as::<_, BudgetRow>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM budget_limits
            WHERE resident_id = $1
              AND ($2::INT IS NULL OR EXTRACT(YEAR FROM period)::INT = $2)
              AND ($3::INT IS NULL OR EXTRACT(MONTH FROM period)::INT = $3)
            ORDER BY period DESC, utility
            "#
        ))
        .bind(resident_id)
        .bind(year)
        .bind(month)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}
