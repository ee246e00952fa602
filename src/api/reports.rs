use axum::extract::{Path, Query, State};
use chrono::{Datelike, Utc};
use serde::Deserialize;

use crate::{
    api::{error::ApiError, response::ApiResponse},
    auth::ResidentId,
    billing::{Dashboard, Report, ReportKind, Trend},
    domain::Period,
    service::AppState,
};

/// `?year=&month=`, each defaulting to the current one
#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl PeriodQuery {
    pub fn period(&self) -> Result<Period, ApiError> {
        let today = Utc::now();
        let year = self.year.unwrap_or_else(|| today.year());
        let month = self.month.unwrap_or_else(|| today.month());
        Ok(Period::new(year, month)?)
    }
}

/// GET /api/v1/dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    ResidentId(resident_id): ResidentId,
    Query(q): Query<PeriodQuery>,
) -> Result<ApiResponse<Dashboard>, ApiError> {
    let view = state.service.dashboard(resident_id, q.period()?).await?;
    Ok(ApiResponse::success(view))
}

/// GET /api/v1/reports/:kind - `monthly` or `annual`
pub async fn report(
    State(state): State<AppState>,
    ResidentId(resident_id): ResidentId,
    Path(kind): Path<String>,
    Query(q): Query<PeriodQuery>,
) -> Result<ApiResponse<Report>, ApiError> {
    let kind: ReportKind = kind.parse()?;
    let report = state
        .service
        .report(resident_id, kind, q.period()?)
        .await?;
    Ok(ApiResponse::success(report))
}

/// GET /api/v1/reports/trend
pub async fn trend(
    State(state): State<AppState>,
    ResidentId(resident_id): ResidentId,
    Query(q): Query<PeriodQuery>,
) -> Result<ApiResponse<Trend>, ApiError> {
    Ok(ApiResponse::success(
        state.service.trend(resident_id, q.period()?).await?,
    ))
}
