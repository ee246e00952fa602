use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    api::{
        error::ApiError,
        response::{list, ApiResponse},
    },
    auth::ResidentId,
    domain::{ConsumptionEntry, ConsumptionRecord, NewConsumption, Period},
    repo::PeriodFilter,
    service::AppState,
};

/// `?year=&month=` on history endpoints; both optional
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl HistoryQuery {
    pub fn filter(&self) -> Result<PeriodFilter, ApiError> {
        match (self.year, self.month) {
            (Some(year), Some(month)) => Ok(PeriodFilter::period(Period::new(year, month)?)),
            (Some(year), None) => Ok(PeriodFilter::year(year)),
            (None, None) => Ok(PeriodFilter::all()),
            (None, Some(_)) => Err(ApiError::BadRequest(
                "month filter needs a year".to_string(),
            )),
        }
    }
}

/// GET /api/v1/consumption
pub async fn history(
    State(state): State<AppState>,
    ResidentId(resident_id): ResidentId,
    Query(q): Query<HistoryQuery>,
) -> Result<ApiResponse<Vec<ConsumptionEntry>>, ApiError> {
    let entries = state
        .service
        .consumption_history(resident_id, q.filter()?)
        .await?;
    Ok(list(entries))
}

/// POST /api/v1/consumption - 409 when the device already has that month
pub async fn record(
    State(state): State<AppState>,
    ResidentId(resident_id): ResidentId,
    Json(body): Json<NewConsumption>,
) -> Result<ApiResponse<ConsumptionRecord>, ApiError> {
    let record = state.service.record_consumption(resident_id, body).await?;
    Ok(ApiResponse::created(record))
}

/// PUT /api/v1/consumption/:id
pub async fn update(
    State(state): State<AppState>,
    ResidentId(resident_id): ResidentId,
    Path(id): Path<i64>,
    Json(body): Json<NewConsumption>,
) -> Result<ApiResponse<ConsumptionRecord>, ApiError> {
    Ok(ApiResponse::success(
        state.service.update_consumption(resident_id, id, body).await?,
    ))
}

/// DELETE /api/v1/consumption/:id
pub async fn delete(
    State(state): State<AppState>,
    ResidentId(resident_id): ResidentId,
    Path(id): Path<i64>,
) -> Result<ApiResponse<i64>, ApiError> {
    state.service.delete_consumption(resident_id, id).await?;
    Ok(ApiResponse::success(id))
}
