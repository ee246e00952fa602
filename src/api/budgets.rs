use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    api::{
        consumption::HistoryQuery,
        error::ApiError,
        response::{list, ApiResponse},
    },
    auth::ResidentId,
    domain::{BudgetLimit, BudgetValue, NewBudget},
    service::AppState,
};

/// GET /api/v1/budgets
pub async fn history(
    State(state): State<AppState>,
    ResidentId(resident_id): ResidentId,
    Query(q): Query<HistoryQuery>,
) -> Result<ApiResponse<Vec<BudgetLimit>>, ApiError> {
    Ok(list(state.service.budgets(resident_id, q.filter()?).await?))
}

/// POST /api/v1/budgets - 409 when the utility already has a limit that month
pub async fn create(
    State(state): State<AppState>,
    ResidentId(resident_id): ResidentId,
    Json(body): Json<NewBudget>,
) -> Result<ApiResponse<BudgetLimit>, ApiError> {
    let budget = state.service.create_budget(resident_id, body).await?;
    Ok(ApiResponse::created(budget))
}

/// PUT /api/v1/budgets/:id
pub async fn update(
    State(state): State<AppState>,
    ResidentId(resident_id): ResidentId,
    Path(id): Path<i64>,
    Json(body): Json<BudgetValue>,
) -> Result<ApiResponse<BudgetLimit>, ApiError> {
    Ok(ApiResponse::success(
        state.service.update_budget(resident_id, id, body).await?,
    ))
}

/// DELETE /api/v1/budgets/:id
pub async fn delete(
    State(state): State<AppState>,
    ResidentId(resident_id): ResidentId,
    Path(id): Path<i64>,
) -> Result<ApiResponse<i64>, ApiError> {
    state.service.delete_budget(resident_id, id).await?;
    Ok(ApiResponse::success(id))
}
