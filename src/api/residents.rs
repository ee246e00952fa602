use axum::{extract::State, Json};

use crate::{
    api::{error::ApiError, response::ApiResponse},
    auth::ResidentId,
    domain::{NewResident, ProfileUpdate, Resident},
    service::AppState,
};

/// POST /api/v1/residents - register; the account starts inactive
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<NewResident>,
) -> Result<ApiResponse<Resident>, ApiError> {
    let resident = state.service.register(body).await?;
    Ok(ApiResponse::created(resident))
}

/// GET /api/v1/me
pub async fn me(
    State(state): State<AppState>,
    ResidentId(id): ResidentId,
) -> Result<ApiResponse<Resident>, ApiError> {
    Ok(ApiResponse::success(state.service.profile(id).await?))
}

/// PUT /api/v1/me
pub async fn update_me(
    State(state): State<AppState>,
    ResidentId(id): ResidentId,
    Json(body): Json<ProfileUpdate>,
) -> Result<ApiResponse<Resident>, ApiError> {
    Ok(ApiResponse::success(
        state.service.update_profile(id, body).await?,
    ))
}
