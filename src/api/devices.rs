use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::{
    api::{
        error::ApiError,
        response::{list, ApiResponse},
    },
    auth::ResidentId,
    domain::{Device, DeviceSpec},
    service::AppState,
};

#[derive(Debug, Serialize)]
pub struct DeletedDevice {
    pub id: i64,
    pub removed_records: u64,
}

/// GET /api/v1/devices
pub async fn list_devices(
    State(state): State<AppState>,
    ResidentId(resident_id): ResidentId,
) -> Result<ApiResponse<Vec<Device>>, ApiError> {
    Ok(list(state.service.devices(resident_id).await?))
}

/// POST /api/v1/devices
pub async fn add_device(
    State(state): State<AppState>,
    ResidentId(resident_id): ResidentId,
    Json(spec): Json<DeviceSpec>,
) -> Result<ApiResponse<Device>, ApiError> {
    let device = state.service.add_device(resident_id, spec).await?;
    Ok(ApiResponse::created(device))
}

/// PUT /api/v1/devices/:id
pub async fn update_device(
    State(state): State<AppState>,
    ResidentId(resident_id): ResidentId,
    Path(id): Path<i64>,
    Json(spec): Json<DeviceSpec>,
) -> Result<ApiResponse<Device>, ApiError> {
    Ok(ApiResponse::success(
        state.service.update_device(resident_id, id, spec).await?,
    ))
}

/// POST /api/v1/devices/:id/toggle
pub async fn toggle_device(
    State(state): State<AppState>,
    ResidentId(resident_id): ResidentId,
    Path(id): Path<i64>,
) -> Result<ApiResponse<Device>, ApiError> {
    Ok(ApiResponse::success(
        state.service.toggle_device(resident_id, id).await?,
    ))
}

/// DELETE /api/v1/devices/:id - also removes the device's records
pub async fn delete_device(
    State(state): State<AppState>,
    ResidentId(resident_id): ResidentId,
    Path(id): Path<i64>,
) -> Result<ApiResponse<DeletedDevice>, ApiError> {
    let removed_records = state.service.delete_device(resident_id, id).await?;
    Ok(ApiResponse::success(DeletedDevice {
        id,
        removed_records,
    }))
}
