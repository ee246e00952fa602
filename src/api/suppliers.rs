use axum::{extract::State, Json};
use serde::Deserialize;

use crate::{
    api::{
        error::ApiError,
        response::{list, ApiResponse},
    },
    auth::ResidentId,
    domain::ResidentContract,
    service::{AppState, SupplierListing},
};

#[derive(Debug, Deserialize)]
pub struct SwitchContractRequest {
    pub service_id: i64,
}

/// GET /api/v1/suppliers - active suppliers, current prices, own contracts
pub async fn list_suppliers(
    State(state): State<AppState>,
    ResidentId(resident_id): ResidentId,
) -> Result<ApiResponse<Vec<SupplierListing>>, ApiError> {
    Ok(list(state.service.supplier_listing(resident_id).await?))
}

/// POST /api/v1/contracts - replaces the active contract for the
/// service's utility
pub async fn switch_contract(
    State(state): State<AppState>,
    ResidentId(resident_id): ResidentId,
    Json(body): Json<SwitchContractRequest>,
) -> Result<ApiResponse<ResidentContract>, ApiError> {
    let contract = state
        .service
        .switch_contract(resident_id, body.service_id)
        .await?;
    Ok(ApiResponse::created(contract))
}
