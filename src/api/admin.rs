use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    api::{
        error::ApiError,
        response::{list, ApiResponse},
    },
    auth::AdminBearer,
    domain::{
        NewSupplier, NewSupplierService, NewTariff, Resident, Supplier, SupplierService,
        TariffRecord,
    },
    service::{AppState, ResidentOverview, ServiceError},
};

/// GET /api/v1/admin/residents - every resident with active contracts
pub async fn residents(
    State(state): State<AppState>,
    _: AdminBearer,
) -> Result<ApiResponse<Vec<ResidentOverview>>, ApiError> {
    Ok(list(state.service.resident_overview().await?))
}

/// POST /api/v1/admin/residents/:id/toggle
pub async fn toggle_resident(
    State(state): State<AppState>,
    _: AdminBearer,
    Path(id): Path<i64>,
) -> Result<ApiResponse<Resident>, ApiError> {
    // unknown ids are a plain 404 here, not an identity failure
    let resident = state
        .service
        .toggle_resident(id)
        .await
        .map_err(|e| match e {
            ServiceError::UnknownResident(id) => {
                ApiError::NotFound(format!("resident {id}"))
            }
            other => other.into(),
        })?;
    Ok(ApiResponse::success(resident))
}

/// GET /api/v1/admin/suppliers - active and inactive
pub async fn suppliers(
    State(state): State<AppState>,
    _: AdminBearer,
) -> Result<ApiResponse<Vec<Supplier>>, ApiError> {
    Ok(list(state.service.all_suppliers().await?))
}

/// POST /api/v1/admin/suppliers
pub async fn add_supplier(
    State(state): State<AppState>,
    _: AdminBearer,
    Json(body): Json<NewSupplier>,
) -> Result<ApiResponse<Supplier>, ApiError> {
    Ok(ApiResponse::created(state.service.add_supplier(body).await?))
}

/// POST /api/v1/admin/services
pub async fn add_service(
    State(state): State<AppState>,
    _: AdminBearer,
    Json(body): Json<NewSupplierService>,
) -> Result<ApiResponse<SupplierService>, ApiError> {
    Ok(ApiResponse::created(state.service.add_service(body).await?))
}

/// GET /api/v1/admin/services/:id/tariffs
pub async fn tariff_history(
    State(state): State<AppState>,
    _: AdminBearer,
    Path(service_id): Path<i64>,
) -> Result<ApiResponse<Vec<TariffRecord>>, ApiError> {
    Ok(list(state.service.tariff_history(service_id).await?))
}

/// POST /api/v1/admin/tariffs - appends to the service's price history
pub async fn add_tariff(
    State(state): State<AppState>,
    _: AdminBearer,
    Json(body): Json<NewTariff>,
) -> Result<ApiResponse<TariffRecord>, ApiError> {
    Ok(ApiResponse::created(state.service.add_tariff(body).await?))
}
