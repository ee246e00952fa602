use axum::{
    routing::{get, post, put},
    Router,
};

use crate::service::AppState;

use super::{admin, budgets, consumption, devices, reports, residents, suppliers};

/// Routes under `/api/v1`. Resident routes identify the caller through the
/// `X-Resident-Id` header, admin routes through the bearer token.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/residents", post(residents::register))
        .route("/me", get(residents::me).put(residents::update_me))
        .route("/devices", get(devices::list_devices).post(devices::add_device))
        .route(
            "/devices/:id",
            put(devices::update_device).delete(devices::delete_device),
        )
        .route("/devices/:id/toggle", post(devices::toggle_device))
        .route(
            "/consumption",
            get(consumption::history).post(consumption::record),
        )
        .route(
            "/consumption/:id",
            put(consumption::update).delete(consumption::delete),
        )
        .route("/budgets", get(budgets::history).post(budgets::create))
        .route("/budgets/:id", put(budgets::update).delete(budgets::delete))
        .route("/dashboard", get(reports::dashboard))
        .route("/reports/trend", get(reports::trend))
        .route("/reports/:kind", get(reports::report))
        .route("/suppliers", get(suppliers::list_suppliers))
        .route("/contracts", post(suppliers::switch_contract))
        .nest("/admin", admin_router())
        .with_state(state)
}

fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/residents", get(admin::residents))
        .route("/residents/:id/toggle", post(admin::toggle_resident))
        .route(
            "/suppliers",
            get(admin::suppliers).post(admin::add_supplier),
        )
        .route("/services", post(admin::add_service))
        .route("/services/:id/tariffs", get(admin::tariff_history))
        .route("/tariffs", post(admin::add_tariff))
}
