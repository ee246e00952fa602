use anyhow::Result;
use household_utilities::{api, config::Config, service::AppState, telemetry};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let cfg = Config::load()?;

    if cfg.auth.is_placeholder() {
        anyhow::bail!(
            "SECURITY ERROR: HU__AUTH__ADMIN_TOKEN must be set to a secure random token. \
            Generate one with: openssl rand -base64 32"
        );
    }

    if cfg.auth.admin_token == "devtoken" {
        warn!("Using 'devtoken' admin token - this is only safe for local development!");
    }

    let app_state = AppState::new(cfg.clone()).await?;
    let app = api::router(app_state, &cfg);

    let addr = cfg.server.socket_addr()?;

    if cfg.server.host == "0.0.0.0" {
        warn!(
            "Server binding to 0.0.0.0 - service will be accessible from network! \
            Bind to 127.0.0.1 unless behind a reverse proxy."
        );
    }

    info!(%addr, backend = ?cfg.db.backend, "starting household utilities service");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    warn!("shutdown complete");
    Ok(())
}
