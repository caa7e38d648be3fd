//! UTM Governance Service: binary entrypoint
//! Boots the Axum HTTP server: tracing, config, session state, metrics and routes.

use shuttle_axum::ShuttleAxum;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use utm_governance::config::AppConfig;
use utm_governance::metrics::Metrics;
use utm_governance::{router, AppState};

/// Compact logs by default, JSON when UTM_LOG_JSON=1. Filter from RUST_LOG.
/// Leaves an already installed subscriber (e.g. the runtime's) in place.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("utm_governance=info,warn"));

    let json = std::env::var("UTM_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = AppConfig::load()?;
    let metrics = Metrics::init()?;

    let state = AppState::from_config(&cfg);
    let app = router(state).merge(metrics.router());

    info!(
        default_country = %cfg.property.default_country,
        channels = cfg.channels.client.len(),
        reporting = cfg.reporting.enabled,
        "utm governance service ready"
    );

    Ok(app.into())
}
