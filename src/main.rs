use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};

use fantasma::{AlertNotifier, AppConfig, EarlyWarningEngine, NotifierConfig};

/// Application state shared across handlers
pub struct AppState {
    pub engine: EarlyWarningEngine,
    pub notifier: AlertNotifier,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("Starting FANTASMA early-warning service...");

    let cfg = AppConfig::load()?;

    if cfg.banxico_token.is_empty() {
        warn!("⚠ BANXICO_TOKEN not set, domestic signals will be unmeasured");
    }
    if cfg.fred_api_key.is_empty() {
        warn!("⚠ FRED_API_KEY not set, policy rate falls back to {}", cfg.fallback_policy_rate);
    }
    if cfg.search_interest_url.is_none() {
        warn!("⚠ SEARCH_INTEREST_URL not set, search interest will be unmeasured");
    }

    let engine = EarlyWarningEngine::from_config(&cfg)?;
    info!("✓ Scoring engine initialized");

    let notifier = AlertNotifier::new(
        fantasma::sources::http::build_client(cfg.request_timeout_secs)?,
        NotifierConfig {
            email_webhook_url: cfg.email_webhook_url.clone(),
            alert_email_to: cfg.alert_email_to.clone(),
            threshold: cfg.alert_threshold,
        },
    );
    info!("✓ Alert notifier initialized (threshold {})", cfg.alert_threshold);

    let state = Arc::new(AppState { engine, notifier });

    // Build router
    let app = Router::new()
        .route("/", get(handlers::health_check))
        .route("/score", get(handlers::get_score))
        .route("/signals", get(handlers::get_signals))
        .route("/alert/:score", get(handlers::get_alert))
        .route("/sources", get(handlers::get_sources))
        .route("/notify", post(handlers::notify))
        .layer(CorsLayer::new().allow_origin(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", cfg.port)).await?;
    info!("🚀 FANTASMA listening on port {}", cfg.port);

    axum::serve(listener, app).await?;

    Ok(())
}

mod handlers;
