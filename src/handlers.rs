use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::AppState;
use fantasma::sources::{banxico, cftc, fred, yahoo};
use fantasma::{classify, AlertLevel, IndicatorResult, NotifyOutcome, ScoreReport, MAX_POSSIBLE_SCORE};

/// GET / - Service health check
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "fantasma",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
    })
}

/// GET /score - Full scoring run
pub async fn get_score(State(state): State<Arc<AppState>>) -> Json<ScoreReport> {
    Json(state.engine.run_scoring().await)
}

/// GET /signals - Raw indicator results without the breakdown
pub async fn get_signals(State(state): State<Arc<AppState>>) -> Json<SignalsResponse> {
    let policy_rate = state.engine.fetch_prerequisite_rate().await;
    let signals = state.engine.collect_signals(policy_rate).await;

    Json(SignalsResponse {
        timestamp: Utc::now(),
        raw_score: signals.iter().map(|s| s.score).sum(),
        signals,
    })
}

/// GET /alert/:score - Alert tier for an arbitrary score
pub async fn get_alert(
    Path(score): Path<i64>,
) -> Result<Json<AlertResponse>, (StatusCode, String)> {
    alert_for_score(score)
        .map(Json)
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                format!("score must be between 0 and {}", MAX_POSSIBLE_SCORE),
            )
        })
}

fn alert_for_score(score: i64) -> Option<AlertResponse> {
    let score = u32::try_from(score)
        .ok()
        .filter(|s| *s <= MAX_POSSIBLE_SCORE)?;
    let level = classify(score);
    Some(AlertResponse {
        score,
        level,
        emoji: level.emoji(),
        action: level.recommended_action(),
    })
}

/// GET /sources - Upstream series catalog
pub async fn get_sources() -> Json<SourcesResponse> {
    let catalog = |map: &phf::Map<&'static str, &'static str>| {
        map.entries()
            .map(|(id, title)| (*id, *title))
            .collect::<BTreeMap<_, _>>()
    };

    Json(SourcesResponse {
        banxico: catalog(&banxico::SERIES_TITLES),
        fred: catalog(&fred::SERIES_TITLES),
        yahoo: catalog(&yahoo::SYMBOL_TITLES),
        cftc: cftc::MEXICAN_PESO_MARKET,
    })
}

/// POST /notify - Score and dispatch an alert when over threshold
pub async fn notify(State(state): State<Arc<AppState>>) -> Json<NotifyOutcome> {
    let report = state.engine.run_scoring().await;
    let outcome = state.notifier.check_and_notify(&report).await;
    info!(
        sent = outcome.sent,
        score = outcome.score,
        threshold = state.notifier.threshold(),
        "Notify check finished"
    );
    Json(outcome)
}

// Response types
#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, serde::Serialize)]
pub struct SignalsResponse {
    pub timestamp: DateTime<Utc>,
    pub raw_score: u32,
    pub signals: Vec<IndicatorResult>,
}

#[derive(Debug, serde::Serialize)]
pub struct AlertResponse {
    pub score: u32,
    pub level: AlertLevel,
    pub emoji: &'static str,
    pub action: &'static str,
}

#[derive(Debug, serde::Serialize)]
pub struct SourcesResponse {
    pub banxico: BTreeMap<&'static str, &'static str>,
    pub fred: BTreeMap<&'static str, &'static str>,
    pub yahoo: BTreeMap<&'static str, &'static str>,
    pub cftc: &'static str,
}
