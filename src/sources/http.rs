use crate::types::{Result, SignalError};
use anyhow::Context;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::debug;

/// Browser-like agent for endpoints that reject library clients
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// HTTP client with a hard per-request timeout
pub fn build_client(timeout_secs: u64) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .context("Failed to create HTTP client")
}

/// Send one request, mapping transport faults and non-2xx statuses to `Fetch`
pub async fn send(source: &str, request: RequestBuilder) -> Result<Response> {
    let started = Instant::now();
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            SignalError::Fetch(format!("{} request timed out: {}", source, e))
        } else {
            SignalError::Fetch(format!("{} request failed: {}", source, e))
        }
    })?;

    let status = response.status();
    debug!(
        source,
        status = status.as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "Upstream response"
    );

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(200).collect();
        return Err(SignalError::Fetch(format!(
            "{} API error ({}): {}",
            source, status, snippet
        )));
    }

    Ok(response)
}

/// GET a JSON payload; undecodable bodies surface as `Parse`
pub async fn get_json<T: DeserializeOwned>(source: &str, request: RequestBuilder) -> Result<T> {
    let body = get_text(source, request).await?;
    serde_json::from_str(&body)
        .map_err(|e| SignalError::Parse(format!("{} payload: {}", source, e)))
}

/// GET a text payload
pub async fn get_text(source: &str, request: RequestBuilder) -> Result<String> {
    let response = send(source, request).await?;
    response
        .text()
        .await
        .map_err(|e| SignalError::Fetch(format!("{} body read failed: {}", source, e)))
}
