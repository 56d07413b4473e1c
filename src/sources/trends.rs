use crate::normalizers::strip_xssi_prefix;
use crate::sources::http;
use crate::types::*;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

/// Geography the search-interest query is restricted to
pub const SEARCH_GEO: &str = "MX";

/// Search-interest timeline client
///
/// Reads the interest-over-time widget format. Without a configured
/// endpoint every fetch is `Unavailable`, so the signal is reported as
/// unmeasured instead of scored on a made-up baseline.
pub struct SearchTrendsClient {
    client: Client,
    timeline_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TimelineResponse {
    default: TimelineBody,
}

#[derive(Debug, Deserialize)]
struct TimelineBody {
    #[serde(rename = "timelineData", default)]
    timeline_data: Vec<TimelinePoint>,
}

#[derive(Debug, Deserialize)]
struct TimelinePoint {
    time: String,
    #[serde(default)]
    value: Vec<f64>,
}

impl SearchTrendsClient {
    pub fn new(client: Client, timeline_url: Option<String>) -> Self {
        Self {
            client,
            timeline_url: timeline_url.filter(|u| !u.trim().is_empty()),
        }
    }

    /// Interest timeline, each point averaged across `keywords`
    pub async fn get_interest(&self, keywords: &[&str]) -> Result<Vec<Observation>> {
        let base = self.timeline_url.as_deref().ok_or_else(|| {
            SignalError::Unavailable("search-interest endpoint not configured".to_string())
        })?;

        let query = keywords.join(",");
        let url = Url::parse_with_params(base, &[("q", query.as_str()), ("geo", SEARCH_GEO)])
            .map_err(|e| SignalError::Fetch(format!("invalid search-interest url: {}", e)))?;

        debug!(keywords = keywords.len(), "Fetching search-interest timeline");

        let request = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, http::BROWSER_USER_AGENT);
        let body = http::get_text("search_interest", request).await?;
        parse_timeline(&body)
    }
}

fn parse_timeline(body: &str) -> Result<Vec<Observation>> {
    let payload: TimelineResponse = serde_json::from_str(strip_xssi_prefix(body))
        .map_err(|e| SignalError::Parse(format!("search_interest payload: {}", e)))?;

    let mut observations = Vec::with_capacity(payload.default.timeline_data.len());
    for point in payload.default.timeline_data {
        if point.value.is_empty() {
            continue;
        }
        let secs: i64 = point
            .time
            .parse()
            .map_err(|_| SignalError::Parse(format!("bad timeline time {:?}", point.time)))?;
        let timestamp: DateTime<Utc> = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| SignalError::Parse(format!("timeline time out of range: {}", secs)))?;
        let mean = point.value.iter().sum::<f64>() / point.value.len() as f64;
        observations.push(Observation::new(timestamp, mean));
    }

    observations.sort_by_key(|o| o.timestamp);
    Ok(observations)
}

#[async_trait::async_trait]
impl SearchInterestSource for SearchTrendsClient {
    async fn fetch_interest(&self, keywords: &[&str]) -> Result<Vec<Observation>> {
        SearchTrendsClient::get_interest(self, keywords).await
    }

    fn name(&self) -> &str {
        "search_interest"
    }
}
