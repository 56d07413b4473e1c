use crate::normalizers::parse_number;
use crate::sources::http;
use crate::types::*;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.stlouisfed.org/fred/series/observations";

/// Effective federal funds rate (monthly)
pub const FED_FUNDS_SERIES: &str = "FEDFUNDS";
/// CBOE volatility index close
pub const VIX_SERIES: &str = "VIXCLS";
/// 10-year Treasury constant maturity yield
pub const US10Y_SERIES: &str = "DGS10";

/// FEDFUNDS rows are dated the 1st of their month and published the month
/// after; the window must reach the 1st of two months back on any day
pub const FED_FUNDS_LOOKBACK_DAYS: i64 = 75;

pub static SERIES_TITLES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "FEDFUNDS" => "Federal Funds Effective Rate",
    "VIXCLS" => "CBOE Volatility Index: VIX",
    "DGS10" => "Market Yield on U.S. Treasury Securities at 10-Year Constant Maturity",
};

/// FRED observations API client
pub struct FredClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    observations: Vec<FredObservation>,
}

#[derive(Debug, Deserialize)]
struct FredObservation {
    date: String,
    value: String,
}

impl FredClient {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Observations for `series_id`, oldest first
    ///
    /// FRED is asked for newest-first data; the `.` missing-value marker is
    /// dropped and the result re-ordered before returning.
    pub async fn get_series(&self, series_id: &str, lookback_days: i64) -> Result<Vec<Observation>> {
        if self.api_key.trim().is_empty() {
            return Err(SignalError::Unavailable(
                "FRED_API_KEY not configured".to_string(),
            ));
        }

        let end = Utc::now().date_naive();
        let start = observation_start(end, lookback_days).format("%Y-%m-%d").to_string();
        let end = end.format("%Y-%m-%d").to_string();

        let url = Url::parse_with_params(
            &self.base_url,
            &[
                ("series_id", series_id),
                ("api_key", self.api_key.as_str()),
                ("file_type", "json"),
                ("observation_start", start.as_str()),
                ("observation_end", end.as_str()),
                ("sort_order", "desc"),
            ],
        )
        .map_err(|e| SignalError::Fetch(format!("invalid FRED url: {}", e)))?;

        debug!(
            series = series_id,
            title = SERIES_TITLES.get(series_id).copied().unwrap_or("unknown"),
            "Fetching FRED series"
        );

        let payload: ObservationsResponse = http::get_json("fred", self.client.get(url)).await?;
        parse_observations(payload)
    }
}

/// First date requested for a window of `lookback_days` ending on `end`
pub fn observation_start(end: NaiveDate, lookback_days: i64) -> NaiveDate {
    end - Duration::days(lookback_days.max(0))
}

fn parse_observations(payload: ObservationsResponse) -> Result<Vec<Observation>> {
    let mut observations = Vec::with_capacity(payload.observations.len());
    for obs in payload.observations {
        let Some(value) = parse_number(&obs.value) else {
            continue;
        };
        let timestamp = NaiveDate::parse_from_str(obs.date.trim(), "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| Utc.from_utc_datetime(&naive))
            .ok_or_else(|| SignalError::Parse(format!("bad FRED date {:?}", obs.date)))?;
        observations.push(Observation::new(timestamp, value));
    }

    observations.sort_by_key(|o| o.timestamp);
    Ok(observations)
}

#[async_trait::async_trait]
impl SeriesSource for FredClient {
    async fn fetch_series(&self, series_id: &str, lookback_days: i64) -> Result<Vec<Observation>> {
        FredClient::get_series(self, series_id, lookback_days).await
    }

    fn name(&self) -> &str {
        "fred"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str) -> FredClient {
        FredClient::new(http::build_client(5).unwrap(), base_url, "key")
    }

    #[tokio::test]
    async fn test_reorders_and_skips_missing_markers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("series_id", "DGS10"))
            .and(query_param("sort_order", "desc"))
            .and(query_param("api_key", "key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "observations": [
                    {"date": "2024-10-04", "value": "3.98"},
                    {"date": "2024-10-03", "value": "."},
                    {"date": "2024-10-02", "value": "3.79"}
                ]
            })))
            .mount(&server)
            .await;

        let series = client(&server.uri())
            .fetch_series(US10Y_SERIES, 10)
            .await
            .unwrap();

        let values: Vec<f64> = series.iter().map(|o| o.value).collect();
        assert_eq!(values, vec![3.79, 3.98]);
    }

    #[test]
    fn test_fed_funds_window_reaches_last_published_month() {
        for (end, oldest_needed) in [
            ((2026, 10, 31), (2026, 9, 1)),
            ((2026, 3, 31), (2026, 2, 1)),
            ((2026, 10, 20), (2026, 9, 1)),
            // previous month not yet published
            ((2026, 10, 2), (2026, 8, 1)),
            ((2026, 3, 1), (2026, 1, 1)),
        ] {
            let end = NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap();
            let needed = NaiveDate::from_ymd_opt(oldest_needed.0, oldest_needed.1, oldest_needed.2)
                .unwrap();
            let start = observation_start(end, FED_FUNDS_LOOKBACK_DAYS);
            assert!(start <= needed, "window from {} starts {}", end, start);
        }
    }

    #[tokio::test]
    async fn test_missing_observations_field_is_parse_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error_code": 400})))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .fetch_series(VIX_SERIES, 5)
            .await
            .unwrap_err();
        assert!(matches!(err, SignalError::Parse(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn test_bad_request_is_fetch_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Bad Request. The value for variable api_key is not registered."))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .fetch_series(FED_FUNDS_SERIES, 45)
            .await
            .unwrap_err();
        match err {
            SignalError::Fetch(msg) => assert!(msg.contains("400")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
