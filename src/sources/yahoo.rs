use crate::sources::http;
use crate::types::*;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

pub const DXY_SYMBOL: &str = "DX-Y.NYB";
pub const HIGH_YIELD_ETF: &str = "HYG";
pub const INVESTMENT_GRADE_ETF: &str = "LQD";
pub const COPPER_SYMBOL: &str = "HG=F";

pub static SYMBOL_TITLES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "DX-Y.NYB" => "US Dollar Index",
    "HYG" => "iShares iBoxx High Yield Corporate Bond ETF",
    "LQD" => "iShares iBoxx Investment Grade Corporate Bond ETF",
    "HG=F" => "Copper Futures",
};

/// Yahoo Finance chart API client (no API key)
pub struct YahooClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    /// Unix seconds, one per close
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    #[serde(rename = "previousClose")]
    previous_close: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteBlock>,
}

#[derive(Debug, Deserialize)]
struct QuoteBlock {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

impl YahooClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Current price plus one month of daily closes (oldest first)
    pub async fn get_quote(&self, symbol: &str) -> Result<Quote> {
        let url = Url::parse_with_params(
            &format!("{}/{}", self.base_url.trim_end_matches('/'), symbol),
            &[("interval", "1d"), ("range", "1mo")],
        )
        .map_err(|e| SignalError::Fetch(format!("invalid Yahoo url: {}", e)))?;

        debug!(
            symbol,
            title = SYMBOL_TITLES.get(symbol).copied().unwrap_or("unknown"),
            "Fetching Yahoo quote"
        );

        let request = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, http::BROWSER_USER_AGENT);
        let payload: ChartResponse = http::get_json("yahoo", request).await?;
        parse_quote(payload, symbol)
    }
}

fn parse_quote(payload: ChartResponse, symbol: &str) -> Result<Quote> {
    if let Some(err) = payload.chart.error {
        return Err(SignalError::Parse(format!(
            "Yahoo chart error for {}: {} ({})",
            symbol, err.description, err.code
        )));
    }

    let result = payload
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| SignalError::Parse(format!("no chart result for {}", symbol)))?;

    let raw_closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|block| block.close)
        .unwrap_or_default();
    if raw_closes.len() != result.timestamp.len() {
        return Err(SignalError::Parse(format!(
            "{} closes but {} timestamps for {}",
            raw_closes.len(),
            result.timestamp.len(),
            symbol
        )));
    }

    let closes: Vec<Observation> = result
        .timestamp
        .iter()
        .zip(raw_closes)
        .filter_map(|(secs, close)| {
            let close = close.filter(|c| c.is_finite())?;
            DateTime::from_timestamp(*secs, 0).map(|at| Observation::new(at, close))
        })
        .collect();

    let current = result
        .meta
        .regular_market_price
        .or_else(|| closes.last().map(|o| o.value))
        .ok_or_else(|| SignalError::Parse(format!("no price for {}", symbol)))?;

    let previous_close = result.meta.previous_close.or_else(|| {
        closes
            .len()
            .checked_sub(2)
            .and_then(|i| closes.get(i))
            .map(|o| o.value)
    });

    Ok(Quote {
        symbol: symbol.to_string(),
        current,
        previous_close,
        closes,
    })
}

#[async_trait::async_trait]
impl QuoteSource for YahooClient {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote> {
        YahooClient::get_quote(self, symbol).await
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str) -> YahooClient {
        YahooClient::new(http::build_client(5).unwrap(), base_url)
    }

    #[tokio::test]
    async fn test_parses_chart_and_drops_null_closes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/HG=F"))
            .and(query_param("range", "1mo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "chart": {
                    "result": [{
                        "meta": {"regularMarketPrice": 4.41, "previousClose": 4.38},
                        "timestamp": [1727096400, 1727182800, 1727269200, 1727355600],
                        "indicators": {"quote": [{"close": [4.30, null, 4.38, 4.41]}]}
                    }],
                    "error": null
                }
            })))
            .mount(&server)
            .await;

        let quote = client(&server.uri())
            .fetch_quote(COPPER_SYMBOL)
            .await
            .unwrap();

        assert_eq!(quote.current, 4.41);
        assert_eq!(quote.previous_close, Some(4.38));
        assert_eq!(quote.close_values(), vec![4.30, 4.38, 4.41]);
        // the null close takes its day with it
        assert_eq!(quote.closes[1].timestamp.timestamp(), 1727269200);
    }

    #[tokio::test]
    async fn test_closes_without_matching_timestamps_are_parse_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "chart": {
                    "result": [{
                        "meta": {"regularMarketPrice": 78.1},
                        "timestamp": [1727096400],
                        "indicators": {"quote": [{"close": [78.0, 78.1]}]}
                    }],
                    "error": null
                }
            })))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .fetch_quote(HIGH_YIELD_ETF)
            .await
            .unwrap_err();
        assert!(matches!(err, SignalError::Parse(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn test_falls_back_to_closes_without_meta_price() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "chart": {
                    "result": [{
                        "meta": {},
                        "timestamp": [1727096400, 1727182800],
                        "indicators": {"quote": [{"close": [104.1, 104.9]}]}
                    }],
                    "error": null
                }
            })))
            .mount(&server)
            .await;

        let quote = client(&server.uri()).fetch_quote(DXY_SYMBOL).await.unwrap();
        assert_eq!(quote.current, 104.9);
        assert_eq!(quote.previous_close, Some(104.1));
    }

    #[tokio::test]
    async fn test_chart_error_is_parse_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "chart": {
                    "result": null,
                    "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}
                }
            })))
            .mount(&server)
            .await;

        let err = client(&server.uri()).fetch_quote("XXXX").await.unwrap_err();
        assert!(matches!(err, SignalError::Parse(_)), "{:?}", err);
    }
}
