use crate::normalizers::parse_number;
use crate::sources::http;
use crate::types::*;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://www.banxico.org.mx/SieAPIRest/service/v1/series";

/// FIX reference exchange rate, pesos per dollar
pub const FIX_SERIES: &str = "SF43718";
/// TIIE 28-day interbank rate
pub const TIIE_SERIES: &str = "SF60648";
/// International reserves, billions of dollars
pub const RESERVES_SERIES: &str = "SF110168";

/// Series this service reads from the SIE API
pub static SERIES_TITLES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "SF43718" => "Tipo de cambio FIX (MXN/USD)",
    "SF60648" => "TIIE a 28 días",
    "SF110168" => "Reservas internacionales (mmd)",
};

/// Banxico SIE REST client
pub struct BanxicoClient {
    client: Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct SieResponse {
    bmx: SieBody,
}

#[derive(Debug, Deserialize)]
struct SieBody {
    #[serde(default)]
    series: Vec<SieSeries>,
}

#[derive(Debug, Deserialize)]
struct SieSeries {
    #[serde(rename = "idSerie")]
    id: String,
    #[serde(default)]
    datos: Vec<SieDatum>,
}

#[derive(Debug, Deserialize)]
struct SieDatum {
    fecha: String,
    dato: String,
}

impl BanxicoClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    /// Observations for `series_id`, oldest first
    ///
    /// Non-numeric markers such as `N/E` are skipped.
    pub async fn get_series(&self, series_id: &str, lookback_days: i64) -> Result<Vec<Observation>> {
        if self.token.trim().is_empty() {
            return Err(SignalError::Unavailable(
                "BANXICO_TOKEN not configured".to_string(),
            ));
        }

        let end = Utc::now().date_naive();
        let start = end - Duration::days(lookback_days);
        let url = format!(
            "{}/{}/datos/{}/{}",
            self.base_url.trim_end_matches('/'),
            series_id,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d"),
        );

        debug!(
            series = series_id,
            title = SERIES_TITLES.get(series_id).copied().unwrap_or("unknown"),
            "Fetching Banxico series"
        );

        let request = self.client.get(&url).header("Bmx-Token", &self.token);
        let payload: SieResponse = http::get_json("banxico", request).await?;
        parse_series(payload, series_id)
    }
}

fn parse_series(payload: SieResponse, series_id: &str) -> Result<Vec<Observation>> {
    let series = payload
        .bmx
        .series
        .into_iter()
        .find(|s| s.id == series_id)
        .ok_or_else(|| SignalError::Parse(format!("series {} missing from payload", series_id)))?;

    let mut observations = Vec::with_capacity(series.datos.len());
    for datum in series.datos {
        let Some(value) = parse_number(&datum.dato) else {
            continue;
        };
        let date = NaiveDate::parse_from_str(datum.fecha.trim(), "%d/%m/%Y")
            .map_err(|e| SignalError::Parse(format!("bad date {:?}: {}", datum.fecha, e)))?;
        let timestamp = date
            .and_hms_opt(0, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive))
            .ok_or_else(|| SignalError::Parse(format!("bad date {:?}", datum.fecha)))?;
        observations.push(Observation::new(timestamp, value));
    }

    observations.sort_by_key(|o| o.timestamp);
    Ok(observations)
}

#[async_trait::async_trait]
impl SeriesSource for BanxicoClient {
    async fn fetch_series(&self, series_id: &str, lookback_days: i64) -> Result<Vec<Observation>> {
        BanxicoClient::get_series(self, series_id, lookback_days).await
    }

    fn name(&self) -> &str {
        "banxico"
    }
}
