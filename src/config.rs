//! Service configuration
//!
//! Values come from an optional `fantasma.toml` next to the binary and
//! from environment variables (`BANXICO_TOKEN`, `FRED_API_KEY`, ...), with
//! environment taking precedence. A `.env` file is honored when present.

use anyhow::Context;
use serde::Deserialize;

use crate::sources::{banxico, cftc, fred, yahoo};

/// Runtime configuration injected into sources, engine and notifier
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub banxico_token: String,
    #[serde(default = "default_banxico_base_url")]
    pub banxico_base_url: String,
    #[serde(default)]
    pub fred_api_key: String,
    #[serde(default = "default_fred_base_url")]
    pub fred_base_url: String,
    #[serde(default = "default_yahoo_base_url")]
    pub yahoo_base_url: String,
    #[serde(default = "default_cftc_report_url")]
    pub cftc_report_url: String,
    /// Interest-over-time endpoint; search interest is unmeasured without it
    #[serde(default)]
    pub search_interest_url: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Policy rate used when the prerequisite fetch fails
    #[serde(default = "default_fallback_policy_rate")]
    pub fallback_policy_rate: f64,
    /// Domestic yield used for the spread when no TIIE reading is available
    #[serde(default = "default_domestic_yield")]
    pub default_domestic_yield: f64,
    /// Total score at or above which an alert is dispatched
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: u32,
    #[serde(default)]
    pub email_webhook_url: Option<String>,
    #[serde(default = "default_alert_email_to")]
    pub alert_email_to: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_banxico_base_url() -> String {
    banxico::DEFAULT_BASE_URL.to_string()
}

fn default_fred_base_url() -> String {
    fred::DEFAULT_BASE_URL.to_string()
}

fn default_yahoo_base_url() -> String {
    yahoo::DEFAULT_BASE_URL.to_string()
}

fn default_cftc_report_url() -> String {
    cftc::DEFAULT_REPORT_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_fallback_policy_rate() -> f64 {
    5.25
}

fn default_domestic_yield() -> f64 {
    11.0
}

fn default_alert_threshold() -> u32 {
    40
}

fn default_alert_email_to() -> String {
    "alerts@fantasma.local".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            banxico_token: String::new(),
            banxico_base_url: default_banxico_base_url(),
            fred_api_key: String::new(),
            fred_base_url: default_fred_base_url(),
            yahoo_base_url: default_yahoo_base_url(),
            cftc_report_url: default_cftc_report_url(),
            search_interest_url: None,
            request_timeout_secs: default_request_timeout_secs(),
            fallback_policy_rate: default_fallback_policy_rate(),
            default_domestic_yield: default_domestic_yield(),
            alert_threshold: default_alert_threshold(),
            email_webhook_url: None,
            alert_email_to: default_alert_email_to(),
            port: default_port(),
        }
    }
}

impl AppConfig {
    /// Load from `.env`, `fantasma.toml` and the process environment
    pub fn load() -> anyhow::Result<Self> {
        // A missing .env is the normal production case
        let _ = dotenvy::dotenv();

        let settings = config::Config::builder()
            .add_source(config::File::with_name("fantasma").required(false))
            .add_source(config::Environment::default().try_parsing(true))
            .build()
            .context("Failed to read configuration sources")?;

        Self::from_settings(settings)
    }

    fn from_settings(settings: config::Config) -> anyhow::Result<Self> {
        let cfg: AppConfig = settings
            .try_deserialize()
            .context("Invalid configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be greater than zero");
        }
        if !self.fallback_policy_rate.is_finite() || !self.default_domestic_yield.is_finite() {
            anyhow::bail!("fallback rates must be finite numbers");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let mut builder = config::Config::builder();
        for (key, value) in pairs {
            builder = builder.set_override(*key, *value)?;
        }
        AppConfig::from_settings(builder.build()?)
    }

    #[test]
    fn test_defaults_apply_when_unset() {
        let cfg = from_pairs(&[]).unwrap();
        assert_eq!(cfg.request_timeout_secs, 30);
        assert_eq!(cfg.fallback_policy_rate, 5.25);
        assert_eq!(cfg.default_domestic_yield, 11.0);
        assert_eq!(cfg.alert_threshold, 40);
        assert_eq!(cfg.banxico_base_url, banxico::DEFAULT_BASE_URL);
        assert!(cfg.search_interest_url.is_none());
    }

    #[test]
    fn test_overrides_are_read() {
        let cfg = from_pairs(&[
            ("banxico_token", "abc"),
            ("request_timeout_secs", "12"),
            ("search_interest_url", "http://trends.local/multiline"),
        ])
        .unwrap();
        assert_eq!(cfg.banxico_token, "abc");
        assert_eq!(cfg.request_timeout_secs, 12);
        assert_eq!(
            cfg.search_interest_url.as_deref(),
            Some("http://trends.local/multiline")
        );
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        assert!(from_pairs(&[("request_timeout_secs", "0")]).is_err());
    }
}
