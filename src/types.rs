use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Highest total score a run can produce
pub const MAX_POSSIBLE_SCORE: u32 = 100;

/// Dated numeric observation from any upstream series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Observation {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Point quote with recent dated daily closes, oldest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub current: f64,
    pub previous_close: Option<f64>,
    pub closes: Vec<Observation>,
}

impl Quote {
    pub fn close_values(&self) -> Vec<f64> {
        self.closes.iter().map(|o| o.value).collect()
    }
}

/// Speculative positioning in one futures market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositioningReport {
    pub market: String,
    pub open_interest: i64,
    pub long_contracts: i64,
    pub short_contracts: i64,
    pub net_contracts: i64,
    /// Net position notional in billions of contract currency
    pub net_notional_billions: f64,
}

/// Signal grouping used for the report breakdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Domestic currency indicators
    Core,
    /// Global risk overlay
    Global,
}

impl Category {
    /// Fixed score ceiling for the category
    pub fn ceiling(&self) -> u32 {
        match self {
            Category::Core => 65,
            Category::Global => 35,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Core => "core",
            Category::Global => "global",
        }
    }
}

/// Stable identifiers of the twelve scored indicators, in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SignalId {
    #[serde(rename = "C1_FIX")]
    Fix,
    #[serde(rename = "C2_TIIE")]
    TiieSpread,
    #[serde(rename = "C3_CFTC")]
    Positioning,
    #[serde(rename = "C4_RESERVES")]
    Reserves,
    #[serde(rename = "C5_SPREAD")]
    YieldSpread,
    #[serde(rename = "G1_VIX")]
    Vix,
    #[serde(rename = "G2_DXY")]
    DollarIndex,
    #[serde(rename = "G3_US10Y")]
    Us10y,
    #[serde(rename = "G4_HY_SPREAD")]
    HighYieldSpread,
    #[serde(rename = "G5_COPPER")]
    Copper,
    #[serde(rename = "G6_TRENDS")]
    SearchTrends,
    #[serde(rename = "G7_VOL")]
    RealizedVolatility,
}

impl SignalId {
    pub const ALL: [SignalId; 12] = [
        SignalId::Fix,
        SignalId::TiieSpread,
        SignalId::Positioning,
        SignalId::Reserves,
        SignalId::YieldSpread,
        SignalId::Vix,
        SignalId::DollarIndex,
        SignalId::Us10y,
        SignalId::HighYieldSpread,
        SignalId::Copper,
        SignalId::SearchTrends,
        SignalId::RealizedVolatility,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalId::Fix => "C1_FIX",
            SignalId::TiieSpread => "C2_TIIE",
            SignalId::Positioning => "C3_CFTC",
            SignalId::Reserves => "C4_RESERVES",
            SignalId::YieldSpread => "C5_SPREAD",
            SignalId::Vix => "G1_VIX",
            SignalId::DollarIndex => "G2_DXY",
            SignalId::Us10y => "G3_US10Y",
            SignalId::HighYieldSpread => "G4_HY_SPREAD",
            SignalId::Copper => "G5_COPPER",
            SignalId::SearchTrends => "G6_TRENDS",
            SignalId::RealizedVolatility => "G7_VOL",
        }
    }

    /// Category is encoded in the id prefix (`C` core, `G` global)
    pub fn category(&self) -> Category {
        if self.as_str().starts_with('C') {
            Category::Core
        } else {
            Category::Global
        }
    }

    pub fn max_score(&self) -> u32 {
        match self {
            SignalId::Fix => 20,
            SignalId::TiieSpread => 10,
            SignalId::Positioning => 15,
            SignalId::Reserves => 10,
            SignalId::YieldSpread => 10,
            SignalId::Vix => 8,
            SignalId::DollarIndex => 5,
            SignalId::Us10y => 5,
            SignalId::HighYieldSpread => 5,
            SignalId::Copper => 5,
            SignalId::SearchTrends => 4,
            SignalId::RealizedVolatility => 3,
        }
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a signal produced a real measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStatus {
    Measured,
    /// Fetch, parse or data-window failure
    Degraded,
    /// Source not implemented or not configured
    Unmeasured,
}

/// Secondary metric attached to a result (informational, never scored)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Metric {
    Number(f64),
    Integer(i64),
    Flag(bool),
    Text(String),
    Labels(Vec<String>),
}

impl From<f64> for Metric {
    fn from(value: f64) -> Self {
        Metric::Number(value)
    }
}

impl From<i64> for Metric {
    fn from(value: i64) -> Self {
        Metric::Integer(value)
    }
}

impl From<usize> for Metric {
    fn from(value: usize) -> Self {
        Metric::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<bool> for Metric {
    fn from(value: bool) -> Self {
        Metric::Flag(value)
    }
}

impl From<&str> for Metric {
    fn from(value: &str) -> Self {
        Metric::Text(value.to_string())
    }
}

impl From<&[&str]> for Metric {
    fn from(value: &[&str]) -> Self {
        Metric::Labels(value.iter().map(|s| s.to_string()).collect())
    }
}

/// Outcome of one indicator evaluation
///
/// Exactly one of `value` and `error` is set. A degraded result always
/// carries a zero score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorResult {
    pub signal: SignalId,
    pub status: SignalStatus,
    pub value: Option<f64>,
    pub error: Option<String>,
    pub score: u32,
    pub max_score: u32,
    pub derived: BTreeMap<&'static str, Metric>,
}

impl IndicatorResult {
    /// Successful measurement; the score is clamped to the signal's maximum
    pub fn measured(signal: SignalId, value: f64, score: u32) -> Self {
        let max_score = signal.max_score();
        Self {
            signal,
            status: SignalStatus::Measured,
            value: Some(value),
            error: None,
            score: score.min(max_score),
            max_score,
            derived: BTreeMap::new(),
        }
    }

    pub fn degraded(signal: SignalId, error: &SignalError) -> Self {
        let status = match error {
            SignalError::Unavailable(_) => SignalStatus::Unmeasured,
            _ => SignalStatus::Degraded,
        };
        Self {
            signal,
            status,
            value: None,
            error: Some(error.to_string()),
            score: 0,
            max_score: signal.max_score(),
            derived: BTreeMap::new(),
        }
    }

    /// Attach a derived metric
    pub fn with(mut self, key: &'static str, metric: impl Into<Metric>) -> Self {
        self.derived.insert(key, metric.into());
        self
    }

    pub fn is_active(&self) -> bool {
        self.score > 0
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Policy rate fed to the spread evaluator
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PolicyRate {
    pub value: f64,
    pub fallback_used: bool,
}

/// Alert tier derived from the total score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    Low,
    Moderate,
    Elevated,
    High,
    Critical,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Low => "LOW",
            AlertLevel::Moderate => "MODERATE",
            AlertLevel::Elevated => "ELEVATED",
            AlertLevel::High => "HIGH",
            AlertLevel::Critical => "CRITICAL",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            AlertLevel::Low => "🟢",
            AlertLevel::Moderate => "🟡",
            AlertLevel::Elevated => "🟠",
            AlertLevel::High => "🔴",
            AlertLevel::Critical => "⚫",
        }
    }

    pub fn recommended_action(&self) -> &'static str {
        match self {
            AlertLevel::Low => "none",
            AlertLevel::Moderate => "monitor",
            AlertLevel::Elevated => "reduce exposure",
            AlertLevel::High => "active hedging",
            AlertLevel::Critical => "full defensive mode",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subtotal for one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub score: u32,
    pub max: u32,
    pub signals: Vec<IndicatorResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdown {
    pub core: CategoryTotal,
    pub global: CategoryTotal,
}

/// Full scoring report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreReport {
    pub timestamp: DateTime<Utc>,
    pub total_score: u32,
    pub max_possible: u32,
    pub alert_level: AlertLevel,
    pub alert_emoji: &'static str,
    pub recommended_action: &'static str,
    pub policy_rate: PolicyRate,
    pub breakdown: Breakdown,
    pub active_signals_count: usize,
    pub active_signals: Vec<IndicatorResult>,
}

impl ScoreReport {
    /// All twelve results in declaration order
    pub fn signals(&self) -> impl Iterator<Item = &IndicatorResult> {
        self.breakdown
            .core
            .signals
            .iter()
            .chain(self.breakdown.global.signals.iter())
    }
}

/// Error types for signal collection
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SignalError {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("invalid response: {0}")]
    Parse(String),

    #[error("insufficient data: need {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("evaluator fault: {0}")]
    Internal(String),
}

/// Result type for signal collection
pub type Result<T> = std::result::Result<T, SignalError>;

/// Time-series provider (central bank, macro data)
#[async_trait::async_trait]
pub trait SeriesSource: Send + Sync {
    /// Observations of `series_id` over the trailing `lookback_days`
    async fn fetch_series(&self, series_id: &str, lookback_days: i64) -> Result<Vec<Observation>>;

    fn name(&self) -> &str;
}

/// Quotes provider
#[async_trait::async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote>;

    fn name(&self) -> &str;
}

/// Speculative positioning report provider
#[async_trait::async_trait]
pub trait PositioningSource: Send + Sync {
    async fn fetch_positioning(&self) -> Result<PositioningReport>;

    fn name(&self) -> &str;
}

/// Consumer search-interest provider
#[async_trait::async_trait]
pub trait SearchInterestSource: Send + Sync {
    /// Interest timeline averaged across `keywords`
    async fn fetch_interest(&self, keywords: &[&str]) -> Result<Vec<Observation>>;

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_scores_sum_to_hundred() {
        let total: u32 = SignalId::ALL.iter().map(|s| s.max_score()).sum();
        assert_eq!(total, MAX_POSSIBLE_SCORE);
        assert_eq!(
            Category::Core.ceiling() + Category::Global.ceiling(),
            MAX_POSSIBLE_SCORE
        );
    }

    #[test]
    fn test_category_max_scores_match_ceilings() {
        for category in [Category::Core, Category::Global] {
            let sum: u32 = SignalId::ALL
                .iter()
                .filter(|s| s.category() == category)
                .map(|s| s.max_score())
                .sum();
            assert_eq!(sum, category.ceiling(), "{:?}", category);
        }
    }

    #[test]
    fn test_signal_id_serializes_as_wire_name() {
        let json = serde_json::to_string(&SignalId::Reserves).unwrap();
        assert_eq!(json, "\"C4_RESERVES\"");
        assert_eq!(SignalId::RealizedVolatility.to_string(), "G7_VOL");
    }

    #[test]
    fn test_measured_clamps_score() {
        let result = IndicatorResult::measured(SignalId::Reserves, 140.0, 15);
        assert_eq!(result.score, 10);
        assert_eq!(result.status, SignalStatus::Measured);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_degraded_has_zero_score_and_error() {
        let err = SignalError::Fetch("connection refused".to_string());
        let result = IndicatorResult::degraded(SignalId::Vix, &err);
        assert_eq!(result.score, 0);
        assert_eq!(result.max_score, 8);
        assert!(result.value.is_none());
        assert_eq!(result.status, SignalStatus::Degraded);
        assert!(result.error.unwrap().contains("connection refused"));
    }

    #[test]
    fn test_unavailable_source_is_unmeasured() {
        let err = SignalError::Unavailable("not configured".to_string());
        let result = IndicatorResult::degraded(SignalId::SearchTrends, &err);
        assert_eq!(result.status, SignalStatus::Unmeasured);
        assert_eq!(result.score, 0);
    }
}
