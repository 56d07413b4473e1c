pub mod types;
pub mod sources {
    pub mod http;
    pub mod banxico;
    pub mod fred;
    pub mod yahoo;
    pub mod cftc;
    pub mod trends;
}
pub mod normalizers;
pub mod signals;
pub mod aggregators;
pub mod config;
pub mod notify;

pub use types::*;
pub use aggregators::{build_report, classify};
pub use config::AppConfig;
pub use notify::{AlertNotifier, NotifierConfig, NotifyOutcome};
pub use sources::banxico::BanxicoClient;
pub use sources::cftc::{CftcClient, CotReportParser};
pub use sources::fred::FredClient;
pub use sources::trends::SearchTrendsClient;
pub use sources::yahoo::YahooClient;

use chrono::Utc;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use signals::{domestic, global, volatility};
use sources::{banxico, fred, yahoo};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{info, warn};

/// Calendar days fetched per series; each covers the observations its
/// evaluator compares against
const FIX_LOOKBACK_DAYS: i64 = 10;
const TIIE_LOOKBACK_DAYS: i64 = 10;
const RESERVES_LOOKBACK_DAYS: i64 = 35;
const VOLATILITY_LOOKBACK_DAYS: i64 = 25;
const VIX_LOOKBACK_DAYS: i64 = 10;
const US10Y_LOOKBACK_DAYS: i64 = 10;

/// Upstream providers the engine reads from
#[derive(Clone)]
pub struct SourceSet {
    pub banxico: Arc<dyn SeriesSource>,
    pub fred: Arc<dyn SeriesSource>,
    pub quotes: Arc<dyn QuoteSource>,
    pub positioning: Arc<dyn PositioningSource>,
    pub search: Arc<dyn SearchInterestSource>,
}

/// Constants substituted when an upstream reading is missing
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub fallback_policy_rate: f64,
    pub default_domestic_yield: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            fallback_policy_rate: 5.25,
            default_domestic_yield: 11.0,
        }
    }
}

type Evaluation<'a> = BoxFuture<'a, Result<IndicatorResult>>;

/// Currency-stress early-warning engine
///
/// One scoring run fetches the policy rate, evaluates all twelve signals
/// concurrently and folds them into a [`ScoreReport`]. A run never fails:
/// upstream errors and evaluator panics only degrade the affected signal.
pub struct EarlyWarningEngine {
    sources: SourceSet,
    settings: EngineSettings,
}

impl EarlyWarningEngine {
    pub fn new(sources: SourceSet, settings: EngineSettings) -> Self {
        Self { sources, settings }
    }

    /// Engine wired to the live upstream APIs
    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let client = sources::http::build_client(cfg.request_timeout_secs)?;

        let sources = SourceSet {
            banxico: Arc::new(BanxicoClient::new(
                client.clone(),
                cfg.banxico_base_url.clone(),
                cfg.banxico_token.clone(),
            )),
            fred: Arc::new(FredClient::new(
                client.clone(),
                cfg.fred_base_url.clone(),
                cfg.fred_api_key.clone(),
            )),
            quotes: Arc::new(YahooClient::new(client.clone(), cfg.yahoo_base_url.clone())),
            positioning: Arc::new(CftcClient::new(client.clone(), cfg.cftc_report_url.clone())),
            search: Arc::new(SearchTrendsClient::new(
                client,
                cfg.search_interest_url.clone(),
            )),
        };

        Ok(Self::new(
            sources,
            EngineSettings {
                fallback_policy_rate: cfg.fallback_policy_rate,
                default_domestic_yield: cfg.default_domestic_yield,
            },
        ))
    }

    /// Name of the upstream a signal's primary reading comes from
    pub fn source_name(&self, signal: SignalId) -> &str {
        match signal {
            SignalId::Fix
            | SignalId::TiieSpread
            | SignalId::Reserves
            | SignalId::RealizedVolatility => self.sources.banxico.name(),
            SignalId::YieldSpread | SignalId::Vix | SignalId::Us10y => self.sources.fred.name(),
            SignalId::DollarIndex | SignalId::HighYieldSpread | SignalId::Copper => {
                self.sources.quotes.name()
            }
            SignalId::Positioning => self.sources.positioning.name(),
            SignalId::SearchTrends => self.sources.search.name(),
        }
    }

    /// Latest federal funds rate, or the configured fallback
    pub async fn fetch_prerequisite_rate(&self) -> PolicyRate {
        let fetched = self
            .sources
            .fred
            .fetch_series(fred::FED_FUNDS_SERIES, fred::FED_FUNDS_LOOKBACK_DAYS)
            .await
            .and_then(|series| {
                normalizers::chronological(&series)
                    .last()
                    .map(|o| o.value)
                    .ok_or(SignalError::InsufficientData { needed: 1, got: 0 })
            });

        match fetched {
            Ok(value) => PolicyRate {
                value,
                fallback_used: false,
            },
            Err(e) => {
                warn!(
                    source = self.sources.fred.name(),
                    error = %e,
                    fallback = self.settings.fallback_policy_rate,
                    "Policy rate unavailable, using fallback"
                );
                PolicyRate {
                    value: self.settings.fallback_policy_rate,
                    fallback_used: true,
                }
            }
        }
    }

    /// Evaluate every signal, returned in declaration order
    pub async fn collect_signals(&self, policy_rate: PolicyRate) -> Vec<IndicatorResult> {
        let evaluations: Vec<(SignalId, Evaluation<'_>)> = vec![
            (SignalId::Fix, self.evaluate_fix().boxed()),
            (SignalId::TiieSpread, self.evaluate_tiie(policy_rate.value).boxed()),
            (SignalId::Positioning, self.evaluate_positioning().boxed()),
            (SignalId::Reserves, self.evaluate_reserves().boxed()),
            (SignalId::YieldSpread, self.evaluate_yield_spread().boxed()),
            (SignalId::Vix, self.evaluate_vix().boxed()),
            (SignalId::DollarIndex, self.evaluate_dxy().boxed()),
            (SignalId::Us10y, self.evaluate_us10y().boxed()),
            (SignalId::HighYieldSpread, self.evaluate_hy_spread().boxed()),
            (SignalId::Copper, self.evaluate_copper().boxed()),
            (SignalId::SearchTrends, self.evaluate_search_interest().boxed()),
            (SignalId::RealizedVolatility, self.evaluate_volatility().boxed()),
        ];

        let (ids, futures): (Vec<SignalId>, Vec<Evaluation<'_>>) =
            evaluations.into_iter().unzip();
        let outcomes = join_all(
            futures
                .into_iter()
                .map(|evaluation| AssertUnwindSafe(evaluation).catch_unwind()),
        )
        .await;

        ids.into_iter()
            .zip(outcomes)
            .map(|(signal, outcome)| {
                let outcome = outcome
                    .unwrap_or_else(|panic| Err(SignalError::Internal(panic_message(&*panic))));
                signals::settle(signal, self.source_name(signal), outcome)
            })
            .collect()
    }

    /// Run one full scoring pass
    pub async fn run_scoring(&self) -> ScoreReport {
        let policy_rate = self.fetch_prerequisite_rate().await;
        let signals = self.collect_signals(policy_rate).await;
        let report = build_report(signals, policy_rate, Utc::now());

        let degraded = report.signals().filter(|s| s.is_degraded()).count();
        info!(
            total_score = report.total_score,
            level = %report.alert_level,
            active = report.active_signals_count,
            degraded,
            policy_rate_fallback = policy_rate.fallback_used,
            "Scoring run complete"
        );
        report
    }

    async fn evaluate_fix(&self) -> Result<IndicatorResult> {
        let series = self
            .sources
            .banxico
            .fetch_series(banxico::FIX_SERIES, FIX_LOOKBACK_DAYS)
            .await?;
        domestic::score_fix(&series)
    }

    async fn evaluate_tiie(&self, policy_rate: f64) -> Result<IndicatorResult> {
        let series = self
            .sources
            .banxico
            .fetch_series(banxico::TIIE_SERIES, TIIE_LOOKBACK_DAYS)
            .await?;
        domestic::score_tiie(&series, policy_rate)
    }

    async fn evaluate_positioning(&self) -> Result<IndicatorResult> {
        let report = self.sources.positioning.fetch_positioning().await?;
        domestic::score_positioning(&report)
    }

    async fn evaluate_reserves(&self) -> Result<IndicatorResult> {
        let series = self
            .sources
            .banxico
            .fetch_series(banxico::RESERVES_SERIES, RESERVES_LOOKBACK_DAYS)
            .await?;
        domestic::score_reserves(&series)
    }

    async fn evaluate_yield_spread(&self) -> Result<IndicatorResult> {
        let (us10y, tiie) = tokio::join!(
            self.sources
                .fred
                .fetch_series(fred::US10Y_SERIES, US10Y_LOOKBACK_DAYS),
            self.sources
                .banxico
                .fetch_series(banxico::TIIE_SERIES, TIIE_LOOKBACK_DAYS),
        );

        let domestic_yield = match tiie {
            Ok(series) => normalizers::chronological(&series).last().map(|o| o.value),
            Err(e) => {
                warn!(error = %e, "Domestic yield unavailable, using default");
                None
            }
        };
        domestic::score_yield_spread(&us10y?, domestic_yield, self.settings.default_domestic_yield)
    }

    async fn evaluate_vix(&self) -> Result<IndicatorResult> {
        let series = self
            .sources
            .fred
            .fetch_series(fred::VIX_SERIES, VIX_LOOKBACK_DAYS)
            .await?;
        global::score_vix(&series)
    }

    async fn evaluate_dxy(&self) -> Result<IndicatorResult> {
        let quote = self.sources.quotes.fetch_quote(yahoo::DXY_SYMBOL).await?;
        global::score_dxy(&quote)
    }

    async fn evaluate_us10y(&self) -> Result<IndicatorResult> {
        let series = self
            .sources
            .fred
            .fetch_series(fred::US10Y_SERIES, US10Y_LOOKBACK_DAYS)
            .await?;
        global::score_us10y(&series)
    }

    async fn evaluate_hy_spread(&self) -> Result<IndicatorResult> {
        let (hyg, lqd) = tokio::join!(
            self.sources.quotes.fetch_quote(yahoo::HIGH_YIELD_ETF),
            self.sources.quotes.fetch_quote(yahoo::INVESTMENT_GRADE_ETF),
        );
        global::score_hy_spread(&hyg?, &lqd?)
    }

    async fn evaluate_copper(&self) -> Result<IndicatorResult> {
        let quote = self.sources.quotes.fetch_quote(yahoo::COPPER_SYMBOL).await?;
        global::score_copper(&quote)
    }

    async fn evaluate_search_interest(&self) -> Result<IndicatorResult> {
        let timeline = self
            .sources
            .search
            .fetch_interest(&global::SEARCH_KEYWORDS)
            .await?;
        global::score_search_interest(&timeline)
    }

    async fn evaluate_volatility(&self) -> Result<IndicatorResult> {
        let series = self
            .sources
            .banxico
            .fetch_series(banxico::FIX_SERIES, VOLATILITY_LOOKBACK_DAYS)
            .await?;
        volatility::score_realized_volatility(&series)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("evaluator panicked: {}", msg)
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("evaluator panicked: {}", msg)
    } else {
        "evaluator panicked".to_string()
    }
}
