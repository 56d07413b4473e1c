//! Global overlay indicators G1–G6

use super::{ladder_above, ladder_below, latest, MONTH_WINDOW, WEEK_WINDOW};
use crate::normalizers::{chronological, lookback_value, pct_change, round_to};
use crate::types::{IndicatorResult, Observation, Quote, SignalError, SignalId};
use chrono::NaiveDate;
use std::collections::BTreeMap;

const VIX_LADDER: [(f64, u32); 2] = [(35.0, 8), (25.0, 4)];
const DXY_LADDER: [(f64, u32); 2] = [(110.0, 5), (105.0, 3)];
const US10Y_LEVEL_PCT: f64 = 5.0;
const US10Y_WEEKLY_BPS: f64 = 30.0;
const HY_WEEKLY_BPS: f64 = 50.0;
const COPPER_LADDER: [(f64, u32); 2] = [(-10.0, 5), (-5.0, 3)];
const SEARCH_SPIKE_LADDER: [(f64, u32); 2] = [(4.0, 4), (2.0, 2)];

/// Trailing points excluded from the search-interest baseline
pub const SEARCH_RECENT_POINTS: usize = 7;

/// Keywords whose combined search interest feeds G6
pub const SEARCH_KEYWORDS: [&str; 4] = [
    "crisis México",
    "devaluación peso",
    "comprar dólares",
    "dólar hoy México",
];

pub fn vix_points(value: f64) -> u32 {
    ladder_above(value, &VIX_LADDER)
}

/// G1: equity volatility index level
pub fn score_vix(series: &[Observation]) -> crate::Result<IndicatorResult> {
    let (_, current) = latest(series)?;
    Ok(IndicatorResult::measured(
        SignalId::Vix,
        round_to(current, 2),
        vix_points(current),
    ))
}

pub fn dxy_points(value: f64) -> u32 {
    ladder_above(value, &DXY_LADDER)
}

/// G2: trade-weighted dollar index
pub fn score_dxy(quote: &Quote) -> crate::Result<IndicatorResult> {
    let current = finite_price(quote)?;
    Ok(IndicatorResult::measured(
        SignalId::DollarIndex,
        round_to(current, 2),
        dxy_points(current),
    ))
}

/// G3 points: the level rule takes precedence over the weekly move
pub fn us10y_points(yield_pct: f64, weekly_change_bps: f64) -> u32 {
    if yield_pct > US10Y_LEVEL_PCT {
        5
    } else if weekly_change_bps.abs() > US10Y_WEEKLY_BPS {
        3
    } else {
        0
    }
}

/// G3: US 10-year Treasury yield
pub fn score_us10y(series: &[Observation]) -> crate::Result<IndicatorResult> {
    let (ordered, current) = latest(series)?;
    let values: Vec<f64> = ordered.iter().map(|o| o.value).collect();
    let weekly_change_bps = lookback_value(&values, WEEK_WINDOW)
        .map(|week_ago| (current - week_ago) * 100.0)
        .unwrap_or(0.0);

    Ok(IndicatorResult::measured(
        SignalId::Us10y,
        round_to(current, 2),
        us10y_points(current, weekly_change_bps),
    )
    .with("weekly_change_bps", round_to(weekly_change_bps, 0)))
}

/// G4 points; only the weekly widening rule is scored
pub fn hy_spread_points(weekly_change_bps: f64) -> u32 {
    if weekly_change_bps.abs() > HY_WEEKLY_BPS {
        3
    } else {
        0
    }
}

/// G4: high-yield vs investment-grade ETF price gap as a credit proxy
///
/// The >500 bps upper band needs real yield data, which no configured
/// source provides, so it is reported as unavailable rather than scored.
pub fn score_hy_spread(hyg: &Quote, lqd: &Quote) -> crate::Result<IndicatorResult> {
    let hyg_current = finite_price(hyg)?;
    let lqd_current = finite_price(lqd)?;
    let spread_proxy = (hyg_current - lqd_current).abs() * 10.0;

    let current_gap = hyg_current - lqd_current;
    let weekly_change_bps = lookback_value(&daily_gaps(hyg, lqd), WEEK_WINDOW)
        .map(|week_ago_gap| (current_gap - week_ago_gap) * 100.0)
        .unwrap_or(0.0);

    Ok(IndicatorResult::measured(
        SignalId::HighYieldSpread,
        round_to(spread_proxy, 0),
        hy_spread_points(weekly_change_bps),
    )
    .with("hyg_price", round_to(hyg_current, 2))
    .with("lqd_price", round_to(lqd_current, 2))
    .with("weekly_change_bps", round_to(weekly_change_bps, 0))
    .with("upper_band_rule", "unavailable"))
}

/// HYG minus LQD close on each day both ETFs closed, oldest first
fn daily_gaps(hyg: &Quote, lqd: &Quote) -> Vec<f64> {
    let lqd_by_day: BTreeMap<NaiveDate, f64> = chronological(&lqd.closes)
        .iter()
        .map(|o| (o.timestamp.date_naive(), o.value))
        .collect();

    chronological(&hyg.closes)
        .iter()
        .filter_map(|o| {
            lqd_by_day
                .get(&o.timestamp.date_naive())
                .map(|lqd_close| o.value - lqd_close)
        })
        .collect()
}

pub fn copper_points(monthly_change_pct: f64) -> u32 {
    ladder_below(monthly_change_pct, &COPPER_LADDER)
}

/// G5: copper futures as a China demand proxy
pub fn score_copper(quote: &Quote) -> crate::Result<IndicatorResult> {
    let current = finite_price(quote)?;
    let closes: Vec<f64> = chronological(&quote.closes).iter().map(|o| o.value).collect();
    let monthly_change_pct = lookback_value(&closes, MONTH_WINDOW)
        .and_then(|month_ago| pct_change(current, month_ago))
        .unwrap_or(0.0);

    Ok(IndicatorResult::measured(
        SignalId::Copper,
        round_to(current, 2),
        copper_points(monthly_change_pct),
    )
    .with("monthly_change_pct", round_to(monthly_change_pct, 2)))
}

pub fn search_spike_points(spike_ratio: f64) -> u32 {
    ladder_above(spike_ratio, &SEARCH_SPIKE_LADDER)
}

/// Latest interest over the mean of everything before the trailing window
pub fn spike_ratio(values: &[f64]) -> crate::Result<f64> {
    let needed = SEARCH_RECENT_POINTS + 1;
    if values.len() < needed {
        return Err(SignalError::InsufficientData {
            needed,
            got: values.len(),
        });
    }
    let baseline_values = &values[..values.len() - SEARCH_RECENT_POINTS];
    let baseline = baseline_values.iter().sum::<f64>() / baseline_values.len() as f64;
    let current = values[values.len() - 1];
    if baseline <= 0.0 {
        return Ok(0.0);
    }
    Ok(current / baseline)
}

/// G6: spike in crisis-related search interest
pub fn score_search_interest(timeline: &[Observation]) -> crate::Result<IndicatorResult> {
    let values: Vec<f64> = chronological(timeline).iter().map(|o| o.value).collect();
    let ratio = spike_ratio(&values)?;

    Ok(IndicatorResult::measured(
        SignalId::SearchTrends,
        round_to(ratio, 2),
        search_spike_points(ratio),
    )
    .with("keywords", SEARCH_KEYWORDS.as_slice())
    .with("data_points", values.len()))
}

fn finite_price(quote: &Quote) -> crate::Result<f64> {
    if quote.current.is_finite() {
        Ok(quote.current)
    } else {
        Err(SignalError::Parse(format!(
            "{} quote has no usable price",
            quote.symbol
        )))
    }
}
