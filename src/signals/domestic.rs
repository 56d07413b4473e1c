//! Core (domestic currency) indicators C1–C5

use super::{ladder_above, ladder_below, latest, MONTH_WINDOW, WEEK_WINDOW};
use crate::normalizers::{chronological, lookback_value, pct_change, round_to};
use crate::types::{IndicatorResult, Observation, PositioningReport, SignalError, SignalId};

/// Days of strictly rising fixings that add the trend bonus
pub const FIX_TREND_DAYS: usize = 5;
const FIX_TREND_BONUS: u32 = 5;
const FIX_DAILY_LADDER: [(f64, u32); 3] = [(4.0, 20), (2.5, 15), (1.5, 10)];

const TIIE_SPREAD_THRESHOLD_BPS: f64 = 600.0;
const TIIE_WEEKLY_THRESHOLD_BPS: f64 = 25.0;
const TIIE_RULE_POINTS: u32 = 5;

/// Net-short thresholds in billions (negative = short)
const POSITIONING_LADDER: [(f64, u32); 2] = [(-8.0, 15), (-5.0, 10)];

const RESERVES_DECLINE_LADDER: [(f64, u32); 2] = [(-10.0, 10), (-5.0, 5)];
const RESERVES_FLOOR_BILLIONS: f64 = 150.0;
const RESERVES_FLOOR_POINTS: u32 = 5;

const SPREAD_WIDE_BPS: f64 = 650.0;
const SPREAD_NARROW_BPS: f64 = 400.0;

/// C1 points for a daily percentage change and trend flag
pub fn fix_points(daily_change_pct: f64, trend_up: bool) -> u32 {
    let base = ladder_above(daily_change_pct.abs(), &FIX_DAILY_LADDER);
    if trend_up {
        (base + FIX_TREND_BONUS).min(SignalId::Fix.max_score())
    } else {
        base
    }
}

/// True when the last `days` values rise strictly day over day
pub fn strictly_rising(values: &[f64], days: usize) -> bool {
    if days < 2 || values.len() < days {
        return false;
    }
    values[values.len() - days..]
        .windows(2)
        .all(|pair| pair[0] < pair[1])
}

/// C1: official FIX exchange rate
///
/// Needs at least two fixings; the series is re-ordered oldest first.
pub fn score_fix(series: &[Observation]) -> crate::Result<IndicatorResult> {
    let ordered = chronological(series);
    if ordered.len() < 2 {
        return Err(SignalError::InsufficientData {
            needed: 2,
            got: ordered.len(),
        });
    }

    let values: Vec<f64> = ordered.iter().map(|o| o.value).collect();
    let current = values[values.len() - 1];
    let previous = values[values.len() - 2];
    let daily_change = pct_change(current, previous)
        .ok_or_else(|| SignalError::Parse("previous FIX fixing is zero".to_string()))?;
    let trend_up = strictly_rising(&values, FIX_TREND_DAYS);

    Ok(
        IndicatorResult::measured(SignalId::Fix, round_to(current, 4), fix_points(daily_change, trend_up))
            .with("daily_change_pct", round_to(daily_change, 2))
            .with("trend_5d_up", trend_up),
    )
}

/// C2 points for a spread and weekly change, both in basis points
pub fn tiie_points(spread_bps: f64, weekly_change_bps: f64) -> u32 {
    let mut points = 0;
    if spread_bps > TIIE_SPREAD_THRESHOLD_BPS {
        points += TIIE_RULE_POINTS;
    }
    if weekly_change_bps.abs() > TIIE_WEEKLY_THRESHOLD_BPS {
        points += TIIE_RULE_POINTS;
    }
    points
}

/// C2: TIIE 28-day rate against the external policy rate
pub fn score_tiie(series: &[Observation], policy_rate: f64) -> crate::Result<IndicatorResult> {
    let (ordered, current) = latest(series)?;
    let values: Vec<f64> = ordered.iter().map(|o| o.value).collect();

    let spread_bps = (current - policy_rate) * 100.0;
    let weekly_change_bps = lookback_value(&values, WEEK_WINDOW)
        .map(|week_ago| (current - week_ago) * 100.0)
        .unwrap_or(0.0);

    Ok(
        IndicatorResult::measured(SignalId::TiieSpread, current, tiie_points(spread_bps, weekly_change_bps))
            .with("policy_rate", policy_rate)
            .with("spread_vs_policy_bps", round_to(spread_bps, 0))
            .with("weekly_change_bps", round_to(weekly_change_bps, 0)),
    )
}

/// C3 points for a net notional position in billions
pub fn positioning_points(net_notional_billions: f64) -> u32 {
    ladder_below(net_notional_billions, &POSITIONING_LADDER)
}

/// C3: speculative net positioning
pub fn score_positioning(report: &PositioningReport) -> crate::Result<IndicatorResult> {
    if !report.net_notional_billions.is_finite() {
        return Err(SignalError::Parse(
            "positioning notional is not a number".to_string(),
        ));
    }

    Ok(IndicatorResult::measured(
        SignalId::Positioning,
        round_to(report.net_notional_billions, 2),
        positioning_points(report.net_notional_billions),
    )
    .with("net_contracts", report.net_contracts)
    .with("long_contracts", report.long_contracts)
    .with("short_contracts", report.short_contracts)
    .with("open_interest", report.open_interest))
}

/// C4 points for a monthly change and current level, in billions
pub fn reserves_points(monthly_change_billions: f64, level_billions: f64) -> u32 {
    let mut points = ladder_below(monthly_change_billions, &RESERVES_DECLINE_LADDER);
    if level_billions < RESERVES_FLOOR_BILLIONS {
        points = (points + RESERVES_FLOOR_POINTS).min(SignalId::Reserves.max_score());
    }
    points
}

/// C4: international reserves, in billions
pub fn score_reserves(series: &[Observation]) -> crate::Result<IndicatorResult> {
    let (ordered, current) = latest(series)?;
    let values: Vec<f64> = ordered.iter().map(|o| o.value).collect();
    let monthly_change = lookback_value(&values, MONTH_WINDOW)
        .map(|month_ago| current - month_ago)
        .unwrap_or(0.0);

    Ok(IndicatorResult::measured(
        SignalId::Reserves,
        round_to(current, 2),
        reserves_points(monthly_change, current),
    )
    .with("monthly_change_billions", round_to(monthly_change, 2)))
}

/// C5 points for a domestic minus US yield spread in basis points
pub fn yield_spread_points(spread_bps: f64) -> u32 {
    if spread_bps > SPREAD_WIDE_BPS {
        10
    } else if spread_bps < SPREAD_NARROW_BPS {
        5
    } else {
        0
    }
}

/// C5: domestic vs US 10-year yield spread
///
/// `domestic_yield` is the policy-linked domestic rate standing in for a
/// bond yield; `default_domestic` is used when none was obtained.
pub fn score_yield_spread(
    us10y: &[Observation],
    domestic_yield: Option<f64>,
    default_domestic: f64,
) -> crate::Result<IndicatorResult> {
    let (_, us_yield) = latest(us10y)?;
    let (mx_yield, proxy) = match domestic_yield.filter(|y| y.is_finite()) {
        Some(y) => (y, "tiie"),
        None => (default_domestic, "default"),
    };
    let spread_bps = (mx_yield - us_yield) * 100.0;

    Ok(IndicatorResult::measured(
        SignalId::YieldSpread,
        round_to(spread_bps, 0),
        yield_spread_points(spread_bps),
    )
    .with("mx_yield", round_to(mx_yield, 2))
    .with("us_yield", round_to(us_yield, 2))
    .with("mx_yield_source", proxy))
}
