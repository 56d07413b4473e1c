//! Indicator evaluators
//!
//! Every evaluator is a pure function from already-fetched upstream data to
//! an [`IndicatorResult`]. Failures are returned as [`SignalError`] and turned
//! into degraded results by [`settle`], so an evaluator never needs to build
//! a zero-score result itself.

pub mod domestic;
pub mod global;
pub mod volatility;

use crate::types::{IndicatorResult, Observation, SignalError, SignalId};
use tracing::warn;

/// Observations spanning one trading week, latest included
pub const WEEK_WINDOW: usize = 5;
/// Observations spanning one trading month, latest included
pub const MONTH_WINDOW: usize = 20;

/// Convert an evaluation outcome into the result reported for `signal`
///
/// `source` only labels the degradation log line.
pub fn settle(
    signal: SignalId,
    source: &str,
    outcome: crate::Result<IndicatorResult>,
) -> IndicatorResult {
    match outcome {
        Ok(result) if result.signal == signal => result,
        Ok(result) => {
            let err = SignalError::Internal(format!(
                "evaluator for {} returned a result for {}",
                signal, result.signal
            ));
            warn!(signal = %signal, source, error = %err, "Signal degraded");
            IndicatorResult::degraded(signal, &err)
        }
        Err(err) => {
            warn!(signal = %signal, source, error = %err, "Signal degraded");
            IndicatorResult::degraded(signal, &err)
        }
    }
}

/// Points for the first threshold `value` strictly exceeds
///
/// `ladder` is ordered from the highest threshold down.
pub(crate) fn ladder_above(value: f64, ladder: &[(f64, u32)]) -> u32 {
    ladder
        .iter()
        .find(|(threshold, _)| value > *threshold)
        .map(|(_, points)| *points)
        .unwrap_or(0)
}

/// Points for the first threshold `value` is strictly below
///
/// `ladder` is ordered from the lowest threshold up.
pub(crate) fn ladder_below(value: f64, ladder: &[(f64, u32)]) -> u32 {
    ladder
        .iter()
        .find(|(threshold, _)| value < *threshold)
        .map(|(_, points)| *points)
        .unwrap_or(0)
}

/// Latest observation of a series after chronological ordering
pub(crate) fn latest(series: &[Observation]) -> crate::Result<(Vec<Observation>, f64)> {
    let ordered = crate::normalizers::chronological(series);
    match ordered.last() {
        Some(last) => {
            let value = last.value;
            Ok((ordered, value))
        }
        None => Err(SignalError::InsufficientData {
            needed: 1,
            got: 0,
        }),
    }
}
