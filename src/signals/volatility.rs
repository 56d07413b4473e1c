//! G7: realized volatility of the exchange rate

use super::ladder_above;
use crate::normalizers::{chronological, round_to};
use crate::types::{IndicatorResult, Observation, SignalError, SignalId};

/// Closing prices used for the rolling window
pub const VOLATILITY_WINDOW: usize = 20;
/// Minimum prices for a sample standard deviation of returns
pub const MIN_PRICES: usize = 3;
const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const VOLATILITY_LADDER: [(f64, u32); 2] = [(25.0, 3), (15.0, 2)];

/// Log returns between consecutive prices
pub fn log_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .map(|pair| (pair[1] / pair[0]).ln())
        .collect()
}

/// Annualized realized volatility in percent
///
/// Sample standard deviation (n - 1) of log returns scaled by sqrt(252).
pub fn realized_volatility(prices: &[f64]) -> crate::Result<f64> {
    if prices.len() < MIN_PRICES {
        return Err(SignalError::InsufficientData {
            needed: MIN_PRICES,
            got: prices.len(),
        });
    }
    if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
        return Err(SignalError::Parse(
            "volatility needs strictly positive prices".to_string(),
        ));
    }

    let returns = log_returns(prices);
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);

    Ok(variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt() * 100.0)
}

pub fn volatility_points(annualized_pct: f64) -> u32 {
    ladder_above(annualized_pct, &VOLATILITY_LADDER)
}

/// G7: 20-day realized volatility of the FIX series
pub fn score_realized_volatility(series: &[Observation]) -> crate::Result<IndicatorResult> {
    let prices: Vec<f64> = chronological(series).iter().map(|o| o.value).collect();
    let recent = &prices[prices.len().saturating_sub(VOLATILITY_WINDOW)..];
    let vol = realized_volatility(recent)?;

    Ok(IndicatorResult::measured(
        SignalId::RealizedVolatility,
        round_to(vol, 2),
        volatility_points(vol),
    )
    .with("data_points", recent.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Metric;
    use chrono::{Duration, TimeZone, Utc};

    fn daily(values: &[f64]) -> Vec<Observation> {
        let start = Utc.with_ymd_and_hms(2024, 9, 2, 0, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Observation::new(start + Duration::days(i as i64), *v))
            .collect()
    }

    #[test]
    fn test_constant_prices_have_zero_volatility() {
        let vol = realized_volatility(&[18.0, 18.0, 18.0, 18.0]).unwrap();
        assert_eq!(vol, 0.0);
    }

    #[test]
    fn test_realized_volatility_matches_hand_computation() {
        // returns ln(1.01) and ln(0.99/1.01)
        let prices = [100.0, 101.0, 99.99];
        let r1 = (101.0f64 / 100.0).ln();
        let r2 = (99.99f64 / 101.0).ln();
        let mean = (r1 + r2) / 2.0;
        let sample_var = ((r1 - mean).powi(2) + (r2 - mean).powi(2)) / 1.0;
        let expected = sample_var.sqrt() * 252f64.sqrt() * 100.0;

        let vol = realized_volatility(&prices).unwrap();
        assert!((vol - expected).abs() < 1e-9);
        // roughly 22.4% annualized
        assert!(vol > 15.0 && vol < 25.0);
        assert_eq!(volatility_points(vol), 2);
    }

    #[test]
    fn test_volatility_requires_three_prices() {
        assert_eq!(
            realized_volatility(&[18.0, 18.1]).unwrap_err(),
            SignalError::InsufficientData { needed: 3, got: 2 }
        );
        assert!(score_realized_volatility(&[]).is_err());
    }

    #[test]
    fn test_volatility_rejects_non_positive_prices() {
        assert!(matches!(
            realized_volatility(&[18.0, 0.0, 18.1]),
            Err(SignalError::Parse(_))
        ));
    }

    #[test]
    fn test_volatility_uses_last_twenty_prices() {
        // A wild early segment followed by 20 flat fixings
        let mut values = vec![10.0, 30.0, 10.0, 30.0];
        values.extend(std::iter::repeat(18.0).take(20));
        let result = score_realized_volatility(&daily(&values)).unwrap();
        assert_eq!(result.value, Some(0.0));
        assert_eq!(result.score, 0);
        assert_eq!(result.derived["data_points"], Metric::Integer(20));
    }

    #[test]
    fn test_volatility_is_idempotent() {
        let series = daily(&[17.0, 17.2, 17.4, 17.6, 18.4]);
        let first = serde_json::to_string(&score_realized_volatility(&series).unwrap()).unwrap();
        let second = serde_json::to_string(&score_realized_volatility(&series).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_volatility_bands() {
        assert_eq!(volatility_points(25.0), 2);
        assert_eq!(volatility_points(15.0), 0);
        assert_eq!(volatility_points(15.1), 2);
    }
}
