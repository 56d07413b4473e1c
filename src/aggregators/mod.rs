// Report assembly and alert classification
use crate::types::*;
use chrono::{DateTime, Utc};

/// Closed, contiguous score ranges covering 0..=100
pub const ALERT_TIERS: [(u32, u32, AlertLevel); 5] = [
    (0, 20, AlertLevel::Low),
    (21, 40, AlertLevel::Moderate),
    (41, 60, AlertLevel::Elevated),
    (61, 80, AlertLevel::High),
    (81, 100, AlertLevel::Critical),
];

/// Map a total score to its alert tier
///
/// Scores outside 0..=100 cannot come out of a scoring run; they fall back
/// to the most severe tier.
pub fn classify(total_score: u32) -> AlertLevel {
    ALERT_TIERS
        .iter()
        .find(|(low, high, _)| (*low..=*high).contains(&total_score))
        .map(|(_, _, level)| *level)
        .unwrap_or(AlertLevel::Critical)
}

/// Subtotal for one category, keeping the input order of its signals
pub fn category_total(category: Category, signals: &[IndicatorResult]) -> CategoryTotal {
    let members: Vec<IndicatorResult> = signals
        .iter()
        .filter(|s| s.signal.category() == category)
        .cloned()
        .collect();

    CategoryTotal {
        score: members.iter().map(|s| s.score).sum(),
        max: category.ceiling(),
        signals: members,
    }
}

/// Assemble the report from results in declaration order
pub fn build_report(
    signals: Vec<IndicatorResult>,
    policy_rate: PolicyRate,
    timestamp: DateTime<Utc>,
) -> ScoreReport {
    let total_score: u32 = signals.iter().map(|s| s.score).sum();
    let alert = classify(total_score);

    let core = category_total(Category::Core, &signals);
    let global = category_total(Category::Global, &signals);

    let active_signals: Vec<IndicatorResult> =
        signals.into_iter().filter(|s| s.is_active()).collect();

    ScoreReport {
        timestamp,
        total_score,
        max_possible: MAX_POSSIBLE_SCORE,
        alert_level: alert,
        alert_emoji: alert.emoji(),
        recommended_action: alert.recommended_action(),
        policy_rate,
        breakdown: Breakdown { core, global },
        active_signals_count: active_signals.len(),
        active_signals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn policy() -> PolicyRate {
        PolicyRate {
            value: 5.25,
            fallback_used: false,
        }
    }

    #[test]
    fn test_tiers_partition_score_range() {
        for score in 0..=MAX_POSSIBLE_SCORE {
            let matching = ALERT_TIERS
                .iter()
                .filter(|(low, high, _)| (*low..=*high).contains(&score))
                .count();
            assert_eq!(matching, 1, "score {} matched {} tiers", score, matching);
        }
        for pair in ALERT_TIERS.windows(2) {
            assert_eq!(pair[0].1 + 1, pair[1].0);
        }
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(classify(0), AlertLevel::Low);
        assert_eq!(classify(20), AlertLevel::Low);
        assert_eq!(classify(21), AlertLevel::Moderate);
        assert_eq!(classify(40), AlertLevel::Moderate);
        assert_eq!(classify(41), AlertLevel::Elevated);
        assert_eq!(classify(60), AlertLevel::Elevated);
        assert_eq!(classify(61), AlertLevel::High);
        assert_eq!(classify(80), AlertLevel::High);
        assert_eq!(classify(81), AlertLevel::Critical);
        assert_eq!(classify(100), AlertLevel::Critical);
    }

    #[test]
    fn test_out_of_range_falls_back_to_critical() {
        assert_eq!(classify(101), AlertLevel::Critical);
        assert_eq!(classify(u32::MAX), AlertLevel::Critical);
    }

    #[test]
    fn test_report_partitions_and_totals() {
        let signals: Vec<IndicatorResult> = SignalId::ALL
            .iter()
            .map(|id| match id {
                SignalId::Fix => IndicatorResult::measured(*id, 19.8, 20),
                SignalId::Vix => IndicatorResult::measured(*id, 30.0, 4),
                SignalId::Copper => IndicatorResult::degraded(
                    *id,
                    &SignalError::Fetch("timeout".to_string()),
                ),
                _ => IndicatorResult::measured(*id, 1.0, 0),
            })
            .collect();

        let ts = Utc.with_ymd_and_hms(2024, 10, 1, 12, 0, 0).unwrap();
        let report = build_report(signals, policy(), ts);

        assert_eq!(report.total_score, 24);
        assert_eq!(report.alert_level, AlertLevel::Moderate);
        assert_eq!(report.recommended_action, "monitor");
        assert_eq!(report.breakdown.core.score, 20);
        assert_eq!(report.breakdown.core.max, 65);
        assert_eq!(report.breakdown.global.score, 4);
        assert_eq!(report.breakdown.global.max, 35);
        assert_eq!(report.breakdown.core.signals.len(), 5);
        assert_eq!(report.breakdown.global.signals.len(), 7);
        assert_eq!(report.active_signals_count, 2);
        assert_eq!(report.signals().count(), 12);

        let order: Vec<SignalId> = report.signals().map(|s| s.signal).collect();
        assert_eq!(order, SignalId::ALL.to_vec());
    }

    #[test]
    fn test_report_json_contract() {
        let signals: Vec<IndicatorResult> = SignalId::ALL
            .iter()
            .map(|id| IndicatorResult::measured(*id, 1.0, 0))
            .collect();
        let ts = Utc.with_ymd_and_hms(2024, 10, 1, 12, 0, 0).unwrap();
        let json = serde_json::to_value(build_report(signals, policy(), ts)).unwrap();

        for key in [
            "timestamp",
            "total_score",
            "max_possible",
            "alert_level",
            "alert_emoji",
            "recommended_action",
            "breakdown",
            "active_signals_count",
            "active_signals",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(json["max_possible"], 100);
        assert_eq!(json["alert_level"], "LOW");
        assert_eq!(json["breakdown"]["core"]["max"], 65);
        assert_eq!(json["breakdown"]["global"]["signals"][0]["signal"], "G1_VIX");
    }
}
