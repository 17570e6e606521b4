use crate::application::market_data::indicators::round_to;
use crate::domain::market::{MarketBias, Timeframe};
use crate::domain::scoring::{FundamentalQuarter, FundamentalStability, StabilityMetrics};
use crate::domain::structure::RegimeEvent;
use std::collections::BTreeMap;

/// Bars at which the duration component saturates.
const DURATION_CAP_BARS: f64 = 50.0;
/// Changes per bar at which the volatility component reaches zero.
const VOLATILITY_CAP: f64 = 0.1;

const DURATION_WEIGHT: f64 = 0.50;
const VOLATILITY_WEIGHT: f64 = 0.30;
const PERSISTENCE_WEIGHT: f64 = 0.20;

pub struct RegimeStabilityScorer;

impl RegimeStabilityScorer {
    /// Scores how settled the current regime is from its stitched history.
    pub fn stability_metrics(
        history: &[RegimeEvent],
        current: MarketBias,
        timeframe: Timeframe,
    ) -> StabilityMetrics {
        let Some(latest) = history.last() else {
            return StabilityMetrics::default();
        };

        let current_duration = if latest.bias == current {
            latest.duration
        } else {
            0
        };
        let volatility = Self::volatility(history);
        let persistence = Self::persistence(history);

        let mut regime_distribution = BTreeMap::new();
        for event in history {
            *regime_distribution.entry(event.bias).or_insert(0) += 1;
        }

        StabilityMetrics {
            current_duration,
            duration_formatted: timeframe.format_duration(current_duration),
            regime_volatility: round_to(volatility, 3),
            persistence_rate: round_to(persistence, 3),
            stability_score: round_to(
                Self::score(current_duration, volatility, persistence),
                1,
            ),
            total_regimes: history.len(),
            regime_distribution,
        }
    }

    /// Regime changes per bar covered.
    fn volatility(history: &[RegimeEvent]) -> f64 {
        let total: usize = history.iter().map(|e| e.duration).sum();
        if history.len() <= 1 || total == 0 {
            return 0.0;
        }
        (history.len() - 1) as f64 / total as f64
    }

    /// Share of events that were not failed breakouts.
    fn persistence(history: &[RegimeEvent]) -> f64 {
        if history.is_empty() {
            return 0.0;
        }
        let persisted = history
            .iter()
            .filter(|e| e.bias != MarketBias::FailedBreakout)
            .count();
        persisted as f64 / history.len() as f64
    }

    fn score(duration: usize, volatility: f64, persistence: f64) -> f64 {
        let duration_score = (duration as f64 / DURATION_CAP_BARS).min(1.0) * 100.0;
        let volatility_score = (1.0 - (volatility / VOLATILITY_CAP).min(1.0)).max(0.0) * 100.0;
        let persistence_score = persistence * 100.0;

        (duration_score * DURATION_WEIGHT
            + volatility_score * VOLATILITY_WEIGHT
            + persistence_score * PERSISTENCE_WEIGHT)
            .clamp(0.0, 100.0)
    }

    /// Run length of the latest fundamental phase, penalised by phase churn.
    pub fn fundamental_stability(quarters: &[FundamentalQuarter]) -> FundamentalStability {
        if quarters.len() < 2 {
            return FundamentalStability::default();
        }
        let Some(latest) = quarters.last() else {
            return FundamentalStability::default();
        };

        let run = quarters
            .iter()
            .rev()
            .take_while(|q| q.phase == latest.phase)
            .count();
        let changes = quarters
            .windows(2)
            .filter(|w| w[0].phase != w[1].phase)
            .count();

        let len = quarters.len() as f64;
        let score = (run as f64 / len * 100.0 - changes as f64 / len * 50.0).max(0.0);

        FundamentalStability {
            duration_quarters: run,
            phase_changes: changes,
            stability_score: round_to(score, 1),
            current_phase: Some(latest.phase.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::Confidence;
    use chrono::{Duration, TimeZone, Utc};

    fn history(layout: &[(MarketBias, usize)]) -> Vec<RegimeEvent> {
        let mut time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut previous = None;
        layout.iter()
            .map(|&(bias, duration)| {
                let mut event = RegimeEvent::open(time, bias, Confidence::Medium, previous);
                for _ in 1..duration {
                    time += Duration::days(1);
                    event.extend_to(time);
                }
                time += Duration::days(1);
                previous = Some(bias);
                event
            })
            .collect()
    }

    fn quarters(phases: &[&str]) -> Vec<FundamentalQuarter> {
        phases
            .iter()
            .map(|p| FundamentalQuarter {
                period: None,
                phase: p.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_empty_history_defaults() {
        let metrics = RegimeStabilityScorer::stability_metrics(&[], MarketBias::Neutral, Timeframe::Day);
        assert_eq!(metrics, StabilityMetrics::default());
    }

    #[test]
    fn test_single_long_regime_is_fully_stable() {
        let h = history(&[(MarketBias::Accumulation, 60)]);
        let metrics =
            RegimeStabilityScorer::stability_metrics(&h, MarketBias::Accumulation, Timeframe::Day);

        assert_eq!(metrics.current_duration, 60);
        assert_eq!(metrics.duration_formatted, "~3.0 months");
        assert_eq!(metrics.regime_volatility, 0.0);
        assert_eq!(metrics.persistence_rate, 1.0);
        assert_eq!(metrics.stability_score, 100.0);
    }

    #[test]
    fn test_mixed_history() {
        let h = history(&[
            (MarketBias::Neutral, 10),
            (MarketBias::FailedBreakout, 1),
            (MarketBias::FailedBreakout, 1),
            (MarketBias::Distribution, 8),
        ]);
        let metrics =
            RegimeStabilityScorer::stability_metrics(&h, MarketBias::Distribution, Timeframe::Week);

        // 3 changes over 20 bars
        assert_eq!(metrics.regime_volatility, 0.15);
        assert_eq!(metrics.persistence_rate, 0.5);
        assert_eq!(metrics.current_duration, 8);
        assert_eq!(metrics.duration_formatted, "~2.0 months");
        // 8/50*100*0.5 + 0 + 50*0.2
        assert_eq!(metrics.stability_score, 18.0);
        assert_eq!(metrics.total_regimes, 4);
        assert_eq!(metrics.regime_distribution[&MarketBias::FailedBreakout], 2);
    }

    #[test]
    fn test_current_duration_zero_when_bias_differs() {
        let h = history(&[(MarketBias::Accumulation, 12)]);
        let metrics =
            RegimeStabilityScorer::stability_metrics(&h, MarketBias::Neutral, Timeframe::Hour);
        assert_eq!(metrics.current_duration, 0);
        assert_eq!(metrics.duration_formatted, "0 bars");
    }

    #[test]
    fn test_fundamental_stability() {
        let stable = RegimeStabilityScorer::fundamental_stability(&quarters(&[
            "Growth", "Growth", "Growth", "Growth",
        ]));
        assert_eq!(stable.duration_quarters, 4);
        assert_eq!(stable.phase_changes, 0);
        assert_eq!(stable.stability_score, 100.0);
        assert_eq!(stable.current_phase.as_deref(), Some("Growth"));

        let churn = RegimeStabilityScorer::fundamental_stability(&quarters(&[
            "Growth", "Maturity", "Growth", "Maturity",
        ]));
        assert_eq!(churn.duration_quarters, 1);
        assert_eq!(churn.phase_changes, 3);
        // 25 - 37.5 floors at zero
        assert_eq!(churn.stability_score, 0.0);

        assert_eq!(
            RegimeStabilityScorer::fundamental_stability(&quarters(&["Growth"])),
            FundamentalStability::default()
        );
    }
}
