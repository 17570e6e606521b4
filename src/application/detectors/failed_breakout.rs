//! Failed breakout detection.
//!
//! Support and resistance come from the extremes of a base window at the
//! start of the lookback. The latest close beyond either level is treated as
//! the breakout attempt, and the next few candles are checked for signs that
//! the move was rejected.

use super::traits::{DetectionContext, StructureDetector};
use crate::application::market_data::CandleSeries;
use crate::application::market_data::indicators::{average_true_range, mean, round_to};
use crate::config::FailedBreakoutConfig;
use crate::domain::errors::{ConfigError, DetectionError};
use crate::domain::market::{Bar, Confidence};
use crate::domain::structure::{BreakoutDirection, FailedBreakoutEvent, FailureSignals};
use tracing::debug;

/// Candles required beyond the base window before a scan is attempted.
const MIN_CANDLES_AFTER_BASE: usize = 5;
const WICK_TO_BODY: f64 = 1.2;
const WICK_TO_RANGE: f64 = 0.35;
const COUNTER_BODY_TO_RANGE: f64 = 0.6;
const BODY_EPSILON: f64 = 1e-6;

/// Support/resistance and averages taken from the base window.
#[derive(Debug, Clone, Copy)]
struct BaseRange {
    resistance: f64,
    support: f64,
    average_range: f64,
    average_volume: f64,
}

pub struct FailedBreakoutDetector {
    config: FailedBreakoutConfig,
}

impl FailedBreakoutDetector {
    pub fn new(config: FailedBreakoutConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    fn base_range(&self, recent: &[Bar]) -> Option<(usize, BaseRange)> {
        let base_end = self.config.base_window.max(recent.len() / 2).min(recent.len());
        let base = &recent[..base_end];
        if base.is_empty() {
            return None;
        }

        let volumes: Vec<f64> = base.iter().map(|b| b.volume).collect();
        let range = BaseRange {
            resistance: base.iter().map(|b| b.high).fold(f64::MIN, f64::max),
            support: base.iter().map(|b| b.low).fold(f64::MAX, f64::min),
            average_range: average_true_range(base),
            average_volume: mean(&volumes),
        };
        Some((base_end, range))
    }

    fn scan(
        &self,
        direction: BreakoutDirection,
        recent: &[Bar],
        base_end: usize,
        base: &BaseRange,
    ) -> Option<FailedBreakoutEvent> {
        let n = recent.len();
        if n < MIN_CANDLES_AFTER_BASE || base.average_range <= 0.0 {
            return None;
        }

        let level = match direction {
            BreakoutDirection::Up => base.resistance,
            BreakoutDirection::Down => base.support,
        };
        let min_distance = base.average_range * self.config.min_breakout_range_pct;
        let beyond = |close: f64| match direction {
            BreakoutDirection::Up => close > level && close - level >= min_distance,
            BreakoutDirection::Down => close < level && level - close >= min_distance,
        };

        let breakout_idx = (base_end..n).rev().find(|&i| beyond(recent[i].close))?;
        let breakout = &recent[breakout_idx];
        let window_end = n.min(breakout_idx + 1 + self.config.reentry_window);
        let after = &recent[breakout_idx..window_end];
        let later = &recent[breakout_idx + 1..window_end];

        let wick = match direction {
            BreakoutDirection::Up => breakout.upper_wick(),
            BreakoutDirection::Down => breakout.lower_wick(),
        };

        let signals = FailureSignals {
            reentry: after.iter().any(|b| match direction {
                BreakoutDirection::Up => b.close < level,
                BreakoutDirection::Down => b.close > level,
            }),
            volume_fail: breakout.volume <= base.average_volume,
            wick_reject: wick / (breakout.body() + BODY_EPSILON) > WICK_TO_BODY
                && wick / breakout.range() > WICK_TO_RANGE,
            // A breakout on the final candle has had no chance to follow through
            no_follow_through: !later.is_empty()
                && !later.iter().any(|b| match direction {
                    BreakoutDirection::Up => b.close > breakout.close,
                    BreakoutDirection::Down => b.close < breakout.close,
                }),
            counter_candle: later.iter().any(|b| {
                let opposite = match direction {
                    BreakoutDirection::Up => b.is_bearish(),
                    BreakoutDirection::Down => b.is_bullish(),
                };
                opposite && b.body() / b.range() > COUNTER_BODY_TO_RANGE
            }),
        };

        let count = signals.count();
        if count < self.config.min_signals {
            debug!(
                "Breakout {} at {} not failed: {} of 5 signals",
                direction, breakout.time, count
            );
            return None;
        }

        let failure_time = after.last().map(|b| b.time)?;
        let level = round_to(level, 2);

        Some(FailedBreakoutEvent {
            direction,
            breakout_level: level,
            breakout_time: breakout.time,
            failure_time,
            failure_type: signals.failure_type(),
            confidence: Confidence::from_signal_count(count),
            summary: match direction {
                BreakoutDirection::Up => "Upside breakout attempt failed with rejection.",
                BreakoutDirection::Down => "Downside breakout attempt failed with rejection.",
            }
            .to_string(),
            context: Self::context(direction, level, &signals),
            what_to_watch: vec![
                format!("Acceptance {} {:.2}", direction.opposite().preposition(), level),
                "Behavior around prior range midpoint".to_string(),
                match direction {
                    BreakoutDirection::Up => "Watch for downside volume pickup confirming trap",
                    BreakoutDirection::Down => {
                        "Watch for upside volume pickup confirming short trap"
                    }
                }
                .to_string(),
            ],
        })
    }

    fn context(direction: BreakoutDirection, level: f64, signals: &FailureSignals) -> Vec<String> {
        let mut context = vec![format!(
            "Breakout {} level {:.2}",
            direction.preposition(),
            level
        )];
        if signals.volume_fail {
            context.push("Breakout volume did not expand vs recent average".to_string());
        }
        if signals.reentry {
            context.push("Price quickly closed back inside prior range".to_string());
        }
        if signals.wick_reject {
            context.push("Long wick against breakout direction, showing rejection".to_string());
        }
        if signals.no_follow_through {
            context.push("No follow-through closes beyond breakout candle".to_string());
        }
        if signals.counter_candle {
            context.push("Strong opposite-direction candle appeared soon after".to_string());
        }
        context
    }
}

impl StructureDetector for FailedBreakoutDetector {
    type Output = FailedBreakoutEvent;

    fn name(&self) -> &'static str {
        "failed_breakout"
    }

    fn detect(
        &self,
        series: &CandleSeries,
        _ctx: &DetectionContext<'_>,
    ) -> Result<Vec<FailedBreakoutEvent>, DetectionError> {
        if series.len() < self.config.base_window + MIN_CANDLES_AFTER_BASE {
            return Ok(Vec::new());
        }

        let recent = series.tail(self.config.lookback);
        let Some((base_end, base)) = self.base_range(recent) else {
            return Ok(Vec::new());
        };

        let events: Vec<FailedBreakoutEvent> = [BreakoutDirection::Up, BreakoutDirection::Down]
            .into_iter()
            .filter_map(|direction| self.scan(direction, recent, base_end, &base))
            .collect();

        if !events.is_empty() {
            debug!(
                "Failed breakout scan: {} event(s), resistance {:.2}, support {:.2}",
                events.len(),
                base.resistance,
                base.support
            );
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::Candle;
    use crate::domain::structure::FailureType;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal::prelude::FromPrimitive;

    fn candle(i: usize, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Candle {
        let d = |v: f64| Decimal::from_f64(v).unwrap();
        Candle::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(i as i64),
            d(open),
            d(high),
            d(low),
            d(close),
            d(volume),
        )
    }

    fn base(count: usize) -> Vec<Candle> {
        (0..count)
            .map(|i| candle(i, 100.0, 101.0, 99.0, 100.0, 1000.0))
            .collect()
    }

    fn detect(candles: &[Candle]) -> Vec<FailedBreakoutEvent> {
        let detector = FailedBreakoutDetector::new(FailedBreakoutConfig::default()).unwrap();
        let series = CandleSeries::new(candles).unwrap();
        detector.detect(&series, &DetectionContext::default()).unwrap()
    }

    #[test]
    fn test_low_volume_breakout_with_reentry_is_trap() {
        let mut candles = base(40);
        candles.push(candle(40, 100.5, 102.2, 100.4, 102.0, 500.0));
        candles.push(candle(41, 102.0, 102.2, 99.8, 100.0, 1200.0));

        let events = detect(&candles);
        assert_eq!(events.len(), 1);

        let event = &events[0];
        assert_eq!(event.direction, BreakoutDirection::Up);
        assert_eq!(event.breakout_level, 101.0);
        assert_eq!(event.breakout_time, candles[40].time);
        assert_eq!(event.failure_time, candles[41].time);
        // re-entry, low volume, no follow-through, counter candle
        assert_eq!(event.confidence, Confidence::High);
        assert_eq!(event.failure_type, FailureType::TrapReversal);
        assert_eq!(event.context[0], "Breakout above level 101.00");
        assert!(
            event
                .context
                .contains(&"Breakout volume did not expand vs recent average".to_string())
        );
    }

    #[test]
    fn test_wick_rejection_below_support() {
        let mut candles = base(40);
        // Closes under support but leaves a long lower wick
        candles.push(candle(40, 98.8, 98.9, 96.0, 98.7, 800.0));
        candles.push(candle(41, 98.7, 99.6, 98.6, 99.5, 900.0));

        let events = detect(&candles);
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.direction, BreakoutDirection::Down);
        assert_eq!(event.failure_type, FailureType::ImmediateRejection);
        assert_eq!(event.summary, "Downside breakout attempt failed with rejection.");
    }

    #[test]
    fn test_clean_breakout_is_not_a_failure() {
        let mut candles = base(40);
        candles.push(candle(40, 100.5, 103.1, 100.4, 103.0, 3000.0));
        candles.push(candle(41, 103.0, 105.1, 102.9, 105.0, 3200.0));
        candles.push(candle(42, 105.0, 107.1, 104.9, 107.0, 3100.0));

        assert!(detect(&candles).is_empty());
    }

    #[test]
    fn test_short_series_returns_nothing() {
        assert!(detect(&[]).is_empty());
        assert!(detect(&base(34)).is_empty());
    }
}
