//! Accumulation zone detection.
//!
//! Looks for compressed sideways ranges where volume holds up, down candles
//! show no climactic selling and lower wicks keep absorbing supply. Windows
//! are searched greedily from the left: every start index tries all
//! durations in the band, the longest accepted window wins, and the scan
//! resumes after it.
//!
//! Two passes run: one from the first candle, so older zones still reach the
//! regime history, and one anchored at the start of the lookback window.
//! Zones from both passes are merged where they overlap.

use super::traits::{DetectionContext, StructureDetector, WindowBudget};
use crate::application::market_data::CandleSeries;
use crate::application::market_data::indicators::{Envelope, mean, percentile, round_to};
use crate::config::AccumulationConfig;
use crate::domain::errors::{ConfigError, DetectionError};
use crate::domain::market::{Bar, Confidence};
use crate::domain::structure::{
    RejectionReason, RejectionTally, Zone, ZoneKind, merge_overlapping,
};
use std::collections::BTreeMap;
use tracing::debug;

pub const DEFAULT_WINDOW_BUDGET: usize = 250_000;

const CLIMAX_PERCENTILE: f64 = 90.0;
const MIN_ABSORPTION_CANDLES: usize = 2;
/// Bars beyond the minimum duration before the duration point is awarded.
pub(super) const TARGET_DURATION_MARGIN: usize = 2;

/// Scored window that passed every gate.
struct Candidate {
    start: usize,
    duration: usize,
    envelope: Envelope,
    compression: f64,
    volume_ratio: f64,
    wick_count: usize,
    close_bias_ratio: f64,
    score: f64,
    characteristics: Vec<String>,
}

pub struct AccumulationDetector {
    config: AccumulationConfig,
    window_budget: usize,
}

impl AccumulationDetector {
    pub fn new(config: AccumulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            window_budget: DEFAULT_WINDOW_BUDGET,
        })
    }

    pub fn with_window_budget(mut self, budget: usize) -> Self {
        self.window_budget = budget;
        self
    }

    pub fn config(&self) -> &AccumulationConfig {
        &self.config
    }

    fn evaluate_window(
        &self,
        bars: &[Bar],
        start: usize,
        duration: usize,
        min_duration: usize,
        tolerance: f64,
        baseline_volume: f64,
    ) -> Result<Candidate, RejectionReason> {
        let cfg = &self.config;
        let window = &bars[start..start + duration];
        let prior = &bars[start.saturating_sub(duration)..start];

        let envelope = Envelope::of(window).ok_or(RejectionReason::CompressionTooWide)?;
        let compression = envelope.compression();
        if compression > tolerance {
            return Err(RejectionReason::CompressionTooWide);
        }

        let window_volumes: Vec<f64> = window.iter().map(|b| b.volume).collect();
        let prior_volumes: Vec<f64> = prior.iter().map(|b| b.volume).collect();
        // Windows at the start of the series compare against the lookback
        let prior_mean = if prior_volumes.is_empty() {
            baseline_volume
        } else {
            mean(&prior_volumes)
        };
        let volume_ratio = if prior_mean <= 0.0 {
            1.0
        } else {
            mean(&window_volumes) / prior_mean
        };
        if volume_ratio < cfg.volume_stability_ratio {
            return Err(RejectionReason::VolumeCollapse);
        }

        let mut all_volumes = prior_volumes;
        all_volumes.extend_from_slice(&window_volumes);
        if let Some(p90) = percentile(&all_volumes, CLIMAX_PERCENTILE) {
            let climax = cfg.climax_multiplier * p90;
            if window.iter().any(|b| b.is_bearish() && b.volume > climax) {
                return Err(RejectionReason::DownVolumeClimax);
            }
        }

        let mut score = 0.0;
        let mut characteristics = vec![format!(
            "Range compressed {:.1}% over {} bars",
            compression * 100.0,
            duration
        )];

        if compression <= cfg.ideal_compression {
            score += 2.0;
            characteristics.push("Tight compression inside band".to_string());
        }

        if duration >= min_duration + TARGET_DURATION_MARGIN {
            score += 1.0;
        }

        if volume_ratio >= cfg.stable_volume_ratio {
            score += 2.0;
            characteristics.push("Volume stable (not collapsing)".to_string());
        }

        let wick_count = window
            .iter()
            .filter(|b| b.lower_wick() / b.range() >= cfg.absorption_ratio)
            .count();
        if wick_count >= MIN_ABSORPTION_CANDLES {
            score += 1.0;
            characteristics.push("Repeated lower-wick absorption".to_string());
        }

        let upper_closes = window
            .iter()
            .filter(|b| b.close_position() >= cfg.close_bias)
            .count();
        let close_bias_ratio = upper_closes as f64 / duration as f64;
        if upper_closes * 2 > duration {
            score += 1.0;
            characteristics.push("Closes holding the upper part of their range".to_string());
        }

        if score < cfg.min_score {
            return Err(RejectionReason::LowScore);
        }

        Ok(Candidate {
            start,
            duration,
            envelope,
            compression,
            volume_ratio,
            wick_count,
            close_bias_ratio,
            score,
            characteristics,
        })
    }

    /// One greedy left-to-right pass starting at `from`.
    fn scan_from(
        &self,
        bars: &[Bar],
        from: usize,
        min_duration: usize,
        tolerance: f64,
        baseline_volume: f64,
        budget: &mut WindowBudget,
    ) -> Result<Vec<Zone>, DetectionError> {
        let n = bars.len();
        let mut zones = Vec::new();
        let mut idx = from;

        while idx + min_duration <= n {
            let mut best: Option<Candidate> = None;
            let mut rejections = RejectionTally::new();

            for duration in min_duration..=self.config.max_duration {
                if idx + duration > n {
                    break;
                }
                budget.charge()?;
                match self.evaluate_window(
                    bars,
                    idx,
                    duration,
                    min_duration,
                    tolerance,
                    baseline_volume,
                ) {
                    Ok(candidate) => best = Some(candidate),
                    Err(reason) => {
                        debug!(
                            "Accumulation window rejected (start={}, duration={}): {}",
                            idx, duration, reason
                        );
                        *rejections.entry(reason).or_insert(0) += 1;
                    }
                }
            }

            match best {
                Some(candidate) => {
                    idx += candidate.duration;
                    zones.push(Self::build_zone(bars, candidate, rejections));
                }
                None => idx += 1,
            }
        }
        Ok(zones)
    }

    fn build_zone(bars: &[Bar], candidate: Candidate, rejections: RejectionTally) -> Zone {
        let confidence = Confidence::from_zone_score(candidate.score);
        let constructive = confidence != Confidence::Low;

        let mut metrics = BTreeMap::new();
        metrics.insert(
            "compression_pct".to_string(),
            round_to(candidate.compression * 100.0, 2),
        );
        metrics.insert("volume_ratio".to_string(), round_to(candidate.volume_ratio, 3));
        metrics.insert("wick_count".to_string(), candidate.wick_count as f64);
        metrics.insert(
            "close_bias_ratio".to_string(),
            round_to(candidate.close_bias_ratio, 3),
        );

        let summary = if constructive {
            "Signs of accumulation with steady absorption"
        } else {
            "Sideways structure with constructive signs"
        };
        let interpretation = if constructive {
            "Supply is being absorbed without aggressive selling; bias leans to accumulation."
        } else {
            "Neutral consolidation; needs confirmation."
        };

        Zone {
            kind: ZoneKind::Accumulation,
            high: round_to(candidate.envelope.high, 2),
            low: round_to(candidate.envelope.low, 2),
            start_time: bars[candidate.start].time,
            end_time: bars[candidate.start + candidate.duration - 1].time,
            duration: candidate.duration,
            confidence,
            score: candidate.score,
            summary: summary.to_string(),
            characteristics: candidate.characteristics,
            interpretation: interpretation.to_string(),
            what_to_watch: vec![
                "Sustained hold above zone midpoint".to_string(),
                "Volume expansion on upside attempts".to_string(),
                "Avoid decisive close below zone low".to_string(),
            ],
            failure_signals: vec![
                "Strong close below zone with volume expansion".to_string(),
                "Upper-wick dominance returning with range expansion".to_string(),
            ],
            metrics,
            rejections: (!rejections.is_empty()).then_some(rejections),
        }
    }
}

impl StructureDetector for AccumulationDetector {
    type Output = Zone;

    fn name(&self) -> &'static str {
        "accumulation"
    }

    fn detect(
        &self,
        series: &CandleSeries,
        ctx: &DetectionContext<'_>,
    ) -> Result<Vec<Zone>, DetectionError> {
        let bars = series.bars();
        let n = bars.len();
        let profile = ctx.timeframe.profile();
        let min_duration = self.config.min_duration_for(&profile);
        let tolerance = self.config.tolerance_for(&profile);

        if n < min_duration || min_duration > self.config.max_duration {
            return Ok(Vec::new());
        }

        let mut budget = WindowBudget::new(self.name(), self.window_budget);
        let recent_start = n.saturating_sub(self.config.lookback);
        let recent_volumes: Vec<f64> = bars[recent_start..].iter().map(|b| b.volume).collect();
        let baseline_volume = mean(&recent_volumes);

        let mut zones = Vec::new();
        let mut pass_starts = vec![0];
        if recent_start > 0 {
            pass_starts.push(recent_start);
        }
        for pass_start in pass_starts {
            zones.extend(self.scan_from(
                bars,
                pass_start,
                min_duration,
                tolerance,
                baseline_volume,
                &mut budget,
            )?);
        }

        let merged = merge_overlapping(zones);
        debug!(
            "Accumulation scan: {} zone(s) after {} window evaluations",
            merged.len(),
            budget.used()
        );
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::{Candle, Timeframe};
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal::prelude::FromPrimitive;

    fn candle(day: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Candle {
        let d = |v: f64| Decimal::from_f64(v).unwrap();
        Candle::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(day),
            d(open),
            d(high),
            d(low),
            d(close),
            d(volume),
        )
    }

    /// 1% range bars with long lower wicks and closes near the top.
    fn absorbing_range(len: usize) -> Vec<Candle> {
        (0..len)
            .map(|i| candle(i as i64, 100.2, 100.5, 99.5, 100.4, 1000.0))
            .collect()
    }

    fn detect(candles: &[Candle]) -> Vec<Zone> {
        let detector = AccumulationDetector::new(AccumulationConfig::default()).unwrap();
        let series = CandleSeries::new(candles).unwrap();
        detector
            .detect(&series, &DetectionContext::new(Timeframe::Day, None))
            .unwrap()
    }

    #[test]
    fn test_compressed_absorbing_range_is_high_confidence() {
        let zones = detect(&absorbing_range(20));

        assert_eq!(zones.len(), 1);
        let zone = &zones[0];
        assert_eq!(zone.kind, ZoneKind::Accumulation);
        assert_eq!(zone.duration, 20);
        assert_eq!(zone.high, 100.5);
        assert_eq!(zone.low, 99.5);
        // tight 2 + duration 1 + volume 2 + absorption 1 + closes 1
        assert_eq!(zone.score, 7.0);
        assert_eq!(zone.confidence, Confidence::High);
        assert_eq!(zone.summary, "Signs of accumulation with steady absorption");
        assert_eq!(zone.metric("wick_count"), Some(20.0));
    }

    #[test]
    fn test_minimum_length_window_misses_duration_point() {
        let zones = detect(&absorbing_range(9));

        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].duration, 9);
        // tight 2 + volume 2 + absorption 1 + closes 1, no duration point
        assert_eq!(zones[0].score, 6.0);
    }

    #[test]
    fn test_overlapping_passes_merge_into_one_zone() {
        // The full-history pass and the lookback pass cut the range at
        // different offsets, so their zones overlap from bar 20 onwards
        let candles = absorbing_range(90);
        let zones = detect(&candles);

        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].start_time, candles[0].time);
        assert_eq!(zones[0].end_time, candles[19].time);
        assert_eq!(zones[1].start_time, candles[20].time);
        assert_eq!(zones[1].end_time, candles[89].time);
        assert_eq!(zones[1].high, 100.5);
        assert_eq!(zones[1].low, 99.5);
        assert_eq!(zones[1].score, 7.0);
    }

    #[test]
    fn test_zone_older_than_lookback_is_found() {
        let noisy = |i: i64| {
            let base = 100.0 + (i % 2) as f64 * 10.0;
            candle(i, base, base + 5.0, base - 5.0, base + 1.0, 1000.0)
        };
        let candles: Vec<Candle> = (0..200)
            .map(|i| {
                if (20..40).contains(&i) {
                    candle(i, 100.2, 100.5, 99.5, 100.4, 1000.0)
                } else {
                    noisy(i)
                }
            })
            .collect();

        let zones = detect(&candles);
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].start_time, candles[20].time);
        assert_eq!(zones[0].end_time, candles[39].time);
        assert_eq!(zones[0].duration, 20);
    }

    #[test]
    fn test_empty_and_short_series_yield_nothing() {
        assert!(detect(&[]).is_empty());
        assert!(detect(&absorbing_range(7)).is_empty());
    }

    #[test]
    fn test_wide_range_is_rejected() {
        let candles: Vec<Candle> = (0..20)
            .map(|i| {
                let base = 100.0 + (i % 2) as f64 * 10.0;
                candle(i as i64, base, base + 5.0, base - 5.0, base + 1.0, 1000.0)
            })
            .collect();
        assert!(detect(&candles).is_empty());
    }

    #[test]
    fn test_volume_collapse_against_prior_window_is_rejected() {
        // Wide, heavy prior followed by a quiet range at a tenth of the volume
        let mut candles: Vec<Candle> = (0..20)
            .map(|i| {
                let base = 100.0 + (i % 2) as f64 * 10.0;
                candle(i as i64, base, base + 5.0, base - 5.0, base + 1.0, 10_000.0)
            })
            .collect();
        candles.extend((20..28).map(|i| candle(i, 100.2, 100.5, 99.5, 100.4, 1000.0)));

        let detector = AccumulationDetector::new(AccumulationConfig {
            max_duration: 8,
            ..Default::default()
        })
        .unwrap();
        let series = CandleSeries::new(&candles).unwrap();
        let zones = detector
            .detect(&series, &DetectionContext::default())
            .unwrap();
        assert!(zones.is_empty());
    }

    #[test]
    fn test_down_volume_climax_is_rejected() {
        let mut candles = absorbing_range(8);
        candles[4] = candle(4, 100.4, 100.5, 99.5, 99.6, 50_000.0);

        let detector = AccumulationDetector::new(AccumulationConfig {
            max_duration: 8,
            ..Default::default()
        })
        .unwrap();
        let series = CandleSeries::new(&candles).unwrap();
        let zones = detector
            .detect(&series, &DetectionContext::default())
            .unwrap();
        assert!(zones.is_empty());
    }

    #[test]
    fn test_budget_guard_surfaces_as_error() {
        let detector = AccumulationDetector::new(AccumulationConfig::default())
            .unwrap()
            .with_window_budget(3);
        let series = CandleSeries::new(&absorbing_range(30)).unwrap();
        let ctx = DetectionContext::default();

        assert!(matches!(
            detector.detect(&series, &ctx),
            Err(DetectionError::IterationBudgetExceeded { budget: 3, .. })
        ));
        assert!(detector.detect_or_empty(&series, &ctx).is_empty());
    }

    #[test]
    fn test_invalid_config_fails_construction() {
        let result = AccumulationDetector::new(AccumulationConfig {
            min_duration: Some(0),
            ..Default::default()
        });
        assert!(result.is_err());
    }
}
