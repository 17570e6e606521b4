//! Distribution zone detection.
//!
//! Mirrors the accumulation search with three differences: the series must
//! first show a prior advance and trade above its long-term mean, repeated
//! upper-wick rejection is mandatory, and the scan runs most-recent-first
//! so that only the latest accepted zone is reported.

use super::accumulation::{DEFAULT_WINDOW_BUDGET, TARGET_DURATION_MARGIN};
use super::traits::{DetectionContext, StructureDetector, WindowBudget};
use crate::application::market_data::CandleSeries;
use crate::application::market_data::indicators::{Envelope, mean, round_to, sma};
use crate::config::DistributionConfig;
use crate::domain::errors::{ConfigError, DetectionError};
use crate::domain::market::{Bar, Confidence};
use crate::domain::structure::{RejectionReason, RejectionTally, Zone, ZoneKind};
use std::collections::BTreeMap;
use tracing::debug;

/// Closes at the end of the series checked for upside acceptance.
const ACCEPTANCE_CLOSES: usize = 3;

struct Candidate {
    envelope: Envelope,
    compression: f64,
    volume_ratio: f64,
    wick_count: usize,
    close_bias_ratio: f64,
    score: f64,
    characteristics: Vec<String>,
}

pub struct DistributionDetector {
    config: DistributionConfig,
    window_budget: usize,
}

impl DistributionDetector {
    pub fn new(config: DistributionConfig) -> Result<Self, ConfigError> {
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

    /// Prior advance over the profile window and price at or above the
    /// long-term mean. The mean check is skipped when it cannot be computed.
    fn preconditions_hold(
        &self,
        bars: &[Bar],
        window: usize,
        ctx: &DetectionContext<'_>,
    ) -> bool {
        let n = bars.len();
        let current = bars[n - 1].close;
        let reference = bars[n - window].close;

        if reference <= 0.0 {
            debug!(
                "Distribution rejected: {} (non-positive reference close)",
                RejectionReason::PreconditionFailed
            );
            return false;
        }

        let advance = (current - reference) / reference;
        if advance < self.config.prior_advance {
            debug!(
                "Distribution rejected: {} (prior advance {:.1}% < {:.0}%)",
                RejectionReason::PreconditionFailed,
                advance * 100.0,
                self.config.prior_advance * 100.0
            );
            return false;
        }

        let long_term_mean = ctx.indicators.and_then(|i| i.sma_200).or_else(|| {
            let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
            sma(&closes, self.config.long_term_ma_period)
        });

        if let Some(ma) = long_term_mean.filter(|ma| current < *ma) {
            debug!(
                "Distribution rejected: {} (price {:.2} below long-term mean {:.2})",
                RejectionReason::PreconditionFailed,
                current,
                ma
            );
            return false;
        }

        true
    }

    fn evaluate_window(
        &self,
        window: &[Bar],
        prior: &[Bar],
        min_duration: usize,
        tolerance: f64,
        final_close: f64,
    ) -> Result<Candidate, RejectionReason> {
        let cfg = &self.config;
        let duration = window.len();

        let envelope = Envelope::of(window).ok_or(RejectionReason::CompressionTooWide)?;
        let compression = envelope.compression();
        if compression > tolerance {
            return Err(RejectionReason::CompressionTooWide);
        }

        let prior_mean = mean(&prior.iter().map(|b| b.volume).collect::<Vec<_>>());
        let window_mean = mean(&window.iter().map(|b| b.volume).collect::<Vec<_>>());
        let volume_ratio = if prior_mean > 0.0 {
            window_mean / prior_mean
        } else {
            1.0
        };
        if volume_ratio < cfg.volume_ratio_threshold {
            return Err(RejectionReason::VolumeCollapse);
        }

        let mut score = 0.0;
        let mut characteristics = Vec::new();

        if compression <= cfg.ideal_compression {
            score += 2.0;
            characteristics.push(format!("Tight compression ({:.1}%)", compression * 100.0));
        } else {
            characteristics.push(format!(
                "Compression within tolerance ({:.1}%)",
                compression * 100.0
            ));
        }

        if duration >= min_duration + TARGET_DURATION_MARGIN {
            score += 1.0;
        }

        if volume_ratio >= cfg.volume_ratio_threshold {
            score += 2.0;
            characteristics.push("Active volume churn (supply presence)".to_string());
        }

        let wick_count = window
            .iter()
            .filter(|b| b.upper_wick() / b.range() >= cfg.upper_wick_ratio)
            .count();
        if wick_count < cfg.min_upper_wick_candles {
            return Err(RejectionReason::NoUpperWickRejection);
        }
        score += 1.0;
        characteristics.push("Repeated upper-wick supply rejection".to_string());

        let low_closes = window
            .iter()
            .filter(|b| b.close_position() <= cfg.close_position_bias)
            .count();
        let close_bias_ratio = low_closes as f64 / duration as f64;
        if close_bias_ratio >= 0.5 {
            score += 1.0;
            characteristics.push("Weak close positioning (supply dominance)".to_string());
        }

        if final_close > envelope.high * (1.0 + cfg.acceptance_margin) {
            return Err(RejectionReason::UpsideAcceptance);
        }

        if score < cfg.min_score {
            return Err(RejectionReason::LowScore);
        }

        Ok(Candidate {
            envelope,
            compression,
            volume_ratio,
            wick_count,
            close_bias_ratio,
            score,
            characteristics,
        })
    }

    fn build_zone(window: &[Bar], candidate: Candidate, rejections: RejectionTally) -> Option<Zone> {
        let first = window.first()?;
        let last = window.last()?;
        let confidence = Confidence::from_zone_score(candidate.score);

        let summary = match confidence {
            Confidence::High => "Repeated supply rejection during compression after an advance.",
            Confidence::Medium => "Compression present, but supply signals are mixed.",
            Confidence::Low => "Early distributional behavior; requires confirmation.",
        };

        let mut metrics = BTreeMap::new();
        metrics.insert(
            "compression_pct".to_string(),
            round_to(candidate.compression * 100.0, 2),
        );
        metrics.insert("duration".to_string(), window.len() as f64);
        metrics.insert("volume_ratio".to_string(), round_to(candidate.volume_ratio, 2));
        metrics.insert("wick_count".to_string(), candidate.wick_count as f64);
        metrics.insert(
            "close_bias_ratio".to_string(),
            round_to(candidate.close_bias_ratio, 3),
        );

        Some(Zone {
            kind: ZoneKind::Distribution,
            high: round_to(candidate.envelope.high, 2),
            low: round_to(candidate.envelope.low, 2),
            start_time: first.time,
            end_time: last.time,
            duration: window.len(),
            confidence,
            score: candidate.score,
            summary: summary.to_string(),
            characteristics: candidate.characteristics,
            interpretation: "Supply is being distributed into strength rather than absorbed. \
                Price is holding range, but upside attempts are repeatedly rejected, \
                indicating seller presence."
                .to_string(),
            what_to_watch: vec![
                "Sustained acceptance above zone high (invalidates distribution)".to_string(),
                "Continued upper-wick rejection near highs".to_string(),
                "Volume expansion on downside attempts".to_string(),
            ],
            failure_signals: vec![
                "Strong closes above zone high with volume".to_string(),
                "Absence of upper-wick rejection".to_string(),
                "Transition back to absorption behavior".to_string(),
            ],
            metrics,
            rejections: (!rejections.is_empty()).then_some(rejections),
        })
    }
}

impl StructureDetector for DistributionDetector {
    type Output = Zone;

    fn name(&self) -> &'static str {
        "distribution"
    }

    fn detect(
        &self,
        series: &CandleSeries,
        ctx: &DetectionContext<'_>,
    ) -> Result<Vec<Zone>, DetectionError> {
        let bars = series.bars();
        let n = bars.len();
        let profile = ctx.timeframe.profile();

        if n == 0 || n < profile.precondition_window {
            return Ok(Vec::new());
        }
        if !self.preconditions_hold(bars, profile.precondition_window, ctx) {
            return Ok(Vec::new());
        }

        let min_duration = self.config.min_duration_for(&profile);
        let tolerance = self.config.tolerance_for(&profile);
        let final_close = bars[n.saturating_sub(ACCEPTANCE_CLOSES)..]
            .iter()
            .map(|b| b.close)
            .fold(f64::MIN, f64::max);

        let mut budget = WindowBudget::new(self.name(), self.window_budget);
        let mut rejections = RejectionTally::new();
        let lowest_end = n.saturating_sub(self.config.lookback) + 1;

        for end in (lowest_end..=n).rev() {
            for duration in (min_duration..=self.config.max_duration).rev() {
                let Some(start) = end.checked_sub(duration) else {
                    continue;
                };
                let prior = &bars[start.saturating_sub(duration)..start];
                if prior.is_empty() {
                    continue;
                }

                budget.charge()?;
                let window = &bars[start..end];
                match self.evaluate_window(window, prior, min_duration, tolerance, final_close) {
                    Ok(candidate) => {
                        return Ok(Self::build_zone(window, candidate, rejections)
                            .into_iter()
                            .collect());
                    }
                    Err(reason) => {
                        debug!(
                            "Distribution window rejected (end={}, duration={}): {}",
                            end, duration, reason
                        );
                        *rejections.entry(reason).or_insert(0) += 1;
                    }
                }
            }
        }

        Ok(Vec::new())
    }
}
