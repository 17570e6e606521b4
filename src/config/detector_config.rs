//! Detector thresholds.
//!
//! `min_duration` and `compression_tolerance` default to `None`, meaning
//! "take it from the timeframe profile of the series being analysed".

use super::EnvReader;
use crate::domain::errors::ConfigError;
use crate::domain::market::TimeframeProfile;
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccumulationConfig {
    /// Bars at the end of the series in which zone starts are searched
    pub lookback: usize,
    pub min_duration: Option<usize>,
    pub max_duration: usize,
    pub compression_tolerance: Option<f64>,
    /// Compression at or below this earns the tight-range points
    pub ideal_compression: f64,
    /// Window/prior mean volume below this is a collapse
    pub volume_stability_ratio: f64,
    /// Window/prior mean volume at or above this counts as stable
    pub stable_volume_ratio: f64,
    /// Down candle volume above `climax_multiplier` x p90 is a climax
    pub climax_multiplier: f64,
    pub absorption_ratio: f64,
    pub close_bias: f64,
    pub min_score: f64,
}

impl Default for AccumulationConfig {
    fn default() -> Self {
        Self {
            lookback: 60,
            min_duration: None,
            max_duration: 20,
            compression_tolerance: None,
            ideal_compression: 0.04,
            volume_stability_ratio: 0.5,
            stable_volume_ratio: 0.8,
            climax_multiplier: 1.1,
            absorption_ratio: 0.35,
            close_bias: 0.45,
            min_score: 3.0,
        }
    }
}

impl AccumulationConfig {
    pub(crate) fn from_reader<F>(env: &EnvReader<F>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        Ok(Self {
            lookback: env.usize("REGIME_ACC_LOOKBACK", d.lookback)?,
            min_duration: env.opt_usize("REGIME_ACC_MIN_DURATION")?,
            max_duration: env.usize("REGIME_ACC_MAX_DURATION", d.max_duration)?,
            compression_tolerance: env.opt_f64("REGIME_ACC_COMPRESSION_TOLERANCE")?,
            ideal_compression: env.f64("REGIME_ACC_IDEAL_COMPRESSION", d.ideal_compression)?,
            volume_stability_ratio: env
                .f64("REGIME_ACC_VOLUME_STABILITY_RATIO", d.volume_stability_ratio)?,
            stable_volume_ratio: env.f64("REGIME_ACC_STABLE_VOLUME_RATIO", d.stable_volume_ratio)?,
            climax_multiplier: env.f64("REGIME_ACC_CLIMAX_MULTIPLIER", d.climax_multiplier)?,
            absorption_ratio: env.f64("REGIME_ACC_ABSORPTION_RATIO", d.absorption_ratio)?,
            close_bias: env.f64("REGIME_ACC_CLOSE_BIAS", d.close_bias)?,
            min_score: env.f64("REGIME_ACC_MIN_SCORE", d.min_score)?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive_usize("accumulation.lookback", self.lookback)?;
        validate_band(
            "accumulation.min_duration",
            "accumulation.max_duration",
            self.min_duration,
            self.max_duration,
        )?;
        if let Some(tolerance) = self.compression_tolerance {
            positive_f64("accumulation.compression_tolerance", tolerance)?;
        }
        positive_f64("accumulation.ideal_compression", self.ideal_compression)?;
        positive_f64("accumulation.volume_stability_ratio", self.volume_stability_ratio)?;
        positive_f64("accumulation.stable_volume_ratio", self.stable_volume_ratio)?;
        positive_f64("accumulation.climax_multiplier", self.climax_multiplier)?;
        unit_range("accumulation.absorption_ratio", self.absorption_ratio)?;
        unit_range("accumulation.close_bias", self.close_bias)?;
        positive_f64("accumulation.min_score", self.min_score)
    }

    pub fn min_duration_for(&self, profile: &TimeframeProfile) -> usize {
        self.min_duration.unwrap_or(profile.min_duration)
    }

    pub fn tolerance_for(&self, profile: &TimeframeProfile) -> f64 {
        self.compression_tolerance
            .unwrap_or(profile.compression_tolerance)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    /// Most recent end indices searched
    pub lookback: usize,
    pub min_duration: Option<usize>,
    pub max_duration: usize,
    pub compression_tolerance: Option<f64>,
    pub ideal_compression: f64,
    /// Window/prior mean volume at or above this counts as churn
    pub volume_ratio_threshold: f64,
    pub upper_wick_ratio: f64,
    pub min_upper_wick_candles: usize,
    /// Closes at or below this position in their bar count as weak
    pub close_position_bias: f64,
    /// Minimum fractional advance over the precondition window
    pub prior_advance: f64,
    pub long_term_ma_period: usize,
    /// Allowed overshoot of the zone high by the final closes
    pub acceptance_margin: f64,
    pub min_score: f64,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            lookback: 40,
            min_duration: None,
            max_duration: 25,
            compression_tolerance: None,
            ideal_compression: 0.04,
            volume_ratio_threshold: 0.8,
            upper_wick_ratio: 0.35,
            min_upper_wick_candles: 2,
            close_position_bias: 0.55,
            prior_advance: 0.20,
            long_term_ma_period: 200,
            acceptance_margin: 0.002,
            min_score: 3.0,
        }
    }
}

impl DistributionConfig {
    pub(crate) fn from_reader<F>(env: &EnvReader<F>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        Ok(Self {
            lookback: env.usize("REGIME_DIST_LOOKBACK", d.lookback)?,
            min_duration: env.opt_usize("REGIME_DIST_MIN_DURATION")?,
            max_duration: env.usize("REGIME_DIST_MAX_DURATION", d.max_duration)?,
            compression_tolerance: env.opt_f64("REGIME_DIST_COMPRESSION_TOLERANCE")?,
            ideal_compression: env.f64("REGIME_DIST_IDEAL_COMPRESSION", d.ideal_compression)?,
            volume_ratio_threshold: env
                .f64("REGIME_DIST_VOLUME_RATIO_THRESHOLD", d.volume_ratio_threshold)?,
            upper_wick_ratio: env.f64("REGIME_DIST_UPPER_WICK_RATIO", d.upper_wick_ratio)?,
            min_upper_wick_candles: env
                .usize("REGIME_DIST_MIN_UPPER_WICK_CANDLES", d.min_upper_wick_candles)?,
            close_position_bias: env
                .f64("REGIME_DIST_CLOSE_POSITION_BIAS", d.close_position_bias)?,
            prior_advance: env.f64("REGIME_DIST_PRIOR_ADVANCE", d.prior_advance)?,
            long_term_ma_period: env.usize("REGIME_DIST_LONG_TERM_MA_PERIOD", d.long_term_ma_period)?,
            acceptance_margin: env.f64("REGIME_DIST_ACCEPTANCE_MARGIN", d.acceptance_margin)?,
            min_score: env.f64("REGIME_DIST_MIN_SCORE", d.min_score)?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive_usize("distribution.lookback", self.lookback)?;
        validate_band(
            "distribution.min_duration",
            "distribution.max_duration",
            self.min_duration,
            self.max_duration,
        )?;
        if let Some(tolerance) = self.compression_tolerance {
            positive_f64("distribution.compression_tolerance", tolerance)?;
        }
        positive_f64("distribution.ideal_compression", self.ideal_compression)?;
        positive_f64("distribution.volume_ratio_threshold", self.volume_ratio_threshold)?;
        unit_range("distribution.upper_wick_ratio", self.upper_wick_ratio)?;
        positive_usize("distribution.min_upper_wick_candles", self.min_upper_wick_candles)?;
        unit_range("distribution.close_position_bias", self.close_position_bias)?;
        positive_f64("distribution.prior_advance", self.prior_advance)?;
        positive_usize("distribution.long_term_ma_period", self.long_term_ma_period)?;
        unit_range("distribution.acceptance_margin", self.acceptance_margin)?;
        positive_f64("distribution.min_score", self.min_score)
    }

    pub fn min_duration_for(&self, profile: &TimeframeProfile) -> usize {
        self.min_duration.unwrap_or(profile.min_duration)
    }

    pub fn tolerance_for(&self, profile: &TimeframeProfile) -> f64 {
        self.compression_tolerance
            .unwrap_or(profile.compression_tolerance)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FailedBreakoutConfig {
    pub lookback: usize,
    /// Leading bars of the lookback that define support and resistance
    pub base_window: usize,
    /// Breakout distance as a fraction of the base average true range
    pub min_breakout_range_pct: f64,
    /// Bars after the breakout in which failure signals are tested
    pub reentry_window: usize,
    pub min_signals: usize,
}

impl Default for FailedBreakoutConfig {
    fn default() -> Self {
        Self {
            lookback: 80,
            base_window: 30,
            min_breakout_range_pct: 0.01,
            reentry_window: 3,
            min_signals: 2,
        }
    }
}

impl FailedBreakoutConfig {
    pub(crate) fn from_reader<F>(env: &EnvReader<F>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        Ok(Self {
            lookback: env.usize("REGIME_FB_LOOKBACK", d.lookback)?,
            base_window: env.usize("REGIME_FB_BASE_WINDOW", d.base_window)?,
            min_breakout_range_pct: env
                .f64("REGIME_FB_MIN_BREAKOUT_RANGE_PCT", d.min_breakout_range_pct)?,
            reentry_window: env.usize("REGIME_FB_REENTRY_WINDOW", d.reentry_window)?,
            min_signals: env.usize("REGIME_FB_MIN_SIGNALS", d.min_signals)?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive_usize("failed_breakout.lookback", self.lookback)?;
        positive_usize("failed_breakout.base_window", self.base_window)?;
        positive_f64("failed_breakout.min_breakout_range_pct", self.min_breakout_range_pct)?;
        positive_usize("failed_breakout.reentry_window", self.reentry_window)?;
        positive_usize("failed_breakout.min_signals", self.min_signals)
    }
}

fn positive_usize(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::NonPositive { field, value: 0.0 });
    }
    Ok(())
}

fn positive_f64(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value <= 0.0 || !value.is_finite() {
        return Err(ConfigError::NonPositive { field, value });
    }
    Ok(())
}

fn unit_range(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::OutOfUnitRange { field, value });
    }
    Ok(())
}

fn validate_band(
    min_field: &'static str,
    max_field: &'static str,
    min: Option<usize>,
    max: usize,
) -> Result<(), ConfigError> {
    positive_usize(max_field, max)?;
    if let Some(min) = min {
        positive_usize(min_field, min)?;
        if min > max {
            return Err(ConfigError::InvertedDurationBand { min, max });
        }
    }
    Ok(())
}
