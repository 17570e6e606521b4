//! Indicator math shared by the detectors and the technical scorer.
//!
//! All functions take plain f64 slices (the f64 boundary for statistics)
//! and return `None` or `0.0` rather than panicking on short input. Moving
//! averages and true range are streamed through `ta` indicators.

use crate::domain::market::Bar;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Distribution};
use ta::indicators::{ExponentialMovingAverage, SimpleMovingAverage, TrueRange};
use ta::{Close, High, Low, Next};

/// Moving averages precomputed by the caller. Missing values are derived
/// from closes where a consumer needs them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    #[serde(default, alias = "SMA_50", alias = "50_SMA")]
    pub sma_50: Option<f64>,
    #[serde(default, alias = "SMA_200", alias = "200_SMA")]
    pub sma_200: Option<f64>,
    #[serde(default, alias = "WMA_10", alias = "10_WMA")]
    pub wma_10: Option<f64>,
    #[serde(default, alias = "WMA_40", alias = "40_WMA")]
    pub wma_40: Option<f64>,
    #[serde(default, alias = "EMA_21", alias = "21_EMA")]
    pub ema_21: Option<f64>,
}

/// Arithmetic mean, 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    Data::new(values.to_vec()).mean().unwrap_or(0.0)
}

/// Percentile with linear interpolation between closest ranks, `p` in [0, 100].
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Latest simple moving average over `period` closes.
pub fn sma(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period {
        return None;
    }
    let mut indicator = SimpleMovingAverage::new(period).ok()?;
    closes.iter().map(|&close| indicator.next(close)).last()
}

/// Latest exponential moving average (span smoothing, seeded with the first close).
pub fn ema(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period {
        return None;
    }
    let mut indicator = ExponentialMovingAverage::new(period).ok()?;
    closes.iter().map(|&close| indicator.next(close)).last()
}

/// Latest linearly weighted moving average; the newest close carries weight `period`.
pub fn wma(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period {
        return None;
    }
    let window = &closes[closes.len() - period..];
    let weighted: f64 = window
        .iter()
        .enumerate()
        .map(|(i, close)| close * (i + 1) as f64)
        .sum();
    let weights = (period * (period + 1)) as f64 / 2.0;
    Some(weighted / weights)
}

impl High for Bar {
    fn high(&self) -> f64 {
        self.high
    }
}

impl Low for Bar {
    fn low(&self) -> f64 {
        self.low
    }
}

impl Close for Bar {
    fn close(&self) -> f64 {
        self.close
    }
}

/// Plain mean of the true range. The first bar has no previous close and
/// uses its own range.
pub fn average_true_range(bars: &[Bar]) -> f64 {
    let mut true_range = TrueRange::new();
    let ranges: Vec<f64> = bars
        .iter()
        .map(|bar| true_range.next(bar))
        .filter(|r| r.is_finite())
        .collect();

    mean(&ranges)
}

/// Price envelope of a window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub high: f64,
    pub low: f64,
}

impl Envelope {
    pub fn of(bars: &[Bar]) -> Option<Self> {
        if bars.is_empty() {
            return None;
        }
        let high = bars.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let low = bars.iter().map(|b| b.low).fold(f64::MAX, f64::min);
        Some(Self { high, low })
    }

    pub fn mid(&self) -> f64 {
        (self.high + self.low) / 2.0
    }

    /// `(high - low) / mid`; infinite for a non-positive midpoint.
    pub fn compression(&self) -> f64 {
        let mid = self.mid();
        if mid <= 0.0 {
            return f64::INFINITY;
        }
        (self.high - self.low) / mid
    }
}

/// Rounds to `dp` decimal places.
pub fn round_to(value: f64, dp: i32) -> f64 {
    let factor = 10f64.powi(dp);
    (value * factor).round() / factor
}
