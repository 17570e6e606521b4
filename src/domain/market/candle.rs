use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Canonical OHLCV bar produced by the candle normalizer.
///
/// A series of candles handed to the detectors is expected to be sorted by
/// `time` and free of duplicate timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    pub fn new(
        time: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Float view used by the detectors (f64 boundary for the statistics code).
    pub fn to_bar(&self) -> Bar {
        Bar {
            time: self.time,
            open: self.open.to_f64().unwrap_or(0.0),
            high: self.high.to_f64().unwrap_or(0.0),
            low: self.low.to_f64().unwrap_or(0.0),
            close: self.close.to_f64().unwrap_or(0.0),
            volume: self.volume.to_f64().unwrap_or(0.0),
        }
    }
}

/// f64 projection of a [`Candle`] with the wick/body geometry the pattern
/// detectors need.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Floor for degenerate (zero range) bars.
    pub const MIN_RANGE: f64 = 1e-6;

    pub fn range(&self) -> f64 {
        (self.high - self.low).max(Self::MIN_RANGE)
    }

    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    /// Where the close sits inside the bar: 0.0 at the low, 1.0 at the high.
    pub fn close_position(&self) -> f64 {
        (self.close - self.low) / self.range()
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}
