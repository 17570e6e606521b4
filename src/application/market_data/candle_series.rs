use crate::domain::errors::DetectionError;
use crate::domain::market::{Bar, Candle};
use chrono::{DateTime, Utc};

/// Validated, chronologically ordered f64 view over a candle slice.
///
/// Detectors work on this instead of raw candles so the ordering invariant
/// is checked once per evaluation.
#[derive(Debug, Clone, Default)]
pub struct CandleSeries {
    bars: Vec<Bar>,
}

impl CandleSeries {
    pub fn new(candles: &[Candle]) -> Result<Self, DetectionError> {
        let bars: Vec<Bar> = candles.iter().map(Candle::to_bar).collect();

        for (index, pair) in bars.windows(2).enumerate() {
            if pair[0].time >= pair[1].time {
                return Err(DetectionError::NotChronological {
                    index: index + 1,
                    previous: pair[0].time,
                    current: pair[1].time,
                });
            }
        }

        Ok(Self { bars })
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// The trailing `n` bars (or all of them when shorter).
    pub fn tail(&self, n: usize) -> &[Bar] {
        let start = self.bars.len().saturating_sub(n);
        &self.bars[start..]
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn times(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.bars.iter().map(|b| b.time)
    }
}
