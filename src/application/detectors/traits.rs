use crate::application::market_data::{CandleSeries, IndicatorSnapshot};
use crate::domain::errors::DetectionError;
use crate::domain::market::Timeframe;
use tracing::warn;

/// Per-call inputs shared by every detector.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetectionContext<'a> {
    pub timeframe: Timeframe,
    pub indicators: Option<&'a IndicatorSnapshot>,
}

impl<'a> DetectionContext<'a> {
    pub fn new(timeframe: Timeframe, indicators: Option<&'a IndicatorSnapshot>) -> Self {
        Self {
            timeframe,
            indicators,
        }
    }
}

/// A stateless pattern detector over a validated candle series.
///
/// Implementations hold only their thresholds, so one instance can be shared
/// across threads and evaluations.
pub trait StructureDetector: Send + Sync {
    type Output: Send;

    /// Name used in logs and budget errors
    fn name(&self) -> &'static str;

    fn detect(
        &self,
        series: &CandleSeries,
        ctx: &DetectionContext<'_>,
    ) -> Result<Vec<Self::Output>, DetectionError>;

    /// Best-effort variant: failures are logged and read as "no signal".
    fn detect_or_empty(&self, series: &CandleSeries, ctx: &DetectionContext<'_>) -> Vec<Self::Output> {
        match self.detect(series, ctx) {
            Ok(found) => found,
            Err(e) => {
                warn!("{}: detection degraded to empty result: {}", self.name(), e);
                Vec::new()
            }
        }
    }
}

/// Counts candidate window evaluations against a fixed ceiling.
#[derive(Debug)]
pub struct WindowBudget {
    detector: &'static str,
    limit: usize,
    used: usize,
}

impl WindowBudget {
    pub fn new(detector: &'static str, limit: usize) -> Self {
        Self {
            detector,
            limit,
            used: 0,
        }
    }

    pub fn charge(&mut self) -> Result<(), DetectionError> {
        if self.used >= self.limit {
            return Err(DetectionError::IterationBudgetExceeded {
                detector: self.detector,
                budget: self.limit,
            });
        }
        self.used += 1;
        Ok(())
    }

    pub fn used(&self) -> usize {
        self.used
    }
}
