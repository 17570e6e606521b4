use super::regime_history::RegimeHistoryStitcher;
use crate::application::detectors::{
    AccumulationDetector, DetectionContext, DistributionDetector, FailedBreakoutDetector,
    StructureDetector,
};
use crate::application::market_data::{CandleSeries, IndicatorSnapshot};
use crate::config::EngineConfig;
use crate::domain::errors::ConfigError;
use crate::domain::market::{Candle, Confidence, MarketBias, Timeframe};
use crate::domain::structure::{
    BreakoutDirection, FailedBreakoutEvent, MarketStructureState, StructureDetails, Zone,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info};

const NEUTRAL_EXPLANATION: &str = "No clear edge detected. Market is in neutral consolidation.";
const NEUTRAL_REASON: &str = "No accumulation, distribution or failed breakout patterns found.";
const ERROR_EXPLANATION: &str = "Error evaluating market structure.";

/// Raw detector output for one series.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct DetectedStructures {
    pub accumulation_zones: Vec<Zone>,
    pub distribution_zones: Vec<Zone>,
    pub failed_breakouts: Vec<FailedBreakoutEvent>,
}

impl DetectedStructures {
    pub fn is_empty(&self) -> bool {
        self.accumulation_zones.is_empty()
            && self.distribution_zones.is_empty()
            && self.failed_breakouts.is_empty()
    }
}

/// Fixed-priority resolution: Failed Breakout > Distribution > Accumulation > Neutral.
///
/// Any failed breakout wins with High confidence. Otherwise the most recent
/// distribution zone, then accumulation zone, wins with its own confidence.
/// Nothing at all is a confident Neutral.
pub fn resolve_bias<'a>(
    accumulation: impl IntoIterator<Item = &'a Zone>,
    distribution: impl IntoIterator<Item = &'a Zone>,
    failed: impl IntoIterator<Item = &'a FailedBreakoutEvent>,
) -> (MarketBias, Confidence) {
    if failed.into_iter().next().is_some() {
        return (MarketBias::FailedBreakout, Confidence::High);
    }
    if let Some(zone) = most_recent(distribution) {
        return (MarketBias::Distribution, zone.confidence);
    }
    if let Some(zone) = most_recent(accumulation) {
        return (MarketBias::Accumulation, zone.confidence);
    }
    (MarketBias::Neutral, Confidence::High)
}

fn most_recent<'a>(zones: impl IntoIterator<Item = &'a Zone>) -> Option<&'a Zone> {
    zones.into_iter().max_by_key(|z| z.end_time)
}

/// Runs the three detectors, arbitrates the latest state and stitches the
/// regime history.
///
/// Detectors are injected so callers can swap in their own implementations.
pub struct MarketStructureService {
    accumulation: Arc<dyn StructureDetector<Output = Zone>>,
    distribution: Arc<dyn StructureDetector<Output = Zone>>,
    failed_breakout: Arc<dyn StructureDetector<Output = FailedBreakoutEvent>>,
}

impl MarketStructureService {
    pub fn new(
        accumulation: Arc<dyn StructureDetector<Output = Zone>>,
        distribution: Arc<dyn StructureDetector<Output = Zone>>,
        failed_breakout: Arc<dyn StructureDetector<Output = FailedBreakoutEvent>>,
    ) -> Self {
        Self {
            accumulation,
            distribution,
            failed_breakout,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let budget = config.max_window_evaluations;

        Ok(Self::new(
            Arc::new(
                AccumulationDetector::new(config.accumulation.clone())?.with_window_budget(budget),
            ),
            Arc::new(
                DistributionDetector::new(config.distribution.clone())?.with_window_budget(budget),
            ),
            Arc::new(FailedBreakoutDetector::new(config.failed_breakout.clone())?),
        ))
    }

    /// Runs all detectors concurrently and waits for every result.
    pub fn detect_all(&self, series: &CandleSeries, ctx: &DetectionContext<'_>) -> DetectedStructures {
        let (accumulation_zones, (distribution_zones, failed_breakouts)) = rayon::join(
            || self.accumulation.detect_or_empty(series, ctx),
            || {
                rayon::join(
                    || self.distribution.detect_or_empty(series, ctx),
                    || self.failed_breakout.detect_or_empty(series, ctx),
                )
            },
        );

        debug!(
            "Detected {} accumulation, {} distribution, {} failed breakout",
            accumulation_zones.len(),
            distribution_zones.len(),
            failed_breakouts.len()
        );

        DetectedStructures {
            accumulation_zones,
            distribution_zones,
            failed_breakouts,
        }
    }

    pub fn evaluate_structure(
        &self,
        candles: &[Candle],
        timeframe: Timeframe,
        indicators: Option<&IndicatorSnapshot>,
        previous_bias: Option<MarketBias>,
    ) -> MarketStructureState {
        self.analyze(candles, timeframe, indicators, previous_bias).1
    }

    /// Like [`Self::evaluate_structure`] but also hands back the raw detections.
    pub fn analyze(
        &self,
        candles: &[Candle],
        timeframe: Timeframe,
        indicators: Option<&IndicatorSnapshot>,
        previous_bias: Option<MarketBias>,
    ) -> (DetectedStructures, MarketStructureState) {
        let series = match CandleSeries::new(candles) {
            Ok(series) => series,
            Err(e) => {
                error!("Error evaluating market structure: {}", e);
                return (DetectedStructures::default(), degraded(e.to_string()));
            }
        };

        let ctx = DetectionContext::new(timeframe, indicators);
        let detected = self.detect_all(&series, &ctx);

        let times: Vec<_> = series.times().collect();
        let regime_history = match RegimeHistoryStitcher::stitch(&times, &detected) {
            Ok(history) => history,
            Err(e) => {
                error!("Error evaluating market structure: {}", e);
                return (detected, degraded(e.to_string()));
            }
        };

        let mut state = arbitrate(&detected).with_transition_from(previous_bias);
        state.regime_history = regime_history;

        if let Some(narration) = &state.transition_narration {
            info!("{}", narration);
        }
        (detected, state)
    }
}

/// Builds the state for the winning candidate across all detections.
pub fn arbitrate(detected: &DetectedStructures) -> MarketStructureState {
    let (bias, confidence) = resolve_bias(
        &detected.accumulation_zones,
        &detected.distribution_zones,
        &detected.failed_breakouts,
    );

    let winner = match bias {
        MarketBias::FailedBreakout => detected
            .failed_breakouts
            .iter()
            .max_by_key(|e| e.failure_time)
            .map(|event| {
                let explanation = match event.direction {
                    BreakoutDirection::Up => {
                        "Bearish signaling. Price failed to follow through, suggesting a buyer trap."
                    }
                    BreakoutDirection::Down => {
                        "Bullish signaling. Price failed to follow through, suggesting a seller trap."
                    }
                };
                (
                    explanation,
                    StructureDetails::FailedBreakout {
                        event: event.clone(),
                    },
                )
            }),
        MarketBias::Distribution => most_recent(&detected.distribution_zones).map(|zone| {
            (
                "Supply pressure. Upside attempts are being sold into, suggesting distribution.",
                StructureDetails::Distribution { zone: zone.clone() },
            )
        }),
        MarketBias::Accumulation => most_recent(&detected.accumulation_zones).map(|zone| {
            (
                "Constructive action. Price leads with steady absorption, suggesting accumulation.",
                StructureDetails::Accumulation { zone: zone.clone() },
            )
        }),
        MarketBias::Neutral => None,
    };

    match winner {
        Some((explanation, details)) => MarketStructureState {
            bias,
            confidence,
            explanation: explanation.to_string(),
            details,
            transition: None,
            transition_narration: None,
            regime_history: Vec::new(),
        },
        None => MarketStructureState::neutral(confidence, NEUTRAL_EXPLANATION, NEUTRAL_REASON),
    }
}

fn degraded(error: String) -> MarketStructureState {
    MarketStructureState {
        details: StructureDetails::Neutral {
            reason: ERROR_EXPLANATION.to_string(),
            error: Some(error),
        },
        ..MarketStructureState::neutral(Confidence::Low, ERROR_EXPLANATION, ERROR_EXPLANATION)
    }
}
