//! Decision bundle orchestration.
//!
//! Normalizes the raw payload once, runs the market structure service and
//! feeds its classification into every downstream scorer.

use crate::application::market_data::{CandleNormalizer, CandleSeries, IndicatorSnapshot, OhlcPayload};
use crate::application::scoring::{
    CompositeScorer, ConfluenceMatrix, RegimeStabilityScorer, RiskConstraintAssessor,
    TechnicalScorer,
};
use crate::application::structure::{DetectedStructures, MarketStructureService};
use crate::config::EngineConfig;
use crate::domain::errors::ConfigError;
use crate::domain::market::{MarketBias, Timeframe};
use crate::domain::scoring::{
    CompositeScore, ConfluenceState, FundamentalQuarter, FundamentalSnapshot,
    FundamentalStability, RiskConstraint, RiskSummary, StabilityMetrics, TechnicalScore,
};
use crate::domain::structure::MarketStructureState;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Fundamental score used when the caller supplies none.
pub const DEFAULT_FUNDAMENTAL_SCORE: f64 = 50.0;
const DEFAULT_FUNDAMENTAL_REGIME: &str = "NEUTRAL";

/// Already-materialized fundamental inputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FundamentalInput {
    /// `STRONG`, `NEUTRAL` or `WEAK`
    #[serde(default)]
    pub regime: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub snapshot: FundamentalSnapshot,
    /// Quarterly phases, oldest first
    #[serde(default)]
    pub history: Vec<FundamentalQuarter>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DecisionRequest {
    #[serde(flatten)]
    pub ohlc: OhlcPayload,
    #[serde(default)]
    pub indicators: Option<IndicatorSnapshot>,
    #[serde(default)]
    pub previous_bias: Option<MarketBias>,
    #[serde(default)]
    pub fundamentals: Option<FundamentalInput>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecisionBundle {
    pub timeframe: Timeframe,
    pub candle_count: usize,
    pub market_structure: MarketStructureState,
    #[serde(flatten)]
    pub detections: DetectedStructures,
    pub technical_score: TechnicalScore,
    pub confluence: ConfluenceState,
    pub technical_stability: StabilityMetrics,
    pub fundamental_stability: FundamentalStability,
    pub composite: CompositeScore,
    pub risk_constraints: Vec<RiskConstraint>,
    pub risk_summary: RiskSummary,
}

pub struct DecisionEngine {
    default_timeframe: Timeframe,
    structure: MarketStructureService,
    composite: CompositeScorer,
}

impl DecisionEngine {
    pub fn new(config: &EngineConfig) -> Result<Self, ConfigError> {
        Ok(Self::with_structure_service(
            config.default_timeframe,
            MarketStructureService::from_config(config)?,
        ))
    }

    pub fn with_structure_service(
        default_timeframe: Timeframe,
        structure: MarketStructureService,
    ) -> Self {
        Self {
            default_timeframe,
            structure,
            composite: CompositeScorer::default(),
        }
    }

    pub fn structure_service(&self) -> &MarketStructureService {
        &self.structure
    }

    pub fn timeframe_for(&self, interval: Option<&str>) -> Timeframe {
        Timeframe::from_interval_or(interval, self.default_timeframe)
    }

    pub fn evaluate(&self, request: &DecisionRequest) -> DecisionBundle {
        let timeframe = self.timeframe_for(request.ohlc.interval.as_deref());
        let candles = CandleNormalizer::normalize_payload(&request.ohlc);
        let indicators = request.indicators.as_ref();

        let (detections, market_structure) =
            self.structure
                .analyze(&candles, timeframe, indicators, request.previous_bias);

        let technical_score = match CandleSeries::new(&candles) {
            Ok(series) => TechnicalScorer::score(&series, timeframe, indicators),
            Err(e) => {
                warn!("Technical score unavailable: {}", e);
                TechnicalScore::unavailable()
            }
        };

        let fundamentals = request.fundamentals.clone().unwrap_or_default();
        let fundamental_regime = fundamentals
            .regime
            .as_deref()
            .unwrap_or(DEFAULT_FUNDAMENTAL_REGIME);
        let fundamental_score = fundamentals.score.unwrap_or(DEFAULT_FUNDAMENTAL_SCORE);

        let bias = market_structure.bias;
        let confluence = ConfluenceMatrix::state(bias.as_str(), fundamental_regime);
        let technical_stability = RegimeStabilityScorer::stability_metrics(
            &market_structure.regime_history,
            bias,
            timeframe,
        );
        let fundamental_stability =
            RegimeStabilityScorer::fundamental_stability(&fundamentals.history);

        let composite = self.composite.score(
            technical_score.total_score,
            fundamental_score,
            technical_stability.stability_score,
        );

        let risk_constraints = RiskConstraintAssessor::assess(
            &fundamentals.snapshot,
            bias,
            market_structure.confidence,
        );
        let risk_summary = RiskConstraintAssessor::summary(&risk_constraints);

        info!(
            "Decision bundle: {} ({}) over {} {} candles, composite {:.1} {}, risk {}",
            bias,
            market_structure.confidence,
            candles.len(),
            timeframe,
            composite.value,
            composite.band,
            risk_summary.overall_risk
        );

        DecisionBundle {
            timeframe,
            candle_count: candles.len(),
            market_structure,
            detections,
            technical_score,
            confluence,
            technical_stability,
            fundamental_stability,
            composite,
            risk_constraints,
            risk_summary,
        }
    }
}
