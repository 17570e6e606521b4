use crate::domain::market::MarketBias;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Persistence metrics derived from a regime history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StabilityMetrics {
    /// Bars spent in the current regime, 0 if the latest event is another bias
    pub current_duration: usize,
    pub duration_formatted: String,
    /// Regime changes per bar
    pub regime_volatility: f64,
    /// Share of events that were not failed breakouts
    pub persistence_rate: f64,
    pub stability_score: f64,
    pub total_regimes: usize,
    pub regime_distribution: BTreeMap<MarketBias, usize>,
}

impl Default for StabilityMetrics {
    fn default() -> Self {
        Self {
            current_duration: 0,
            duration_formatted: "0 bars".to_string(),
            regime_volatility: 0.0,
            persistence_rate: 0.0,
            stability_score: 0.0,
            total_regimes: 0,
            regime_distribution: BTreeMap::new(),
        }
    }
}

/// Phase of a fundamental quarter, as supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FundamentalQuarter {
    #[serde(default)]
    pub period: Option<String>,
    pub phase: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FundamentalStability {
    pub duration_quarters: usize,
    pub phase_changes: usize,
    pub stability_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_phase: Option<String>,
}
