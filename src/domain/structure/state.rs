use super::failed_breakout::FailedBreakoutEvent;
use super::regime_event::RegimeEvent;
use super::zone::Zone;
use crate::domain::market::{Confidence, MarketBias};
use serde::{Deserialize, Serialize};

/// Bias-specific payload of a [`MarketStructureState`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructureDetails {
    Accumulation { zone: Zone },
    Distribution { zone: Zone },
    FailedBreakout { event: FailedBreakoutEvent },
    Neutral {
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transition {
    pub from: MarketBias,
    pub to: MarketBias,
}

impl Transition {
    /// `Some` only when the bias actually changed.
    pub fn between(previous: Option<MarketBias>, current: MarketBias) -> Option<Self> {
        previous
            .filter(|p| *p != current)
            .map(|from| Transition { from, to: current })
    }

    pub fn narration(&self) -> String {
        format!(
            "Market structure shifted from {} to {}.",
            sentence_case(self.from.as_str()),
            sentence_case(self.to.as_str())
        )
    }
}

fn sentence_case(label: &str) -> String {
    let lower = label.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Arbitrated classification of the latest window plus its history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketStructureState {
    pub bias: MarketBias,
    pub confidence: Confidence,
    pub explanation: String,
    pub details: StructureDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<Transition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_narration: Option<String>,
    pub regime_history: Vec<RegimeEvent>,
}

impl MarketStructureState {
    pub fn neutral(confidence: Confidence, explanation: &str, reason: &str) -> Self {
        Self {
            bias: MarketBias::Neutral,
            confidence,
            explanation: explanation.to_string(),
            details: StructureDetails::Neutral {
                reason: reason.to_string(),
                error: None,
            },
            transition: None,
            transition_narration: None,
            regime_history: Vec::new(),
        }
    }

    /// Records the move away from `previous`, if any.
    pub fn with_transition_from(mut self, previous: Option<MarketBias>) -> Self {
        self.transition = Transition::between(previous, self.bias);
        self.transition_narration = self.transition.map(|t| t.narration());
        self
    }

    pub fn is_degraded(&self) -> bool {
        matches!(
            self.details,
            StructureDetails::Neutral { error: Some(_), .. }
        )
    }
}
