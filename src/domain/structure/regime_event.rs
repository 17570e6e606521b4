use crate::domain::market::{Confidence, MarketBias};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A contiguous run of candles sharing one arbitrated bias.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegimeEvent {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub bias: MarketBias,
    pub confidence: Confidence,
    pub duration: usize,
    pub transition_in: Option<MarketBias>,
    pub transition_out: Option<MarketBias>,
    pub narrative: String,
}

impl RegimeEvent {
    pub(crate) fn open(
        time: DateTime<Utc>,
        bias: MarketBias,
        confidence: Confidence,
        transition_in: Option<MarketBias>,
    ) -> Self {
        Self {
            start_time: time,
            end_time: time,
            bias,
            confidence,
            duration: 1,
            transition_in,
            transition_out: None,
            narrative: String::new(),
        }
    }

    pub(crate) fn extend_to(&mut self, time: DateTime<Utc>) {
        self.end_time = time;
        self.duration += 1;
    }

    /// Seals the event with its successor's bias and the templated narrative.
    pub(crate) fn close(&mut self, next: Option<MarketBias>) {
        self.transition_out = next;
        self.narrative = match self.bias {
            MarketBias::Neutral => "Market lacked clear directional structure.".to_string(),
            MarketBias::Accumulation => format!(
                "Price consolidated in demand zone for {} bars.",
                self.duration
            ),
            MarketBias::Distribution => format!(
                "Supply dominated price action for {} bars.",
                self.duration
            ),
            MarketBias::FailedBreakout => {
                "Attempted breakout triggered sudden reversal.".to_string()
            }
        };
    }
}
