use crate::domain::market::Confidence;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakoutDirection {
    Up,
    Down,
}

impl BreakoutDirection {
    pub fn opposite(&self) -> Self {
        match self {
            BreakoutDirection::Up => BreakoutDirection::Down,
            BreakoutDirection::Down => BreakoutDirection::Up,
        }
    }

    /// Preposition used when describing a move through a level in this direction.
    pub fn preposition(&self) -> &'static str {
        match self {
            BreakoutDirection::Up => "above",
            BreakoutDirection::Down => "below",
        }
    }
}

impl fmt::Display for BreakoutDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakoutDirection::Up => write!(f, "up"),
            BreakoutDirection::Down => write!(f, "down"),
        }
    }
}

/// How a breakout failed, resolved in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureType {
    ImmediateRejection,
    TrapReversal,
    LowVolumeFakeout,
    GenericFailure,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureType::ImmediateRejection => "immediate_rejection",
            FailureType::TrapReversal => "trap_reversal",
            FailureType::LowVolumeFakeout => "low_volume_fakeout",
            FailureType::GenericFailure => "generic_failure",
        };
        write!(f, "{}", s)
    }
}

/// The five binary signals tested after a breakout candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FailureSignals {
    pub reentry: bool,
    pub volume_fail: bool,
    pub wick_reject: bool,
    pub no_follow_through: bool,
    pub counter_candle: bool,
}

impl FailureSignals {
    pub fn count(&self) -> usize {
        [
            self.reentry,
            self.volume_fail,
            self.wick_reject,
            self.no_follow_through,
            self.counter_candle,
        ]
        .iter()
        .filter(|s| **s)
        .count()
    }

    pub fn failure_type(&self) -> FailureType {
        if self.wick_reject && self.reentry {
            FailureType::ImmediateRejection
        } else if self.counter_candle && self.reentry {
            FailureType::TrapReversal
        } else if self.volume_fail && self.no_follow_through {
            FailureType::LowVolumeFakeout
        } else {
            FailureType::GenericFailure
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailedBreakoutEvent {
    pub direction: BreakoutDirection,
    pub breakout_level: f64,
    pub breakout_time: DateTime<Utc>,
    pub failure_time: DateTime<Utc>,
    pub failure_type: FailureType,
    pub confidence: Confidence,
    pub summary: String,
    pub context: Vec<String>,
    pub what_to_watch: Vec<String>,
}

impl FailedBreakoutEvent {
    /// Active at the failure candle and everywhere between breakout and failure.
    pub fn covers(&self, time: DateTime<Utc>) -> bool {
        time == self.failure_time || (self.breakout_time <= time && time <= self.failure_time)
    }
}
