use crate::domain::market::Confidence;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    Accumulation,
    Distribution,
}

/// Why a candidate consolidation window was not accepted as a zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    CompressionTooWide,
    VolumeCollapse,
    DownVolumeClimax,
    NoUpperWickRejection,
    UpsideAcceptance,
    LowScore,
    PreconditionFailed,
}

impl RejectionReason {
    pub fn description(&self) -> &'static str {
        match self {
            RejectionReason::CompressionTooWide => "Range compression exceeds tolerance",
            RejectionReason::VolumeCollapse => {
                "Volume collapsed against the prior window (pause, not participation)"
            }
            RejectionReason::DownVolumeClimax => "Down candle with climactic volume",
            RejectionReason::NoUpperWickRejection => "Absence of upper-wick rejection signals",
            RejectionReason::UpsideAcceptance => "Sustained upside acceptance above zone high",
            RejectionReason::LowScore => "Signal alignment points below threshold",
            RejectionReason::PreconditionFailed => {
                "Insufficient prior advance or below long-term mean"
            }
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Tally of rejection reasons met while searching windows.
pub type RejectionTally = BTreeMap<RejectionReason, usize>;

/// A compressed consolidation range classified as accumulation or distribution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Zone {
    pub kind: ZoneKind,
    pub high: f64,
    pub low: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Span in bars
    pub duration: usize,
    pub confidence: Confidence,
    pub score: f64,
    pub summary: String,
    pub characteristics: Vec<String>,
    pub interpretation: String,
    pub what_to_watch: Vec<String>,
    pub failure_signals: Vec<String>,
    pub metrics: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejections: Option<RejectionTally>,
}

impl Zone {
    /// True when `time` falls inside `[start_time, end_time]`.
    pub fn covers(&self, time: DateTime<Utc>) -> bool {
        self.start_time <= time && time <= self.end_time
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    /// Folds an overlapping zone into this one.
    ///
    /// Bounds widen to cover both. Narrative fields follow the higher
    /// confidence zone while the score is the max of the two.
    fn absorb(&mut self, other: Zone) {
        self.high = self.high.max(other.high);
        self.low = self.low.min(other.low);
        self.end_time = self.end_time.max(other.end_time);
        self.duration = self.duration.max(other.duration);
        self.score = self.score.max(other.score);

        if other.confidence > self.confidence {
            self.confidence = other.confidence;
            self.summary = other.summary;
            self.interpretation = other.interpretation;
            self.characteristics = other.characteristics;
            self.what_to_watch = other.what_to_watch;
            self.failure_signals = other.failure_signals;
            self.metrics = other.metrics;
        }

        if let Some(theirs) = other.rejections {
            let tally = self.rejections.get_or_insert_with(RejectionTally::new);
            for (reason, count) in theirs {
                *tally.entry(reason).or_insert(0) += count;
            }
        }
    }
}

/// Merges zones whose time spans overlap, ordered by start time.
pub fn merge_overlapping(mut zones: Vec<Zone>) -> Vec<Zone> {
    zones.sort_by_key(|z| z.start_time);

    let mut merged: Vec<Zone> = Vec::with_capacity(zones.len());
    for zone in zones {
        match merged.last_mut() {
            Some(last) if zone.start_time <= last.end_time => last.absorb(zone),
            _ => merged.push(zone),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn zone(start_day: i64, end_day: i64, high: f64, low: f64, confidence: Confidence, score: f64) -> Zone {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Zone {
            kind: ZoneKind::Accumulation,
            high,
            low,
            start_time: base + Duration::days(start_day),
            end_time: base + Duration::days(end_day),
            duration: (end_day - start_day + 1) as usize,
            confidence,
            score,
            summary: format!("{} zone", confidence),
            characteristics: vec![format!("score {}", score)],
            interpretation: String::new(),
            what_to_watch: Vec::new(),
            failure_signals: Vec::new(),
            metrics: BTreeMap::new(),
            rejections: None,
        }
    }

    #[test]
    fn test_disjoint_zones_stay_separate() {
        let merged = merge_overlapping(vec![
            zone(10, 20, 105.0, 100.0, Confidence::Low, 3.0),
            zone(0, 8, 104.0, 99.0, Confidence::High, 6.0),
        ]);
        assert_eq!(merged.len(), 2);
        assert!(merged[0].start_time < merged[1].start_time);
    }

    #[test]
    fn test_overlap_takes_bounds_and_higher_confidence_narrative() {
        let merged = merge_overlapping(vec![
            zone(0, 10, 105.0, 100.0, Confidence::Medium, 5.0),
            zone(8, 18, 107.0, 101.0, Confidence::High, 4.5),
        ]);

        assert_eq!(merged.len(), 1);
        let z = &merged[0];
        assert_eq!(z.high, 107.0);
        assert_eq!(z.low, 100.0);
        assert_eq!(z.confidence, Confidence::High);
        assert_eq!(z.summary, "High zone");
        // Score keeps the max of both, not the winner's own score
        assert_eq!(z.score, 5.0);
    }

    #[test]
    fn test_covers_is_inclusive() {
        let z = zone(2, 4, 1.0, 0.5, Confidence::Low, 3.0);
        assert!(z.covers(z.start_time));
        assert!(z.covers(z.end_time));
        assert!(!z.covers(z.end_time + Duration::seconds(1)));
    }
}
