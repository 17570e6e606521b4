//! Regime history stitching.
//!
//! Every candle is classified by re-running the arbitration over the zones and
//! events active at that timestamp. Consecutive candles with the same bias are
//! then compressed into [`RegimeEvent`]s. Failed breakouts are never merged:
//! each candle-level occurrence stays its own event.

use super::arbitrator::{DetectedStructures, resolve_bias};
use crate::domain::errors::DetectionError;
use crate::domain::market::{Confidence, MarketBias};
use crate::domain::structure::RegimeEvent;
use chrono::{DateTime, Utc};
use tracing::debug;

/// Point-in-time classification of a single candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegimeSlice {
    pub time: DateTime<Utc>,
    pub bias: MarketBias,
    pub confidence: Confidence,
}

pub struct RegimeHistoryStitcher;

impl RegimeHistoryStitcher {
    /// Classifies each timestamp against the detections covering it.
    pub fn classify(times: &[DateTime<Utc>], detected: &DetectedStructures) -> Vec<RegimeSlice> {
        times
            .iter()
            .map(|&time| {
                let (bias, confidence) = resolve_bias(
                    detected.accumulation_zones.iter().filter(|z| z.covers(time)),
                    detected.distribution_zones.iter().filter(|z| z.covers(time)),
                    detected.failed_breakouts.iter().filter(|e| e.covers(time)),
                );
                RegimeSlice {
                    time,
                    bias,
                    confidence,
                }
            })
            .collect()
    }

    /// Builds the compressed history and checks it spans every candle once.
    pub fn stitch(
        times: &[DateTime<Utc>],
        detected: &DetectedStructures,
    ) -> Result<Vec<RegimeEvent>, DetectionError> {
        let events = Self::compress(&Self::classify(times, detected));

        if events.is_empty() && !times.is_empty() {
            return Err(DetectionError::EmptyHistory {
                candles: times.len(),
            });
        }

        let covered: usize = events.iter().map(|e| e.duration).sum();
        let ordered = events.windows(2).all(|w| w[0].end_time < w[1].start_time);
        if covered != times.len() || !ordered {
            return Err(DetectionError::HistoryCoverage {
                covered,
                candles: times.len(),
            });
        }

        debug!(
            "Stitched {} candles into {} regime events",
            times.len(),
            events.len()
        );
        Ok(events)
    }

    /// Merges runs of equal bias. A confidence change alone does not split a run.
    pub fn compress(slices: &[RegimeSlice]) -> Vec<RegimeEvent> {
        let mut events: Vec<RegimeEvent> = Vec::new();
        let mut current: Option<RegimeEvent> = None;

        for slice in slices {
            match current.as_mut() {
                Some(event)
                    if event.bias == slice.bias && slice.bias != MarketBias::FailedBreakout =>
                {
                    event.extend_to(slice.time);
                }
                Some(event) => {
                    let previous = event.bias;
                    event.close(Some(slice.bias));
                    events.extend(current.replace(RegimeEvent::open(
                        slice.time,
                        slice.bias,
                        slice.confidence,
                        Some(previous),
                    )));
                }
                None => {
                    current = Some(RegimeEvent::open(
                        slice.time,
                        slice.bias,
                        slice.confidence,
                        None,
                    ));
                }
            }
        }

        if let Some(mut last) = current {
            last.close(None);
            events.push(last);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::structure::{
        BreakoutDirection, FailedBreakoutEvent, FailureType, Zone, ZoneKind,
    };
    use chrono::{Duration, TimeZone};
    use std::collections::BTreeMap;

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(n)
    }

    fn times(count: i64) -> Vec<DateTime<Utc>> {
        (0..count).map(day).collect()
    }

    fn zone(kind: ZoneKind, start: i64, end: i64) -> Zone {
        Zone {
            kind,
            high: 101.0,
            low: 99.0,
            start_time: day(start),
            end_time: day(end),
            duration: (end - start + 1) as usize,
            confidence: Confidence::Medium,
            score: 4.0,
            summary: String::new(),
            characteristics: Vec::new(),
            interpretation: String::new(),
            what_to_watch: Vec::new(),
            failure_signals: Vec::new(),
            metrics: BTreeMap::new(),
            rejections: None,
        }
    }

    fn failed(breakout: i64, failure: i64) -> FailedBreakoutEvent {
        FailedBreakoutEvent {
            direction: BreakoutDirection::Up,
            breakout_level: 101.0,
            breakout_time: day(breakout),
            failure_time: day(failure),
            failure_type: FailureType::TrapReversal,
            confidence: Confidence::Medium,
            summary: String::new(),
            context: Vec::new(),
            what_to_watch: Vec::new(),
        }
    }

    #[test]
    fn test_empty_series_has_empty_history() {
        let history = RegimeHistoryStitcher::stitch(&[], &DetectedStructures::default()).unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn test_history_covers_every_candle_without_overlap() {
        let detected = DetectedStructures {
            accumulation_zones: vec![zone(ZoneKind::Accumulation, 3, 9)],
            distribution_zones: vec![zone(ZoneKind::Distribution, 12, 15)],
            failed_breakouts: vec![failed(17, 18)],
        };
        let history = RegimeHistoryStitcher::stitch(&times(20), &detected).unwrap();

        let biases: Vec<MarketBias> = history.iter().map(|e| e.bias).collect();
        assert_eq!(
            biases,
            vec![
                MarketBias::Neutral,
                MarketBias::Accumulation,
                MarketBias::Neutral,
                MarketBias::Distribution,
                MarketBias::Neutral,
                MarketBias::FailedBreakout,
                MarketBias::FailedBreakout,
                MarketBias::Neutral,
            ]
        );
        assert_eq!(history.iter().map(|e| e.duration).sum::<usize>(), 20);
        for pair in history.windows(2) {
            assert!(pair[0].end_time < pair[1].start_time);
            assert_eq!(pair[0].transition_out, Some(pair[1].bias));
            assert_eq!(pair[1].transition_in, Some(pair[0].bias));
        }
        assert_eq!(history[1].duration, 7);
        assert_eq!(history[1].narrative, "Price consolidated in demand zone for 7 bars.");
        assert_eq!(history.last().and_then(|e| e.transition_out), None);
    }

    #[test]
    fn test_failed_breakout_overrides_overlapping_zone() {
        let detected = DetectedStructures {
            accumulation_zones: vec![zone(ZoneKind::Accumulation, 0, 5)],
            failed_breakouts: vec![failed(5, 5)],
            ..Default::default()
        };
        let slices = RegimeHistoryStitcher::classify(&times(6), &detected);

        assert_eq!(slices[4].bias, MarketBias::Accumulation);
        assert_eq!(slices[5].bias, MarketBias::FailedBreakout);
        assert_eq!(slices[5].confidence, Confidence::High);
    }

    #[test]
    fn test_confidence_change_does_not_split_run() {
        let slices = vec![
            RegimeSlice {
                time: day(0),
                bias: MarketBias::Accumulation,
                confidence: Confidence::Low,
            },
            RegimeSlice {
                time: day(1),
                bias: MarketBias::Accumulation,
                confidence: Confidence::High,
            },
        ];
        let events = RegimeHistoryStitcher::compress(&slices);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].confidence, Confidence::Low);
        assert_eq!(events[0].duration, 2);
    }
}
