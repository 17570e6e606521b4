use chrono::{Duration, TimeZone, Utc};
use regime_engine::application::structure::{MarketStructureService, resolve_bias};
use regime_engine::config::EngineConfig;
use regime_engine::domain::market::{Candle, Confidence, MarketBias, Timeframe};
use regime_engine::domain::structure::{RegimeEvent, StructureDetails};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

fn create_candle(day: usize, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Candle {
    let d = |v: f64| Decimal::from_f64(v).unwrap();
    Candle::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(day as i64),
        d(open),
        d(high),
        d(low),
        d(close),
        d(volume),
    )
}

/// Quiet base followed by a weak breakout that closes back inside.
fn base_then_trap() -> Vec<Candle> {
    let mut candles: Vec<Candle> = (0..40)
        .map(|i| create_candle(i, 100.0, 101.0, 99.0, 100.0, 1000.0))
        .collect();
    candles.push(create_candle(40, 100.5, 102.2, 100.4, 102.0, 500.0));
    candles.push(create_candle(41, 102.0, 102.2, 99.8, 100.0, 1200.0));
    candles
}

fn assert_gap_free(history: &[RegimeEvent], candles: usize) {
    let total: usize = history.iter().map(|e| e.duration).sum();
    assert_eq!(total, candles, "history must cover every candle exactly once");
    for pair in history.windows(2) {
        assert!(pair[0].end_time < pair[1].start_time, "events overlap");
    }
}

#[test]
fn test_failed_breakout_wins_over_accumulation() {
    let service = MarketStructureService::from_config(&EngineConfig::default()).unwrap();
    let candles = base_then_trap();

    let (detected, state) = service.analyze(&candles, Timeframe::Day, None, None);

    assert!(!detected.accumulation_zones.is_empty());
    assert!(!detected.failed_breakouts.is_empty());
    assert_eq!(
        resolve_bias(
            &detected.accumulation_zones,
            &detected.distribution_zones,
            &detected.failed_breakouts
        ),
        (MarketBias::FailedBreakout, Confidence::High)
    );

    assert_eq!(state.bias, MarketBias::FailedBreakout);
    assert_eq!(state.confidence, Confidence::High);
    assert!(matches!(state.details, StructureDetails::FailedBreakout { .. }));
    assert!(state.explanation.contains("buyer trap"));
}

#[test]
fn test_regime_history_is_gap_free() {
    let service = MarketStructureService::from_config(&EngineConfig::default()).unwrap();
    let candles = base_then_trap();

    let state = service.evaluate_structure(&candles, Timeframe::Day, None, None);
    assert_gap_free(&state.regime_history, candles.len());

    let last = state.regime_history.last().unwrap();
    assert_eq!(last.bias, MarketBias::FailedBreakout);
    assert_eq!(last.duration, 1);
    assert_eq!(last.transition_out, None);
    assert_eq!(last.narrative, "Attempted breakout triggered sudden reversal.");
}

#[test]
fn test_transition_narration_only_when_bias_changes() {
    let service = MarketStructureService::from_config(&EngineConfig::default()).unwrap();
    let candles = base_then_trap();

    let same = service.evaluate_structure(
        &candles,
        Timeframe::Day,
        None,
        Some(MarketBias::FailedBreakout),
    );
    assert!(same.transition.is_none());
    assert!(same.transition_narration.is_none());

    let changed =
        service.evaluate_structure(&candles, Timeframe::Day, None, Some(MarketBias::Accumulation));
    let transition = changed.transition.unwrap();
    assert_eq!(transition.from, MarketBias::Accumulation);
    assert_eq!(transition.to, MarketBias::FailedBreakout);
    assert!(changed.transition_narration.is_some());
}

#[test]
fn test_short_quiet_series_is_one_neutral_event() {
    let service = MarketStructureService::from_config(&EngineConfig::default()).unwrap();
    let candles: Vec<Candle> = (0..5)
        .map(|i| create_candle(i, 100.0, 103.0, 97.0, 100.0, 1000.0))
        .collect();

    let state = service.evaluate_structure(&candles, Timeframe::Day, None, None);
    assert_eq!(state.bias, MarketBias::Neutral);
    assert_eq!(state.confidence, Confidence::High);
    assert_eq!(state.regime_history.len(), 1);
    assert_eq!(state.regime_history[0].duration, 5);
    assert_eq!(
        state.regime_history[0].narrative,
        "Market lacked clear directional structure."
    );
}

#[test]
fn test_state_serializes_with_tagged_details() {
    let service = MarketStructureService::from_config(&EngineConfig::default()).unwrap();
    let state = service.evaluate_structure(&base_then_trap(), Timeframe::Day, None, None);

    let json = serde_json::to_value(&state).unwrap();
    assert_eq!(json["bias"], "FAILED_BREAKOUT");
    assert_eq!(json["confidence"], "High");
    assert_eq!(json["details"]["kind"], "failed_breakout");
    assert!(json["details"]["event"]["context"].is_array());
    assert!(json.get("transition").is_none());
}

#[test]
fn test_old_consolidation_appears_in_regime_history() {
    // Wide alternating bars everywhere except a tight range at bars 20..40
    let candles: Vec<Candle> = (0..200)
        .map(|i| {
            if (20..40).contains(&i) {
                create_candle(i, 100.2, 100.5, 99.5, 100.4, 1000.0)
            } else {
                let base = 100.0 + (i % 2) as f64 * 10.0;
                create_candle(i, base, base + 5.0, base - 5.0, base + 1.0, 1000.0)
            }
        })
        .collect();

    let service = MarketStructureService::from_config(&EngineConfig::default()).unwrap();
    let state = service.evaluate_structure(&candles, Timeframe::Day, None, None);

    assert_gap_free(&state.regime_history, candles.len());
    let biases: Vec<MarketBias> = state.regime_history.iter().map(|e| e.bias).collect();
    assert_eq!(
        biases,
        vec![MarketBias::Neutral, MarketBias::Accumulation, MarketBias::Neutral]
    );

    let zone_event = &state.regime_history[1];
    assert_eq!(zone_event.start_time, candles[20].time);
    assert_eq!(zone_event.end_time, candles[39].time);
    assert_eq!(zone_event.duration, 20);
}
