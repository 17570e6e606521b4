use crate::application::market_data::indicators::{ema, mean, round_to, sma, wma};
use crate::application::market_data::{CandleSeries, IndicatorSnapshot};
use crate::domain::market::{Bar, Timeframe};
use crate::domain::scoring::{TechnicalComponents, TechnicalGrade, TechnicalScore};
use tracing::debug;

const MA_POSITION_MAX: f64 = 50.0;
const VOLUME_LOOKBACK: usize = 10;
const TREND_LOOKBACK: usize = 10;
const MOMENTUM_LOOKBACK: usize = 5;

/// Trend and momentum score (0-100) from moving-average position, volume
/// confirmation, candle trend and five-bar momentum.
pub struct TechnicalScorer;

impl TechnicalScorer {
    pub fn score(
        series: &CandleSeries,
        timeframe: Timeframe,
        indicators: Option<&IndicatorSnapshot>,
    ) -> TechnicalScore {
        let bars = series.bars();
        let components = TechnicalComponents {
            ma_position: round_to(Self::ma_position(series, timeframe, indicators), 1),
            volume: Self::volume(bars),
            trend: Self::trend(bars),
            momentum: Self::momentum(bars),
        };

        let total = (components.ma_position + components.volume + components.trend + components.momentum)
            .clamp(0.0, 100.0);

        TechnicalScore {
            total_score: round_to(total, 1),
            grade: TechnicalGrade::from_score(total),
            signals: Self::signals(&components),
            components,
        }
    }

    /// 0-50. Daily compares against SMA50/SMA200, weekly against WMA10/WMA40,
    /// intraday against EMA21. Averages missing from `indicators` are computed
    /// from closes; if still unavailable the component is 0.
    fn ma_position(
        series: &CandleSeries,
        timeframe: Timeframe,
        indicators: Option<&IndicatorSnapshot>,
    ) -> f64 {
        let Some(price) = series.last().map(|b| b.close) else {
            return 0.0;
        };
        let closes = series.closes();
        let supplied = indicators.cloned().unwrap_or_default();

        let score = match timeframe {
            Timeframe::Day => {
                let fast = supplied.sma_50.or_else(|| sma(&closes, 50));
                let slow = supplied.sma_200.or_else(|| sma(&closes, 200));
                let (Some(fast), Some(slow)) = (fast, slow) else {
                    debug!("Moving averages unavailable for daily MA position");
                    return 0.0;
                };
                let mut score = Self::stacked_position(price, fast, slow);
                let dist_slow = (price - slow) / slow * 100.0;
                let dist_fast = (price - fast) / fast * 100.0;
                if dist_slow > 5.0 {
                    score += 5.0;
                } else if dist_slow < -5.0 {
                    score -= 5.0;
                }
                if dist_fast > 3.0 {
                    score += 3.0;
                } else if dist_fast < -3.0 {
                    score -= 3.0;
                }
                score
            }
            Timeframe::Week => {
                let fast = supplied.wma_10.or_else(|| wma(&closes, 10));
                let slow = supplied.wma_40.or_else(|| wma(&closes, 40));
                let (Some(fast), Some(slow)) = (fast, slow) else {
                    return 0.0;
                };
                Self::stacked_position(price, fast, slow)
            }
            Timeframe::Hour | Timeframe::FifteenMinute | Timeframe::FiveMinute => {
                let Some(ema21) = supplied.ema_21.or_else(|| ema(&closes, 21)) else {
                    return 0.0;
                };
                let dist = ((price - ema21) / ema21 * 100.0).abs();
                match (price > ema21, dist) {
                    (true, d) if d < 0.5 => 35.0,
                    (true, _) => 50.0,
                    (false, d) if d < 2.0 => 20.0,
                    (false, _) => 0.0,
                }
            }
        };

        if score.is_finite() {
            score.clamp(0.0, MA_POSITION_MAX)
        } else {
            0.0
        }
    }

    /// Price position against a fast and slow average, plus the cross bonus.
    fn stacked_position(price: f64, fast: f64, slow: f64) -> f64 {
        let base = match (price > slow, price > fast) {
            (true, true) => 50.0,
            (true, false) => 30.0,
            (false, true) => 20.0,
            (false, false) => 0.0,
        };
        if fast > slow { base + 5.0 } else { base - 5.0 }
    }

    /// -15..25: last candle's volume against the prior ten-bar average.
    fn volume(bars: &[Bar]) -> f64 {
        let n = bars.len();
        if n < VOLUME_LOOKBACK + 1 {
            return 10.0;
        }
        let prior: Vec<f64> = bars[n - 1 - VOLUME_LOOKBACK..n - 1]
            .iter()
            .map(|b| b.volume)
            .collect();
        let average = mean(&prior);
        if average <= 0.0 {
            return 10.0;
        }

        let current = &bars[n - 1];
        let ratio = current.volume / average;
        if current.is_bullish() {
            match ratio {
                r if r > 1.5 => 25.0,
                r if r > 1.2 => 20.0,
                r if r > 1.0 => 15.0,
                _ => 8.0,
            }
        } else if current.is_bearish() {
            match ratio {
                r if r > 1.5 => -15.0,
                r if r > 1.0 => -10.0,
                _ => 5.0,
            }
        } else if ratio > 1.5 {
            5.0
        } else {
            10.0
        }
    }

    /// -5..15 from bullish candle count and higher highs over ten bars.
    fn trend(bars: &[Bar]) -> f64 {
        if bars.len() < TREND_LOOKBACK {
            return 5.0;
        }
        let recent = &bars[bars.len() - TREND_LOOKBACK..];
        let bullish = recent.iter().filter(|b| b.is_bullish()).count();
        let bearish = TREND_LOOKBACK - bullish;
        let higher_highs = recent.windows(2).filter(|w| w[1].high > w[0].high).count();
        let lower_lows = recent.windows(2).filter(|w| w[1].low < w[0].low).count();

        if bullish >= 7 && higher_highs >= 3 {
            15.0
        } else if bullish >= 6 && higher_highs >= 2 {
            12.0
        } else if bullish >= 5 {
            8.0
        } else if bullish >= 4 {
            5.0
        } else if bearish >= 7 && lower_lows >= 3 {
            -5.0
        } else {
            0.0
        }
    }

    /// 0..10 from the five-bar percentage change.
    fn momentum(bars: &[Bar]) -> f64 {
        let n = bars.len();
        if n < MOMENTUM_LOOKBACK + 1 {
            return 5.0;
        }
        let then = bars[n - 1 - MOMENTUM_LOOKBACK].close;
        if then == 0.0 {
            return 5.0;
        }
        let change = (bars[n - 1].close - then) / then * 100.0;
        match change {
            c if c >= 5.0 => 10.0,
            c if c >= 3.0 => 8.0,
            c if c >= 1.0 => 6.0,
            c if c >= -1.0 => 5.0,
            c if c >= -3.0 => 3.0,
            c if c >= -5.0 => 1.0,
            _ => 0.0,
        }
    }

    fn signals(c: &TechnicalComponents) -> Vec<String> {
        let mut signals = Vec::new();

        if c.ma_position >= 40.0 {
            signals.push("Price showing strength above key MAs");
        } else if c.ma_position <= 10.0 {
            signals.push("Price weakness below key MAs");
        }

        if c.volume >= 20.0 {
            signals.push("Strong bullish volume confirmation");
        } else if (0.0..=5.0).contains(&c.volume) {
            signals.push("Weak volume, lack of conviction");
        } else if c.volume < 0.0 {
            signals.push("High bearish volume pressure");
        }

        if c.trend >= 12.0 {
            signals.push("Strong uptrend establishment");
        } else if c.trend <= 0.0 {
            signals.push("Downtrend structure detected");
        }

        if c.momentum >= 8.0 {
            signals.push("Strong positive momentum (5-bar)");
        } else if c.momentum <= 2.0 {
            signals.push("Negative momentum detected");
        }

        signals.into_iter().map(String::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::Candle;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal::prelude::FromPrimitive;

    fn series(closes: &[f64], last_volume: f64) -> CandleSeries {
        let d = |v: f64| Decimal::from_f64(v).unwrap();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let candles: Vec<Candle> = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let volume = if i + 1 == closes.len() { last_volume } else { 1000.0 };
                Candle::new(
                    start + Duration::days(i as i64),
                    d(close - 0.5),
                    d(close + 1.0),
                    d(close - 1.0),
                    d(close),
                    d(volume),
                )
            })
            .collect();
        CandleSeries::new(&candles).unwrap()
    }

    #[test]
    fn test_uptrend_with_supplied_averages_scores_bullish() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let indicators = IndicatorSnapshot {
            sma_50: Some(110.0),
            sma_200: Some(100.0),
            ..Default::default()
        };

        let score = TechnicalScorer::score(&series(&closes, 2000.0), Timeframe::Day, Some(&indicators));

        // MA 50 (clamped), volume 25, trend 15, momentum 8 (129 vs 124)
        assert_eq!(score.components.ma_position, 50.0);
        assert_eq!(score.components.volume, 25.0);
        assert_eq!(score.components.trend, 15.0);
        assert_eq!(score.components.momentum, 8.0);
        assert_eq!(score.total_score, 98.0);
        assert_eq!(score.grade, TechnicalGrade::StrongBullish);
        assert!(score.signals.contains(&"Strong uptrend establishment".to_string()));
    }

    #[test]
    fn test_short_daily_series_without_averages() {
        let score = TechnicalScorer::score(&series(&[100.0, 101.0, 102.0], 1000.0), Timeframe::Day, None);
        // No averages, neutral defaults for the rest
        assert_eq!(score.components.ma_position, 0.0);
        assert_eq!(score.components.volume, 10.0);
        assert_eq!(score.components.trend, 5.0);
        assert_eq!(score.components.momentum, 5.0);
        assert_eq!(score.total_score, 20.0);
        assert_eq!(score.grade, TechnicalGrade::Bearish);
    }

    #[test]
    fn test_intraday_uses_computed_ema() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let score = TechnicalScorer::score(&series(&closes, 1000.0), Timeframe::Hour, None);
        // EMA21 lags a steady climb by several points
        assert_eq!(score.components.ma_position, 50.0);

        let below = IndicatorSnapshot {
            ema_21: Some(131.0),
            ..Default::default()
        };
        let score = TechnicalScorer::score(&series(&closes, 1000.0), Timeframe::Hour, Some(&below));
        assert_eq!(score.components.ma_position, 20.0);
    }
}
