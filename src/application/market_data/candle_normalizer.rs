//! Canonicalizes loosely typed OHLCV rows into [`Candle`]s.
//!
//! Rows arrive from heterogeneous market-data adapters: keys may be
//! capitalised or abbreviated, numbers may be strings and timestamps come as
//! epoch seconds, epoch milliseconds or several textual formats. Anything
//! that cannot be read is dropped; the normalizer itself never fails.

use crate::domain::market::Candle;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

const OPEN_KEYS: &[&str] = &["open", "o"];
const HIGH_KEYS: &[&str] = &["high", "h"];
const LOW_KEYS: &[&str] = &["low", "l"];
const CLOSE_KEYS: &[&str] = &["close", "c"];
const VOLUME_KEYS: &[&str] = &["volume", "vol", "v"];
const TIME_KEYS: &[&str] = &["date", "time", "timestamp", "datetime"];

/// Epoch values at or above this are read as milliseconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 1e11;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const OFFSET_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%z"];

/// Raw price payload: `{ "data": [...], "interval": "day" }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OhlcPayload {
    #[serde(default)]
    pub data: Vec<Value>,
    #[serde(default)]
    pub interval: Option<String>,
}

pub struct CandleNormalizer;

impl CandleNormalizer {
    /// Sorted, de-duplicated candles. A later row with the same timestamp
    /// replaces an earlier one.
    pub fn normalize(rows: &[Value]) -> Vec<Candle> {
        let mut by_time: BTreeMap<DateTime<Utc>, Candle> = BTreeMap::new();
        let mut dropped = 0usize;

        for row in rows {
            match Self::normalize_row(row) {
                Some(candle) => {
                    by_time.insert(candle.time, candle);
                }
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            debug!(
                "CandleNormalizer: dropped {} of {} rows as unreadable",
                dropped,
                rows.len()
            );
        }

        by_time.into_values().collect()
    }

    pub fn normalize_payload(payload: &OhlcPayload) -> Vec<Candle> {
        Self::normalize(&payload.data)
    }

    fn normalize_row(row: &Value) -> Option<Candle> {
        let object = row.as_object()?;
        let fields = lowercase_keys(object);

        let time = lookup(&fields, TIME_KEYS).and_then(parse_time)?;
        let open = lookup(&fields, OPEN_KEYS).and_then(parse_decimal)?;
        let high = lookup(&fields, HIGH_KEYS).and_then(parse_decimal)?;
        let low = lookup(&fields, LOW_KEYS).and_then(parse_decimal)?;
        let close = lookup(&fields, CLOSE_KEYS).and_then(parse_decimal)?;
        let volume = match lookup(&fields, VOLUME_KEYS) {
            None | Some(Value::Null) => Decimal::ZERO,
            Some(v) => parse_decimal(v)?,
        };

        Some(Candle::new(time, open, high, low, close, volume))
    }
}

fn lowercase_keys(object: &Map<String, Value>) -> BTreeMap<String, &Value> {
    object
        .iter()
        .map(|(k, v)| (k.trim().to_lowercase(), v))
        .collect()
}

fn lookup<'a>(fields: &BTreeMap<String, &'a Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|alias| fields.get(*alias).copied())
}

fn parse_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

fn parse_decimal(value: &Value) -> Option<Decimal> {
    parse_number(value).and_then(Decimal::from_f64)
}

fn parse_time(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_f64().and_then(from_epoch),
        Value::String(s) => parse_time_str(s.trim()),
        _ => None,
    }
}

fn from_epoch(raw: f64) -> Option<DateTime<Utc>> {
    if !raw.is_finite() {
        return None;
    }
    if raw.abs() >= EPOCH_MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(raw as i64)
    } else {
        let secs = raw.trunc() as i64;
        let nanos = ((raw - raw.trunc()) * 1e9).round().clamp(0.0, 999_999_999.0) as u32;
        DateTime::from_timestamp(secs, nanos)
    }
}

fn parse_time_str(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    s.parse::<f64>().ok().and_then(from_epoch)
}
