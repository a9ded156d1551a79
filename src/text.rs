// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Turning entered text and looked-up values into instants.

use crate::error::{Error, Result};
use crate::format::OutputFormat;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde_json::Value;

/// Free-text date parser.
///
/// Hosts with a natural-language parser plug it in here; the crate ships
/// [`ChronoTextParser`], which understands the common numeric forms.
pub trait DateTextParser {
    /// A time of day on `now`'s UTC date, or a full date.
    fn parse_time(&self, text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>>;

    /// A full date, with or without time.
    fn parse_date(&self, text: &str) -> Option<DateTime<Utc>>;
}

const DATE_TIME_PATTERNS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

const TIME_PATTERNS: &[&str] = &["%H:%M:%S", "%H:%M", "%I:%M:%S %p", "%I:%M %p", "%I:%M%p"];

/// Parser for RFC 3339/2822, ISO-like date-times, plain dates, epoch
/// milliseconds and times of day. All naive values are taken as UTC.
#[derive(Debug, Default, Copy, Clone)]
pub struct ChronoTextParser;

impl DateTextParser for ChronoTextParser {
    fn parse_time(&self, text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let text = text.trim();
        let time = TIME_PATTERNS
            .iter()
            .find_map(|p| NaiveTime::parse_from_str(&text.to_ascii_uppercase(), p).ok());
        match time {
            Some(time) => Some(Utc.from_utc_datetime(&now.date_naive().and_time(time))),
            None => self.parse_date(text),
        }
    }

    fn parse_date(&self, text: &str) -> Option<DateTime<Utc>> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if let Ok(ms) = text.parse::<i64>() {
            return DateTime::from_timestamp_millis(ms);
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Some(naive) = DATE_TIME_PATTERNS
            .iter()
            .find_map(|p| NaiveDateTime::parse_from_str(text, p).ok())
        {
            return Some(Utc.from_utc_datetime(&naive));
        }
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| Utc.from_utc_datetime(&naive))
    }
}

/// Instant carried by a JSON value: epoch milliseconds or date text.
pub fn instant_from_value(value: &Value, parser: &dyn DateTextParser) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64))
            .and_then(DateTime::from_timestamp_millis),
        Value::String(s) => parser.parse_date(s),
        _ => None,
    }
}

/// Read an instant out of `value`, trying the custom pattern of `format`
/// first.
pub fn parse_with_format(
    value: &Value,
    format: &OutputFormat,
    parser: &dyn DateTextParser,
) -> Result<DateTime<Utc>> {
    if let (OutputFormat::Custom(pattern), Value::String(text)) = (format, value) {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text.trim(), pattern) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    instant_from_value(value, parser).ok_or_else(|| Error::Format {
        text: match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    })
}
