// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Output representations of a resolved instant.

use crate::error::{Error, Result};
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use std::fmt::Write as _;

/// How a resolved instant is handed back to the host.
///
/// Parsed from numeric codes (`0..=5`) or names; any other text is a
/// `strftime` pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Milliseconds since the Unix epoch, as a JSON number.
    #[default]
    Millis,
    /// RFC 3339 with millisecond precision.
    Iso,
    /// RFC 2822.
    Utc,
    /// `YYYY-MM-DD`.
    Date,
    /// `HH:MM:SS`.
    Time,
    /// Object with the individual calendar components.
    Object,
    Custom(String),
}

impl OutputFormat {
    pub fn parse(tag: &str) -> Self {
        match tag.trim() {
            "" | "0" | "ms" | "millis" => OutputFormat::Millis,
            "1" | "iso" => OutputFormat::Iso,
            "2" | "utc" => OutputFormat::Utc,
            "3" | "date" => OutputFormat::Date,
            "4" | "time" => OutputFormat::Time,
            "5" | "object" => OutputFormat::Object,
            _ => OutputFormat::Custom(tag.to_string()),
        }
    }

    /// Render `instant` in this format.
    pub fn render(&self, instant: DateTime<Utc>) -> Result<Value> {
        Ok(match self {
            OutputFormat::Millis => json!(instant.timestamp_millis()),
            OutputFormat::Iso => {
                Value::String(instant.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
            }
            OutputFormat::Utc => Value::String(instant.to_rfc2822()),
            OutputFormat::Date => Value::String(instant.format("%Y-%m-%d").to_string()),
            OutputFormat::Time => Value::String(instant.format("%H:%M:%S").to_string()),
            OutputFormat::Object => json!({
                "year": instant.year(),
                "month": instant.month(),
                "day": instant.day(),
                "hours": instant.hour(),
                "minutes": instant.minute(),
                "seconds": instant.second(),
                "millis": instant.timestamp_subsec_millis(),
                "weekday": instant.weekday().num_days_from_sunday(),
                "ts": instant.timestamp_millis(),
            }),
            OutputFormat::Custom(pattern) => {
                let mut out = String::new();
                if pattern.trim().is_empty()
                    || write!(out, "{}", instant.format(pattern)).is_err()
                {
                    return Err(Error::Format {
                        text: pattern.clone(),
                    });
                }
                Value::String(out)
            }
        })
    }
}

impl<'de> Deserialize<'de> for OutputFormat {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Null => OutputFormat::default(),
            Value::String(s) => OutputFormat::parse(&s),
            other => OutputFormat::parse(&other.to_string()),
        })
    }
}
