// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Source descriptors: "where does this value come from".
//!
//! [`SourceKind`] is the closed set of source tags. Hosts store the tags as
//! strings (`"pdsTime"`, `"msgPayload"`, `"dateSpecific"`, ...); parsing never
//! fails and keeps unrecognised tags in [`SourceKind::Unknown`] so each
//! resolver can report them in its own way.

use crate::calendar::WeekdayFilter;
use crate::format::OutputFormat;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Fields of the incoming message that have a dedicated tag.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MessageField {
    Payload,
    Value,
    /// Message timestamp.
    Ts,
    /// Last-change marker.
    Lc,
}

impl MessageField {
    pub const fn key(self) -> &'static str {
        match self {
            MessageField::Payload => "payload",
            MessageField::Value => "value",
            MessageField::Ts => "ts",
            MessageField::Lc => "lc",
        }
    }
}

/// Host-side stores reached through [`ContextLookup`](crate::ContextLookup).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ContextKind {
    Msg,
    Flow,
    Global,
    Env,
    Str,
    Bool,
    /// Expression language evaluated by the host.
    Expression,
    Binary,
}

impl ContextKind {
    pub const fn tag(self) -> &'static str {
        match self {
            ContextKind::Msg => "msg",
            ContextKind::Flow => "flow",
            ContextKind::Global => "global",
            ContextKind::Env => "env",
            ContextKind::Str => "str",
            ContextKind::Bool => "bool",
            ContextKind::Expression => "jsonata",
            ContextKind::Binary => "bin",
        }
    }
}

/// Closed set of source tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceKind {
    /// `""` or `"none"`.
    #[default]
    None,
    /// `"date"` — the current instant.
    Now,
    /// `"dateSpecific"` — the current instant plus offset.
    NowWithOffset,
    /// `"entered"` / `"dateEntered"` — free-text date or time.
    Entered,
    /// `"dayOfMonth"` — a [`DayOfMonthRule`](crate::DayOfMonthRule) in the current month.
    DayOfMonth,
    /// `"pdsTime"` — a named solar event.
    SunTime,
    /// `"pdmTime"` — a named lunar event.
    MoonTime,
    /// `"pdsCalcData"` — a full sun position snapshot.
    SunCalc,
    /// `"pdmCalcData"` — a full moon position snapshot.
    MoonCalc,
    /// `"num"` — a literal number.
    Number,
    /// `"msgPayload"`, `"msgValue"`, `"msgTs"`, `"msgLc"`.
    Message(MessageField),
    /// `"json"` — a static JSON literal.
    Json,
    Context(ContextKind),
    Unknown(String),
}

impl SourceKind {
    pub fn is_none(&self) -> bool {
        matches!(self, SourceKind::None)
    }

    pub fn tag(&self) -> &str {
        match self {
            SourceKind::None => "none",
            SourceKind::Now => "date",
            SourceKind::NowWithOffset => "dateSpecific",
            SourceKind::Entered => "entered",
            SourceKind::DayOfMonth => "dayOfMonth",
            SourceKind::SunTime => "pdsTime",
            SourceKind::MoonTime => "pdmTime",
            SourceKind::SunCalc => "pdsCalcData",
            SourceKind::MoonCalc => "pdmCalcData",
            SourceKind::Number => "num",
            SourceKind::Message(MessageField::Payload) => "msgPayload",
            SourceKind::Message(MessageField::Value) => "msgValue",
            SourceKind::Message(MessageField::Ts) => "msgTs",
            SourceKind::Message(MessageField::Lc) => "msgLc",
            SourceKind::Json => "json",
            SourceKind::Context(kind) => kind.tag(),
            SourceKind::Unknown(tag) => tag,
        }
    }
}

impl FromStr for SourceKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "" | "none" => SourceKind::None,
            "date" => SourceKind::Now,
            "dateSpecific" => SourceKind::NowWithOffset,
            "entered" | "dateEntered" => SourceKind::Entered,
            "dayOfMonth" | "DayOfMonth" => SourceKind::DayOfMonth,
            "pdsTime" => SourceKind::SunTime,
            "pdmTime" => SourceKind::MoonTime,
            "pdsCalcData" => SourceKind::SunCalc,
            "pdmCalcData" => SourceKind::MoonCalc,
            "num" => SourceKind::Number,
            "msgPayload" => SourceKind::Message(MessageField::Payload),
            "msgValue" => SourceKind::Message(MessageField::Value),
            "msgTs" => SourceKind::Message(MessageField::Ts),
            "msgLc" => SourceKind::Message(MessageField::Lc),
            "json" => SourceKind::Json,
            "msg" => SourceKind::Context(ContextKind::Msg),
            "flow" => SourceKind::Context(ContextKind::Flow),
            "global" => SourceKind::Context(ContextKind::Global),
            "env" => SourceKind::Context(ContextKind::Env),
            "str" => SourceKind::Context(ContextKind::Str),
            "bool" => SourceKind::Context(ContextKind::Bool),
            "jsonata" => SourceKind::Context(ContextKind::Expression),
            "bin" => SourceKind::Context(ContextKind::Binary),
            other => SourceKind::Unknown(other.to_string()),
        })
    }
}

impl From<String> for SourceKind {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl From<&str> for SourceKind {
    fn from(s: &str) -> Self {
        SourceKind::from(s.to_string())
    }
}

impl From<SourceKind> for String {
    fn from(kind: SourceKind) -> Self {
        kind.tag().to_string()
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A `(kind, raw value)` pair, the input of the numeric and value resolvers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertySource {
    #[serde(rename = "type", default)]
    pub kind: SourceKind,
    #[serde(default, deserialize_with = "raw_string")]
    pub value: String,
}

impl PropertySource {
    pub fn new(kind: impl Into<SourceKind>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn number(value: f64) -> Self {
        Self::new(SourceKind::Number, value.to_string())
    }
}

/// Default offset unit: minutes.
pub const DEFAULT_MULTIPLIER: f64 = 60.0;

/// Offset added to a resolved time: `source` evaluated as a number, scaled by
/// `multiplier` seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Offset {
    pub source: PropertySource,
    pub multiplier: f64,
}

impl Default for Offset {
    fn default() -> Self {
        Self {
            source: PropertySource::none(),
            multiplier: DEFAULT_MULTIPLIER,
        }
    }
}

impl Offset {
    /// A literal offset of `value` units of `multiplier` seconds.
    pub fn literal(value: f64, multiplier: f64) -> Self {
        Self {
            source: PropertySource::number(value),
            multiplier,
        }
    }

    pub fn minutes(value: f64) -> Self {
        Self::literal(value, DEFAULT_MULTIPLIER)
    }
}

/// Full description of a configured time value.
///
/// Deserializes from the flat host shape:
///
/// ```json
/// { "type": "pdsTime", "value": "sunrise", "offset": 30, "offsetType": "num",
///   "multiplier": 60, "next": 1, "days": "1,2,3,4,5" }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawTimeDescriptor")]
pub struct TimeDescriptor {
    pub source: PropertySource,
    pub format: OutputFormat,
    pub offset: Offset,
    /// Look this many occurrences ahead when the naive result is not in the
    /// future.
    pub next: Option<u32>,
    pub days: WeekdayFilter,
}

impl TimeDescriptor {
    pub fn new(kind: impl Into<SourceKind>, value: impl Into<String>) -> Self {
        Self {
            source: PropertySource::new(kind, value),
            format: OutputFormat::default(),
            offset: Offset::default(),
            next: None,
            days: WeekdayFilter::Any,
        }
    }

    pub fn with_offset(mut self, offset: Offset) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_next(mut self, next: u32) -> Self {
        self.next = Some(next);
        self
    }

    pub fn with_days(mut self, days: WeekdayFilter) -> Self {
        self.days = days;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn kind(&self) -> &SourceKind {
        &self.source.kind
    }

    pub fn value(&self) -> &str {
        &self.source.value
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTimeDescriptor {
    #[serde(rename = "type", default)]
    kind: SourceKind,
    #[serde(default, deserialize_with = "raw_string")]
    value: String,
    #[serde(default)]
    format: OutputFormat,
    #[serde(default, deserialize_with = "raw_string")]
    offset: String,
    #[serde(default)]
    offset_type: SourceKind,
    multiplier: Option<f64>,
    next: Option<u32>,
    days: Option<String>,
}

impl From<RawTimeDescriptor> for TimeDescriptor {
    fn from(raw: RawTimeDescriptor) -> Self {
        // a bare offset without a type is a literal number
        let offset_kind = match (&raw.offset_type, raw.offset.is_empty()) {
            (SourceKind::None, false) => SourceKind::Number,
            (kind, _) => kind.clone(),
        };
        let days = match raw.days.as_deref() {
            None => WeekdayFilter::Any,
            Some(days) => days.parse().unwrap_or_default(),
        };
        TimeDescriptor {
            source: PropertySource::new(raw.kind, raw.value),
            format: raw.format,
            offset: Offset {
                source: PropertySource::new(offset_kind, raw.offset),
                multiplier: raw.multiplier.unwrap_or(DEFAULT_MULTIPLIER),
            },
            next: raw.next,
            days,
        }
    }
}

/// Accept strings, numbers and booleans as the raw text of a descriptor.
pub(crate) fn raw_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}
