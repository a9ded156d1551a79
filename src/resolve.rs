// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Descriptor resolution: times, dates, formatted output and numbers.
//!
//! Three families share the same dispatch over [`SourceKind`] but differ in
//! how they fail:
//!
//! | Family | Entry point | Ordinary failure |
//! |--------|-------------|------------------|
//! | time | [`PositionConfig::resolve_time`] | `now` plus [`ResolvedTime::error`] |
//! | date | [`PositionConfig::resolve_date`] | `Err`, wrapped with the descriptor |
//! | output | [`PositionConfig::resolve_output`] | `null`, or `Err` for unusable text |
//!
//! Invalid coordinates are always an `Err`.

use crate::calendar::DayOfMonthRule;
use crate::config::PositionConfig;
use crate::context::{evaluate_literal, ContextLookup};
use crate::descriptor::{MessageField, Offset, PropertySource, SourceKind, TimeDescriptor};
use crate::ephemeris::Ephemeris;
use crate::error::{Error, Result};
use crate::events::Adjustment;
use crate::text::{instant_from_value, parse_with_format};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

/// A resolved time: always a value, plus the reason if it is only the
/// `now` fallback or otherwise suspect.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTime {
    pub value: DateTime<Utc>,
    pub error: Option<Error>,
    /// `false` when the value came from a runtime lookup that may change
    /// between evaluations.
    pub is_fixed: bool,
}

impl ResolvedTime {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

struct Partial {
    value: Option<DateTime<Utc>>,
    error: Option<Error>,
    is_fixed: bool,
}

impl Partial {
    fn fixed(value: DateTime<Utc>) -> Self {
        Self {
            value: Some(value),
            error: None,
            is_fixed: true,
        }
    }

    fn failed(error: Error, is_fixed: bool) -> Self {
        Self {
            value: None,
            error: Some(error),
            is_fixed,
        }
    }

    fn adjusted(result: Result<DateTime<Utc>>, is_fixed: bool) -> Self {
        match result {
            Ok(value) => Self {
                value: Some(value),
                error: None,
                is_fixed,
            },
            Err(error) => Self::failed(error, is_fixed),
        }
    }
}

/// Message fields, literal kinds, then the host context.
pub(crate) fn lookup(
    ctx: &dyn ContextLookup,
    kind: &SourceKind,
    value: &str,
) -> Result<Option<Value>> {
    match kind {
        SourceKind::Message(field) => Ok(ctx.message_field(*field)),
        _ => evaluate_literal(kind, value).unwrap_or_else(|| ctx.evaluate(kind, value)),
    }
}

/// Midnight UTC of the day `rule` selects in the month of `now`.
pub(crate) fn rule_date(rule: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let rule: DayOfMonthRule = rule.parse().ok()?;
    let date = rule.date_in_month_of(now)?.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&date))
}

/// `null`, `false`, `""` and `0` carry no time.
fn carries_value(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

fn display_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl<E: Ephemeris> PositionConfig<E> {
    // ── Numbers ───────────────────────────────────────────────────────────

    /// Evaluate `source` as a finite number.
    ///
    /// An untyped source yields its value when that is numeric text and
    /// `default` otherwise; an empty literal also yields `default`.
    ///
    /// # Errors
    ///
    /// [`Error::NotEvaluable`] when the lookup finds nothing,
    /// [`Error::NotANumber`] when the value is not a finite number, or the
    /// lookup's own error.
    pub fn resolve_number(
        &self,
        source: &PropertySource,
        ctx: &dyn ContextLookup,
        default: f64,
    ) -> Result<f64> {
        let kind = &source.kind;
        match kind {
            SourceKind::None => {
                let literal = source.value.trim().parse::<f64>().ok();
                return Ok(literal.filter(|n| n.is_finite()).unwrap_or(default));
            }
            SourceKind::Number if source.value.trim().is_empty() => return Ok(default),
            _ => {}
        }
        let found = lookup(ctx, kind, &source.value)?
            .ok_or_else(|| Error::not_evaluable(kind, source.value.as_str()))?;
        number_of(&found).ok_or_else(|| Error::NotANumber {
            kind: kind.to_string(),
            value: source.value.clone(),
        })
    }

    fn offset_of(&self, offset: &Offset, ctx: &dyn ContextLookup) -> Result<f64> {
        self.resolve_number(&offset.source, ctx, 0.0)
    }

    fn adjustment<'d>(
        &self,
        d: &'d TimeDescriptor,
        ctx: &dyn ContextLookup,
        next: Option<u32>,
    ) -> Result<Adjustment<'d>> {
        Ok(Adjustment {
            offset: self.offset_of(&d.offset, ctx)?,
            multiplier: d.offset.multiplier,
            next,
            days: &d.days,
        })
    }

    fn offset_only(
        &self,
        d: &TimeDescriptor,
        ctx: &dyn ContextLookup,
    ) -> Result<Adjustment<'static>> {
        Ok(Adjustment::offset(
            self.offset_of(&d.offset, ctx)?,
            d.offset.multiplier,
        ))
    }

    // ── Time family ───────────────────────────────────────────────────────

    /// Resolve `d` to a time.
    ///
    /// Ordinary failures (empty weekday filter, unknown kind, missing event,
    /// unparsable text) come back as `Ok` with the error set and `value`
    /// falling back to `now`.
    ///
    /// # Errors
    ///
    /// Invalid coordinates, and offset or context lookups that fail outright;
    /// both are wrapped with the descriptor.
    pub fn resolve_time(
        &mut self,
        d: &TimeDescriptor,
        ctx: &dyn ContextLookup,
        now: DateTime<Utc>,
    ) -> Result<ResolvedTime> {
        let Partial {
            value,
            mut error,
            is_fixed,
        } = self.time_of(d, ctx, now).map_err(|e| {
            let context = format!("property {}.{} could not be evaluated", d.kind(), d.value());
            e.with_context(context)
        })?;
        let value = value.unwrap_or_else(|| {
            error.get_or_insert_with(|| Error::Unresolvable {
                kind: d.kind().to_string(),
                value: d.value().to_string(),
            });
            now
        });
        Ok(ResolvedTime {
            value,
            error,
            is_fixed,
        })
    }

    fn time_of(
        &mut self,
        d: &TimeDescriptor,
        ctx: &dyn ContextLookup,
        now: DateTime<Utc>,
    ) -> Result<Partial> {
        if d.days.is_empty() {
            return Ok(Partial::failed(Error::NoValidDays, true));
        }
        let kind = d.kind();
        Ok(match kind {
            SourceKind::None | SourceKind::Unknown(_) => Partial::failed(
                Error::WrongType {
                    kind: kind.to_string(),
                    value: d.value().to_string(),
                },
                true,
            ),
            SourceKind::Now => Partial::fixed(now),
            SourceKind::NowWithOffset => {
                let adjust = self.adjustment(d, ctx, d.next)?;
                Partial::adjusted(adjust.apply(now, now), true)
            }
            SourceKind::DayOfMonth => {
                let adjust = self.offset_only(d, ctx)?;
                match rule_date(d.value(), now) {
                    Some(base) => Partial::adjusted(adjust.shift(base), true),
                    None => Partial::failed(Error::not_evaluable(kind, d.value()), true),
                }
            }
            SourceKind::Entered => {
                let adjust = self.adjustment(d, ctx, d.next)?;
                match self.parser.parse_time(d.value(), now) {
                    Some(at) => Partial::adjusted(adjust.apply(at, now), true),
                    None => Partial::failed(
                        Error::Format {
                            text: d.value().to_string(),
                        },
                        true,
                    ),
                }
            }
            SourceKind::SunTime => {
                let adjust = self.adjustment(d, ctx, d.next)?;
                let t = self.sun_time(d.value(), &adjust, now)?;
                Partial {
                    value: t.value,
                    error: t.error,
                    is_fixed: true,
                }
            }
            SourceKind::MoonTime => {
                let adjust = self.adjustment(d, ctx, d.next)?;
                let t = self.moon_time(d.value(), &adjust, now)?;
                Partial {
                    value: t.value,
                    error: t.error,
                    is_fixed: true,
                }
            }
            SourceKind::SunCalc
            | SourceKind::MoonCalc
            | SourceKind::Number
            | SourceKind::Message(_)
            | SourceKind::Json
            | SourceKind::Context(_) => {
                let is_fixed = matches!(kind, SourceKind::Json);
                let adjust = self.adjustment(d, ctx, d.next)?;
                match lookup(ctx, kind, d.value())?.filter(carries_value) {
                    None => Partial::failed(Error::not_evaluable(kind, d.value()), is_fixed),
                    Some(found) => match instant_from_value(&found, self.parser.as_ref()) {
                        Some(at) => Partial::adjusted(adjust.apply(at, now), is_fixed),
                        None => Partial::failed(
                            Error::Format {
                                text: display_text(&found),
                            },
                            is_fixed,
                        ),
                    },
                }
            }
        })
    }

    // ── Date family ───────────────────────────────────────────────────────

    /// Resolve `d` to a date, failing loudly.
    ///
    /// Roll-forward and weekday rules are not applied; the offset is.
    ///
    /// # Errors
    ///
    /// Any failure, wrapped with `on try to evaluate <kind>.<value>`.
    pub fn resolve_date(
        &mut self,
        d: &TimeDescriptor,
        ctx: &dyn ContextLookup,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        self.date_of(d, ctx, now)
            .map_err(|e| e.with_context(format!("on try to evaluate {}.{}", d.kind(), d.value())))
    }

    fn date_of(
        &mut self,
        d: &TimeDescriptor,
        ctx: &dyn ContextLookup,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        let kind = d.kind();
        match kind {
            SourceKind::None | SourceKind::Now => Ok(now),
            SourceKind::NowWithOffset => self.offset_only(d, ctx)?.shift(now),
            SourceKind::DayOfMonth => {
                let adjust = self.offset_only(d, ctx)?;
                rule_date(d.value(), now)
                    .ok_or_else(|| Error::not_evaluable(kind, d.value()))
                    .and_then(|base| adjust.shift(base))
            }
            SourceKind::SunTime => {
                let adjust = self.offset_only(d, ctx)?;
                self.sun_time(d.value(), &adjust, now)?
                    .into_result(d.value())
            }
            SourceKind::MoonTime => {
                let adjust = self.offset_only(d, ctx)?;
                self.moon_time(d.value(), &adjust, now)?
                    .into_result(d.value())
            }
            SourceKind::Entered => {
                let adjust = self.offset_only(d, ctx)?;
                self.parser
                    .parse_date(d.value())
                    .ok_or_else(|| Error::Format {
                        text: d.value().to_string(),
                    })
                    .and_then(|at| adjust.shift(at))
            }
            SourceKind::SunCalc
            | SourceKind::MoonCalc
            | SourceKind::Number
            | SourceKind::Message(_)
            | SourceKind::Json
            | SourceKind::Context(_)
            | SourceKind::Unknown(_) => {
                let adjust = self.offset_only(d, ctx)?;
                let found = lookup(ctx, kind, d.value())?
                    .ok_or_else(|| Error::not_evaluable(kind, d.value()))?;
                let at = parse_with_format(&found, &d.format, self.parser.as_ref())?;
                adjust.shift(at)
            }
        }
    }

    // ── Output family ─────────────────────────────────────────────────────

    /// Resolve `d` to the value a host writes into its output message.
    ///
    /// Times are rendered in `d.format`; message fields and context values
    /// pass through unchanged; `pdsCalcData` / `pdmCalcData` produce a full
    /// snapshot at the message timestamp.
    ///
    /// # Errors
    ///
    /// Invalid coordinates, unparsable entered text, an unusable custom
    /// format, and failing offset or context lookups.
    pub fn resolve_output(
        &mut self,
        d: &TimeDescriptor,
        ctx: &dyn ContextLookup,
        now: DateTime<Utc>,
    ) -> Result<Value> {
        let kind = d.kind();
        match kind {
            SourceKind::None if d.value().trim().is_empty() => {
                let at = self.offset_only(d, ctx)?.shift(now)?;
                d.format.render(at)
            }
            SourceKind::None => Ok(Value::String(d.value().to_string())),
            SourceKind::Now => Ok(json!(now.timestamp_millis())),
            SourceKind::NowWithOffset => {
                let at = self.offset_only(d, ctx)?.shift(now)?;
                d.format.render(at)
            }
            SourceKind::Message(field) => Ok(ctx.message_field(*field).unwrap_or(Value::Null)),
            SourceKind::SunCalc | SourceKind::MoonCalc => {
                let at = ctx
                    .message_field(MessageField::Ts)
                    .and_then(|ts| instant_from_value(&ts, self.parser.as_ref()));
                let snapshot = if *kind == SourceKind::SunCalc {
                    self.sun_snapshot(at, true, now)?
                } else {
                    self.moon_snapshot(at, true, now)?
                };
                serde_json::to_value(snapshot).map_err(|e| Error::Format {
                    text: e.to_string(),
                })
            }
            SourceKind::SunTime | SourceKind::MoonTime => {
                let adjust = self.adjustment(d, ctx, None)?;
                let t = if *kind == SourceKind::SunTime {
                    self.sun_time(d.value(), &adjust, now)?
                } else {
                    self.moon_time(d.value(), &adjust, now)?
                };
                match (t.value, t.error) {
                    (Some(at), None) => d.format.render(at),
                    _ => Ok(Value::Null),
                }
            }
            SourceKind::Entered => {
                let adjust = self.adjustment(d, ctx, d.next)?;
                let at = self
                    .parser
                    .parse_time(d.value(), now)
                    .ok_or_else(|| Error::Format {
                        text: d.value().to_string(),
                    })?;
                d.format.render(adjust.apply(at, now)?)
            }
            SourceKind::DayOfMonth => {
                let adjust = self.offset_only(d, ctx)?;
                match rule_date(d.value(), now) {
                    Some(base) => d.format.render(adjust.shift(base)?),
                    None => Ok(Value::Null),
                }
            }
            SourceKind::Number
            | SourceKind::Json
            | SourceKind::Context(_)
            | SourceKind::Unknown(_) => {
                Ok(lookup(ctx, kind, d.value())?.unwrap_or(Value::Null))
            }
        }
    }
}
