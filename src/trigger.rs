// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Sun-position trigger: azimuth ranges and a start/end window.
//!
//! Each evaluation takes a sun snapshot at the message timestamp (or now),
//! optionally resolves a start and an end time, checks every azimuth rule
//! and reports which rules matched and whether any of them changed state
//! since the previous evaluation.

use crate::config::PositionConfig;
use crate::context::ContextLookup;
use crate::descriptor::{
    raw_string, MessageField, Offset, PropertySource, SourceKind, TimeDescriptor,
    DEFAULT_MULTIPLIER,
};
use crate::ephemeris::Ephemeris;
use crate::error::{Error, Result};
use crate::position::PositionSnapshot;
use crate::text::instant_from_value;
use crate::translate::Translator;
use crate::window::TimeWindow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Whether `value` lies inside the range given by `low` and `high`.
///
/// With both limits, `high < low` describes a range wrapping through zero
/// (e.g. `300..60` across north). A single limit is a one-sided bound.
/// Without limits nothing matches. All bounds are exclusive.
pub fn check_limits(value: f64, low: Option<f64>, high: Option<f64>) -> bool {
    match (low, high) {
        (Some(low), Some(high)) if high > low => value > low && value < high,
        (Some(low), Some(high)) => value > low || value < high,
        (Some(low), None) => value > low,
        (None, Some(high)) => value < high,
        (None, None) => false,
    }
}

/// Azimuth range of one output.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(from = "RawRule")]
pub struct AzimuthRule {
    pub low: PropertySource,
    pub high: PropertySource,
}

impl AzimuthRule {
    pub fn between(low: f64, high: f64) -> Self {
        Self {
            low: PropertySource::number(low),
            high: PropertySource::number(high),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRule {
    #[serde(default, deserialize_with = "raw_string")]
    value_low: String,
    #[serde(default)]
    value_low_type: SourceKind,
    #[serde(default, deserialize_with = "raw_string")]
    value_high: String,
    #[serde(default)]
    value_high_type: SourceKind,
}

impl From<RawRule> for AzimuthRule {
    fn from(raw: RawRule) -> Self {
        AzimuthRule {
            low: PropertySource::new(raw.value_low_type, raw.value_low),
            high: PropertySource::new(raw.value_high_type, raw.value_high),
        }
    }
}

/// Trigger configuration.
///
/// Deserializes from the flat host shape (`start`, `startType`,
/// `startOffset`, `startOffsetType`, `startOffsetMultiplier`, the same for
/// `end`, and `rules`).
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(from = "RawSettings")]
pub struct TriggerSettings {
    pub topic: String,
    pub start: Option<TimeDescriptor>,
    pub end: Option<TimeDescriptor>,
    pub rules: Vec<AzimuthRule>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSettings {
    #[serde(default)]
    topic: String,
    #[serde(default, deserialize_with = "raw_string")]
    start: String,
    #[serde(default)]
    start_type: SourceKind,
    #[serde(default, deserialize_with = "raw_string")]
    start_offset: String,
    #[serde(default)]
    start_offset_type: SourceKind,
    start_offset_multiplier: Option<f64>,
    #[serde(default, deserialize_with = "raw_string")]
    end: String,
    #[serde(default)]
    end_type: SourceKind,
    #[serde(default, deserialize_with = "raw_string")]
    end_offset: String,
    #[serde(default)]
    end_offset_type: SourceKind,
    end_offset_multiplier: Option<f64>,
    #[serde(default)]
    rules: Vec<AzimuthRule>,
}

fn window_edge(
    kind: SourceKind,
    value: String,
    offset: String,
    offset_kind: SourceKind,
    multiplier: Option<f64>,
) -> Option<TimeDescriptor> {
    if kind.is_none() {
        return None;
    }
    let offset_kind = match offset_kind {
        SourceKind::None if !offset.trim().is_empty() => SourceKind::Number,
        other => other,
    };
    Some(TimeDescriptor::new(kind, value).with_offset(Offset {
        source: PropertySource::new(offset_kind, offset),
        multiplier: multiplier.unwrap_or(DEFAULT_MULTIPLIER),
    }))
}

impl From<RawSettings> for TriggerSettings {
    fn from(raw: RawSettings) -> Self {
        TriggerSettings {
            topic: raw.topic,
            start: window_edge(
                raw.start_type,
                raw.start,
                raw.start_offset,
                raw.start_offset_type,
                raw.start_offset_multiplier,
            ),
            end: window_edge(
                raw.end_type,
                raw.end,
                raw.end_offset,
                raw.end_offset_type,
                raw.end_offset_multiplier,
            ),
            rules: raw.rules,
        }
    }
}

/// Status indicator colour.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFill {
    /// Evaluation error.
    Red,
    /// Inside the start/end window.
    Yellow,
    /// Outside the start/end window.
    Blue,
    /// No window configured.
    Grey,
}

/// Short human-readable state of the trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerStatus {
    pub fill: StatusFill,
    pub text: String,
}

/// A rule whose azimuth range contains the sun.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleMatch {
    pub rule: usize,
    /// The rule did not match in the previous evaluation.
    pub changed: bool,
}

/// Result of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerOutput {
    pub topic: String,
    pub position: PositionSnapshot,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Present when both window edges resolved.
    pub sun_in_sky: Option<bool>,
    /// Per-rule state, in rule order.
    pub pos: Vec<bool>,
    /// Any rule changed state.
    pub pos_changed: bool,
    pub matches: Vec<RuleMatch>,
    pub status: TriggerStatus,
}

/// Stateful sun-position trigger.
#[derive(Debug, Clone)]
pub struct SunPositionTrigger {
    settings: TriggerSettings,
    previous: Vec<bool>,
}

impl SunPositionTrigger {
    pub fn new(settings: TriggerSettings) -> Self {
        Self {
            settings,
            previous: Vec::new(),
        }
    }

    pub fn settings(&self) -> &TriggerSettings {
        &self.settings
    }

    /// Rule states of the last evaluation.
    pub fn previous(&self) -> &[bool] {
        &self.previous
    }

    /// Evaluate against the message in `ctx`.
    ///
    /// # Errors
    ///
    /// Invalid coordinates, a non-finite azimuth, and window edges whose
    /// resolution fails outright. A window edge resolving with a soft error
    /// only turns the status red.
    pub fn evaluate<E: Ephemeris>(
        &mut self,
        config: &mut PositionConfig<E>,
        ctx: &dyn ContextLookup,
        translator: &dyn Translator,
        now: DateTime<Utc>,
    ) -> Result<TriggerOutput> {
        let now = ctx
            .message_field(MessageField::Ts)
            .and_then(|ts| instant_from_value(&ts, config.parser.as_ref()))
            .unwrap_or(now);
        let position = config.sun_snapshot(Some(now), true, now)?;
        if !position.azimuth.is_finite() {
            return Err(Error::NotCalculable("azimuth"));
        }

        let mut error_status = None;
        let mut edge = |descriptor: Option<&TimeDescriptor>, failure: &str| -> Result<_> {
            let Some(descriptor) = descriptor else {
                return Ok(None);
            };
            let resolved = config.resolve_time(descriptor, ctx, now)?;
            debug!(kind = %descriptor.kind(), value = resolved.value.timestamp_millis(), "window edge");
            match resolved.error {
                Some(err) => {
                    warn!(%err, "{failure}");
                    error_status = Some(translator.translate(failure, &[]));
                    Ok(None)
                }
                None => Ok(Some(resolved.value)),
            }
        };
        let start_time = edge(self.settings.start.as_ref(), "could not evaluate start time")?;
        let end_time = edge(self.settings.end.as_ref(), "could not evaluate end time")?;

        let window = start_time.zip(end_time).map(|(s, e)| TimeWindow::new(s, e));
        let sun_in_sky = window.map(|w| w.contains(now));

        let mut pos = Vec::with_capacity(self.settings.rules.len());
        let mut matches = Vec::new();
        for (i, rule) in self.settings.rules.iter().enumerate() {
            let limit = |source: &PropertySource| {
                if source.kind.is_none() {
                    return None;
                }
                config.resolve_number(source, ctx, 0.0).ok()
            };
            let inside = check_limits(position.azimuth, limit(&rule.low), limit(&rule.high));
            let changed = self.previous.get(i) != Some(&inside);
            if inside {
                matches.push(RuleMatch { rule: i, changed });
            }
            pos.push(inside);
        }
        let pos_changed = pos
            .iter()
            .enumerate()
            .any(|(i, p)| self.previous.get(i) != Some(p));
        self.previous.clone_from(&pos);

        let status = match (error_status, window) {
            (Some(text), _) => TriggerStatus {
                fill: StatusFill::Red,
                text,
            },
            (None, Some(w)) => TriggerStatus {
                fill: if w.contains(now) {
                    StatusFill::Yellow
                } else {
                    StatusFill::Blue
                },
                text: translator.translate(
                    "{start} - {end}",
                    &[
                        ("start", &w.start.format("%H:%M").to_string()),
                        ("end", &w.end.format("%H:%M").to_string()),
                    ],
                ),
            },
            (None, None) => TriggerStatus {
                fill: StatusFill::Grey,
                text: translator.translate(
                    "{azimuth}/{altitude} - {time}",
                    &[
                        ("azimuth", &format!("{:.2}", position.azimuth)),
                        ("altitude", &format!("{:.2}", position.altitude)),
                        (
                            "time",
                            &position.last_update.format("%Y-%m-%d %H:%M:%S").to_string(),
                        ),
                    ],
                ),
            },
        };

        Ok(TriggerOutput {
            topic: self.settings.topic.clone(),
            position,
            start_time,
            end_time,
            sun_in_sky,
            pos,
            pos_changed,
            matches,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{JsonContext, NoContext};
    use crate::testing::{may15, stub_config};
    use crate::translate::KeyTranslator;
    use serde_json::json;

    #[test]
    fn limits() {
        assert!(check_limits(100.0, Some(90.0), Some(180.0)));
        assert!(!check_limits(90.0, Some(90.0), Some(180.0)), "exclusive");
        assert!(check_limits(350.0, Some(300.0), Some(60.0)), "wraps north");
        assert!(check_limits(10.0, Some(300.0), Some(60.0)));
        assert!(!check_limits(180.0, Some(300.0), Some(60.0)));
        assert!(check_limits(5.0, None, Some(10.0)));
        assert!(check_limits(15.0, Some(10.0), None));
        assert!(!check_limits(15.0, None, None));
    }

    fn rules() -> Vec<AzimuthRule> {
        vec![AzimuthRule::between(90.0, 180.0), AzimuthRule::between(180.0, 270.0)]
    }

    #[test]
    fn rules_match_and_track_changes() {
        let mut config = stub_config();
        config.ephemeris().azimuth.set(120.0);
        let mut trigger = SunPositionTrigger::new(TriggerSettings {
            rules: rules(),
            ..TriggerSettings::default()
        });

        let first = trigger
            .evaluate(&mut config, &NoContext, &KeyTranslator, may15(9, 0))
            .unwrap();
        assert_eq!(first.pos, vec![true, false]);
        assert!(first.pos_changed, "first evaluation changes every rule");
        assert_eq!(first.matches, vec![RuleMatch { rule: 0, changed: true }]);

        let again = trigger
            .evaluate(&mut config, &NoContext, &KeyTranslator, may15(9, 5))
            .unwrap();
        assert!(!again.pos_changed);
        assert_eq!(again.matches, vec![RuleMatch { rule: 0, changed: false }]);

        config.ephemeris().azimuth.set(200.0);
        let moved = trigger
            .evaluate(&mut config, &NoContext, &KeyTranslator, may15(13, 0))
            .unwrap();
        assert_eq!(moved.pos, vec![false, true]);
        assert!(moved.pos_changed);
        assert_eq!(trigger.previous(), &[false, true]);
    }

    #[test]
    fn window_sets_sun_in_sky_and_status() {
        let mut config = stub_config();
        let mut trigger = SunPositionTrigger::new(TriggerSettings {
            start: Some(TimeDescriptor::new("pdsTime", "sunrise").with_offset(Offset::minutes(30.0))),
            end: Some(TimeDescriptor::new("pdsTime", "sunset")),
            ..TriggerSettings::default()
        });

        let day = trigger
            .evaluate(&mut config, &NoContext, &KeyTranslator, may15(12, 0))
            .unwrap();
        assert_eq!(day.start_time, Some(may15(6, 30)));
        assert_eq!(day.sun_in_sky, Some(true));
        assert_eq!(
            day.status,
            TriggerStatus {
                fill: StatusFill::Yellow,
                text: "06:30 - 18:00".into()
            }
        );

        let night = trigger
            .evaluate(&mut config, &NoContext, &KeyTranslator, may15(22, 0))
            .unwrap();
        assert_eq!(night.sun_in_sky, Some(false));
        assert_eq!(night.status.fill, StatusFill::Blue);
    }

    #[test]
    fn message_timestamp_overrides_now() {
        let mut config = stub_config();
        let mut trigger = SunPositionTrigger::new(TriggerSettings {
            start: Some(TimeDescriptor::new("pdsTime", "sunrise")),
            end: Some(TimeDescriptor::new("pdsTime", "sunset")),
            ..TriggerSettings::default()
        });
        let ctx = JsonContext::new(json!({ "ts": may15(12, 0).timestamp_millis() }));
        let out = trigger
            .evaluate(&mut config, &ctx, &KeyTranslator, may15(23, 0))
            .unwrap();
        assert_eq!(out.sun_in_sky, Some(true));
        assert_eq!(out.position.last_update, may15(12, 0));
    }

    #[test]
    fn failing_edge_turns_status_red() {
        let mut config = stub_config();
        let mut trigger = SunPositionTrigger::new(TriggerSettings {
            start: Some(TimeDescriptor::new("pdsTime", "noSuchEvent")),
            end: Some(TimeDescriptor::new("pdsTime", "sunset")),
            ..TriggerSettings::default()
        });
        let out = trigger
            .evaluate(&mut config, &NoContext, &KeyTranslator, may15(12, 0))
            .unwrap();
        assert_eq!(out.start_time, None);
        assert_eq!(out.sun_in_sky, None);
        assert_eq!(
            out.status,
            TriggerStatus {
                fill: StatusFill::Red,
                text: "could not evaluate start time".into()
            }
        );
    }

    #[test]
    fn out_of_range_edge_turns_status_red() {
        let mut config = stub_config();
        let mut trigger = SunPositionTrigger::new(TriggerSettings {
            start: Some(TimeDescriptor::new("pdsTime", "sunrise")),
            end: Some(
                TimeDescriptor::new("pdsTime", "sunset").with_offset(Offset::literal(1e12, 60.0)),
            ),
            ..TriggerSettings::default()
        });
        let out = trigger
            .evaluate(&mut config, &NoContext, &KeyTranslator, may15(12, 0))
            .unwrap();
        assert_eq!(out.end_time, None);
        assert_eq!(out.status.fill, StatusFill::Red);
        assert_eq!(out.status.text, "could not evaluate end time");
    }

    #[test]
    fn no_window_reports_the_position() {
        let mut config = stub_config();
        config.ephemeris().azimuth.set(135.0);
        config.ephemeris().altitude.set(12.5);
        let mut trigger = SunPositionTrigger::new(TriggerSettings::default());
        let out = trigger
            .evaluate(&mut config, &NoContext, &KeyTranslator, may15(8, 0))
            .unwrap();
        assert_eq!(out.status.fill, StatusFill::Grey);
        assert_eq!(out.status.text, "135.00/12.50 - 2024-05-15 08:00:00");
        assert!(!out.pos_changed);
    }

    #[test]
    fn nan_azimuth_is_an_error() {
        let mut config = stub_config();
        config.ephemeris().azimuth.set(f64::NAN);
        let mut trigger = SunPositionTrigger::new(TriggerSettings::default());
        let err = trigger
            .evaluate(&mut config, &NoContext, &KeyTranslator, may15(8, 0))
            .unwrap_err();
        assert_eq!(err, Error::NotCalculable("azimuth"));
    }

    #[test]
    fn unresolvable_limits_are_unset() {
        let mut config = stub_config();
        config.ephemeris().azimuth.set(100.0);
        let mut trigger = SunPositionTrigger::new(TriggerSettings {
            rules: vec![AzimuthRule {
                low: PropertySource::new("flow", "missing"),
                high: PropertySource::number(150.0),
            }],
            ..TriggerSettings::default()
        });
        let out = trigger
            .evaluate(&mut config, &JsonContext::default(), &KeyTranslator, may15(8, 0))
            .unwrap();
        assert_eq!(out.pos, vec![true], "only the upper bound applies");
    }

    #[test]
    fn settings_from_host_json() {
        let settings: TriggerSettings = serde_json::from_value(json!({
            "topic": "sun",
            "start": "sunrise",
            "startType": "pdsTime",
            "startOffset": 15,
            "end": "",
            "endType": "none",
            "rules": [
                { "valueLow": 90, "valueLowType": "num", "valueHigh": "limits.high", "valueHighType": "flow" }
            ]
        }))
        .unwrap();
        assert_eq!(settings.topic, "sun");
        let start = settings.start.unwrap();
        assert_eq!(start.value(), "sunrise");
        assert_eq!(start.offset, Offset::minutes(15.0));
        assert!(settings.end.is_none());
        assert_eq!(settings.rules[0].high, PropertySource::new("flow", "limits.high"));
    }
}
