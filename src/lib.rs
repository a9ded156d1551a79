// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Sun and moon relative time resolution
//!
//! This crate resolves time descriptors such as "sunrise + 30 min, next
//! Friday" against a geographic position, compares rule values with a closed
//! set of operators, and builds solar and lunar position snapshots for
//! automation hosts.
//!
//! # Core types
//!
//! - [`PositionConfig<E>`] — a configured position plus its per-day caches;
//!   every resolver hangs off it.
//! - [`Ephemeris`] — trait supplying raw sun/moon events and positions.
//! - [`TimeDescriptor`] — what to resolve: a [`SourceKind`] tag, its value,
//!   an [`Offset`], roll-forward and a [`WeekdayFilter`].
//! - [`ResolvedTime`] — a resolved instant with its soft error.
//! - [`PositionSnapshot`] — sun or moon position at an instant.
//! - [`CompareOp`] — the comparison operators.
//! - [`SunPositionTrigger`] — azimuth ranges and a start/end window.
//!
//! # Modules
//!
//! | Module | Concern |
//! |--------|---------|
//! | `coordinates` | latitude/longitude validation, angle units |
//! | `calendar` | offsets, weekday filters, day-of-month rules |
//! | `ephemeris` | the data source contract |
//! | `cache` | per-day event tables (today / tomorrow) |
//! | `descriptor` | source tags, properties, offsets, time descriptors |
//! | `format` | output renderings of an instant |
//! | `text` | free-text date parsing |
//! | `context` | host lookups of message and context values |
//! | `events` | sun/moon event resolution with roll-forward |
//! | `position` | debounced position snapshots |
//! | `resolve` | time, date and output resolution |
//! | `compare` | loose value comparison |
//! | `phase` | moon phase classification |
//! | `trigger` | sun-position trigger |
//!
//! # Time
//!
//! All instants are [`chrono::DateTime<Utc>`]. The current instant is always
//! passed in by the caller, so every resolver is deterministic in tests.

mod cache;
mod calendar;
mod compare;
mod config;
mod context;
mod coordinates;
mod descriptor;
mod ephemeris;
mod error;
mod events;
mod format;
mod phase;
mod position;
mod resolve;
mod text;
mod translate;
mod trigger;
mod window;

#[cfg(test)]
mod testing;

// ── Re-exports ────────────────────────────────────────────────────────────

pub use cache::{AstroDayCache, DayTables};
pub use calendar::{add_days, add_offset, DayKey, DayOfMonthRule, Ordinal, WeekdayFilter};
pub use compare::{is_false, is_true, CompareOp};
pub use config::{PositionConfig, PositionSettings, MOON_DEBOUNCE, SUN_DEBOUNCE};
pub use context::{evaluate_literal, ContextLookup, JsonContext, NoContext};
pub use coordinates::{AngleUnit, Coordinates};
pub use descriptor::{
    ContextKind, MessageField, Offset, PropertySource, SourceKind, TimeDescriptor,
    DEFAULT_MULTIPLIER,
};
pub use ephemeris::{
    Ephemeris, MoonEvents, MoonIllumination, MoonPosition, SunEvents, SunPosition,
};
pub use error::{CoordinateError, Error, ErrorKind, Result};
pub use events::{Adjustment, EventTime};
pub use format::OutputFormat;
pub use phase::{MoonPhase, PhaseReading, MOON_PHASES};
pub use position::{Debounce, EventTable, Illumination, MoonDetails, PositionSnapshot};
pub use resolve::ResolvedTime;
pub use text::{instant_from_value, parse_with_format, ChronoTextParser, DateTextParser};
pub use translate::{KeyTranslator, Translator};
pub use trigger::{
    check_limits, AzimuthRule, RuleMatch, StatusFill, SunPositionTrigger, TriggerOutput,
    TriggerSettings, TriggerStatus,
};
pub use window::TimeWindow;

/// The eight named moon phases.
pub mod phases {
    pub use crate::phase::{
        FIRST_QUARTER, FULL_MOON, LAST_QUARTER, NEW_MOON, WANING_CRESCENT, WANING_GIBBOUS,
        WAXING_CRESCENT, WAXING_GIBBOUS,
    };
}
