// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Named sun and moon event times.
//!
//! An event time is looked up in the day tables of the cache and then
//! adjusted in three steps, each of which re-applies the offset to the
//! freshly looked-up event:
//!
//! 1. offset — `offset × multiplier` seconds are added;
//! 2. roll forward — when `next = n` is set and the candidate is not after
//!    `now`, the event is taken from tomorrow's table (`n = 1`) or from a
//!    table computed for `now + n` days;
//! 3. weekday — when the candidate falls on a day the [`WeekdayFilter`]
//!    excludes, the event is taken from the table of the nearest allowed day.

use crate::cache::DayTables;
use crate::calendar::{add_days, add_offset, WeekdayFilter};
use crate::config::PositionConfig;
use crate::descriptor::DEFAULT_MULTIPLIER;
use crate::ephemeris::{Ephemeris, MoonEvents, SunEvents};
use crate::error::{Error, Result};
use chrono::{DateTime, Datelike, Utc};
use tracing::debug;

/// Offset, roll-forward and weekday rules applied to a base instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adjustment<'a> {
    pub offset: f64,
    /// Seconds per offset unit.
    pub multiplier: f64,
    pub next: Option<u32>,
    pub days: &'a WeekdayFilter,
}

impl Default for Adjustment<'_> {
    fn default() -> Self {
        Self {
            offset: 0.0,
            multiplier: DEFAULT_MULTIPLIER,
            next: None,
            days: &WeekdayFilter::Any,
        }
    }
}

impl<'a> Adjustment<'a> {
    pub fn offset(offset: f64, multiplier: f64) -> Self {
        Self {
            offset,
            multiplier,
            ..Self::default()
        }
    }

    pub fn with_next(mut self, next: u32) -> Self {
        self.next = Some(next);
        self
    }

    pub fn with_days(mut self, days: &'a WeekdayFilter) -> Self {
        self.days = days;
        self
    }

    #[inline]
    pub(crate) fn shift(&self, at: DateTime<Utc>) -> Result<DateTime<Utc>> {
        add_offset(at, self.offset, self.multiplier)
    }

    fn roll_count(&self) -> Option<i64> {
        self.next.filter(|n| *n > 0).map(i64::from)
    }

    /// Adjust a plain instant: offset, then `next` whole days if not after
    /// `now`, then forward to the nearest allowed weekday.
    pub fn apply(&self, at: DateTime<Utc>, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let mut at = self.shift(at)?;
        if let Some(n) = self.roll_count() {
            if at <= now {
                at = add_days(at, n)?;
            }
        }
        match self.days.days_until_allowed(at.weekday()) {
            Some(delta) => add_days(at, delta),
            None => Err(Error::NoValidWeekday),
        }
    }
}

/// Outcome of an event lookup.
///
/// `value` is `None` when the ephemeris has no such event for the day;
/// `error` carries the soft failure, if any. Both can be set at once.
#[derive(Debug, Clone, PartialEq)]
pub struct EventTime {
    pub value: Option<DateTime<Utc>>,
    pub error: Option<Error>,
}

impl EventTime {
    /// The value if it was found without error.
    pub fn into_result(self, event: &str) -> Result<DateTime<Utc>> {
        match (self.value, self.error) {
            (Some(value), None) => Ok(value),
            (_, Some(error)) => Err(error),
            (None, None) => Err(Error::NoValidTime {
                event: event.to_string(),
            }),
        }
    }
}

pub(crate) trait EventLookup {
    fn event(&self, name: &str) -> Option<DateTime<Utc>>;
}

impl EventLookup for SunEvents {
    fn event(&self, name: &str) -> Option<DateTime<Utc>> {
        self.get(name)
    }
}

impl EventLookup for MoonEvents {
    fn event(&self, name: &str) -> Option<DateTime<Utc>> {
        self.get(name)
    }
}

fn resolve_event<T, F>(
    tables: &DayTables<T>,
    compute: F,
    event: &str,
    adjust: &Adjustment<'_>,
    now: DateTime<Utc>,
) -> EventTime
where
    T: EventLookup,
    F: Fn(DateTime<Utc>) -> T,
{
    adjusted_event(tables, compute, event, adjust, now).unwrap_or_else(|error| {
        debug!(event, %error, "event time out of range");
        EventTime {
            value: None,
            error: Some(error),
        }
    })
}

fn adjusted_event<T, F>(
    tables: &DayTables<T>,
    compute: F,
    event: &str,
    adjust: &Adjustment<'_>,
    now: DateTime<Utc>,
) -> Result<EventTime>
where
    T: EventLookup,
    F: Fn(DateTime<Utc>) -> T,
{
    let shift = |at: Option<DateTime<Utc>>| at.map(|t| adjust.shift(t)).transpose();
    let mut value = shift(tables.today.event(event))?;

    if let (Some(n), Some(candidate)) = (adjust.roll_count(), value) {
        if candidate <= now {
            let rolled = if n == 1 {
                tables.tomorrow.event(event)
            } else {
                compute(add_days(now, n)?).event(event)
            };
            value = shift(rolled)?;
            debug!(event, next = n, "event already passed, rolled forward");
        }
    }

    let mut error = None;
    if let Some(candidate) = value {
        match adjust.days.days_until_allowed(candidate.weekday()) {
            Some(0) => {}
            Some(delta) => {
                value = shift(compute(add_days(candidate, delta)?).event(event))?;
                debug!(event, delta, "shifted to the next allowed weekday");
            }
            None => error = Some(Error::NoValidWeekday),
        }
    }

    Ok(EventTime { value, error })
}

impl<E: Ephemeris> PositionConfig<E> {
    /// Time of the solar event `event` (`sunrise`, `sunset`, `solarNoon`, ...).
    ///
    /// An event the ephemeris does not report for the day leaves `value`
    /// empty without an error.
    ///
    /// # Errors
    ///
    /// Only [`Error::Configuration`] for invalid coordinates.
    pub fn sun_time(
        &mut self,
        event: &str,
        adjust: &Adjustment<'_>,
        now: DateTime<Utc>,
    ) -> Result<EventTime> {
        self.validate()?;
        let (latitude, longitude) = (self.coordinates().latitude, self.coordinates().longitude);
        let ephemeris = &self.ephemeris;
        let compute = |date: DateTime<Utc>| ephemeris.sun_events(date, latitude, longitude);
        let tables = self.sun_times.refresh_if_stale(now, compute);
        Ok(resolve_event(tables, compute, event, adjust, now))
    }

    /// Time of the lunar event `event` (`rise` or `set`).
    ///
    /// A missing event is reported as [`Error::NoValidTime`].
    ///
    /// # Errors
    ///
    /// Only [`Error::Configuration`] for invalid coordinates.
    pub fn moon_time(
        &mut self,
        event: &str,
        adjust: &Adjustment<'_>,
        now: DateTime<Utc>,
    ) -> Result<EventTime> {
        self.validate()?;
        let (latitude, longitude) = (self.coordinates().latitude, self.coordinates().longitude);
        let ephemeris = &self.ephemeris;
        let compute = |date: DateTime<Utc>| {
            ephemeris
                .moon_events(date, latitude, longitude, true)
                .normalized()
        };
        let tables = self.moon_times.refresh_if_stale(now, compute);
        let mut result = resolve_event(tables, compute, event, adjust, now);
        if result.value.is_none() {
            result.error.get_or_insert_with(|| Error::NoValidTime {
                event: event.to_string(),
            });
        }
        Ok(result)
    }
}
