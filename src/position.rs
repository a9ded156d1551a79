// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Sun and moon position snapshots.
//!
//! Azimuths from the ephemeris are measured from south; the degree fields
//! are turned to compass bearings (`180° + az`). The `azimuth` / `altitude`
//! fields a host reads follow the configured [`AngleUnit`]: compass degrees,
//! or the raw radians.
//!
//! Snapshot requests without an explicit instant are debounced: a request
//! within [`SUN_DEBOUNCE`](crate::SUN_DEBOUNCE) /
//! [`MOON_DEBOUNCE`](crate::MOON_DEBOUNCE) of the last computed snapshot
//! gets that snapshot back unchanged.

use crate::config::PositionConfig;
use crate::coordinates::{to_degrees, AngleUnit};
use crate::ephemeris::{Ephemeris, MoonEvents, SunEvents};
use crate::error::Result;
use crate::phase::PhaseReading;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

// ═══════════════════════════════════════════════════════════════════════════
// Debounce
// ═══════════════════════════════════════════════════════════════════════════

/// "Reuse if younger than `window`" slot for the last computed result.
#[derive(Debug, Clone)]
pub struct Debounce<T> {
    window: Duration,
    last: Option<(DateTime<Utc>, T)>,
}

impl<T> Debounce<T> {
    pub const fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// The stored result if it was computed less than `window` before (or
    /// after) `now`.
    pub fn fresh(&self, now: DateTime<Utc>) -> Option<&T> {
        self.last
            .as_ref()
            .filter(|(at, _)| (now - *at).abs() < self.window)
            .map(|(_, value)| value)
    }

    pub fn store(&mut self, at: DateTime<Utc>, value: T) {
        self.last = Some((at, value));
    }

    pub fn clear(&mut self) {
        self.last = None;
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Snapshot types
// ═══════════════════════════════════════════════════════════════════════════

/// Event table attached to a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventTable {
    Sun(SunEvents),
    Moon(MoonEvents),
}

/// Illumination block of a moon snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Illumination {
    /// Midpoint angle of the lit limb.
    pub angle: f64,
    pub fraction: f64,
    pub phase: PhaseReading,
    /// `angle − parallactic angle`: the lit limb as seen from the observer.
    pub zenith_angle: f64,
}

/// Moon-only snapshot fields. Angles follow the configured unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoonDetails {
    /// Kilometres.
    pub distance: f64,
    pub parallactic_angle: f64,
    pub illumination: Illumination,
}

/// Position of the sun or the moon at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSnapshot {
    /// Epoch milliseconds of `last_update`.
    pub ts: i64,
    pub last_update: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub angle_type: AngleUnit,
    pub azimuth: f64,
    pub altitude: f64,
    /// Compass bearing, north = 0°.
    pub azimuth_degrees: f64,
    pub altitude_degrees: f64,
    /// South-based, as returned by the ephemeris.
    pub azimuth_radians: f64,
    pub altitude_radians: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub times: Option<EventTable>,
    #[serde(flatten)]
    pub moon: Option<MoonDetails>,
}

impl PositionSnapshot {
    fn new(
        instant: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
        unit: AngleUnit,
        azimuth_radians: f64,
        altitude_radians: f64,
    ) -> Self {
        let azimuth_degrees = 180.0 + to_degrees(azimuth_radians);
        let altitude_degrees = to_degrees(altitude_radians);
        let (azimuth, altitude) = match unit {
            AngleUnit::Degrees => (azimuth_degrees, altitude_degrees),
            AngleUnit::Radians => (azimuth_radians, altitude_radians),
        };
        Self {
            ts: instant.timestamp_millis(),
            last_update: instant,
            latitude,
            longitude,
            angle_type: unit,
            azimuth,
            altitude,
            azimuth_degrees,
            altitude_degrees,
            azimuth_radians,
            altitude_radians,
            times: None,
            moon: None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Calculator
// ═══════════════════════════════════════════════════════════════════════════

impl<E: Ephemeris> PositionConfig<E> {
    /// Sun position at `at`, or at `now` when no instant is given.
    ///
    /// With `include_times` the snapshot carries today's sun events and is
    /// remembered for debouncing.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`](crate::Error::Configuration) for invalid
    /// coordinates.
    pub fn sun_snapshot(
        &mut self,
        at: Option<DateTime<Utc>>,
        include_times: bool,
        now: DateTime<Utc>,
    ) -> Result<PositionSnapshot> {
        self.validate()?;
        if at.is_none() {
            if let Some(last) = self.last_sun.fresh(now) {
                debug!(ts = last.ts, "reusing recent sun position");
                return Ok(last.clone());
            }
        }
        let instant = at.unwrap_or(now);
        let coords = *self.coordinates();
        let pos = self
            .ephemeris
            .sun_position(instant, coords.latitude, coords.longitude);
        let mut snapshot = PositionSnapshot::new(
            instant,
            coords.latitude,
            coords.longitude,
            coords.angle_unit,
            pos.azimuth_radians,
            pos.altitude_radians,
        );

        if include_times {
            let ephemeris = &self.ephemeris;
            let tables = self.sun_times.refresh_if_stale(now, |date| {
                ephemeris.sun_events(date, coords.latitude, coords.longitude)
            });
            snapshot.times = Some(EventTable::Sun(tables.today.clone()));
            self.last_sun.store(instant, snapshot.clone());
        }
        Ok(snapshot)
    }

    /// Moon position, distance, illumination and phase at `at`, or at `now`
    /// when no instant is given.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`](crate::Error::Configuration) for invalid
    /// coordinates.
    pub fn moon_snapshot(
        &mut self,
        at: Option<DateTime<Utc>>,
        include_times: bool,
        now: DateTime<Utc>,
    ) -> Result<PositionSnapshot> {
        self.validate()?;
        if at.is_none() {
            if let Some(last) = self.last_moon.fresh(now) {
                debug!(ts = last.ts, "reusing recent moon position");
                return Ok(last.clone());
            }
        }
        let instant = at.unwrap_or(now);
        let coords = *self.coordinates();
        let unit = coords.angle_unit;
        let pos = self
            .ephemeris
            .moon_position(instant, coords.latitude, coords.longitude);
        let illum = self.ephemeris.moon_illumination(instant);

        let mut snapshot = PositionSnapshot::new(
            instant,
            coords.latitude,
            coords.longitude,
            unit,
            pos.azimuth_radians,
            pos.altitude_radians,
        );
        snapshot.moon = Some(MoonDetails {
            distance: pos.distance,
            parallactic_angle: unit.from_radians(pos.parallactic_angle_radians),
            illumination: Illumination {
                angle: unit.from_radians(illum.angle_radians),
                fraction: illum.fraction,
                phase: PhaseReading::new(illum.phase, unit),
                zenith_angle: unit
                    .from_radians(illum.angle_radians - pos.parallactic_angle_radians),
            },
        });

        if include_times {
            let ephemeris = &self.ephemeris;
            let tables = self.moon_times.refresh_if_stale(now, |date| {
                ephemeris
                    .moon_events(date, coords.latitude, coords.longitude, true)
                    .normalized()
            });
            snapshot.times = Some(EventTable::Moon(tables.today.clone()));
            self.last_moon.store(instant, snapshot.clone());
        }
        Ok(snapshot)
    }
}
