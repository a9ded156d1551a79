// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Shared fixtures for unit tests.

use crate::config::{PositionConfig, PositionSettings};
use crate::coordinates::AngleUnit;
use crate::ephemeris::{
    Ephemeris, MoonEvents, MoonIllumination, MoonPosition, SunEvents, SunPosition,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::cell::Cell;

/// Same events every day: dawn 05:30, sunrise 06:00, solar noon 12:00,
/// sunset 18:00, dusk 18:30; moonset 08:00, moonrise 20:00.
///
/// The sun stands at a settable compass azimuth and altitude (degrees).
pub(crate) struct StubEphemeris {
    pub azimuth: Cell<f64>,
    pub altitude: Cell<f64>,
    pub sun_event_calls: Cell<u32>,
}

impl Default for StubEphemeris {
    fn default() -> Self {
        Self {
            azimuth: Cell::new(180.0),
            altitude: Cell::new(30.0),
            sun_event_calls: Cell::new(0),
        }
    }
}

pub(crate) fn midnight(date: DateTime<Utc>) -> DateTime<Utc> {
    date - Duration::milliseconds(
        date.timestamp_millis().rem_euclid(Duration::days(1).num_milliseconds()),
    )
}

impl Ephemeris for StubEphemeris {
    fn sun_events(&self, date: DateTime<Utc>, _: f64, _: f64) -> SunEvents {
        self.sun_event_calls.set(self.sun_event_calls.get() + 1);
        let day = midnight(date);
        [
            ("dawn", day + Duration::minutes(330)),
            ("sunrise", day + Duration::hours(6)),
            ("solarNoon", day + Duration::hours(12)),
            ("sunset", day + Duration::hours(18)),
            ("dusk", day + Duration::minutes(1110)),
        ]
        .into_iter()
        .collect()
    }

    fn moon_events(&self, date: DateTime<Utc>, _: f64, _: f64, _: bool) -> MoonEvents {
        let day = midnight(date);
        MoonEvents {
            rise: Some(day + Duration::hours(20)),
            set: Some(day + Duration::hours(8)),
            ..MoonEvents::default()
        }
    }

    fn sun_position(&self, _: DateTime<Utc>, _: f64, _: f64) -> SunPosition {
        SunPosition {
            azimuth_radians: (self.azimuth.get() - 180.0).to_radians(),
            altitude_radians: self.altitude.get().to_radians(),
        }
    }

    fn moon_position(&self, _: DateTime<Utc>, _: f64, _: f64) -> MoonPosition {
        MoonPosition {
            azimuth_radians: 0.0,
            altitude_radians: 0.1,
            distance: 384_400.0,
            parallactic_angle_radians: 0.2,
        }
    }

    fn moon_illumination(&self, _: DateTime<Utc>) -> MoonIllumination {
        MoonIllumination {
            fraction: 1.0,
            phase: 0.5,
            angle_radians: 0.3,
        }
    }
}

pub(crate) fn stub_config() -> PositionConfig<StubEphemeris> {
    PositionConfig::new(
        PositionSettings {
            name: "stub".into(),
            latitude: 50.0,
            longitude: 8.0,
            angle_unit: AngleUnit::Degrees,
        },
        StubEphemeris::default(),
    )
}

/// 2024-05-15 (a Wednesday) at `h:m` UTC.
pub(crate) fn may15(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 15, h, m, 0).unwrap()
}
