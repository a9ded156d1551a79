// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! The ephemeris contract consumed by the resolvers.
//!
//! The crate does not compute raw sun/moon events or positions itself; a host
//! plugs in any implementation of [`Ephemeris`] (a suncalc port, a VSOP-based
//! engine, or a fixed table in tests).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named solar events of one day (`sunrise`, `sunset`, `solarNoon`, `dawn`,
/// `dusk`, `night`, `nadir`, golden/blue-hour variants, ...).
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SunEvents(BTreeMap<String, DateTime<Utc>>);

impl SunEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, event: impl Into<String>, at: DateTime<Utc>) {
        self.0.insert(event.into(), at);
    }

    pub fn get(&self, event: &str) -> Option<DateTime<Utc>> {
        self.0.get(event).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, DateTime<Utc>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<S: Into<String>> FromIterator<(S, DateTime<Utc>)> for SunEvents {
    fn from_iter<I: IntoIterator<Item = (S, DateTime<Utc>)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Moon rise/set of one day.
///
/// `always_up` / `always_down` are `None` when the ephemeris does not report
/// them; the day cache normalises them to `Some(false)`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoonEvents {
    pub rise: Option<DateTime<Utc>>,
    pub set: Option<DateTime<Utc>>,
    pub always_up: Option<bool>,
    pub always_down: Option<bool>,
}

impl MoonEvents {
    /// Event lookup by the names hosts use (`rise`, `set`).
    pub fn get(&self, event: &str) -> Option<DateTime<Utc>> {
        match event {
            "rise" => self.rise,
            "set" => self.set,
            _ => None,
        }
    }

    /// Absent "always" flags mean "not applicable".
    pub fn normalized(mut self) -> Self {
        self.always_up.get_or_insert(false);
        self.always_down.get_or_insert(false);
        self
    }
}

/// Sun direction; azimuth is measured from south towards west, as suncalc does.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct SunPosition {
    pub azimuth_radians: f64,
    pub altitude_radians: f64,
}

/// Moon direction, distance (km) and parallactic angle.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoonPosition {
    pub azimuth_radians: f64,
    pub altitude_radians: f64,
    pub distance: f64,
    pub parallactic_angle_radians: f64,
}

/// Lit part of the moon.
///
/// `fraction` is the illuminated fraction of the disc; `phase` is the
/// position in the synodic cycle (0 new, 0.25 first quarter, 0.5 full,
/// 0.75 last quarter); `angle_radians` is the midpoint angle of the lit limb.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoonIllumination {
    pub fraction: f64,
    pub phase: f64,
    pub angle_radians: f64,
}

/// Source of raw solar and lunar data for a date and position.
pub trait Ephemeris {
    fn sun_events(&self, date: DateTime<Utc>, latitude: f64, longitude: f64) -> SunEvents;

    fn moon_events(
        &self,
        date: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
        in_utc: bool,
    ) -> MoonEvents;

    fn sun_position(&self, instant: DateTime<Utc>, latitude: f64, longitude: f64) -> SunPosition;

    fn moon_position(&self, instant: DateTime<Utc>, latitude: f64, longitude: f64)
        -> MoonPosition;

    fn moon_illumination(&self, instant: DateTime<Utc>) -> MoonIllumination;
}

impl<E: Ephemeris + ?Sized> Ephemeris for Box<E> {
    fn sun_events(&self, date: DateTime<Utc>, latitude: f64, longitude: f64) -> SunEvents {
        (**self).sun_events(date, latitude, longitude)
    }

    fn moon_events(
        &self,
        date: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
        in_utc: bool,
    ) -> MoonEvents {
        (**self).moon_events(date, latitude, longitude, in_utc)
    }

    fn sun_position(&self, instant: DateTime<Utc>, latitude: f64, longitude: f64) -> SunPosition {
        (**self).sun_position(instant, latitude, longitude)
    }

    fn moon_position(
        &self,
        instant: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
    ) -> MoonPosition {
        (**self).moon_position(instant, latitude, longitude)
    }

    fn moon_illumination(&self, instant: DateTime<Utc>) -> MoonIllumination {
        (**self).moon_illumination(instant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn moon_flags_default_to_false() {
        let events = MoonEvents::default().normalized();
        assert_eq!(events.always_up, Some(false));
        assert_eq!(events.always_down, Some(false));

        let up = MoonEvents {
            always_up: Some(true),
            ..MoonEvents::default()
        }
        .normalized();
        assert_eq!(up.always_up, Some(true));
    }

    #[test]
    fn moon_event_names() {
        let rise = Utc.with_ymd_and_hms(2024, 5, 1, 3, 0, 0).unwrap();
        let events = MoonEvents {
            rise: Some(rise),
            ..MoonEvents::default()
        };
        assert_eq!(events.get("rise"), Some(rise));
        assert_eq!(events.get("set"), None);
        assert_eq!(events.get("sunrise"), None);
    }

    #[test]
    fn sun_events_serialize_as_a_flat_map() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 4, 30, 0).unwrap();
        let events: SunEvents = [("sunrise", t)].into_iter().collect();
        let json = serde_json::to_value(&events).unwrap();
        assert_eq!(json["sunrise"], "2024-05-01T04:30:00Z");
        assert_eq!(events.len(), 1);
    }
}
