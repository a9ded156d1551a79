// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Per-configuration state: observer position, ephemeris, caches.
//!
//! A [`PositionConfig`] is what the host creates once per configured
//! location. Every resolver and snapshot entry point hangs off it:
//!
//! - event times — [`sun_time`](PositionConfig::sun_time), [`moon_time`](PositionConfig::moon_time)
//! - snapshots — [`sun_snapshot`](PositionConfig::sun_snapshot), [`moon_snapshot`](PositionConfig::moon_snapshot)
//! - descriptors — [`resolve_time`](PositionConfig::resolve_time),
//!   [`resolve_date`](PositionConfig::resolve_date),
//!   [`resolve_output`](PositionConfig::resolve_output),
//!   [`resolve_number`](PositionConfig::resolve_number),
//!   [`resolve_value`](PositionConfig::resolve_value),
//!   [`compare`](PositionConfig::compare)

use crate::cache::AstroDayCache;
use crate::coordinates::{AngleUnit, Coordinates};
use crate::ephemeris::{Ephemeris, MoonEvents, SunEvents};
use crate::error::{Error, Result};
use crate::position::{Debounce, PositionSnapshot};
use crate::text::{ChronoTextParser, DateTextParser};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Sun snapshots requested without an instant within this window of the
/// previous one are reused.
pub const SUN_DEBOUNCE: Duration = Duration::milliseconds(4_000);

/// Moon counterpart of [`SUN_DEBOUNCE`].
pub const MOON_DEBOUNCE: Duration = Duration::milliseconds(3_000);

/// Serializable settings of one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSettings {
    #[serde(default)]
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, alias = "angleType")]
    pub angle_unit: AngleUnit,
}

impl PositionSettings {
    /// Read settings from a JSON document.
    ///
    /// Coordinates are not validated here; they are checked before each
    /// astronomical computation.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Format {
            text: e.to_string(),
        })
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude, self.angle_unit)
    }
}

/// One configured location with its ephemeris and caches.
pub struct PositionConfig<E> {
    name: String,
    coordinates: Coordinates,
    pub(crate) ephemeris: E,
    pub(crate) parser: Box<dyn DateTextParser>,
    pub(crate) sun_times: AstroDayCache<SunEvents>,
    pub(crate) moon_times: AstroDayCache<MoonEvents>,
    pub(crate) last_sun: Debounce<PositionSnapshot>,
    pub(crate) last_moon: Debounce<PositionSnapshot>,
}

impl<E: Ephemeris> PositionConfig<E> {
    pub fn new(settings: PositionSettings, ephemeris: E) -> Self {
        Self {
            coordinates: settings.coordinates(),
            name: settings.name,
            ephemeris,
            parser: Box::new(ChronoTextParser),
            sun_times: AstroDayCache::new("sun"),
            moon_times: AstroDayCache::new("moon"),
            last_sun: Debounce::new(SUN_DEBOUNCE),
            last_moon: Debounce::new(MOON_DEBOUNCE),
        }
    }

    /// Replace the free-text date parser.
    pub fn with_parser(mut self, parser: impl DateTextParser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coordinates(&self) -> &Coordinates {
        &self.coordinates
    }

    pub fn angle_unit(&self) -> AngleUnit {
        self.coordinates.angle_unit
    }

    pub fn ephemeris(&self) -> &E {
        &self.ephemeris
    }

    /// Move the observer. Cached tables and snapshots are dropped.
    pub fn set_coordinates(&mut self, coordinates: Coordinates) {
        self.coordinates = coordinates;
        self.sun_times.invalidate();
        self.moon_times.invalidate();
        self.last_sun.clear();
        self.last_moon.clear();
    }

    /// Check the current coordinates; called before every astronomical
    /// computation.
    pub fn validate(&self) -> Result<()> {
        self.coordinates.validate().map_err(Error::from)
    }

    /// Sun event cache, for inspection.
    pub fn sun_cache(&self) -> &AstroDayCache<SunEvents> {
        &self.sun_times
    }

    /// Moon event cache, for inspection.
    pub fn moon_cache(&self) -> &AstroDayCache<MoonEvents> {
        &self.moon_times
    }
}
