// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Observer coordinates and the angle unit used for reported directions.

use crate::error::CoordinateError;
use qtty::{Degree, Radians};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output convention for every directional value in a snapshot.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AngleUnit {
    #[default]
    #[serde(rename = "deg", alias = "degrees")]
    Degrees,
    #[serde(rename = "rad", alias = "radians")]
    Radians,
}

impl AngleUnit {
    /// Express a radian value in this unit.
    #[inline]
    pub fn from_radians(self, radians: f64) -> f64 {
        match self {
            AngleUnit::Degrees => to_degrees(radians),
            AngleUnit::Radians => radians,
        }
    }
}

impl fmt::Display for AngleUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AngleUnit::Degrees => f.write_str("deg"),
            AngleUnit::Radians => f.write_str("rad"),
        }
    }
}

/// Radians → degrees through `qtty`.
#[inline]
pub(crate) fn to_degrees(radians: f64) -> f64 {
    Radians::new(radians).to::<Degree>().value()
}

/// Geographic position of the observer.
///
/// `latitude` is in `-90..=90`, `longitude` in `-180..=180`; both exactly
/// zero means "not configured". The fields stay public so a host can mutate
/// them at any time: [`Coordinates::validate`] is re-run before every
/// astronomical computation.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub angle_unit: AngleUnit,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64, angle_unit: AngleUnit) -> Self {
        Self {
            latitude,
            longitude,
            angle_unit,
        }
    }

    /// Check that both components are finite, in range, and not the
    /// `(0, 0)` "unset" marker.
    pub fn validate(&self) -> Result<(), CoordinateError> {
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(CoordinateError::LongitudeMissing(self.longitude));
        }
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(CoordinateError::LatitudeMissing(self.latitude));
        }
        if self.latitude == 0.0 && self.longitude == 0.0 {
            return Err(CoordinateError::CoordinatesMissing);
        }
        Ok(())
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}
