// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Discrete moon phases.
//!
//! The lunar cycle position `p ∈ [0, 1]` is split into eight entries. The
//! quarter points get a narrow 0.01 band of their own:
//!
//! | `p` | Phase |
//! |-----|-------|
//! | `< 0.01` | New Moon |
//! | `< 0.25` | Waxing Crescent |
//! | `< 0.26` | First Quarter |
//! | `< 0.50` | Waxing Gibbous |
//! | `< 0.51` | Full Moon |
//! | `≤ 0.75` | Waning Gibbous |
//! | `< 0.76` | Last Quarter |
//! | otherwise | Waning Crescent |

use crate::coordinates::AngleUnit;
use serde::Serialize;

/// One entry of the static phase catalog.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct MoonPhase {
    pub name: &'static str,
    pub emoji: &'static str,
    pub code: &'static str,
    /// Relative share of the cycle; the quarter points are rare instants.
    pub weight: f64,
}

pub const NEW_MOON: MoonPhase = MoonPhase {
    name: "New Moon",
    emoji: "🌚",
    code: ":new_moon_with_face:",
    weight: 1.0,
};

pub const WAXING_CRESCENT: MoonPhase = MoonPhase {
    name: "Waxing Crescent",
    emoji: "🌒",
    code: ":waxing_crescent_moon:",
    weight: 6.3825,
};

pub const FIRST_QUARTER: MoonPhase = MoonPhase {
    name: "First Quarter",
    emoji: "🌓",
    code: ":first_quarter_moon:",
    weight: 1.0,
};

pub const WAXING_GIBBOUS: MoonPhase = MoonPhase {
    name: "Waxing Gibbous",
    emoji: "🌔",
    code: ":waxing_gibbous_moon:",
    weight: 6.3825,
};

pub const FULL_MOON: MoonPhase = MoonPhase {
    name: "Full Moon",
    emoji: "🌝",
    code: ":full_moon_with_face:",
    weight: 1.0,
};

pub const WANING_GIBBOUS: MoonPhase = MoonPhase {
    name: "Waning Gibbous",
    emoji: "🌖",
    code: ":waning_gibbous_moon:",
    weight: 6.3825,
};

pub const LAST_QUARTER: MoonPhase = MoonPhase {
    name: "Last Quarter",
    emoji: "🌗",
    code: ":last_quarter_moon:",
    weight: 1.0,
};

pub const WANING_CRESCENT: MoonPhase = MoonPhase {
    name: "Waning Crescent",
    emoji: "🌘",
    code: ":waning_crescent_moon:",
    weight: 6.3825,
};

/// The full catalog in cycle order.
pub static MOON_PHASES: [MoonPhase; 8] = [
    NEW_MOON,
    WAXING_CRESCENT,
    FIRST_QUARTER,
    WAXING_GIBBOUS,
    FULL_MOON,
    WANING_GIBBOUS,
    LAST_QUARTER,
    WANING_CRESCENT,
];

impl MoonPhase {
    /// Catalog entry for cycle position `p`.
    pub fn classify(p: f64) -> &'static MoonPhase {
        let index = if p < 0.01 {
            0
        } else if p < 0.25 {
            1
        } else if p < 0.26 {
            2
        } else if p < 0.50 {
            3
        } else if p < 0.51 {
            4
        } else if p <= 0.75 {
            5
        } else if p < 0.76 {
            6
        } else {
            7
        };
        &MOON_PHASES[index]
    }
}

/// A catalog entry annotated with the value it was selected for.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct PhaseReading {
    #[serde(flatten)]
    pub phase: MoonPhase,
    /// The raw cycle position.
    pub value: f64,
    /// `value × 360°`, in the configured unit.
    pub angle: f64,
}

impl PhaseReading {
    pub fn new(p: f64, unit: AngleUnit) -> Self {
        let degrees = p * 360.0;
        let angle = match unit {
            AngleUnit::Degrees => degrees,
            AngleUnit::Radians => degrees.to_radians(),
        };
        Self {
            phase: *MoonPhase::classify(p),
            value: p,
            angle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_map_to_catalog() {
        let cases = [
            (0.0, "New Moon"),
            (0.009, "New Moon"),
            (0.01, "Waxing Crescent"),
            (0.249, "Waxing Crescent"),
            (0.25, "First Quarter"),
            (0.259, "First Quarter"),
            (0.26, "Waxing Gibbous"),
            (0.499, "Waxing Gibbous"),
            (0.50, "Full Moon"),
            (0.509, "Full Moon"),
            (0.51, "Waning Gibbous"),
            (0.75, "Waning Gibbous"),
            (0.759, "Last Quarter"),
            (0.76, "Waning Crescent"),
            (0.99, "Waning Crescent"),
            (1.0, "Waning Crescent"),
        ];
        for (p, name) in cases {
            assert_eq!(MoonPhase::classify(p).name, name, "p = {p}");
        }
    }

    #[test]
    fn reading_carries_value_and_angle() {
        let deg = PhaseReading::new(0.5, AngleUnit::Degrees);
        assert_eq!(deg.phase, FULL_MOON);
        assert_eq!(deg.value, 0.5);
        assert!((deg.angle - 180.0).abs() < 1e-12);

        let rad = PhaseReading::new(0.5, AngleUnit::Radians);
        assert!((rad.angle - std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn reading_serializes_flat() {
        let json = serde_json::to_value(PhaseReading::new(0.0, AngleUnit::Degrees)).unwrap();
        assert_eq!(json["name"], "New Moon");
        assert_eq!(json["code"], ":new_moon_with_face:");
        assert_eq!(json["value"], 0.0);
    }
}
