// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Start/end window between two resolved times.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt;

/// Interval between two UTC instants, typically a resolved start and end
/// time such as sunrise + 30 min to sunset.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use heliotime::TimeWindow;
///
/// let day = TimeWindow::new(
///     Utc.with_ymd_and_hms(2024, 6, 1, 5, 0, 0).unwrap(),
///     Utc.with_ymd_and_hms(2024, 6, 1, 21, 0, 0).unwrap(),
/// );
/// assert!(day.contains(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()));
/// assert_eq!(day.duration().num_hours(), 16);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        TimeWindow { start, end }
    }

    /// Strictly between start and end; both edges are outside.
    ///
    /// A window whose end is not after its start contains nothing.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start < instant && instant < self.end
    }

    /// `end − start`; negative for an inverted window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}
