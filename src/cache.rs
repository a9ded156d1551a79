// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Day-keyed cache of today's and tomorrow's event tables.
//!
//! One [`AstroDayCache`] holds sun events, another moon events. Both are
//! refreshed only when the UTC [`DayKey`] of the reference instant differs
//! from the stored one. The refresh replaces key and both tables in a single
//! assignment, so a reader never sees today's table from one day next to
//! tomorrow's table from another. Exclusive access is enforced by `&mut self`;
//! a shared-across-threads port would wrap the cache in a `Mutex`.

use crate::calendar::{add_days, DayKey};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Event tables of the reference day and the day after.
#[derive(Debug, Clone, PartialEq)]
pub struct DayTables<T> {
    pub today: T,
    pub tomorrow: T,
}

#[derive(Debug, Clone)]
struct Entry<T> {
    key: DayKey,
    tables: DayTables<T>,
}

/// Lazily filled, day-invalidated pair of event tables.
#[derive(Debug, Clone)]
pub struct AstroDayCache<T> {
    label: &'static str,
    entry: Option<Entry<T>>,
    refreshes: u64,
}

impl<T> AstroDayCache<T> {
    /// Empty cache; `label` only appears in log output.
    pub const fn new(label: &'static str) -> Self {
        Self {
            label,
            entry: None,
            refreshes: 0,
        }
    }

    /// Return the tables for the day of `now`, recomputing both with
    /// `compute(now)` and `compute(now + 1 day)` if the stored day differs
    /// or nothing is stored yet.
    ///
    /// On the last representable day, tomorrow's table repeats today's.
    pub fn refresh_if_stale<F>(&mut self, now: DateTime<Utc>, mut compute: F) -> &DayTables<T>
    where
        F: FnMut(DateTime<Utc>) -> T,
    {
        let key = DayKey::of(now);
        let entry = match self.entry.take() {
            Some(entry) if entry.key == key => entry,
            _ => {
                debug!(cache = self.label, day_key = key.value(), "refreshing day tables");
                self.refreshes += 1;
                Entry {
                    key,
                    tables: DayTables {
                        today: compute(now),
                        // The last representable day has no successor.
                        tomorrow: compute(add_days(now, 1).unwrap_or(now)),
                    },
                }
            }
        };
        &self.entry.insert(entry).tables
    }

    /// Stored tables without any freshness check.
    pub fn peek(&self) -> Option<&DayTables<T>> {
        self.entry.as_ref().map(|e| &e.tables)
    }

    /// Day the stored tables belong to.
    pub fn day_key(&self) -> Option<DayKey> {
        self.entry.as_ref().map(|e| e.key)
    }

    /// Number of recomputations since creation.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes
    }

    /// Forget the stored tables, e.g. after the coordinates changed.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, d, h, 0, 0).unwrap()
    }

    #[test]
    fn same_day_does_not_recompute() {
        let mut cache = AstroDayCache::new("test");
        let mut calls = 0;
        cache.refresh_if_stale(at(10, 1), |d| {
            calls += 1;
            d
        });
        cache.refresh_if_stale(at(10, 23), |d| {
            calls += 1;
            d
        });
        assert_eq!(calls, 2, "one refresh computes today and tomorrow");
        assert_eq!(cache.refresh_count(), 1);
    }

    #[test]
    fn day_boundary_recomputes_once() {
        let mut cache = AstroDayCache::new("test");
        cache.refresh_if_stale(at(10, 23), |d| d);
        let tables = cache.refresh_if_stale(at(11, 0), |d| d).clone();
        cache.refresh_if_stale(at(11, 12), |d| d);

        assert_eq!(cache.refresh_count(), 2);
        assert_eq!(tables.today, at(11, 0));
        assert_eq!(tables.tomorrow, at(12, 0));
    }

    #[test]
    fn invalidate_forces_refresh() {
        let mut cache = AstroDayCache::new("test");
        cache.refresh_if_stale(at(10, 1), |d| d);
        cache.invalidate();
        assert!(cache.peek().is_none());
        assert!(cache.day_key().is_none());
        cache.refresh_if_stale(at(10, 2), |d| d);
        assert_eq!(cache.refresh_count(), 2);
    }
}
