// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Calendar arithmetic on UTC instants.
//!
//! - [`DayKey`] — cache-invalidation token for a UTC calendar day.
//! - [`add_days`] / [`add_offset`] — instant arithmetic.
//! - [`WeekdayFilter`] — permitted weekdays and the forward day search.
//! - [`DayOfMonthRule`] — "first Monday", "last day", ... of a month.
//!
//! Everything here works on UTC calendar fields.

use crate::error::Error;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use qtty::Seconds;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ═══════════════════════════════════════════════════════════════════════════
// DayKey
// ═══════════════════════════════════════════════════════════════════════════

/// Integer token identifying a UTC calendar day.
///
/// `day + month0 * 31 + year * 372`: unique per day, monotonic within a year
/// and ordered across years. It is not a day count and must not be used for
/// date arithmetic.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey(i64);

impl DayKey {
    pub fn of(instant: DateTime<Utc>) -> Self {
        Self(
            i64::from(instant.day())
                + i64::from(instant.month0()) * 31
                + i64::from(instant.year()) * 372,
        )
    }

    #[inline]
    pub const fn value(&self) -> i64 {
        self.0
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Instant arithmetic
// ═══════════════════════════════════════════════════════════════════════════

/// `instant` shifted by `days` whole UTC days (negative goes back).
///
/// # Errors
///
/// [`Error::OutOfRange`] when the result is not a representable instant.
pub fn add_days(instant: DateTime<Utc>, days: i64) -> crate::error::Result<DateTime<Utc>> {
    Duration::try_days(days)
        .and_then(|shift| instant.checked_add_signed(shift))
        .ok_or(Error::OutOfRange)
}

/// `instant` shifted by `offset × multiplier` seconds.
///
/// The multiplier names the unit the offset was entered in (`1` seconds,
/// `60` minutes, `3600` hours). Sub-millisecond remainders are rounded; a
/// non-finite product leaves `instant` unchanged.
///
/// # Errors
///
/// [`Error::OutOfRange`] when the shift does not fit a millisecond count or
/// the result is not a representable instant.
pub fn add_offset(
    instant: DateTime<Utc>,
    offset: f64,
    multiplier: f64,
) -> crate::error::Result<DateTime<Utc>> {
    let shift = Seconds::new(offset * multiplier);
    if shift.value() == 0.0 || !shift.value().is_finite() {
        return Ok(instant);
    }
    let millis = (shift.value() * 1_000.0).round();
    // i64::MAX as f64 rounds up to 2^63, which is itself out of range.
    if millis.abs() >= i64::MAX as f64 {
        return Err(Error::OutOfRange);
    }
    Duration::try_milliseconds(millis as i64)
        .and_then(|shift| instant.checked_add_signed(shift))
        .ok_or(Error::OutOfRange)
}

// ═══════════════════════════════════════════════════════════════════════════
// Weekday filter
// ═══════════════════════════════════════════════════════════════════════════

/// Permitted weekdays for a resolved time.
///
/// Parsed from the host encoding: `"*"` means any day, an empty string is an
/// empty set, otherwise a list of day numbers `0..=6` (0 = Sunday) separated
/// by commas, semicolons, pipes or spaces.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum WeekdayFilter {
    #[default]
    Any,
    /// Bit `n` set ⇔ weekday `n` (days from Sunday) is allowed.
    Only(u8),
}

impl WeekdayFilter {
    pub fn only<I: IntoIterator<Item = Weekday>>(days: I) -> Self {
        let mask = days
            .into_iter()
            .fold(0u8, |acc, d| acc | 1 << d.num_days_from_sunday());
        WeekdayFilter::Only(mask)
    }

    /// `true` for an explicit filter that admits no day at all.
    pub fn is_empty(&self) -> bool {
        matches!(self, WeekdayFilter::Only(0))
    }

    pub fn allows(&self, day: Weekday) -> bool {
        match self {
            WeekdayFilter::Any => true,
            WeekdayFilter::Only(mask) => mask & (1 << day.num_days_from_sunday()) != 0,
        }
    }

    /// Smallest `delta ∈ 0..7` such that `from + delta` days is allowed.
    ///
    /// `None` when no day of the week qualifies.
    pub fn days_until_allowed(&self, from: Weekday) -> Option<i64> {
        let mut day = from;
        for delta in 0..7 {
            if self.allows(day) {
                return Some(delta);
            }
            day = day.succ();
        }
        None
    }
}

impl FromStr for WeekdayFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "*" {
            return Ok(WeekdayFilter::Any);
        }
        let mask = s
            .split([',', ';', '|', ' '])
            .filter_map(|part| part.trim().parse::<u8>().ok())
            .filter(|n| *n < 7)
            .fold(0u8, |acc, n| acc | 1 << n);
        Ok(WeekdayFilter::Only(mask))
    }
}

impl fmt::Display for WeekdayFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeekdayFilter::Any => f.write_str("*"),
            WeekdayFilter::Only(mask) => {
                let days: Vec<String> = (0..7)
                    .filter(|n| mask & (1 << n) != 0)
                    .map(|n| n.to_string())
                    .collect();
                f.write_str(&days.join(","))
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Day-of-month rules
// ═══════════════════════════════════════════════════════════════════════════

/// Which occurrence inside the month a rule selects.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ordinal {
    First,
    Second,
    Third,
    Fourth,
    Last,
}

/// A qualifying day of a month, e.g. "second Tuesday" or "last day".
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DayOfMonthRule {
    FirstDay,
    LastDay,
    Weekday(Ordinal, Weekday),
}

impl DayOfMonthRule {
    /// The date this rule selects in `year`/`month` (1-based month).
    pub fn date_in(&self, year: i32, month: u32) -> Option<NaiveDate> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let last = last_day_of_month(year, month)?;
        match *self {
            DayOfMonthRule::FirstDay => Some(first),
            DayOfMonthRule::LastDay => Some(last),
            DayOfMonthRule::Weekday(Ordinal::Last, weekday) => {
                let back = (last.weekday().num_days_from_sunday() + 7
                    - weekday.num_days_from_sunday())
                    % 7;
                last.checked_sub_signed(Duration::days(i64::from(back)))
            }
            DayOfMonthRule::Weekday(ordinal, weekday) => {
                let n = match ordinal {
                    Ordinal::First => 1,
                    Ordinal::Second => 2,
                    Ordinal::Third => 3,
                    Ordinal::Fourth | Ordinal::Last => 4,
                };
                NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
            }
        }
    }

    /// The date this rule selects in the month containing `instant`.
    pub fn date_in_month_of(&self, instant: DateTime<Utc>) -> Option<NaiveDate> {
        self.date_in(instant.year(), instant.month())
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (y, m) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1)?.pred_opt()
}

fn parse_weekday(s: &str) -> Option<Weekday> {
    s.trim().parse::<Weekday>().ok()
}

impl FromStr for DayOfMonthRule {
    type Err = String;

    /// Accepts `"first monday"`, `"last-friday"`, `"first day"`, `"last day"`
    /// and the short codes `fMon`, `sTue`, `tWed`, `4Thu`, `lFri`, `fDay`,
    /// `lDay`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();
        let (head, tail) = match lower.split_once([' ', '-', '_']) {
            Some((h, t)) => (h.to_string(), t.to_string()),
            None if trimmed.len() == 4 && trimmed.is_ascii() => {
                (lower[..1].to_string(), lower[1..].to_string())
            }
            None => return Err(format!("unknown day-of-month rule \"{s}\"")),
        };

        let ordinal = match head.as_str() {
            "f" | "first" => Ordinal::First,
            "s" | "second" => Ordinal::Second,
            "t" | "third" => Ordinal::Third,
            "4" | "fourth" => Ordinal::Fourth,
            "l" | "last" => Ordinal::Last,
            _ => return Err(format!("unknown day-of-month rule \"{s}\"")),
        };

        if tail == "day" {
            return match ordinal {
                Ordinal::First => Ok(DayOfMonthRule::FirstDay),
                Ordinal::Last => Ok(DayOfMonthRule::LastDay),
                _ => Err(format!("unknown day-of-month rule \"{s}\"")),
            };
        }
        parse_weekday(&tail)
            .map(|weekday| DayOfMonthRule::Weekday(ordinal, weekday))
            .ok_or_else(|| format!("unknown day-of-month rule \"{s}\""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn day_key_is_stable_within_a_day() {
        assert_eq!(DayKey::of(utc(2024, 3, 10, 0)), DayKey::of(utc(2024, 3, 10, 23)));
    }

    #[test]
    fn day_key_orders_days_across_boundaries() {
        let a = DayKey::of(utc(2024, 1, 31, 12));
        let b = DayKey::of(utc(2024, 2, 1, 12));
        let c = DayKey::of(utc(2025, 1, 1, 0));
        assert!(a < b);
        assert!(b < c);
        assert_ne!(DayKey::of(utc(2024, 12, 31, 0)), c);
    }

    #[test]
    fn offsets_scale_by_multiplier() {
        let t = utc(2024, 6, 1, 12);
        assert_eq!(add_offset(t, 30.0, 60.0), Ok(t + Duration::minutes(30)));
        assert_eq!(add_offset(t, -1.5, 3600.0), Ok(t - Duration::minutes(90)));
        assert_eq!(add_offset(t, 0.0, 60.0), Ok(t));
        assert_eq!(add_offset(t, f64::NAN, 60.0), Ok(t));
    }

    #[test]
    fn huge_offsets_are_out_of_range() {
        let t = utc(2024, 6, 1, 12);
        assert_eq!(add_offset(t, 1e12, 60.0), Err(Error::OutOfRange));
        assert_eq!(add_offset(t, -1e12, 60.0), Err(Error::OutOfRange));
        assert_eq!(add_offset(t, 1e300, 1e300), Ok(t), "infinite product");
        assert_eq!(add_offset(t, f64::MAX, 1.0), Err(Error::OutOfRange));
    }

    #[test]
    fn add_days_crosses_months() {
        assert_eq!(add_days(utc(2024, 2, 28, 6), 2), Ok(utc(2024, 3, 1, 6)));
        assert_eq!(add_days(utc(2024, 3, 1, 6), -1), Ok(utc(2024, 2, 29, 6)));
    }

    #[test]
    fn add_days_past_the_calendar_range_fails() {
        let t = utc(2024, 6, 1, 12);
        assert_eq!(add_days(t, 200_000_000), Err(Error::OutOfRange));
        assert_eq!(add_days(t, i64::MAX), Err(Error::OutOfRange));
        assert_eq!(add_days(DateTime::<Utc>::MAX_UTC, 1), Err(Error::OutOfRange));
    }

    #[test]
    fn weekday_filter_parsing() {
        assert_eq!("*".parse::<WeekdayFilter>().unwrap(), WeekdayFilter::Any);
        assert!("".parse::<WeekdayFilter>().unwrap().is_empty());
        let f: WeekdayFilter = "1, 3;5".parse().unwrap();
        assert!(f.allows(Weekday::Mon));
        assert!(f.allows(Weekday::Wed));
        assert!(f.allows(Weekday::Fri));
        assert!(!f.allows(Weekday::Sun));
        assert_eq!(f.to_string(), "1,3,5");
    }

    #[test]
    fn days_until_allowed_searches_forward() {
        let weekend = WeekdayFilter::only([Weekday::Sat, Weekday::Sun]);
        assert_eq!(weekend.days_until_allowed(Weekday::Sat), Some(0));
        assert_eq!(weekend.days_until_allowed(Weekday::Mon), Some(5));
        assert_eq!(weekend.days_until_allowed(Weekday::Fri), Some(1));
        assert_eq!(WeekdayFilter::Only(0).days_until_allowed(Weekday::Mon), None);
        assert_eq!(WeekdayFilter::Any.days_until_allowed(Weekday::Thu), Some(0));
    }

    #[test]
    fn day_of_month_rules() {
        let nd = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        // June 2024 starts on a Saturday and ends on a Sunday.
        assert_eq!(DayOfMonthRule::FirstDay.date_in(2024, 6), Some(nd(2024, 6, 1)));
        assert_eq!(DayOfMonthRule::LastDay.date_in(2024, 6), Some(nd(2024, 6, 30)));
        assert_eq!(DayOfMonthRule::LastDay.date_in(2024, 2), Some(nd(2024, 2, 29)));
        assert_eq!(DayOfMonthRule::LastDay.date_in(2024, 12), Some(nd(2024, 12, 31)));
        assert_eq!(
            DayOfMonthRule::Weekday(Ordinal::First, Weekday::Mon).date_in(2024, 6),
            Some(nd(2024, 6, 3))
        );
        assert_eq!(
            DayOfMonthRule::Weekday(Ordinal::Second, Weekday::Sat).date_in(2024, 6),
            Some(nd(2024, 6, 8))
        );
        assert_eq!(
            DayOfMonthRule::Weekday(Ordinal::Last, Weekday::Fri).date_in(2024, 6),
            Some(nd(2024, 6, 28))
        );
        assert_eq!(
            DayOfMonthRule::Weekday(Ordinal::Last, Weekday::Sun).date_in(2024, 6),
            Some(nd(2024, 6, 30))
        );
    }

    #[test]
    fn day_of_month_rule_parsing() {
        assert_eq!(
            "fMon".parse::<DayOfMonthRule>().unwrap(),
            DayOfMonthRule::Weekday(Ordinal::First, Weekday::Mon)
        );
        assert_eq!(
            "4Thu".parse::<DayOfMonthRule>().unwrap(),
            DayOfMonthRule::Weekday(Ordinal::Fourth, Weekday::Thu)
        );
        assert_eq!(
            "last-friday".parse::<DayOfMonthRule>().unwrap(),
            DayOfMonthRule::Weekday(Ordinal::Last, Weekday::Fri)
        );
        assert_eq!("lDay".parse::<DayOfMonthRule>().unwrap(), DayOfMonthRule::LastDay);
        assert_eq!("first day".parse::<DayOfMonthRule>().unwrap(), DayOfMonthRule::FirstDay);
        assert!("second day".parse::<DayOfMonthRule>().is_err());
        assert!("someday".parse::<DayOfMonthRule>().is_err());
    }
}
