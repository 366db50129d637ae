//! Time types for timetable lessons.
//!
//! This module provides [`ClockTime`] for school-local wall-clock times (which
//! may legitimately end at `24:00`), and [`DateRange`] for defining query
//! windows over calendar dates.

use std::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// A wall-clock time of day, stored as minutes since midnight.
///
/// Unlike [`NaiveTime`], `24:00` is representable so that a lesson ending at
/// midnight still belongs to the day it started on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClockTime(u16);

impl ClockTime {
    /// Minutes in a day; the largest representable value (`24:00`).
    pub const END_OF_DAY: u16 = 24 * 60;

    /// Midnight at the start of the day.
    pub const MIDNIGHT: ClockTime = ClockTime(0);

    /// Creates a clock time from hours and minutes.
    ///
    /// Returns `None` for anything past `24:00` or with minutes >= 60.
    pub fn from_hm(hours: u32, minutes: u32) -> Option<Self> {
        if minutes >= 60 {
            return None;
        }
        let total = hours.checked_mul(60)?.checked_add(minutes)?;
        if total > u32::from(Self::END_OF_DAY) {
            return None;
        }
        Some(Self(total as u16))
    }

    /// Parses the compact `HHMM` integer encoding used by WebUntis
    /// (e.g. `745` for 07:45, `1330` for 13:30).
    pub fn from_hhmm(value: u32) -> Option<Self> {
        Self::from_hm(value / 100, value % 100)
    }

    /// Returns the number of minutes since midnight.
    pub fn minutes(self) -> u16 {
        self.0
    }

    /// Returns the hour component (0..=24).
    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    /// Returns the minute component (0..=59).
    pub fn minute(self) -> u16 {
        self.0 % 60
    }

    /// Returns the local datetime this clock time denotes on `date`.
    ///
    /// `24:00` maps to midnight of the following day.
    pub fn on(self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(NaiveTime::default()) + Duration::minutes(i64::from(self.0))
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

/// A range of calendar dates.
///
/// Represents a half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First date in the range (inclusive).
    pub start: NaiveDate,
    /// End of the range (exclusive).
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a new date range.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        assert!(start <= end, "DateRange start must be <= end");
        Self { start, end }
    }

    /// Creates a date range, collapsing it to an empty range at `start` when
    /// `end` precedes `start`.
    pub fn clamped(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Creates a range covering `start` through `last`, both inclusive.
    pub fn inclusive(start: NaiveDate, last: NaiveDate) -> Self {
        Self::clamped(start, last + Duration::days(1))
    }

    /// Returns true if the range contains no dates.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Returns the number of dates in the range.
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days().max(0)
    }

    /// Checks if a date falls within this range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    /// Returns the last date in the range, if any.
    pub fn last(&self) -> Option<NaiveDate> {
        if self.is_empty() {
            None
        } else {
            self.end.pred_opt()
        }
    }

    /// Iterates over every date in the range in ascending order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start
            .iter_days()
            .take_while(move |date| *date < self.end)
    }

    /// Splits the range into consecutive inclusive `(first, last)` chunks of
    /// at most `chunk_days` dates each.
    ///
    /// Remote timetable APIs take inclusive bounds and reject very long
    /// ranges, so fetches are issued chunk by chunk.
    pub fn chunks(&self, chunk_days: u32) -> Vec<(NaiveDate, NaiveDate)> {
        let step = Duration::days(i64::from(chunk_days.max(1)));
        let mut chunks = Vec::new();
        let mut first = self.start;
        while first < self.end {
            let next = (first + step).min(self.end);
            chunks.push((first, next - Duration::days(1)));
            first = next;
        }
        chunks
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    mod clock_time {
        use super::*;

        #[test]
        fn parses_hhmm() {
            assert_eq!(ClockTime::from_hhmm(745), ClockTime::from_hm(7, 45));
            assert_eq!(ClockTime::from_hhmm(1330).unwrap().minutes(), 13 * 60 + 30);
            assert_eq!(ClockTime::from_hhmm(0), Some(ClockTime::MIDNIGHT));
        }

        #[test]
        fn accepts_end_of_day() {
            let t = ClockTime::from_hhmm(2400).unwrap();
            assert_eq!(t.minutes(), ClockTime::END_OF_DAY);
            assert_eq!(t.to_string(), "24:00");
        }

        #[test]
        fn rejects_out_of_range() {
            assert!(ClockTime::from_hhmm(2401).is_none());
            assert!(ClockTime::from_hhmm(1260).is_none());
            assert!(ClockTime::from_hm(25, 0).is_none());
        }

        #[test]
        fn display_pads() {
            assert_eq!(ClockTime::from_hm(8, 5).unwrap().to_string(), "08:05");
        }

        #[test]
        fn on_date() {
            let d = date(2024, 1, 31);
            let start = ClockTime::from_hm(8, 0).unwrap().on(d);
            assert_eq!(start, d.and_hms_opt(8, 0, 0).unwrap());

            let midnight = ClockTime::from_hhmm(2400).unwrap().on(d);
            assert_eq!(midnight, date(2024, 2, 1).and_hms_opt(0, 0, 0).unwrap());
        }

        #[test]
        fn ordering() {
            let a = ClockTime::from_hm(8, 0).unwrap();
            let b = ClockTime::from_hm(8, 45).unwrap();
            assert!(a < b);
        }
    }

    mod date_range {
        use super::*;

        #[test]
        fn creation() {
            let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 8));
            assert_eq!(range.len_days(), 7);
            assert!(!range.is_empty());
            assert_eq!(range.last(), Some(date(2024, 1, 7)));
        }

        #[test]
        #[should_panic(expected = "start must be <= end")]
        fn invalid_range() {
            DateRange::new(date(2024, 1, 8), date(2024, 1, 1));
        }

        #[test]
        fn clamped_collapses() {
            let range = DateRange::clamped(date(2024, 1, 8), date(2024, 1, 1));
            assert!(range.is_empty());
            assert_eq!(range.last(), None);
            assert_eq!(range.days().count(), 0);
        }

        #[test]
        fn inclusive_includes_last() {
            let range = DateRange::inclusive(date(2024, 1, 1), date(2024, 1, 3));
            assert!(range.contains(date(2024, 1, 3)));
            assert!(!range.contains(date(2024, 1, 4)));
        }

        #[test]
        fn days_iteration() {
            let range = DateRange::new(date(2024, 2, 27), date(2024, 3, 2));
            let days: Vec<_> = range.days().collect();
            assert_eq!(
                days,
                vec![
                    date(2024, 2, 27),
                    date(2024, 2, 28),
                    date(2024, 2, 29),
                    date(2024, 3, 1)
                ]
            );
        }

        #[test]
        fn chunks_cover_range() {
            let range = DateRange::new(date(2024, 1, 1), date(2024, 3, 1));
            let chunks = range.chunks(28);
            assert_eq!(chunks.len(), 3);
            assert_eq!(chunks[0], (date(2024, 1, 1), date(2024, 1, 28)));
            assert_eq!(chunks[1], (date(2024, 1, 29), date(2024, 2, 25)));
            assert_eq!(chunks[2], (date(2024, 2, 26), date(2024, 2, 29)));
        }

        #[test]
        fn chunks_of_empty_range() {
            let range = DateRange::clamped(date(2024, 1, 1), date(2024, 1, 1));
            assert!(range.chunks(28).is_empty());
        }

        #[test]
        fn serde_roundtrip() {
            let range = DateRange::new(date(2024, 1, 1), date(2024, 2, 1));
            let json = serde_json::to_string(&range).unwrap();
            let parsed: DateRange = serde_json::from_str(&json).unwrap();
            assert_eq!(range, parsed);
        }
    }
}
