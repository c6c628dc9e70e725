//! Timezone-aware interval and wall-clock utilities.
//!
//! Everything above this module works with two window representations:
//! [`UtcWindow`] (half-open, used for all overlap and capacity math) and
//! [`ZonedWindow`] (the same instant pair expressed in a concrete IANA
//! timezone, used for presentation). All functions are pure — the caller
//! provides the "now" anchor when one is needed.
//!
//! # DST Policy
//!
//! Wall-clock instants that fall inside a spring-forward gap do not exist
//! and are skipped; instants inside a fall-back fold are ambiguous and
//! resolve to the earlier UTC offset. Both cases go through
//! [`resolve_local`], which wraps chrono's `LocalResult`.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

// ── Week start ──────────────────────────────────────────────────────────────

/// Which day begins a week when the calendar renderer lays out a week grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum WeekStartDay {
    /// ISO 8601 standard (Monday = day 0 of the week).
    #[default]
    Monday,
    /// US/Canada convention (Sunday = day 0 of the week).
    Sunday,
}

impl WeekStartDay {
    /// How many days `weekday` is from the week-start day.
    pub fn days_from_start(self, weekday: Weekday) -> i64 {
        match self {
            WeekStartDay::Monday => weekday.num_days_from_monday() as i64,
            WeekStartDay::Sunday => weekday.num_days_from_sunday() as i64,
        }
    }
}

// ── Windows ─────────────────────────────────────────────────────────────────

/// A half-open `[start, end)` interval of UTC instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtcWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl UtcWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Half-open overlap: `self.start < other.end && self.end > other.start`.
    pub fn overlaps(&self, other: &UtcWindow) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Whether `instant` lies inside `[start, end)`.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }

    pub fn duration_hours(&self) -> f64 {
        (self.end - self.start).num_seconds() as f64 / 3600.0
    }

    /// The same window expressed in `tz`.
    pub fn in_timezone(&self, tz: Tz) -> ZonedWindow {
        ZonedWindow {
            start: self.start.with_timezone(&tz),
            end: self.end.with_timezone(&tz),
        }
    }
}

/// The same instant pair as a [`UtcWindow`], expressed in a concrete timezone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZonedWindow {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

// ── Timezone parsing ────────────────────────────────────────────────────────

/// Parse an IANA timezone string into `Tz`.
pub fn parse_timezone(s: &str) -> Result<Tz, EngineError> {
    s.parse::<Tz>()
        .map_err(|_| EngineError::InvalidTimezone(format!("'{}'", s)))
}

/// Parse an IANA timezone string, falling back to `fallback` when invalid.
///
/// Requested timezones only frame presentation; a bad one must not fail the
/// whole availability query.
pub fn parse_timezone_or(s: &str, fallback: Tz) -> Tz {
    s.parse::<Tz>().unwrap_or(fallback)
}

// ── Wall-clock resolution ───────────────────────────────────────────────────

/// Resolve a local date + time to an instant in `tz`.
///
/// Returns `None` for nonexistent wall-clock times (spring-forward gap);
/// ambiguous times (fall-back fold) resolve to the earlier offset.
pub fn resolve_local(tz: Tz, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&date.and_time(time)).earliest()
}

/// Convert fractional hours (e.g., `9.5` = 09:30) to a `NaiveTime`.
///
/// Returns `None` outside `[0, 24)`.
pub fn hour_to_time(hour: f64) -> Option<NaiveTime> {
    if !(0.0..24.0).contains(&hour) {
        return None;
    }
    let secs = (hour * 3600.0).round() as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, 0)
}

/// A `chrono::Duration` of `hours` fractional hours, rounded to milliseconds.
pub fn hours_duration(hours: f64) -> Duration {
    Duration::milliseconds((hours * 3_600_000.0).round() as i64)
}

/// Enumerate the local calendar dates of `tz` touched by `[start, end]`,
/// earliest first.
pub fn local_days(tz: Tz, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut day = start.with_timezone(&tz).date_naive();
    let last = end.with_timezone(&tz).date_naive();
    while day <= last {
        days.push(day);
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    days
}

/// The local calendar date of `instant` in `tz`.
pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// The full local calendar day containing `instant`, as a UTC window.
///
/// `[00:00, next day 00:00)` in `tz`; DST shifts make this 23 or 25 hours
/// on transition days.
pub fn local_day_window(instant: DateTime<Utc>, tz: Tz) -> Option<UtcWindow> {
    let date = local_date(instant, tz);
    let start = resolve_local(tz, date, NaiveTime::MIN)?;
    let end = resolve_local(tz, date.succ_opt()?, NaiveTime::MIN)?;
    Some(UtcWindow::new(
        start.with_timezone(&Utc),
        end.with_timezone(&Utc),
    ))
}

// ── Tests ───────────────────────────────────────────────────────────────────
