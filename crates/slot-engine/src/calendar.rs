//! Calendar rendering: resolved slots → month/week/day buckets.
//!
//! Pure grouping for the presentation layer. The renderer makes no
//! availability decisions: a day with no resolved slots is an empty day,
//! never an error. Slots arrive ordered by UTC start (the generator's
//! invariant), so one forward pass suffices — no re-sort.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::slots::ResolvedSlot;
use crate::temporal::{local_date, WeekStartDay};

/// One calendar day in the rendered grid.
#[derive(Debug, Clone, Serialize)]
pub struct DayBucket {
    pub date: NaiveDate,
    /// False for the padding days that square off the month grid.
    pub in_month: bool,
    /// Whether at least one bookable slot resolved on this day.
    pub available: bool,
    pub slots: Vec<ResolvedSlot>,
}

/// Seven consecutive days, aligned to the configured week start.
#[derive(Debug, Clone, Serialize)]
pub struct WeekBucket {
    pub days: Vec<DayBucket>,
}

/// One month of the rendered grid, weeks padded to seven days so a UI can
/// draw it directly.
#[derive(Debug, Clone, Serialize)]
pub struct MonthBucket {
    pub year: i32,
    pub month: u32,
    pub weeks: Vec<WeekBucket>,
}

/// Group `slots` into month → week → day buckets over `[window_start,
/// window_end]`, dated in `tz` (the visitor's requested timezone).
pub fn render_calendar(
    slots: &[ResolvedSlot],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    tz: Tz,
    week_start: WeekStartDay,
) -> Vec<MonthBucket> {
    let first = local_date(window_start, tz);
    let last = local_date(window_end, tz);
    if first > last {
        return Vec::new();
    }

    let mut months = Vec::new();
    let mut idx = 0usize;
    let (mut year, mut month) = (first.year(), first.month());
    loop {
        months.push(render_month(
            slots, &mut idx, year, month, first, last, tz, week_start,
        ));
        if year == last.year() && month == last.month() {
            break;
        }
        (year, month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
    }
    months
}

#[allow(clippy::too_many_arguments)]
fn render_month(
    slots: &[ResolvedSlot],
    idx: &mut usize,
    year: i32,
    month: u32,
    window_first: NaiveDate,
    window_last: NaiveDate,
    tz: Tz,
    week_start: WeekStartDay,
) -> MonthBucket {
    // from_ymd_opt only fails at the ends of the representable date range
    let month_first = NaiveDate::from_ymd_opt(year, month, 1)
        .unwrap_or(window_first);
    let month_last = next_month_first(year, month)
        .and_then(|d| d.pred_opt())
        .unwrap_or(window_last);
    let grid_start = month_first - Duration::days(week_start.days_from_start(month_first.weekday()));
    let grid_end = month_last + Duration::days(6 - week_start.days_from_start(month_last.weekday()));

    let mut weeks = Vec::new();
    let mut day = grid_start;
    while day <= grid_end {
        let mut days = Vec::with_capacity(7);
        for _ in 0..7 {
            let in_month = day.year() == year && day.month() == month;
            let in_window = day >= window_first && day <= window_last;
            let mut day_slots = Vec::new();
            if in_month && in_window {
                while *idx < slots.len() && local_date(slots[*idx].utc.start, tz) < day {
                    *idx += 1;
                }
                while *idx < slots.len() && local_date(slots[*idx].utc.start, tz) == day {
                    day_slots.push(slots[*idx].clone());
                    *idx += 1;
                }
            }
            days.push(DayBucket {
                date: day,
                in_month,
                available: !day_slots.is_empty(),
                slots: day_slots,
            });
            day += Duration::days(1);
        }
        weeks.push(WeekBucket { days });
    }

    MonthBucket { year, month, weeks }
}

fn next_month_first(year: i32, month: u32) -> Option<NaiveDate> {
    if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
