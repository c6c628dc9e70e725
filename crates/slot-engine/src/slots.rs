//! Slot generation: recurrence rules → concrete candidate windows.
//!
//! [`generate_slots`] expands an appointment type's rules over a query
//! window into [`ResolvedSlot`]s carrying the window in three framings at
//! once: the appointment timezone (where the rules are written), the
//! requested timezone (where the visitor reads them), and UTC (where all
//! capacity math happens). Slots come out unassigned; the availability
//! resolvers attach entities afterwards.

use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::Result;
use crate::schedule::{AppointmentCategory, AppointmentType, EntityId, SlotRuleKind};
use crate::temporal::{
    hour_to_time, hours_duration, local_day_window, local_days, parse_timezone, resolve_local,
    UtcWindow, ZonedWindow,
};

/// Which entities, if any, can take a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Assignment {
    /// No resolver has run yet, or none of the candidates was free.
    Unassigned,
    /// One entity was auto-assigned.
    Assigned(EntityId),
    /// The available entities, for the caller to choose among (manual
    /// assignment mode, or a multi-resource combination).
    Candidates(Vec<EntityId>),
}

impl Assignment {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Assignment::Unassigned)
    }

    /// The assigned/candidate entity ids, empty when unassigned.
    pub fn entities(&self) -> Vec<EntityId> {
        match self {
            Assignment::Unassigned => Vec::new(),
            Assignment::Assigned(id) => vec![*id],
            Assignment::Candidates(ids) => ids.clone(),
        }
    }
}

/// A candidate bookable window, recomputed on every query and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSlot {
    /// The rule this slot was expanded from.
    pub rule_id: u32,
    /// The window in the appointment type's timezone.
    pub appointment_local: ZonedWindow,
    /// The window in the visitor's requested timezone.
    pub requested_local: ZonedWindow,
    /// The window in UTC; all overlap and capacity math uses this one.
    pub utc: UtcWindow,
    /// Whether this is a full-local-day slot (duration is presented as
    /// "all day", not an hour count).
    pub all_day: bool,
    pub duration_hours: f64,
    pub assignment: Assignment,
}

/// Expand `appt`'s rules over `[window_start, window_end]` into unassigned
/// slots, ordered by UTC start ascending.
///
/// `reference` optionally moves the earliest-offerable instant forward
/// (e.g., "from next Monday on"); the minimum lead time
/// `now + min_schedule_hours` always applies on top of it. Recurring rules
/// advance past the lead floor in whole `slot_interval` steps — a slot is
/// either emitted intact or skipped, never truncated.
///
/// # Errors
///
/// Returns an error for an invalid configuration or an unparseable
/// appointment timezone; an empty result is not an error.
pub fn generate_slots(
    appt: &AppointmentType,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    requested_tz: Tz,
    now: DateTime<Utc>,
    reference: Option<DateTime<Utc>>,
) -> Result<Vec<ResolvedSlot>> {
    appt.validate()?;
    let tz = parse_timezone(&appt.timezone)?;
    let floor = reference
        .unwrap_or(now)
        .max(now + hours_duration(appt.min_schedule_hours));

    let mut slots = Vec::new();
    match appt.category {
        AppointmentCategory::Recurring
        | AppointmentCategory::Punctual
        | AppointmentCategory::Anytime => {
            let bounds = if appt.category == AppointmentCategory::Punctual {
                // validate() guarantees both are present for punctual types
                appt.start_datetime.zip(appt.end_datetime)
            } else {
                None
            };
            for day in local_days(tz, window_start, window_end) {
                for rule in &appt.slot_rules {
                    let SlotRuleKind::Recurring {
                        weekday,
                        start_hour,
                        end_hour,
                    } = rule.kind
                    else {
                        continue;
                    };
                    if day.weekday() != weekday {
                        continue;
                    }
                    let horizon = end_hour.min(24.0);
                    let mut step = 0u32;
                    loop {
                        let t = start_hour + f64::from(step) * appt.slot_interval_hours;
                        if t + appt.duration_hours > horizon + 1e-9 {
                            break;
                        }
                        step += 1;
                        let Some(time) = hour_to_time(t) else { continue };
                        // Nonexistent wall-clock starts (DST gap) are skipped
                        let Some(local_start) = resolve_local(tz, day, time) else {
                            continue;
                        };
                        let start_utc = local_start.with_timezone(&Utc);
                        let end_utc = start_utc + hours_duration(appt.duration_hours);
                        if start_utc <= floor
                            || start_utc < window_start
                            || start_utc > window_end
                        {
                            continue;
                        }
                        if let Some((bound_start, bound_end)) = bounds {
                            if start_utc < bound_start || end_utc > bound_end {
                                continue;
                            }
                        }
                        slots.push(make_slot(
                            rule.id,
                            UtcWindow::new(start_utc, end_utc),
                            false,
                            appt.duration_hours,
                            tz,
                            requested_tz,
                        ));
                    }
                }
            }
        }
        AppointmentCategory::Custom => {
            for rule in &appt.slot_rules {
                let SlotRuleKind::Unique {
                    start,
                    end,
                    all_day,
                } = rule.kind
                else {
                    continue;
                };
                let window = if all_day {
                    match local_day_window(start, tz) {
                        Some(w) => w,
                        None => continue,
                    }
                } else {
                    UtcWindow::new(start, end)
                };
                // Unique slots in the past are discarded, never advanced
                if window.start <= floor
                    || window.start < window_start
                    || window.start > window_end
                {
                    continue;
                }
                let duration = window.duration_hours();
                slots.push(make_slot(rule.id, window, all_day, duration, tz, requested_tz));
            }
        }
    }

    slots.sort_by_key(|s| (s.utc.start, s.rule_id));
    Ok(slots)
}

fn make_slot(
    rule_id: u32,
    utc: UtcWindow,
    all_day: bool,
    duration_hours: f64,
    appointment_tz: Tz,
    requested_tz: Tz,
) -> ResolvedSlot {
    ResolvedSlot {
        rule_id,
        appointment_local: utc.in_timezone(appointment_tz),
        requested_local: utc.in_timezone(requested_tz),
        utc,
        all_day,
        duration_hours,
        assignment: Assignment::Unassigned,
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
