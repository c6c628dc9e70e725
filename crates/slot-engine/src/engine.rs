//! The exposed pipeline: generate → resolve → render, plus the validity gate.
//!
//! [`available_slots`] is what the booking service's HTTP layer calls to
//! show a calendar; [`validate_slot`] is what it calls inside its write
//! transaction before committing a reservation. Both take an
//! [`AvailabilitySnapshot`] of already-fetched external state — the engine
//! performs no I/O and holds no state of its own, so concurrent callers
//! each bring their own snapshot.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::calendar::{render_calendar, MonthBucket};
use crate::error::Result;
use crate::ledger::BookingLine;
use crate::resource::fill_resource_availability;
use crate::schedule::{AppointmentType, AssignmentMode, EntityId, ScheduleBasis};
use crate::slots::generate_slots;
use crate::staff::{fill_staff_availability, BusyBlock};
use crate::temporal::{parse_timezone, parse_timezone_or, UtcWindow, WeekStartDay};
use crate::validity::{is_slot_still_valid, EntitySelection};

/// A read-only snapshot of the external state availability depends on:
/// existing bookings, staff calendars, and resource outage intervals. The
/// caller fetches it once per query; the engine never mutates it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AvailabilitySnapshot {
    pub bookings: Vec<BookingLine>,
    pub staff_busy: BTreeMap<EntityId, Vec<BusyBlock>>,
    pub resource_outages: BTreeMap<EntityId, Vec<UtcWindow>>,
}

/// Parameters of one availability query.
#[derive(Debug, Clone)]
pub struct SlotQuery {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    /// The visitor's IANA timezone; invalid values fall back to the
    /// appointment timezone instead of failing the query.
    pub timezone: String,
    /// Restrict resolution to these entities (e.g., the visitor already
    /// picked a staff member); `None` means every assigned entity.
    pub entities: Option<Vec<EntityId>>,
    pub asked_capacity: u32,
    /// Optional "not before" instant on top of the configured lead time.
    pub reference: Option<DateTime<Utc>>,
    pub mode: AssignmentMode,
    /// Pins the staff tie-break shuffle; tests use this, production leaves
    /// it unset.
    pub shuffle_seed: Option<u64>,
    pub week_start: WeekStartDay,
}

impl SlotQuery {
    /// A query over `[window_start, window_end]` in `timezone`, asking for
    /// one seat in auto-assign mode.
    pub fn new(
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        timezone: impl Into<String>,
    ) -> Self {
        Self {
            window_start,
            window_end,
            timezone: timezone.into(),
            entities: None,
            asked_capacity: 1,
            reference: None,
            mode: AssignmentMode::Auto,
            shuffle_seed: None,
            week_start: WeekStartDay::default(),
        }
    }
}

/// The rendered answer to an availability query, ready for the HTTP layer.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarPayload {
    pub appointment_type: u32,
    /// The timezone the calendar is dated in (the requested one, or the
    /// appointment timezone after a fallback).
    pub timezone: String,
    pub months: Vec<MonthBucket>,
}

/// Run the full pipeline: expand slots, resolve staff or resource
/// availability, drop unresolvable slots, and bucket the rest into a
/// calendar.
///
/// The queried window is clamped to `now + max_schedule_days`; a window
/// entirely in the past or beyond the horizon yields an empty calendar,
/// not an error.
///
/// # Errors
///
/// Returns an error only for invalid configuration (bad rules, bad
/// appointment timezone); "nothing available" is a normal empty result.
pub fn available_slots(
    appt: &AppointmentType,
    snapshot: &AvailabilitySnapshot,
    query: &SlotQuery,
    now: DateTime<Utc>,
) -> Result<CalendarPayload> {
    appt.validate()?;
    let appt_tz = parse_timezone(&appt.timezone)?;
    let requested_tz = parse_timezone_or(&query.timezone, appt_tz);
    if requested_tz.name() != query.timezone {
        debug!(
            requested = %query.timezone,
            fallback = %requested_tz,
            "unknown requested timezone, using appointment timezone"
        );
    }

    let horizon = now + Duration::days(i64::from(appt.max_schedule_days));
    let window_end = query.window_end.min(horizon);
    if window_end < query.window_end {
        debug!(%window_end, "query window clamped to scheduling horizon");
    }

    let mut slots = if window_end <= query.window_start {
        Vec::new()
    } else {
        generate_slots(
            appt,
            query.window_start,
            window_end,
            requested_tz,
            now,
            query.reference,
        )?
    };
    debug!(appointment_type = appt.id, candidates = slots.len(), "slots generated");

    let candidates: Vec<EntityId> = match &query.entities {
        Some(requested) => {
            let assigned = appt.assigned_entities();
            requested
                .iter()
                .filter(|id| assigned.contains(id))
                .copied()
                .collect()
        }
        None => appt.assigned_entities(),
    };

    match appt.schedule_basis {
        ScheduleBasis::Staff => fill_staff_availability(
            &mut slots,
            appt,
            &candidates,
            &snapshot.staff_busy,
            &snapshot.bookings,
            query.asked_capacity,
            query.mode,
            query.shuffle_seed,
        ),
        ScheduleBasis::Resource => fill_resource_availability(
            &mut slots,
            appt,
            &candidates,
            &snapshot.resource_outages,
            &snapshot.bookings,
            query.asked_capacity,
            query.mode,
        ),
    }

    let generated = slots.len();
    slots.retain(|s| s.assignment.is_resolved());
    trace!(
        resolved = slots.len(),
        dropped = generated - slots.len(),
        "availability resolved"
    );

    let months = render_calendar(
        &slots,
        query.window_start,
        window_end,
        requested_tz,
        query.week_start,
    );
    Ok(CalendarPayload {
        appointment_type: appt.id,
        timezone: requested_tz.name().to_string(),
        months,
    })
}

/// The validity gate for the booking service's write transaction; see
/// [`crate::validity`].
#[allow(clippy::too_many_arguments)]
pub fn validate_slot(
    appt: &AppointmentType,
    selection: &EntitySelection,
    asked_capacity: u32,
    start: DateTime<Utc>,
    duration_hours: f64,
    all_day: bool,
    snapshot: &AvailabilitySnapshot,
    now: DateTime<Utc>,
) -> Result<bool> {
    is_slot_still_valid(
        appt,
        selection,
        asked_capacity,
        start,
        duration_hours,
        all_day,
        snapshot,
        now,
    )
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{AppointmentCategory, SlotRule, SlotRuleKind, StaffMember};
    use chrono::{Datelike, TimeZone, Weekday};

    fn utc(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, d, h, 0, 0).unwrap()
    }

    fn staff_type() -> AppointmentType {
        AppointmentType {
            id: 3,
            name: "Tour".into(),
            category: AppointmentCategory::Recurring,
            timezone: "UTC".into(),
            duration_hours: 1.0,
            slot_interval_hours: 1.0,
            min_schedule_hours: 0.0,
            max_schedule_days: 14,
            schedule_basis: ScheduleBasis::Staff,
            manage_capacity: false,
            max_bookings: 1,
            auto_confirm: true,
            confirmation_threshold: 1.0,
            start_datetime: None,
            end_datetime: None,
            // Monday 09:00-12:00; 2026-03-16 is a Monday
            slot_rules: vec![SlotRule {
                id: 1,
                kind: SlotRuleKind::Recurring {
                    weekday: Weekday::Mon,
                    start_hour: 9.0,
                    end_hour: 12.0,
                },
                restricted_staff: vec![],
                restricted_resources: vec![],
            }],
            staff: vec![StaffMember {
                id: 1,
                name: "Alex".into(),
                timezone: "UTC".into(),
                capacity: 1,
            }],
            resources: vec![],
        }
    }

    #[test]
    fn test_pipeline_produces_available_days() {
        let appt = staff_type();
        let query = SlotQuery::new(utc(15, 0), utc(21, 0), "UTC");
        let payload =
            available_slots(&appt, &AvailabilitySnapshot::default(), &query, utc(10, 0)).unwrap();
        assert_eq!(payload.appointment_type, 3);
        assert_eq!(payload.timezone, "UTC");
        let available: Vec<_> = payload.months[0]
            .weeks
            .iter()
            .flat_map(|w| &w.days)
            .filter(|d| d.available)
            .collect();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].slots.len(), 3);
    }

    #[test]
    fn test_invalid_requested_timezone_falls_back() {
        let appt = staff_type();
        let query = SlotQuery::new(utc(15, 0), utc(21, 0), "Moon/Crater");
        let payload =
            available_slots(&appt, &AvailabilitySnapshot::default(), &query, utc(10, 0)).unwrap();
        assert_eq!(payload.timezone, "UTC");
        assert!(!payload.months.is_empty());
    }

    #[test]
    fn test_horizon_clamps_far_future_queries() {
        let appt = staff_type();
        // max_schedule_days = 14 from March 10 → nothing after March 24
        let query = SlotQuery::new(utc(15, 0), utc(31, 0), "UTC");
        let payload =
            available_slots(&appt, &AvailabilitySnapshot::default(), &query, utc(10, 0)).unwrap();
        let latest = payload
            .months
            .iter()
            .flat_map(|m| &m.weeks)
            .flat_map(|w| &w.days)
            .filter(|d| d.available)
            .map(|d| d.date)
            .max()
            .unwrap();
        // Monday the 23rd is inside the horizon, Monday the 30th is not
        assert_eq!(latest.day(), 23);
    }

    #[test]
    fn test_entity_filter_rejects_unassigned_ids() {
        let appt = staff_type();
        let mut query = SlotQuery::new(utc(15, 0), utc(21, 0), "UTC");
        query.entities = Some(vec![999]);
        let payload =
            available_slots(&appt, &AvailabilitySnapshot::default(), &query, utc(10, 0)).unwrap();
        assert!(payload
            .months
            .iter()
            .flat_map(|m| &m.weeks)
            .flat_map(|w| &w.days)
            .all(|d| !d.available));
    }

    #[test]
    fn test_window_fully_past_horizon_yields_empty_calendar() {
        let appt = staff_type();
        let query = SlotQuery::new(utc(25, 0), utc(31, 0), "UTC");
        let payload =
            available_slots(&appt, &AvailabilitySnapshot::default(), &query, utc(10, 0)).unwrap();
        assert!(payload
            .months
            .iter()
            .flat_map(|m| &m.weeks)
            .flat_map(|w| &w.days)
            .all(|d| !d.available));
    }
}
