//! End-to-end scenarios through the public pipeline.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, TimeZone, Utc, Weekday};
use slot_engine::{
    available_slots, validate_slot, AppointmentCategory, AppointmentType, Assignment,
    AssignmentMode, AvailabilitySnapshot, BookingLine, DayBucket, EntitySelection, Resource,
    ScheduleBasis, SlotQuery, SlotRule, SlotRuleKind, StaffMember, UtcWindow,
};

fn utc(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap()
}

fn recurring_rule(id: u32, weekday: Weekday, start_hour: f64, end_hour: f64) -> SlotRule {
    SlotRule {
        id,
        kind: SlotRuleKind::Recurring {
            weekday,
            start_hour,
            end_hour,
        },
        restricted_staff: vec![],
        restricted_resources: vec![],
    }
}

fn base_type(basis: ScheduleBasis) -> AppointmentType {
    AppointmentType {
        id: 1,
        name: "Session".into(),
        category: AppointmentCategory::Recurring,
        timezone: "UTC".into(),
        duration_hours: 1.0,
        slot_interval_hours: 1.0,
        min_schedule_hours: 0.0,
        max_schedule_days: 90,
        schedule_basis: basis,
        manage_capacity: false,
        max_bookings: 1,
        auto_confirm: true,
        confirmation_threshold: 1.0,
        start_datetime: None,
        end_datetime: None,
        slot_rules: vec![],
        staff: vec![],
        resources: vec![],
    }
}

fn member(id: u32) -> StaffMember {
    StaffMember {
        id,
        name: format!("Member {id}"),
        timezone: "UTC".into(),
        capacity: 1,
    }
}

fn resource(id: u32, capacity: u32, linked: Vec<u32>) -> Resource {
    Resource {
        id,
        name: format!("Room {id}"),
        capacity,
        shareable: true,
        linked_resources: linked,
        sequence: id,
    }
}

fn available_days(payload: &slot_engine::CalendarPayload) -> Vec<&DayBucket> {
    payload
        .months
        .iter()
        .flat_map(|m| &m.weeks)
        .flat_map(|w| &w.days)
        .filter(|d| d.available)
        .collect()
}

#[test]
fn recurring_monday_morning_yields_exactly_three_slots() {
    // Monday 09:00-12:00 UTC, 1h duration, 1h interval, queried from the
    // preceding Sunday; 2026-03-16 is a Monday
    let mut appt = base_type(ScheduleBasis::Staff);
    appt.slot_rules = vec![recurring_rule(1, Weekday::Mon, 9.0, 12.0)];
    appt.staff = vec![member(1)];
    let query = SlotQuery::new(utc(2026, 3, 15, 0), utc(2026, 3, 21, 0), "UTC");
    let payload =
        available_slots(&appt, &AvailabilitySnapshot::default(), &query, utc(2026, 3, 10, 0))
            .unwrap();
    let days = available_days(&payload);
    assert_eq!(days.len(), 1);
    let starts: Vec<_> = days[0].slots.iter().map(|s| s.utc.start).collect();
    assert_eq!(
        starts,
        vec![utc(2026, 3, 16, 9), utc(2026, 3, 16, 10), utc(2026, 3, 16, 11)]
    );
    assert!(days[0].slots.iter().all(|s| s.duration_hours == 1.0));
}

#[test]
fn punctual_bounds_clip_the_recurring_pattern() {
    // Mon/Tue 08:00-14:00 bounded to [2022-02-14 08:00, 2022-02-20 20:00] UTC
    let mut appt = base_type(ScheduleBasis::Staff);
    appt.category = AppointmentCategory::Punctual;
    appt.start_datetime = Some(utc(2022, 2, 14, 8));
    appt.end_datetime = Some(utc(2022, 2, 20, 20));
    appt.slot_rules = vec![
        recurring_rule(1, Weekday::Mon, 8.0, 14.0),
        recurring_rule(2, Weekday::Tue, 8.0, 14.0),
    ];
    appt.staff = vec![member(1)];
    let query = SlotQuery::new(utc(2022, 2, 1, 0), utc(2022, 2, 28, 0), "UTC");
    let payload =
        available_slots(&appt, &AvailabilitySnapshot::default(), &query, utc(2022, 2, 1, 0))
            .unwrap();
    let days = available_days(&payload);
    assert!(!days.is_empty());
    for day in &days {
        for slot in &day.slots {
            assert!(slot.utc.start >= utc(2022, 2, 14, 8));
            assert!(slot.utc.end <= utc(2022, 2, 20, 20));
        }
    }
    // Only the bounded Monday and Tuesday survive
    let dates: Vec<u32> = days.iter().map(|d| d.date.day()).collect();
    assert_eq!(dates, vec![14, 15]);
}

#[test]
fn shareable_resource_splits_capacity_across_bookings() {
    // Capacity 3, an existing booking using 2
    let mut appt = base_type(ScheduleBasis::Resource);
    appt.manage_capacity = true;
    appt.slot_rules = vec![recurring_rule(1, Weekday::Mon, 9.0, 10.0)];
    appt.resources = vec![resource(1, 3, vec![])];
    let snapshot = AvailabilitySnapshot {
        bookings: vec![BookingLine {
            entity: 1,
            window: UtcWindow::new(utc(2026, 3, 16, 9), utc(2026, 3, 16, 10)),
            capacity_reserved: 2,
            capacity_used: Some(2),
        }],
        ..Default::default()
    };
    // One seat asked: the remaining seat serves it
    let query = SlotQuery::new(utc(2026, 3, 15, 0), utc(2026, 3, 21, 0), "UTC");
    let payload = available_slots(&appt, &snapshot, &query, utc(2026, 3, 10, 0)).unwrap();
    let days = available_days(&payload);
    assert_eq!(days.len(), 1);
    assert_eq!(days[0].slots[0].assignment, Assignment::Assigned(1));

    // Two seats asked: infeasible without a sibling
    let mut query2 = query.clone();
    query2.asked_capacity = 2;
    let payload = available_slots(&appt, &snapshot, &query2, utc(2026, 3, 10, 0)).unwrap();
    assert!(available_days(&payload).is_empty());

    // A linked sibling with a spare seat completes a 2-resource combination
    appt.resources = vec![resource(1, 3, vec![2]), resource(2, 1, vec![])];
    let payload = available_slots(&appt, &snapshot, &query2, utc(2026, 3, 10, 0)).unwrap();
    let days = available_days(&payload);
    assert_eq!(days.len(), 1);
    assert_eq!(
        days[0].slots[0].assignment,
        Assignment::Candidates(vec![1, 2])
    );
}

#[test]
fn best_fit_prefers_exact_single_resource() {
    // Remaining {A:2, B:3, C:5}, asked 5 → C alone, not A+B
    let mut appt = base_type(ScheduleBasis::Resource);
    appt.manage_capacity = true;
    appt.slot_rules = vec![recurring_rule(1, Weekday::Mon, 9.0, 10.0)];
    appt.resources = vec![
        resource(1, 2, vec![]),
        resource(2, 3, vec![]),
        resource(3, 5, vec![]),
    ];
    let mut query = SlotQuery::new(utc(2026, 3, 15, 0), utc(2026, 3, 21, 0), "UTC");
    query.asked_capacity = 5;
    let payload =
        available_slots(&appt, &AvailabilitySnapshot::default(), &query, utc(2026, 3, 10, 0))
            .unwrap();
    let days = available_days(&payload);
    assert_eq!(days[0].slots[0].assignment, Assignment::Assigned(3));
}

#[test]
fn all_day_unique_slot_spans_the_local_day() {
    let mut appt = base_type(ScheduleBasis::Staff);
    appt.category = AppointmentCategory::Custom;
    appt.slot_rules = vec![SlotRule {
        id: 1,
        kind: SlotRuleKind::Unique {
            start: utc(2024, 3, 11, 9),
            end: utc(2024, 3, 11, 9),
            all_day: true,
        },
        restricted_staff: vec![],
        restricted_resources: vec![],
    }];
    appt.staff = vec![member(1)];
    let query = SlotQuery::new(utc(2024, 3, 1, 0), utc(2024, 3, 31, 0), "UTC");
    let payload =
        available_slots(&appt, &AvailabilitySnapshot::default(), &query, utc(2024, 3, 1, 0))
            .unwrap();
    let days = available_days(&payload);
    assert_eq!(days.len(), 1);
    let slot = &days[0].slots[0];
    assert!(slot.all_day);
    assert_eq!(slot.utc.start, utc(2024, 3, 11, 0));
    assert_eq!(slot.utc.end, utc(2024, 3, 12, 0));
}

#[test]
fn manual_mode_surfaces_every_free_member() {
    let mut appt = base_type(ScheduleBasis::Staff);
    appt.slot_rules = vec![recurring_rule(1, Weekday::Mon, 9.0, 10.0)];
    appt.staff = vec![member(1), member(2)];
    let mut query = SlotQuery::new(utc(2026, 3, 15, 0), utc(2026, 3, 21, 0), "UTC");
    query.mode = AssignmentMode::Manual;
    let payload =
        available_slots(&appt, &AvailabilitySnapshot::default(), &query, utc(2026, 3, 10, 0))
            .unwrap();
    let days = available_days(&payload);
    assert_eq!(days[0].slots[0].assignment, Assignment::Candidates(vec![1, 2]));
}

#[test]
fn validate_slot_is_idempotent_and_race_aware() {
    let mut appt = base_type(ScheduleBasis::Resource);
    appt.manage_capacity = true;
    appt.slot_rules = vec![recurring_rule(1, Weekday::Mon, 9.0, 10.0)];
    appt.resources = vec![resource(1, 2, vec![])];
    let selection = EntitySelection::Resources(vec![1]);
    let now = utc(2026, 3, 10, 0);
    let start = utc(2026, 3, 16, 9);

    let empty = AvailabilitySnapshot::default();
    let first = validate_slot(&appt, &selection, 2, start, 1.0, false, &empty, now).unwrap();
    let second = validate_slot(&appt, &selection, 2, start, 1.0, false, &empty, now).unwrap();
    assert!(first);
    assert_eq!(first, second);

    // A racing visitor committed 1 seat: only 1 of the asked 2 remains
    let contested = AvailabilitySnapshot {
        bookings: vec![BookingLine {
            entity: 1,
            window: UtcWindow::new(start, utc(2026, 3, 16, 10)),
            capacity_reserved: 1,
            capacity_used: Some(1),
        }],
        ..Default::default()
    };
    assert!(!validate_slot(&appt, &selection, 2, start, 1.0, false, &contested, now).unwrap());
    assert!(validate_slot(&appt, &selection, 1, start, 1.0, false, &contested, now).unwrap());
}

#[test]
fn requested_timezone_frames_the_calendar() {
    // 09:00 UTC Monday is still Sunday evening in Los Angeles; the visitor's
    // calendar must date the slot accordingly
    let mut appt = base_type(ScheduleBasis::Staff);
    appt.slot_rules = vec![recurring_rule(1, Weekday::Mon, 5.0, 6.0)];
    appt.staff = vec![member(1)];
    let query = SlotQuery::new(utc(2026, 3, 15, 0), utc(2026, 3, 21, 0), "America/Los_Angeles");
    let payload =
        available_slots(&appt, &AvailabilitySnapshot::default(), &query, utc(2026, 3, 10, 0))
            .unwrap();
    assert_eq!(payload.timezone, "America/Los_Angeles");
    let days = available_days(&payload);
    assert_eq!(days.len(), 1);
    // 05:00 UTC Monday March 16 = 22:00 PDT Sunday March 15
    assert_eq!(days[0].date.day(), 15);
    assert_eq!(
        days[0].slots[0].requested_local.start.to_rfc3339(),
        "2026-03-15T22:00:00-07:00"
    );
}

#[test]
fn staff_busy_calendars_flow_through_the_pipeline() {
    let mut appt = base_type(ScheduleBasis::Staff);
    appt.slot_rules = vec![recurring_rule(1, Weekday::Mon, 9.0, 11.0)];
    appt.staff = vec![member(1)];
    let snapshot = AvailabilitySnapshot {
        staff_busy: BTreeMap::from([(
            1,
            vec![slot_engine::BusyBlock {
                window: UtcWindow::new(utc(2026, 3, 16, 9), utc(2026, 3, 16, 10)),
                all_day: false,
                source_type: None,
            }],
        )]),
        ..Default::default()
    };
    let query = SlotQuery::new(utc(2026, 3, 15, 0), utc(2026, 3, 21, 0), "UTC");
    let payload = available_slots(&appt, &snapshot, &query, utc(2026, 3, 10, 0)).unwrap();
    let days = available_days(&payload);
    assert_eq!(days.len(), 1);
    // Only the 10:00 slot survives the 09:00-10:00 busy block
    assert_eq!(days[0].slots.len(), 1);
    assert_eq!(days[0].slots[0].utc.start, utc(2026, 3, 16, 10));
}
