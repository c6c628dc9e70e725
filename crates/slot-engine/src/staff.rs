//! Staff availability: which staff members are free for each slot.
//!
//! A member is free for a slot when the slot rule's restriction list admits
//! them, no busy calendar block overlaps the window, and no all-day block
//! sits on the same calendar date of the member's own timezone. One
//! deliberate carve-out: a busy block that came from the *same* appointment
//! type does not block as long as the member's remaining capacity still
//! covers the asked amount — a member already taking group bookings of this
//! type keeps absorbing more up to capacity. Blocks from any other type
//! always block.

use std::collections::BTreeMap;

use chrono::Duration;
use chrono_tz::Tz;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::ledger::{remaining_capacity, BookingLine};
use crate::schedule::{AppointmentType, AssignmentMode, EntityId};
use crate::slots::{Assignment, ResolvedSlot};
use crate::temporal::{local_date, parse_timezone_or, UtcWindow};

/// A busy interval on a staff member's calendar, supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusyBlock {
    pub window: UtcWindow,
    /// All-day blocks knock out whole calendar dates of the member's own
    /// timezone rather than clock intervals.
    pub all_day: bool,
    /// The appointment type this block originated from, when it is itself a
    /// booking of ours.
    #[serde(default)]
    pub source_type: Option<u32>,
}

/// Attach available staff to each slot, in place.
///
/// `Auto` mode assigns the first free member of a shuffled candidate order;
/// the shuffle spreads assignments across members with equal availability
/// instead of always favoring the first-configured one, and `seed` pins it
/// for tests. `Manual` mode filters the full candidate set with no early
/// exit and attaches the whole list. Slots with nobody free are left
/// unassigned for the caller to drop.
pub fn fill_staff_availability(
    slots: &mut [ResolvedSlot],
    appt: &AppointmentType,
    candidates: &[EntityId],
    busy: &BTreeMap<EntityId, Vec<BusyBlock>>,
    bookings: &[BookingLine],
    asked_capacity: u32,
    mode: AssignmentMode,
    seed: Option<u64>,
) {
    let mut order: Vec<EntityId> = candidates
        .iter()
        .filter(|id| appt.staff_member(**id).is_some())
        .copied()
        .collect();
    if mode == AssignmentMode::Auto {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        order.shuffle(&mut rng);
    }

    let appt_tz = parse_timezone_or(&appt.timezone, chrono_tz::UTC);
    let no_blocks = Vec::new();

    for slot in slots.iter_mut() {
        match mode {
            AssignmentMode::Auto => {
                let picked = order.iter().copied().find(|id| {
                    is_member_free(
                        slot,
                        appt,
                        *id,
                        busy.get(id).unwrap_or(&no_blocks),
                        bookings,
                        asked_capacity,
                        appt_tz,
                    )
                });
                if let Some(id) = picked {
                    slot.assignment = Assignment::Assigned(id);
                }
            }
            AssignmentMode::Manual => {
                let free: Vec<EntityId> = order
                    .iter()
                    .copied()
                    .filter(|id| {
                        is_member_free(
                            slot,
                            appt,
                            *id,
                            busy.get(id).unwrap_or(&no_blocks),
                            bookings,
                            asked_capacity,
                            appt_tz,
                        )
                    })
                    .collect();
                if !free.is_empty() {
                    slot.assignment = Assignment::Candidates(free);
                }
            }
        }
    }
}

fn is_member_free(
    slot: &ResolvedSlot,
    appt: &AppointmentType,
    member_id: EntityId,
    blocks: &[BusyBlock],
    bookings: &[BookingLine],
    asked_capacity: u32,
    appt_tz: Tz,
) -> bool {
    let Some(member) = appt.staff_member(member_id) else {
        return false;
    };
    if let Some(rule) = appt.slot_rule(slot.rule_id) {
        if !rule.restricted_staff.is_empty() && !rule.restricted_staff.contains(&member_id) {
            return false;
        }
    }
    if appt.manage_capacity && asked_capacity > member.capacity {
        return false;
    }

    // All-day semantics are local to the member's own calendar
    let member_tz = parse_timezone_or(&member.timezone, appt_tz);
    let slot_date = local_date(slot.utc.start, member_tz);

    for block in blocks {
        if block.all_day {
            let first = local_date(block.window.start, member_tz);
            let last = local_date(block.window.end - Duration::seconds(1), member_tz);
            if slot_date >= first && slot_date <= last {
                return false;
            }
        } else if block.window.overlaps(&slot.utc) {
            if block.source_type != Some(appt.id) {
                return false;
            }
            // Same appointment type: still bookable while capacity holds
            let report = remaining_capacity(appt, &[member_id], &slot.utc, bookings, false);
            if report.total < i64::from(asked_capacity) {
                return false;
            }
        }
    }
    true
}

// ── Tests ───────────────────────────────────────────────────────────────────
