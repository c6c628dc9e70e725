//! Booking validity re-check.
//!
//! Availability is computed speculatively, so two visitors can race for the
//! last seat of a slot. [`is_slot_still_valid`] is the re-check primitive
//! the booking service runs inside its write transaction, immediately
//! before committing the new booking line: it regenerates the single slot
//! from configuration and re-resolves it against the current snapshot,
//! restricted to the exact entities the visitor picked. The second of two
//! racing confirmations sees the first one's booking line and fails here.
//!
//! The check is pure and idempotent — same snapshot, same answer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::AvailabilitySnapshot;
use crate::error::{EngineError, Result};
use crate::resource::fill_resource_availability;
use crate::schedule::{AppointmentType, AssignmentMode, EntityId, ScheduleBasis};
use crate::slots::{generate_slots, ResolvedSlot};
use crate::staff::fill_staff_availability;
use crate::temporal::{hours_duration, local_day_window, parse_timezone, UtcWindow};

/// The exact entities a visitor is about to book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitySelection {
    Staff(Vec<EntityId>),
    Resources(Vec<EntityId>),
}

impl EntitySelection {
    fn ids(&self) -> &[EntityId] {
        match self {
            EntitySelection::Staff(ids) | EntitySelection::Resources(ids) => ids,
        }
    }
}

/// Re-derive whether the slot at `start` is still bookable for `selection`.
///
/// Returns `Ok(false)` when the slot no longer exists in the configuration,
/// its duration or all-day flag does not match, the selection does not fit
/// the appointment's basis, or any selected entity is no longer free for
/// the asked capacity. Recurring slots must match the configured duration;
/// unique slots must match their window exactly.
pub fn is_slot_still_valid(
    appt: &AppointmentType,
    selection: &EntitySelection,
    asked_capacity: u32,
    start: DateTime<Utc>,
    duration_hours: f64,
    all_day: bool,
    snapshot: &AvailabilitySnapshot,
    now: DateTime<Utc>,
) -> Result<bool> {
    appt.validate()?;
    let tz = parse_timezone(&appt.timezone)?;
    if selection.ids().is_empty() {
        return Ok(false);
    }
    let basis_matches = matches!(
        (appt.schedule_basis, selection),
        (ScheduleBasis::Staff, EntitySelection::Staff(_))
            | (ScheduleBasis::Resource, EntitySelection::Resources(_))
    );
    if !basis_matches {
        return Ok(false);
    }

    let window = if all_day {
        local_day_window(start, tz).ok_or_else(|| {
            EngineError::InvalidDuration(format!("cannot resolve local day of {start}"))
        })?
    } else {
        if duration_hours <= 0.0 {
            return Err(EngineError::InvalidDuration(format!(
                "duration must be positive, got {duration_hours}"
            )));
        }
        UtcWindow::new(start, start + hours_duration(duration_hours))
    };

    let generated = generate_slots(appt, window.start, window.end, tz, now, None)?;
    let Some(slot) = generated
        .into_iter()
        .find(|s| matches_window(s, &window, all_day))
    else {
        return Ok(false);
    };

    let mut slots = vec![slot];
    let available = match selection {
        EntitySelection::Staff(ids) => {
            fill_staff_availability(
                &mut slots,
                appt,
                ids,
                &snapshot.staff_busy,
                &snapshot.bookings,
                asked_capacity,
                AssignmentMode::Manual,
                None,
            );
            slots[0].assignment.entities()
        }
        EntitySelection::Resources(ids) => {
            fill_resource_availability(
                &mut slots,
                appt,
                ids,
                &snapshot.resource_outages,
                &snapshot.bookings,
                asked_capacity,
                AssignmentMode::Manual,
            );
            slots[0].assignment.entities()
        }
    };

    Ok(selection.ids().iter().all(|id| available.contains(id)))
}

fn matches_window(slot: &ResolvedSlot, window: &UtcWindow, all_day: bool) -> bool {
    slot.all_day == all_day && slot.utc.start == window.start && slot.utc.end == window.end
}

// ── Tests ───────────────────────────────────────────────────────────────────
