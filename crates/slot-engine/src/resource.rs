//! Resource availability: which resources can take each slot.
//!
//! A resource is a candidate for a slot when the rule's restriction list
//! admits it, no unavailability interval (leave, maintenance) overlaps the
//! window, and it is either entirely unbooked there or — shareable with
//! capacity management on — still has spare capacity. Candidates then go
//! through the best-fit selector, which may answer with a single resource
//! or a pooled combination; linked-group siblings with spare capacity join
//! the combination pool even when their primary cannot satisfy the request
//! alone.

use std::collections::{BTreeMap, BTreeSet};

use crate::bestfit::{select_best, CapacityInfo, SelectorCache};
use crate::ledger::{remaining_capacity, BookingLine};
use crate::schedule::{AppointmentType, AssignmentMode, EntityId, Resource};
use crate::slots::{Assignment, ResolvedSlot};
use crate::temporal::UtcWindow;

/// Attach available resources to each slot, in place.
///
/// `Auto` mode assigns a single resource where one suffices and a candidate
/// combination where pooling is needed; `Manual` mode surfaces the whole
/// eligible set. Slots no combination can satisfy are left unassigned for
/// the caller to drop. Best-fit selections are memoized across slots for
/// the duration of this call, since consecutive slots usually share the
/// same capacity snapshot.
pub fn fill_resource_availability(
    slots: &mut [ResolvedSlot],
    appt: &AppointmentType,
    candidates: &[EntityId],
    outages: &BTreeMap<EntityId, Vec<UtcWindow>>,
    bookings: &[BookingLine],
    asked_capacity: u32,
    mode: AssignmentMode,
) {
    let mut cache = SelectorCache::new();

    for slot in slots.iter_mut() {
        let restricted = appt
            .slot_rule(slot.rule_id)
            .map(|r| r.restricted_resources.as_slice())
            .unwrap_or(&[]);

        let survivors: Vec<(&Resource, i64)> = candidates
            .iter()
            .filter_map(|id| appt.resource(*id))
            .filter(|r| restricted.is_empty() || restricted.contains(&r.id))
            .filter_map(|r| {
                spare_capacity(appt, r, &slot.utc, outages, bookings).map(|rem| (r, rem))
            })
            .collect();

        // Linked siblings with spare capacity widen the combination pool
        let mut pool: BTreeMap<EntityId, CapacityInfo> = BTreeMap::new();
        let mut sibling_ids: BTreeSet<EntityId> = BTreeSet::new();
        for (resource, remaining) in &survivors {
            pool.insert(
                resource.id,
                CapacityInfo {
                    declared: resource.capacity,
                    remaining: *remaining,
                    sequence: resource.sequence,
                },
            );
            sibling_ids.extend(resource.linked_resources.iter().copied());
        }
        for id in sibling_ids {
            if pool.contains_key(&id) {
                continue;
            }
            let Some(sibling) = appt.resource(id) else { continue };
            if !restricted.is_empty() && !restricted.contains(&id) {
                continue;
            }
            if let Some(remaining) = spare_capacity(appt, sibling, &slot.utc, outages, bookings)
            {
                pool.insert(
                    id,
                    CapacityInfo {
                        declared: sibling.capacity,
                        remaining,
                        sequence: sibling.sequence,
                    },
                );
            }
        }

        let selection = select_best(&mut cache, &pool, asked_capacity, appt.manage_capacity, mode);
        slot.assignment = match (mode, selection.as_slice()) {
            (_, []) => Assignment::Unassigned,
            (AssignmentMode::Auto, [single]) => Assignment::Assigned(*single),
            _ => Assignment::Candidates(selection),
        };
    }
}

/// The resource's own spare capacity for `window`, or `None` when it cannot
/// take any further booking there.
fn spare_capacity(
    appt: &AppointmentType,
    resource: &Resource,
    window: &UtcWindow,
    outages: &BTreeMap<EntityId, Vec<UtcWindow>>,
    bookings: &[BookingLine],
) -> Option<i64> {
    if let Some(intervals) = outages.get(&resource.id) {
        if intervals.iter().any(|o| o.overlaps(window)) {
            return None;
        }
    }

    let booked = bookings
        .iter()
        .any(|line| line.entity == resource.id && line.window.overlaps(window));
    if !booked {
        let full = if appt.manage_capacity {
            i64::from(resource.capacity)
        } else {
            1
        };
        return Some(full);
    }
    // Booked: only a shareable, capacity-managed resource can co-host
    if !(resource.shareable && appt.manage_capacity) {
        return None;
    }
    let report = remaining_capacity(appt, &[resource.id], window, bookings, false);
    let remaining = report.remaining(resource.id);
    (remaining > 0).then_some(remaining)
}

// ── Tests ───────────────────────────────────────────────────────────────────
