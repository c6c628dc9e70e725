//! Capacity ledger: existing bookings → remaining capacity per entity.
//!
//! The ledger never writes anything. It aggregates a read-only snapshot of
//! [`BookingLine`]s over a window and reports how much capacity each entity
//! (or linked-resource pool) still has. When capacity management is off,
//! capacity degrades to a plain counter of concurrent bookings against
//! `max_bookings`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::schedule::{AppointmentType, EntityId};
use crate::temporal::UtcWindow;

/// An existing reservation's footprint, owned by the booking subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingLine {
    pub entity: EntityId,
    pub window: UtcWindow,
    pub capacity_reserved: u32,
    /// Capacity actually consumed; falls back to `capacity_reserved` when unset.
    #[serde(default)]
    pub capacity_used: Option<u32>,
}

impl BookingLine {
    /// The capacity this line weighs against its entity.
    pub fn weight(&self) -> u32 {
        self.capacity_used.unwrap_or(self.capacity_reserved)
    }
}

/// Remaining capacity per entity over one window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapacityReport {
    /// Remaining capacity per entity. Can go negative if the external
    /// ledger was overbooked; the engine never allocates into negative.
    pub per_entity: BTreeMap<EntityId, i64>,
    /// Sum over all entities in the report (the pool total when linked
    /// resources were included).
    pub total: i64,
}

impl CapacityReport {
    pub fn remaining(&self, entity: EntityId) -> i64 {
        self.per_entity.get(&entity).copied().unwrap_or(0)
    }
}

/// Aggregate remaining capacity for `entities` over `window`.
///
/// Bookings count via half-open overlap (`line.start < window.end &&
/// line.end > window.start`). With capacity management on, each line weighs
/// `capacity_used` (falling back to `capacity_reserved`) against the
/// entity's declared capacity; with it off, every line weighs 1 against
/// `max_bookings`. When `with_linked` is set, each entity's linked-resource
/// group is unioned in before aggregation so the group shares one pool.
///
/// An empty entity set yields `total = 0`, not an error.
pub fn remaining_capacity(
    appt: &AppointmentType,
    entities: &[EntityId],
    window: &UtcWindow,
    bookings: &[BookingLine],
    with_linked: bool,
) -> CapacityReport {
    let mut pool: BTreeSet<EntityId> = entities.iter().copied().collect();
    if with_linked {
        for id in entities {
            if let Some(resource) = appt.resource(*id) {
                pool.extend(resource.linked_resources.iter().copied());
            }
        }
    }

    let mut per_entity = BTreeMap::new();
    let mut total = 0i64;
    for id in pool {
        let effective = if appt.manage_capacity {
            i64::from(appt.entity_capacity(id))
        } else {
            i64::from(appt.max_bookings.max(1))
        };
        let used: i64 = bookings
            .iter()
            .filter(|line| line.entity == id && line.window.overlaps(window))
            .map(|line| {
                if appt.manage_capacity {
                    i64::from(line.weight())
                } else {
                    1
                }
            })
            .sum();
        let remaining = effective - used;
        per_entity.insert(id, remaining);
        total += remaining;
    }

    CapacityReport { per_entity, total }
}

/// Whether a booking of `asked` capacity should confirm automatically.
///
/// Confirms while the occupied fraction after the booking stays at or below
/// the configured threshold; `total_capacity` is the pool total before the
/// booking. Pure helper for the booking service — the engine itself never
/// confirms anything.
pub fn should_auto_confirm(appt: &AppointmentType, total_capacity: i64, remaining: i64) -> bool {
    if !appt.auto_confirm {
        return false;
    }
    if total_capacity <= 0 {
        return false;
    }
    let occupied = (total_capacity - remaining) as f64 / total_capacity as f64;
    occupied <= appt.confirmation_threshold + 1e-9
}

// ── Tests ───────────────────────────────────────────────────────────────────
