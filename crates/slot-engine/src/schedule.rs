//! Appointment configuration model.
//!
//! [`AppointmentType`] is the configuration root an administrator edits: the
//! recurrence category, timezone, duration/interval geometry, the scheduling
//! basis (staff or resources), and the assigned bookable entities. All of it
//! is long-lived input owned by the caller; the engine only validates and
//! reads it.

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Identifier for a staff member or resource (a storage key owned by the caller).
pub type EntityId = u32;

/// How an appointment type produces candidate slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentCategory {
    /// Weekly recurring rules, repeated indefinitely.
    Recurring,
    /// Weekly recurring rules clipped to a fixed start/end datetime.
    Punctual,
    /// Explicit one-off slots only.
    Custom,
    /// Booked at any time the weekly rules allow (no punctual bounds).
    Anytime,
}

/// Whether slots are taken by staff members or by physical/virtual resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleBasis {
    Staff,
    Resource,
}

/// Whether the engine picks one entity per slot or surfaces every option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentMode {
    /// Auto-assign: attach the first available entity.
    #[default]
    Auto,
    /// Manual: attach the full list of available entities and let the
    /// visitor choose.
    Manual,
}

/// One scheduling rule of an appointment type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotRule {
    pub id: u32,
    pub kind: SlotRuleKind,
    /// When non-empty, only these staff members may take this rule's slots.
    #[serde(default)]
    pub restricted_staff: Vec<EntityId>,
    /// When non-empty, only these resources may take this rule's slots.
    #[serde(default)]
    pub restricted_resources: Vec<EntityId>,
}

/// A rule is either weekly-recurring or a unique one-off window, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlotRuleKind {
    /// Weekly pattern in the appointment timezone, hours as fractions
    /// (e.g., `9.5` = 09:30).
    Recurring {
        weekday: Weekday,
        start_hour: f64,
        end_hour: f64,
    },
    /// A one-off window. `all_day` rules span the start's full local day
    /// and ignore the instant's time-of-day.
    Unique {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        all_day: bool,
    },
}

/// A bookable person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: EntityId,
    pub name: String,
    /// IANA timezone the member lives in; all-day busy blocks are
    /// interpreted against this zone's calendar dates.
    pub timezone: String,
    /// Simultaneous bookings the member may absorb (only meaningful when
    /// capacity management is on).
    pub capacity: u32,
}

/// A bookable physical or virtual resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: EntityId,
    pub name: String,
    pub capacity: u32,
    /// Whether several simultaneous bookings may co-occupy this resource up
    /// to its capacity.
    pub shareable: bool,
    /// Resources whose capacity pools with this one (e.g., adjoining rooms
    /// bookable as one larger space).
    #[serde(default)]
    pub linked_resources: Vec<EntityId>,
    /// Deterministic tie-break order for best-fit selection.
    pub sequence: u32,
}

/// The configuration root for one bookable appointment offering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentType {
    pub id: u32,
    pub name: String,
    pub category: AppointmentCategory,
    /// IANA timezone the recurring rules are expressed in.
    pub timezone: String,
    /// Slot length in fractional hours.
    pub duration_hours: f64,
    /// Spacing between successive slot starts; may be less than, equal to,
    /// or greater than the duration.
    pub slot_interval_hours: f64,
    /// Minimum lead time before a slot may start.
    pub min_schedule_hours: f64,
    /// Horizon in days beyond "now" that slots may be offered.
    pub max_schedule_days: u32,
    pub schedule_basis: ScheduleBasis,
    /// When on, bookings carry fractional capacity against each entity's
    /// declared capacity; when off, each booking counts as one of
    /// `max_bookings` concurrent seats.
    pub manage_capacity: bool,
    pub max_bookings: u32,
    pub auto_confirm: bool,
    /// Occupancy fraction (0..=1) up to which bookings confirm automatically.
    pub confirmation_threshold: f64,
    /// Punctual categories only: the bounding window slots are clipped to.
    #[serde(default)]
    pub start_datetime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_datetime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub slot_rules: Vec<SlotRule>,
    #[serde(default)]
    pub staff: Vec<StaffMember>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl AppointmentType {
    /// Check the configuration for internal consistency.
    ///
    /// An invalid configuration is a hard error, never a silent empty
    /// calendar — callers must be able to distinguish "nothing available"
    /// from "misconfigured."
    pub fn validate(&self) -> Result<()> {
        if self.duration_hours <= 0.0 {
            return Err(EngineError::InvalidDuration(format!(
                "appointment type {}: duration must be positive, got {}",
                self.id, self.duration_hours
            )));
        }
        if self.slot_interval_hours <= 0.0 {
            return Err(EngineError::InvalidConfiguration(format!(
                "appointment type {}: slot interval must be positive, got {}",
                self.id, self.slot_interval_hours
            )));
        }
        if !(0.0..=1.0).contains(&self.confirmation_threshold) {
            return Err(EngineError::InvalidConfiguration(format!(
                "appointment type {}: confirmation threshold must be in 0..=1, got {}",
                self.id, self.confirmation_threshold
            )));
        }
        match self.schedule_basis {
            ScheduleBasis::Staff if !self.resources.is_empty() => {
                return Err(EngineError::InvalidConfiguration(format!(
                    "appointment type {}: staff-based type must not carry resources",
                    self.id
                )));
            }
            ScheduleBasis::Resource if !self.staff.is_empty() => {
                return Err(EngineError::InvalidConfiguration(format!(
                    "appointment type {}: resource-based type must not carry staff",
                    self.id
                )));
            }
            _ => {}
        }
        if self.category == AppointmentCategory::Punctual {
            match (self.start_datetime, self.end_datetime) {
                (Some(start), Some(end)) if start < end => {}
                (Some(_), Some(_)) => {
                    return Err(EngineError::InvalidConfiguration(format!(
                        "appointment type {}: punctual start must precede end",
                        self.id
                    )));
                }
                _ => {
                    return Err(EngineError::InvalidConfiguration(format!(
                        "appointment type {}: punctual type needs start and end datetimes",
                        self.id
                    )));
                }
            }
        }
        for rule in &self.slot_rules {
            match rule.kind {
                SlotRuleKind::Recurring {
                    start_hour,
                    end_hour,
                    ..
                } => {
                    if !(0.0..24.0).contains(&start_hour)
                        || end_hour > 24.0
                        || start_hour >= end_hour
                    {
                        return Err(EngineError::InvalidRule(format!(
                            "rule {}: recurring hours must satisfy 0 <= start < end <= 24, got {}..{}",
                            rule.id, start_hour, end_hour
                        )));
                    }
                }
                SlotRuleKind::Unique {
                    start,
                    end,
                    all_day,
                } => {
                    // All-day rules derive their window from the start date
                    // alone, so the hour fields carry no invariant.
                    if !all_day && start >= end {
                        return Err(EngineError::InvalidRule(format!(
                            "rule {}: unique start must strictly precede end",
                            rule.id
                        )));
                    }
                }
            }
        }
        for member in &self.staff {
            if member.capacity == 0 {
                return Err(EngineError::InvalidConfiguration(format!(
                    "staff member {}: capacity must be at least 1",
                    member.id
                )));
            }
        }
        for resource in &self.resources {
            if resource.capacity == 0 {
                return Err(EngineError::InvalidConfiguration(format!(
                    "resource {}: capacity must be at least 1",
                    resource.id
                )));
            }
        }
        Ok(())
    }

    pub fn slot_rule(&self, id: u32) -> Option<&SlotRule> {
        self.slot_rules.iter().find(|r| r.id == id)
    }

    pub fn staff_member(&self, id: EntityId) -> Option<&StaffMember> {
        self.staff.iter().find(|s| s.id == id)
    }

    pub fn resource(&self, id: EntityId) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id == id)
    }

    /// The declared capacity of an assigned entity; 1 for unknown ids.
    pub fn entity_capacity(&self, id: EntityId) -> u32 {
        self.staff_member(id)
            .map(|s| s.capacity)
            .or_else(|| self.resource(id).map(|r| r.capacity))
            .unwrap_or(1)
    }

    /// Every entity assignable under the configured basis, in declaration order.
    pub fn assigned_entities(&self) -> Vec<EntityId> {
        match self.schedule_basis {
            ScheduleBasis::Staff => self.staff.iter().map(|s| s.id).collect(),
            ScheduleBasis::Resource => self.resources.iter().map(|r| r.id).collect(),
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
