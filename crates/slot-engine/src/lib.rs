//! # slot-engine
//!
//! Appointment availability and slot allocation.
//!
//! Given a bookable appointment type configuration, the engine produces a
//! calendar of candidate time slots and decides, per slot, which staff
//! members or resources are actually free — honoring timezones,
//! recurring/punctual/custom scheduling rules, and fractional-capacity
//! sharing across shareable and linked resources. Everything is pure
//! computation over caller-supplied snapshots: no clock access, no I/O,
//! no locking. Persistence, notifications, and booking writes live in the
//! surrounding service.
//!
//! ## Modules
//!
//! - [`temporal`] — timezone parsing, interval math, wall-clock resolution
//! - [`schedule`] — appointment configuration model + validation
//! - [`slots`] — recurrence expansion into concrete candidate slots
//! - [`ledger`] — booking aggregation into remaining-capacity figures
//! - [`staff`] — staff availability resolution
//! - [`resource`] — resource availability resolution
//! - [`bestfit`] — best-fit resource subset selection
//! - [`calendar`] — month/week/day bucketing for presentation
//! - [`validity`] — single-slot re-validation for the booking transaction
//! - [`engine`] — the exposed pipeline
//! - [`error`] — error types

pub mod bestfit;
pub mod calendar;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod resource;
pub mod schedule;
pub mod slots;
pub mod staff;
pub mod temporal;
pub mod validity;

pub use bestfit::{select_best, CapacityInfo, SelectorCache};
pub use calendar::{render_calendar, DayBucket, MonthBucket, WeekBucket};
pub use engine::{available_slots, validate_slot, AvailabilitySnapshot, CalendarPayload, SlotQuery};
pub use error::{EngineError, Result};
pub use ledger::{remaining_capacity, should_auto_confirm, BookingLine, CapacityReport};
pub use resource::fill_resource_availability;
pub use schedule::{
    AppointmentCategory, AppointmentType, AssignmentMode, EntityId, Resource, ScheduleBasis,
    SlotRule, SlotRuleKind, StaffMember,
};
pub use slots::{generate_slots, Assignment, ResolvedSlot};
pub use staff::{fill_staff_availability, BusyBlock};
pub use temporal::{UtcWindow, WeekStartDay, ZonedWindow};
pub use validity::{is_slot_still_valid, EntitySelection};
