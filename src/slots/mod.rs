//! Timetable slot engine: atomic slot registry, period grids, composite slot
//! resolution, slot offers, clash detection and weekly aggregation.
//!
//! Everything here is pure and works from a [`SlotTable`] passed in by the caller.

pub mod clash;
pub mod course;
pub mod eligibility;
pub mod grid;
pub mod resolve;
pub mod schedule;
pub mod table;

pub use clash::{detect_clash, find_clashes, self_overlap};
pub use course::{attendance_percent, Course, CourseKind, SessionSource};
pub use eligibility::eligible_slots;
pub use resolve::{
    repeated_token, resolve_sessions, resolve_sessions_strict, unknown_tokens, validate_composite,
    ClassSession, SlotError,
};
pub use schedule::WeeklySchedule;
pub use table::{Day, SlotTable, TimeOfDay};
