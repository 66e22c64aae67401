pub mod attendance;
pub mod core;
pub mod courses;
pub mod setup;
pub mod slots;
pub mod timetable;
