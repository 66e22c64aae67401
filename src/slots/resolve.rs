use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

use super::course::{CourseKind, SessionSource};
use super::table::{Day, Occurrence, SlotTable, TimeOfDay};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    #[error("slot code is empty")]
    EmptyComposite,
    #[error("unknown slot {token:?} in {composite:?}")]
    UnknownAtomic { token: String, composite: String },
}

/// One weekly meeting of a course, materialized from a single atomic occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSession {
    pub id: String,
    pub course_code: String,
    pub course_name: String,
    #[serde(rename = "type")]
    pub kind: CourseKind,
    pub day: Day,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub venue: String,
    pub faculty: String,
    pub slot: String,
}

/// `{course}-{atomic}-{Day}-{HH:MM}`; stable for the same course and slot.
pub fn session_id(course_code: &str, atomic: &str, day: Day, start: TimeOfDay) -> String {
    format!("{}-{}-{}-{}", course_code, atomic, day, start)
}

/// Recovers the weekday embedded in a session id.
pub fn day_from_session_id(id: &str) -> Option<Day> {
    id.split('-').find_map(Day::parse)
}

pub fn atomic_tokens(composite: &str) -> impl Iterator<Item = &str> {
    composite.split('+').map(str::trim)
}

fn session_for(source: &SessionSource<'_>, atomic: &str, occ: &Occurrence) -> ClassSession {
    ClassSession {
        id: session_id(source.code, atomic, occ.day, occ.start),
        course_code: source.code.to_string(),
        course_name: source.name.to_string(),
        kind: source.kind,
        day: occ.day,
        start_time: occ.start,
        end_time: occ.end,
        venue: source.venue.to_string(),
        faculty: source.faculty.to_string(),
        slot: atomic.to_string(),
    }
}

/// Expands a composite slot into sessions, token by token, occurrence by occurrence.
///
/// Tokens missing from the table contribute nothing, so `"A1+XX9"` still yields the
/// `A1` sessions and an empty string yields none.
pub fn resolve_sessions(
    table: &SlotTable,
    composite: &str,
    source: &SessionSource<'_>,
) -> Vec<ClassSession> {
    let mut sessions = Vec::new();
    for token in atomic_tokens(composite) {
        for occ in table.occurrences(token) {
            sessions.push(session_for(source, token, occ));
        }
    }
    sessions
}

/// Every token of `composite` that the table does not know, in order.
pub fn unknown_tokens<'a>(table: &SlotTable, composite: &'a str) -> Vec<&'a str> {
    atomic_tokens(composite)
        .filter(|t| !table.contains(t))
        .collect()
}

/// First non-empty token that appears more than once in `composite`.
pub fn repeated_token(composite: &str) -> Option<&str> {
    let mut seen = HashSet::new();
    atomic_tokens(composite)
        .filter(|t| !t.is_empty())
        .find(|t| !seen.insert(*t))
}

pub fn validate_composite(table: &SlotTable, composite: &str) -> Result<(), SlotError> {
    if composite.trim().is_empty() {
        return Err(SlotError::EmptyComposite);
    }
    if let Some(token) = unknown_tokens(table, composite).first() {
        return Err(SlotError::UnknownAtomic {
            token: token.to_string(),
            composite: composite.to_string(),
        });
    }
    Ok(())
}

/// Like [`resolve_sessions`] but refuses empty codes and unknown tokens.
pub fn resolve_sessions_strict(
    table: &SlotTable,
    composite: &str,
    source: &SessionSource<'_>,
) -> Result<Vec<ClassSession>, SlotError> {
    validate_composite(table, composite)?;
    Ok(resolve_sessions(table, composite, source))
}
