use crate::db;
use crate::ipc::error::ok;
use crate::ipc::helpers::{
    begin_tx, commit_tx, get_optional_str, get_required_trimmed, require_db, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::slots::{CourseKind, Day, SlotTable, TimeOfDay, WeeklySchedule};
use chrono::{Datelike, NaiveDateTime, Timelike};
use rusqlite::Connection;
use serde_json::json;

/// Recomputes the student's week from their current courses and stores it whole.
/// Callers run it inside the transaction that changed the courses.
pub fn rebuild_schedule(
    conn: &Connection,
    table: &SlotTable,
    reg_number: &str,
) -> Result<WeeklySchedule, HandlerErr> {
    let courses = db::list_courses(conn, reg_number).map_err(HandlerErr::query)?;
    let schedule = WeeklySchedule::build(table, &courses);
    db::schedule_replace(conn, reg_number, &schedule)
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;
    tracing::info!(
        reg_number,
        courses = courses.len(),
        sessions = schedule.len(),
        "schedule rebuilt"
    );
    Ok(schedule)
}

fn parse_at(raw: Option<String>) -> Result<NaiveDateTime, HandlerErr> {
    match raw {
        Some(s) => NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M")
            .map_err(|_| HandlerErr::bad_params("at must be YYYY-MM-DDTHH:MM")),
        None => Ok(chrono::Local::now().naive_local()),
    }
}

fn timetable_get(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let reg_number = get_required_trimmed(params, "regNumber")?;
    let kind = match get_optional_str(params, "type")? {
        Some(raw) => Some(CourseKind::parse(&raw).ok_or_else(|| {
            HandlerErr::bad_params("type must be one of: Theory, Lab, Project")
        })?),
        None => None,
    };
    let schedule = db::schedule_load(conn, &reg_number).map_err(HandlerErr::query)?;
    let schedule = match kind {
        Some(k) => schedule.filter_kind(k),
        None => schedule,
    };
    Ok(json!({
        "schedule": schedule,
        "sessionCount": schedule.len(),
        "empty": schedule.is_empty()
    }))
}

fn timetable_rebuild(
    conn: &Connection,
    table: &SlotTable,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let reg_number = get_required_trimmed(params, "regNumber")?;
    let day = match get_optional_str(params, "day")? {
        Some(raw) => Some(Day::parse(&raw).ok_or_else(|| {
            HandlerErr::bad_params("day must be one of: Mon, Tue, Wed, Thu, Fri")
        })?),
        None => None,
    };
    let tx = begin_tx(conn)?;
    let Some(day) = day else {
        let schedule = rebuild_schedule(&tx, table, &reg_number)?;
        commit_tx(tx)?;
        return Ok(json!({ "sessionCount": schedule.len() }));
    };

    // Single-day repair: resolve the whole week, store only the requested day.
    let courses = db::list_courses(&tx, &reg_number).map_err(HandlerErr::query)?;
    let schedule = WeeklySchedule::build(table, &courses);
    db::schedule_replace_day(&tx, &reg_number, day, schedule.day(day))
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;
    commit_tx(tx)?;
    Ok(json!({ "day": day, "sessionCount": schedule.day(day).len() }))
}

fn timetable_next(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let reg_number = get_required_trimmed(params, "regNumber")?;
    let at = parse_at(get_optional_str(params, "at")?)?;
    let Some(day) = Day::from_weekday(at.weekday()) else {
        return Ok(json!({ "day": null, "session": null }));
    };
    let minutes = (at.hour() * 60 + at.minute()) as u16;
    let Some(now) = TimeOfDay::from_minutes(minutes) else {
        return Err(HandlerErr::bad_params("at is out of range"));
    };
    let schedule = db::schedule_load(conn, &reg_number).map_err(HandlerErr::query)?;
    let session = schedule.next_class(day, now);
    Ok(json!({ "day": day, "session": session }))
}

fn handle_timetable_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match timetable_get(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_timetable_rebuild(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match timetable_rebuild(conn, &state.slots, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_timetable_next(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match timetable_next(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "timetable.get" => Some(handle_timetable_get(state, req)),
        "timetable.rebuild" => Some(handle_timetable_rebuild(state, req)),
        "timetable.next" => Some(handle_timetable_next(state, req)),
        _ => None,
    }
}
