use crate::db;
use crate::ipc::error::ok;
use crate::ipc::handlers::setup::load_minimum_attendance;
use crate::ipc::helpers::{get_required_trimmed, require_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::slots::attendance_percent;
use rusqlite::Connection;
use serde_json::json;

fn parse_present(params: &serde_json::Value) -> Result<bool, HandlerErr> {
    params
        .get("present")
        .and_then(|v| v.as_bool())
        .ok_or_else(|| HandlerErr::bad_params("present must be boolean"))
}

/// Records one held class: total always grows, attended only when present.
fn attendance_mark(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let reg_number = get_required_trimmed(params, "regNumber")?;
    let course_id = get_required_trimmed(params, "courseId")?;
    let present = parse_present(params)?;

    let changed = conn
        .execute(
            "UPDATE courses
             SET total_classes = total_classes + 1,
                 attended_classes = attended_classes + ?
             WHERE id = ? AND reg_number = ?",
            (i64::from(present), &course_id, &reg_number),
        )
        .map_err(|e| HandlerErr::new("db_update_failed", e.to_string()))?;
    if changed == 0 {
        return Err(HandlerErr::new("not_found", "course not found"));
    }

    let course = db::get_course(conn, &reg_number, &course_id)
        .map_err(HandlerErr::query)?
        .ok_or_else(|| HandlerErr::new("not_found", "course not found"))?;
    let minimum = load_minimum_attendance(conn).map_err(HandlerErr::query)?;
    Ok(json!({
        "course": course,
        "belowMinimum": course.attendance < minimum
    }))
}

fn attendance_summary(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let reg_number = get_required_trimmed(params, "regNumber")?;
    let courses = db::list_courses(conn, &reg_number).map_err(HandlerErr::query)?;
    let minimum = load_minimum_attendance(conn).map_err(HandlerErr::query)?;
    let attended: i64 = courses.iter().map(|c| c.attended_classes).sum();
    let total: i64 = courses.iter().map(|c| c.total_classes).sum();
    let rows: Vec<serde_json::Value> = courses
        .iter()
        .map(|c| {
            json!({
                "courseId": c.id,
                "code": c.code,
                "name": c.name,
                "attendance": c.attendance,
                "belowMinimum": c.total_classes > 0 && c.attendance < minimum
            })
        })
        .collect();
    Ok(json!({
        "minimumPercent": minimum,
        "overall": attendance_percent(attended, total),
        "courses": rows
    }))
}

fn handle_attendance_mark(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match attendance_mark(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_attendance_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match attendance_summary(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.mark" => Some(handle_attendance_mark(state, req)),
        "attendance.summary" => Some(handle_attendance_summary(state, req)),
        _ => None,
    }
}
