use crate::db;
use crate::ipc::error::ok;
use crate::ipc::handlers::setup::{load_timetable_setup, ClashReport, TimetableSetup};
use crate::ipc::handlers::timetable::rebuild_schedule;
use crate::ipc::helpers::{
    begin_tx, commit_tx, get_optional_i64, get_optional_str, get_required_str,
    get_required_trimmed, require_db, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::slots::{
    detect_clash, find_clashes, repeated_token, resolve_sessions, self_overlap, unknown_tokens,
    Course, CourseKind, SlotTable,
};
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

fn parse_kind(raw: &str) -> Result<CourseKind, HandlerErr> {
    CourseKind::parse(raw)
        .ok_or_else(|| HandlerErr::bad_params("type must be one of: Theory, Lab, Project"))
}

fn normalize_slot(slot: Option<String>) -> Option<String> {
    slot.map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
}

/// Labs always carry one credit.
fn effective_credits(kind: CourseKind, credits: Option<i64>) -> Result<i64, HandlerErr> {
    if kind == CourseKind::Lab {
        return Ok(1);
    }
    let c = credits.unwrap_or(3);
    if !(0..=30).contains(&c) {
        return Err(HandlerErr::bad_params("credits must be in 0..=30"));
    }
    Ok(c)
}

fn check_counts(attended: i64, total: i64) -> Result<(), HandlerErr> {
    if attended < 0 || total < 0 {
        return Err(HandlerErr::bad_params("class counts must not be negative"));
    }
    if attended > total {
        return Err(HandlerErr::bad_params(
            "attendedClasses must not exceed totalClasses",
        ));
    }
    Ok(())
}

/// Rejects a slot that repeats a token, overlaps itself or overlaps one of
/// `others`, and in strict mode a slot with tokens the table does not know.
fn check_slot(
    table: &SlotTable,
    setup: &TimetableSetup,
    slot: &str,
    others: &[Course],
) -> Result<(), HandlerErr> {
    if let Some(token) = repeated_token(slot) {
        return Err(
            HandlerErr::bad_params(format!("slot {} repeats {}", slot, token))
                .with_details(json!({ "repeated": token })),
        );
    }
    if setup.strict_slots {
        let unknown = unknown_tokens(table, slot);
        if !unknown.is_empty() {
            tracing::warn!(slot, ?unknown, "rejecting unknown slot tokens");
            return Err(HandlerErr::new(
                "unknown_slot",
                format!("unknown slot code: {}", unknown.join(", ")),
            )
            .with_details(json!({ "unknown": unknown })));
        }
    }
    if let Some((first, second)) = self_overlap(table, slot) {
        tracing::warn!(slot, "rejecting self-overlapping slot");
        return Err(
            HandlerErr::new("slot_clash", format!("slot {} overlaps itself", slot))
                .with_details(json!({ "selfOverlap": [first, second] })),
        );
    }
    if let Some(conflict) = detect_clash(table, slot, others) {
        tracing::warn!(slot, conflict, "rejecting clashing slot");
        let mut details = json!({ "conflict": conflict });
        if setup.clash_report == ClashReport::All {
            details["conflicts"] = json!(find_clashes(table, slot, others));
        }
        return Err(HandlerErr::new(
            "slot_clash",
            format!("slot {} overlaps with \"{}\"", slot, conflict),
        )
        .with_details(details));
    }
    Ok(())
}

fn load_courses(conn: &Connection, reg_number: &str) -> Result<Vec<Course>, HandlerErr> {
    db::list_courses(conn, reg_number).map_err(HandlerErr::query)
}

fn load_course(
    conn: &Connection,
    reg_number: &str,
    course_id: &str,
) -> Result<Course, HandlerErr> {
    db::get_course(conn, reg_number, course_id)
        .map_err(HandlerErr::query)?
        .ok_or_else(|| HandlerErr::new("not_found", "course not found"))
}

fn ensure_unique_code(
    courses: &[Course],
    code: &str,
    except_id: Option<&str>,
) -> Result<(), HandlerErr> {
    let taken = courses
        .iter()
        .any(|c| c.code == code && Some(c.id.as_str()) != except_id);
    if taken {
        return Err(HandlerErr::new(
            "duplicate_course",
            format!("course {} is already enrolled", code),
        ));
    }
    Ok(())
}

fn courses_list(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let reg_number = get_required_trimmed(params, "regNumber")?;
    let courses = load_courses(conn, &reg_number)?;
    Ok(json!({ "courses": courses }))
}

fn courses_create(
    conn: &Connection,
    table: &SlotTable,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let reg_number = get_required_trimmed(params, "regNumber")?;
    let Some(input) = params.get("course").filter(|v| v.is_object()) else {
        return Err(HandlerErr::bad_params("course must be an object"));
    };
    let setup = load_timetable_setup(conn).map_err(HandlerErr::query)?;

    let name = get_required_trimmed(input, "name")?;
    let kind = parse_kind(&get_required_str(input, "type")?)?;
    let credits = effective_credits(kind, get_optional_i64(input, "credits")?)?;
    let code = get_optional_str(input, "code")?
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| setup.default_course_code.clone())
        .to_ascii_uppercase();
    let faculty = get_optional_str(input, "faculty")?.unwrap_or_default();
    let venue = get_optional_str(input, "venue")?
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| setup.default_venue.clone());
    let slot = normalize_slot(get_optional_str(input, "slot")?);
    let attended = get_optional_i64(input, "attendedClasses")?.unwrap_or(0);
    let total = get_optional_i64(input, "totalClasses")?.unwrap_or(0);
    check_counts(attended, total)?;

    let existing = load_courses(conn, &reg_number)?;
    ensure_unique_code(&existing, &code, None)?;
    if let Some(slot) = slot.as_deref() {
        check_slot(table, &setup, slot, &existing)?;
    }

    let course_id = Uuid::new_v4().to_string();
    let sort_order = db::next_course_sort_order(conn, &reg_number).map_err(HandlerErr::query)?;
    let tx = begin_tx(conn)?;
    tx.execute(
        "INSERT INTO courses(
            id, reg_number, code, name, kind, credits, slot, faculty, venue,
            attended_classes, total_classes, sort_order, created_at
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            course_id,
            reg_number,
            code,
            name,
            kind.as_str(),
            credits,
            slot,
            faculty,
            venue,
            attended,
            total,
            sort_order,
            chrono::Utc::now().to_rfc3339(),
        ],
    )
    .map_err(|e| {
        HandlerErr::new("db_insert_failed", e.to_string())
            .with_details(json!({ "table": "courses" }))
    })?;

    let course = load_course(&tx, &reg_number, &course_id)?;
    let sessions = match course.slot() {
        Some(s) => resolve_sessions(table, s, &course.session_source()),
        None => Vec::new(),
    };
    let schedule = rebuild_schedule(&tx, table, &reg_number)?;
    commit_tx(tx)?;
    tracing::info!(
        reg_number = %reg_number,
        code = %course.code,
        slot = course.slot().unwrap_or(""),
        sessions = sessions.len(),
        total_sessions = schedule.len(),
        "course enrolled"
    );
    Ok(json!({ "course": course, "sessions": sessions }))
}

fn courses_update(
    conn: &Connection,
    table: &SlotTable,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let reg_number = get_required_trimmed(params, "regNumber")?;
    let course_id = get_required_trimmed(params, "courseId")?;
    let Some(patch) = params.get("patch").and_then(|v| v.as_object()) else {
        return Err(HandlerErr::bad_params("patch must be an object"));
    };
    let setup = load_timetable_setup(conn).map_err(HandlerErr::query)?;
    let mut course = load_course(conn, &reg_number, &course_id)?;
    let before = course.clone();

    let patch_value = serde_json::Value::Object(patch.clone());
    for key in patch.keys() {
        match key.as_str() {
            "name" => course.name = get_required_trimmed(&patch_value, "name")?,
            "code" => {
                course.code = get_required_trimmed(&patch_value, "code")?.to_ascii_uppercase()
            }
            "faculty" => {
                course.faculty = get_optional_str(&patch_value, "faculty")?.unwrap_or_default()
            }
            "venue" => {
                course.venue = get_optional_str(&patch_value, "venue")?
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| setup.default_venue.clone())
            }
            "type" => course.kind = parse_kind(&get_required_str(&patch_value, "type")?)?,
            "credits" => {
                course.credits =
                    get_optional_i64(&patch_value, "credits")?.unwrap_or(course.credits)
            }
            "slot" => course.slot = normalize_slot(get_optional_str(&patch_value, "slot")?),
            "attendedClasses" => {
                course.attended_classes =
                    get_optional_i64(&patch_value, "attendedClasses")?.unwrap_or(0)
            }
            "totalClasses" => {
                course.total_classes =
                    get_optional_i64(&patch_value, "totalClasses")?.unwrap_or(0)
            }
            other => {
                return Err(HandlerErr::bad_params(format!(
                    "unknown course field: {}",
                    other
                )))
            }
        }
    }
    course.credits = effective_credits(course.kind, Some(course.credits))?;
    check_counts(course.attended_classes, course.total_classes)?;

    let others: Vec<Course> = load_courses(conn, &reg_number)?
        .into_iter()
        .filter(|c| c.id != course.id)
        .collect();
    ensure_unique_code(&others, &course.code, Some(course.id.as_str()))?;
    let slot_changed = course.slot != before.slot;
    if slot_changed {
        if let Some(slot) = course.slot() {
            check_slot(table, &setup, slot, &others)?;
        }
    }

    let tx = begin_tx(conn)?;
    tx.execute(
        "UPDATE courses
         SET code = ?, name = ?, kind = ?, credits = ?, slot = ?, faculty = ?, venue = ?,
             attended_classes = ?, total_classes = ?
         WHERE id = ? AND reg_number = ?",
        rusqlite::params![
            course.code,
            course.name,
            course.kind.as_str(),
            course.credits,
            course.slot,
            course.faculty,
            course.venue,
            course.attended_classes,
            course.total_classes,
            course.id,
            reg_number,
        ],
    )
    .map_err(|e| HandlerErr::new("db_update_failed", e.to_string()))?;

    // Sessions copy these fields, so any change means the week is rebuilt.
    let schedule_changed = slot_changed
        || course.code != before.code
        || course.name != before.name
        || course.kind != before.kind
        || course.faculty != before.faculty
        || course.venue != before.venue;
    if schedule_changed {
        rebuild_schedule(&tx, table, &reg_number)?;
    }
    let course = load_course(&tx, &reg_number, &course_id)?;
    commit_tx(tx)?;
    Ok(json!({ "course": course, "scheduleRebuilt": schedule_changed }))
}

fn courses_delete(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let reg_number = get_required_trimmed(params, "regNumber")?;
    let course_id = get_required_trimmed(params, "courseId")?;
    let course = load_course(conn, &reg_number, &course_id)?;

    let tx = begin_tx(conn)?;
    tx.execute(
        "DELETE FROM courses WHERE id = ? AND reg_number = ?",
        (&course_id, &reg_number),
    )
    .map_err(|e| {
        HandlerErr::new("db_delete_failed", e.to_string())
            .with_details(json!({ "table": "courses" }))
    })?;
    // Codes are unique per student, so dropping by code leaves the rest untouched.
    let schedule = db::schedule_load(&tx, &reg_number)
        .map_err(HandlerErr::query)?
        .without_course(&course.code);
    db::schedule_replace(&tx, &reg_number, &schedule)
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;
    commit_tx(tx)?;
    tracing::info!(
        reg_number = %reg_number,
        code = %course.code,
        remaining_sessions = schedule.len(),
        "course removed"
    );
    Ok(json!({ "ok": true }))
}

fn handle_courses_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match courses_list(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_courses_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match courses_create(conn, &state.slots, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_courses_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match courses_update(conn, &state.slots, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_courses_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match courses_delete(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "courses.list" => Some(handle_courses_list(state, req)),
        "courses.create" => Some(handle_courses_create(state, req)),
        "courses.update" => Some(handle_courses_update(state, req)),
        "courses.delete" => Some(handle_courses_delete(state, req)),
        _ => None,
    }
}
