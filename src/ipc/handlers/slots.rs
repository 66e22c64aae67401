use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::setup::{load_timetable_setup, ClashReport};
use crate::ipc::helpers::{
    get_optional_bool, get_optional_i64, get_optional_str, get_required_str,
    get_required_trimmed, require_db, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::slots::grid::{LAB_BLOCKS, LAB_MORNING_BLOCKS, THEORY_MORNING_PERIODS, THEORY_PERIODS};
use crate::slots::{
    detect_clash, eligible_slots, find_clashes, resolve_sessions, resolve_sessions_strict,
    unknown_tokens, validate_composite, Course, CourseKind, SessionSource, SlotError, SlotTable,
};
use rusqlite::Connection;
use serde_json::json;

fn slot_error(e: SlotError) -> HandlerErr {
    let details = match &e {
        SlotError::EmptyComposite => json!({ "unknown": [] }),
        SlotError::UnknownAtomic { token, .. } => json!({ "unknown": [token] }),
    };
    HandlerErr::new("unknown_slot", e.to_string()).with_details(details)
}

fn handle_slots_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let codes: Vec<&str> = state.slots.codes().collect();
    ok(&req.id, json!({ "codes": codes }))
}

fn handle_slots_occurrences(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(code) = req.params.get("code").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing code", None);
    };
    let code = code.trim().to_ascii_uppercase();
    let occurrences = state.slots.occurrences(&code);
    ok(&req.id, json!({ "code": code, "occurrences": occurrences }))
}

fn handle_slots_grid(_state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "theory": THEORY_PERIODS,
            "lab": LAB_BLOCKS,
            "theoryLunch": {
                "start": THEORY_PERIODS[THEORY_MORNING_PERIODS - 1].end,
                "end": THEORY_PERIODS[THEORY_MORNING_PERIODS].start
            },
            "labLunch": {
                "start": LAB_BLOCKS[LAB_MORNING_BLOCKS - 1].end,
                "end": LAB_BLOCKS[LAB_MORNING_BLOCKS].start
            }
        }),
    )
}

fn slots_eligible(
    table: &SlotTable,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let raw = get_required_str(params, "type")?;
    let kind = CourseKind::parse(&raw)
        .ok_or_else(|| HandlerErr::bad_params("type must be one of: Theory, Lab, Project"))?;
    let credits = get_optional_i64(params, "credits")?.unwrap_or(0);
    Ok(json!({ "slots": eligible_slots(table, kind, credits) }))
}

fn slots_validate(
    table: &SlotTable,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let slot = get_required_str(params, "slot")?.trim().to_ascii_uppercase();
    let valid = validate_composite(table, &slot).is_ok();
    let unknown: Vec<&str> = if slot.is_empty() {
        Vec::new()
    } else {
        unknown_tokens(table, &slot)
    };
    Ok(json!({ "slot": slot, "valid": valid, "unknown": unknown }))
}

/// Preview of the sessions a course would get; nothing is stored.
fn slots_resolve(
    conn: Option<&Connection>,
    table: &SlotTable,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let slot = get_required_str(params, "slot")?.trim().to_ascii_uppercase();
    let course = params.get("course").cloned().unwrap_or_else(|| json!({}));
    let code = get_optional_str(&course, "code")?.unwrap_or_default();
    let name = get_optional_str(&course, "name")?.unwrap_or_default();
    let faculty = get_optional_str(&course, "faculty")?.unwrap_or_default();
    let kind = match get_optional_str(&course, "type")? {
        Some(raw) => CourseKind::parse(&raw)
            .ok_or_else(|| HandlerErr::bad_params("type must be one of: Theory, Lab, Project"))?,
        None => CourseKind::Theory,
    };
    let strict = match get_optional_bool(params, "strict")? {
        Some(s) => s,
        None => match conn {
            Some(c) => load_timetable_setup(c).map_err(HandlerErr::query)?.strict_slots,
            None => false,
        },
    };
    let venue = match get_optional_str(&course, "venue")?.filter(|s| !s.is_empty()) {
        Some(v) => v,
        None => match conn {
            Some(c) => load_timetable_setup(c).map_err(HandlerErr::query)?.default_venue,
            None => "TBD".to_string(),
        },
    };
    let source = SessionSource {
        code: &code,
        name: &name,
        kind,
        faculty: &faculty,
        venue: &venue,
    };
    let sessions = if strict {
        resolve_sessions_strict(table, &slot, &source).map_err(slot_error)?
    } else {
        let dropped = unknown_tokens(table, &slot);
        if !slot.is_empty() && !dropped.is_empty() {
            tracing::warn!(slot = %slot, ?dropped, "dropping unknown slot tokens");
        }
        resolve_sessions(table, &slot, &source)
    };
    Ok(json!({ "sessions": sessions }))
}

fn slots_clash(
    conn: &Connection,
    table: &SlotTable,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let reg_number = get_required_trimmed(params, "regNumber")?;
    let slot = get_required_str(params, "slot")?.trim().to_ascii_uppercase();
    let exclude = get_optional_str(params, "excludeCourseId")?;
    let courses: Vec<Course> = db::list_courses(conn, &reg_number)
        .map_err(HandlerErr::query)?
        .into_iter()
        .filter(|c| Some(&c.id) != exclude.as_ref())
        .collect();
    let setup = load_timetable_setup(conn).map_err(HandlerErr::query)?;

    let conflict = detect_clash(table, &slot, &courses);
    let mut result = json!({ "slot": slot, "conflict": conflict });
    if setup.clash_report == ClashReport::All {
        result["conflicts"] = json!(find_clashes(table, &slot, &courses));
    }
    Ok(result)
}

fn handle_slots_eligible(state: &mut AppState, req: &Request) -> serde_json::Value {
    match slots_eligible(&state.slots, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_slots_validate(state: &mut AppState, req: &Request) -> serde_json::Value {
    match slots_validate(&state.slots, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_slots_resolve(state: &mut AppState, req: &Request) -> serde_json::Value {
    match slots_resolve(state.db.as_ref(), &state.slots, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_slots_clash(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match slots_clash(conn, &state.slots, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "slots.list" => Some(handle_slots_list(state, req)),
        "slots.occurrences" => Some(handle_slots_occurrences(state, req)),
        "slots.grid" => Some(handle_slots_grid(state, req)),
        "slots.eligible" => Some(handle_slots_eligible(state, req)),
        "slots.validate" => Some(handle_slots_validate(state, req)),
        "slots.resolve" => Some(handle_slots_resolve(state, req)),
        "slots.clash" => Some(handle_slots_clash(state, req)),
        _ => None,
    }
}
