use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::require_db;
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Map, Value};

#[derive(Clone, Copy)]
enum SetupSection {
    Timetable,
    Attendance,
}

impl SetupSection {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "timetable" => Some(Self::Timetable),
            "attendance" => Some(Self::Attendance),
            _ => None,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Timetable => "setup.timetable",
            Self::Attendance => "setup.attendance",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Timetable => json!({
            "strictSlots": false,
            "clashReport": "first",
            "defaultVenue": "TBD",
            "defaultCourseCode": "COURSE"
        }),
        SetupSection::Attendance => json!({
            "minimumPercent": 75
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClashReport {
    First,
    All,
}

/// Typed view of the `timetable` section, read by the enrollment handlers.
#[derive(Debug, Clone)]
pub struct TimetableSetup {
    pub strict_slots: bool,
    pub clash_report: ClashReport,
    pub default_venue: String,
    pub default_course_code: String,
}

fn as_object_mut(value: &mut Value) -> Result<&mut Map<String, Value>, String> {
    value
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())
}

fn parse_bool(v: &Value, key: &str) -> Result<bool, String> {
    v.as_bool().ok_or_else(|| format!("{} must be boolean", key))
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v.as_i64().ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn parse_string_max(v: &Value, key: &str, max_len: usize) -> Result<String, String> {
    let s = v.as_str().ok_or_else(|| format!("{} must be string", key))?;
    let s = s.trim();
    if s.len() > max_len {
        return Err(format!("{} length must be <= {}", key, max_len));
    }
    Ok(s.to_string())
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = as_object_mut(current)?;
    for (k, v) in patch {
        match section {
            SetupSection::Timetable => match k.as_str() {
                "strictSlots" => {
                    obj.insert(k.clone(), Value::Bool(parse_bool(v, k)?));
                }
                "clashReport" => {
                    let s = parse_string_max(v, k, 8)?.to_ascii_lowercase();
                    if s != "first" && s != "all" {
                        return Err("clashReport must be one of: first, all".into());
                    }
                    obj.insert(k.clone(), Value::String(s));
                }
                "defaultVenue" => {
                    let s = parse_string_max(v, k, 40)?;
                    if s.is_empty() {
                        return Err("defaultVenue must not be empty".into());
                    }
                    obj.insert(k.clone(), Value::String(s));
                }
                "defaultCourseCode" => {
                    let s = parse_string_max(v, k, 16)?;
                    if s.is_empty() {
                        return Err("defaultCourseCode must not be empty".into());
                    }
                    obj.insert(k.clone(), Value::String(s.to_ascii_uppercase()));
                }
                _ => return Err(format!("unknown timetable field: {}", k)),
            },
            SetupSection::Attendance => match k.as_str() {
                "minimumPercent" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 0, 100)?));
                }
                _ => return Err(format!("unknown attendance field: {}", k)),
            },
        }
    }
    Ok(())
}

fn load_section(conn: &rusqlite::Connection, section: SetupSection) -> anyhow::Result<Value> {
    let mut current = default_section(section);
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Each stored field is merged on its own; a bad one keeps its default.
            for (key, value) in saved_obj {
                let mut field = Map::new();
                field.insert(key.clone(), value.clone());
                if let Err(e) = merge_section_patch(section, &mut current, &field) {
                    tracing::warn!(
                        section = section.key(),
                        error = %e,
                        "ignoring stored setup field"
                    );
                }
            }
        }
    }
    Ok(current)
}

pub fn load_timetable_setup(conn: &rusqlite::Connection) -> anyhow::Result<TimetableSetup> {
    let v = load_section(conn, SetupSection::Timetable)?;
    Ok(TimetableSetup {
        strict_slots: v["strictSlots"].as_bool().unwrap_or(false),
        clash_report: match v["clashReport"].as_str() {
            Some("all") => ClashReport::All,
            _ => ClashReport::First,
        },
        default_venue: v["defaultVenue"].as_str().unwrap_or("TBD").to_string(),
        default_course_code: v["defaultCourseCode"]
            .as_str()
            .unwrap_or("COURSE")
            .to_string(),
    })
}

pub fn load_minimum_attendance(conn: &rusqlite::Connection) -> anyhow::Result<i64> {
    let v = load_section(conn, SetupSection::Attendance)?;
    Ok(v["minimumPercent"].as_i64().unwrap_or(75))
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let timetable = match load_section(conn, SetupSection::Timetable) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let attendance = match load_section(conn, SetupSection::Attendance) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    ok(
        &req.id,
        json!({
            "timetable": timetable,
            "attendance": attendance
        }),
    )
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let mut current = match load_section(conn, section) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(msg) = merge_section_patch(section, &mut current, patch_obj) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = db::settings_set_json(conn, section.key(), &current) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    tracing::info!(section = section.key(), "setup updated");
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
