use rusqlite::{Connection, OptionalExtension, Row};
use std::path::Path;

use crate::slots::resolve::day_from_session_id;
use crate::slots::{
    attendance_percent, ClassSession, Course, CourseKind, Day, TimeOfDay, WeeklySchedule,
};

pub const DB_FILE: &str = "slotd.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS courses(
            id TEXT PRIMARY KEY,
            reg_number TEXT NOT NULL,
            code TEXT NOT NULL,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            credits INTEGER NOT NULL,
            slot TEXT,
            faculty TEXT NOT NULL DEFAULT '',
            venue TEXT NOT NULL DEFAULT 'TBD',
            attended_classes INTEGER NOT NULL DEFAULT 0,
            total_classes INTEGER NOT NULL DEFAULT 0,
            sort_order INTEGER NOT NULL,
            created_at TEXT
        )",
        [],
    )?;
    ensure_courses_created_at(&conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_courses_student ON courses(reg_number, sort_order)",
        [],
    )?;

    // Materialized weekly schedule, one row per session. Rewritten as a whole per
    // student whenever a course's slot set changes.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schedule_sessions(
            reg_number TEXT NOT NULL,
            id TEXT NOT NULL,
            day TEXT NOT NULL,
            course_code TEXT NOT NULL,
            course_name TEXT NOT NULL,
            kind TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            venue TEXT NOT NULL,
            faculty TEXT NOT NULL,
            slot TEXT NOT NULL,
            PRIMARY KEY(reg_number, id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_schedule_sessions_day
         ON schedule_sessions(reg_number, day)",
        [],
    )?;

    Ok(conn)
}

fn ensure_courses_created_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "courses", "created_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE courses ADD COLUMN created_at TEXT", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub fn settings_get_json(
    conn: &Connection,
    key: &str,
) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}

const COURSE_COLUMNS: &str = "id, code, name, kind, credits, slot, faculty, venue,
    attended_classes, total_classes";

fn course_from_row(r: &Row<'_>) -> rusqlite::Result<Course> {
    let kind_raw: String = r.get(3)?;
    let attended: i64 = r.get(8)?;
    let total: i64 = r.get(9)?;
    Ok(Course {
        id: r.get(0)?,
        code: r.get(1)?,
        name: r.get(2)?,
        kind: CourseKind::parse(&kind_raw).unwrap_or(CourseKind::Theory),
        credits: r.get(4)?,
        slot: r.get(5)?,
        faculty: r.get(6)?,
        venue: r.get(7)?,
        attended_classes: attended,
        total_classes: total,
        attendance: attendance_percent(attended, total),
    })
}

pub fn list_courses(conn: &Connection, reg_number: &str) -> anyhow::Result<Vec<Course>> {
    let sql = format!(
        "SELECT {} FROM courses WHERE reg_number = ? ORDER BY sort_order, rowid",
        COURSE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let courses = stmt
        .query_map([reg_number], course_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(courses)
}

pub fn get_course(
    conn: &Connection,
    reg_number: &str,
    course_id: &str,
) -> anyhow::Result<Option<Course>> {
    let sql = format!(
        "SELECT {} FROM courses WHERE reg_number = ? AND id = ?",
        COURSE_COLUMNS
    );
    Ok(conn
        .query_row(&sql, (reg_number, course_id), course_from_row)
        .optional()?)
}

pub fn next_course_sort_order(conn: &Connection, reg_number: &str) -> anyhow::Result<i64> {
    let max: Option<i64> = conn.query_row(
        "SELECT MAX(sort_order) FROM courses WHERE reg_number = ?",
        [reg_number],
        |r| r.get(0),
    )?;
    Ok(max.map(|m| m + 1).unwrap_or(0))
}

fn session_from_row(r: &Row<'_>) -> rusqlite::Result<Option<ClassSession>> {
    let id: String = r.get(0)?;
    let day_raw: String = r.get(1)?;
    let kind_raw: String = r.get(4)?;
    let start_raw: String = r.get(5)?;
    let end_raw: String = r.get(6)?;
    let (Some(day), Some(kind), Some(start_time), Some(end_time)) = (
        Day::parse(&day_raw).or_else(|| day_from_session_id(&id)),
        CourseKind::parse(&kind_raw),
        TimeOfDay::parse(&start_raw),
        TimeOfDay::parse(&end_raw),
    ) else {
        return Ok(None);
    };
    Ok(Some(ClassSession {
        id,
        course_code: r.get(2)?,
        course_name: r.get(3)?,
        kind,
        day,
        start_time,
        end_time,
        venue: r.get(7)?,
        faculty: r.get(8)?,
        slot: r.get(9)?,
    }))
}

/// Reads the stored week. Rows that no longer parse are skipped.
pub fn schedule_load(conn: &Connection, reg_number: &str) -> anyhow::Result<WeeklySchedule> {
    let mut stmt = conn.prepare(
        "SELECT id, day, course_code, course_name, kind, start_time, end_time, venue, faculty, slot
         FROM schedule_sessions
         WHERE reg_number = ?
         ORDER BY rowid",
    )?;
    let rows = stmt
        .query_map([reg_number], session_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(WeeklySchedule::from_sessions(rows.into_iter().flatten()))
}

fn insert_session(conn: &Connection, reg_number: &str, s: &ClassSession) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO schedule_sessions(
            reg_number, id, day, course_code, course_name, kind,
            start_time, end_time, venue, faculty, slot
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            reg_number,
            s.id,
            s.day.as_str(),
            s.course_code,
            s.course_name,
            s.kind.as_str(),
            s.start_time.to_string(),
            s.end_time.to_string(),
            s.venue,
            s.faculty,
            s.slot,
        ],
    )?;
    Ok(())
}

/// Replaces the student's whole stored week. Runs inside the caller's transaction
/// so the rewrite commits together with the course change that caused it.
pub fn schedule_replace(
    conn: &Connection,
    reg_number: &str,
    schedule: &WeeklySchedule,
) -> anyhow::Result<()> {
    conn.execute(
        "DELETE FROM schedule_sessions WHERE reg_number = ?",
        [reg_number],
    )?;
    for s in schedule.sessions() {
        insert_session(conn, reg_number, s)?;
    }
    Ok(())
}

/// Replaces a single day's sessions. Sessions for other days are ignored.
pub fn schedule_replace_day(
    conn: &Connection,
    reg_number: &str,
    day: Day,
    sessions: &[ClassSession],
) -> anyhow::Result<()> {
    conn.execute(
        "DELETE FROM schedule_sessions WHERE reg_number = ? AND day = ?",
        (reg_number, day.as_str()),
    )?;
    for s in sessions.iter().filter(|s| s.day == day) {
        insert_session(conn, reg_number, s)?;
    }
    Ok(())
}
