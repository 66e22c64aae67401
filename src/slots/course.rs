use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CourseKind {
    Theory,
    Lab,
    Project,
}

impl CourseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CourseKind::Theory => "Theory",
            CourseKind::Lab => "Lab",
            CourseKind::Project => "Project",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "theory" => Some(CourseKind::Theory),
            "lab" => Some(CourseKind::Lab),
            "project" => Some(CourseKind::Project),
            _ => None,
        }
    }
}

impl fmt::Display for CourseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A student's enrolled course as the store keeps it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub code: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CourseKind,
    pub credits: i64,
    pub slot: Option<String>,
    pub faculty: String,
    pub venue: String,
    pub attended_classes: i64,
    pub total_classes: i64,
    pub attendance: i64,
}

impl Course {
    /// Committed slot, treating a blank string as no slot.
    pub fn slot(&self) -> Option<&str> {
        self.slot.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn session_source(&self) -> SessionSource<'_> {
        SessionSource {
            code: &self.code,
            name: &self.name,
            kind: self.kind,
            faculty: &self.faculty,
            venue: &self.venue,
        }
    }
}

/// Course metadata copied onto every resolved session.
#[derive(Debug, Clone, Copy)]
pub struct SessionSource<'a> {
    pub code: &'a str,
    pub name: &'a str,
    pub kind: CourseKind,
    pub faculty: &'a str,
    pub venue: &'a str,
}

/// Rounded attendance percentage; zero when nothing has been held yet.
pub fn attendance_percent(attended: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    ((attended as f64 / total as f64) * 100.0).round() as i64
}
