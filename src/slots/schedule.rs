use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use super::course::{Course, CourseKind};
use super::resolve::{resolve_sessions, ClassSession};
use super::table::{Day, SlotTable, TimeOfDay};

/// One student's week: every teaching day, each with its sessions ordered by start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklySchedule {
    days: BTreeMap<Day, Vec<ClassSession>>,
}

impl Default for WeeklySchedule {
    fn default() -> Self {
        Self::empty()
    }
}

impl WeeklySchedule {
    pub fn empty() -> Self {
        WeeklySchedule {
            days: Day::ALL.iter().map(|d| (*d, Vec::new())).collect(),
        }
    }

    pub fn from_sessions<I>(sessions: I) -> Self
    where
        I: IntoIterator<Item = ClassSession>,
    {
        let mut schedule = Self::empty();
        for s in sessions {
            schedule.days.entry(s.day).or_default().push(s);
        }
        for day in schedule.days.values_mut() {
            day.sort_by_key(|s| s.start_time);
        }
        schedule
    }

    /// Resolves every course that holds a slot. This is the only way a schedule is
    /// produced after a slot change; stale sessions cannot survive it.
    pub fn build(table: &SlotTable, courses: &[Course]) -> Self {
        Self::from_sessions(courses.iter().flat_map(|c| match c.slot() {
            Some(slot) => resolve_sessions(table, slot, &c.session_source()),
            None => Vec::new(),
        }))
    }

    pub fn day(&self, day: Day) -> &[ClassSession] {
        self.days.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn sessions(&self) -> impl Iterator<Item = &ClassSession> {
        self.days.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn without_course(&self, course_code: &str) -> Self {
        Self::from_sessions(
            self.sessions()
                .filter(|s| s.course_code != course_code)
                .cloned(),
        )
    }

    pub fn filter_kind(&self, kind: CourseKind) -> Self {
        Self::from_sessions(self.sessions().filter(|s| s.kind == kind).cloned())
    }

    /// First session on `day` that has not ended by `at`.
    pub fn next_class(&self, day: Day, at: TimeOfDay) -> Option<&ClassSession> {
        self.day(day).iter().find(|s| s.end_time > at)
    }
}

impl Serialize for WeeklySchedule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.days.len()))?;
        for (day, sessions) in &self.days {
            map.serialize_entry(day.as_str(), sessions)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(code: &str, kind: CourseKind, slot: &str) -> Course {
        Course {
            id: format!("id-{}", code),
            code: code.to_string(),
            name: format!("{} name", code),
            kind,
            credits: 3,
            slot: Some(slot.to_string()),
            faculty: "Dr. Y".to_string(),
            venue: "TBD".to_string(),
            attended_classes: 0,
            total_classes: 0,
            attendance: 0,
        }
    }

    #[test]
    fn empty_schedule_has_all_five_days() {
        let s = WeeklySchedule::empty();
        let v = serde_json::to_value(&s).expect("serialize");
        let obj = v.as_object().expect("object");
        assert_eq!(obj.len(), 5);
        for d in ["Mon", "Tue", "Wed", "Thu", "Fri"] {
            assert_eq!(obj.get(d).and_then(|x| x.as_array()).map(Vec::len), Some(0));
        }
    }

    #[test]
    fn build_buckets_and_orders_by_start() {
        let table = SlotTable::standard();
        let courses = vec![
            course("MAT201", CourseKind::Theory, "TB1"),
            course("CSE101", CourseKind::Theory, "A1+TA1"),
            course("PHY110", CourseKind::Lab, "L1+L2"),
        ];
        let s = WeeklySchedule::build(&table, &courses);
        assert_eq!(s.len(), 6);
        let monday: Vec<&str> = s.day(Day::Mon).iter().map(|x| x.id.as_str()).collect();
        assert_eq!(
            monday,
            vec![
                "CSE101-A1-Mon-08:00",
                "PHY110-L1-Mon-08:00",
                "PHY110-L2-Mon-08:50",
                "MAT201-TB1-Mon-11:00",
            ]
        );
        assert_eq!(s.day(Day::Tue).len(), 0);
        assert_eq!(s.filter_kind(CourseKind::Lab).len(), 2);
    }

    #[test]
    fn courses_without_slot_contribute_nothing() {
        let table = SlotTable::standard();
        let mut c = course("HUM100", CourseKind::Theory, "");
        assert!(WeeklySchedule::build(&table, &[c.clone()]).is_empty());
        c.slot = None;
        assert!(WeeklySchedule::build(&table, &[c]).is_empty());
    }

    #[test]
    fn without_course_removes_every_session_of_that_code() {
        let table = SlotTable::standard();
        let courses = vec![
            course("CSE101", CourseKind::Theory, "A1+TA1"),
            course("MAT201", CourseKind::Theory, "B1"),
        ];
        let s = WeeklySchedule::build(&table, &courses).without_course("CSE101");
        assert_eq!(s.len(), 2);
        assert!(s.sessions().all(|x| x.course_code == "MAT201"));
    }

    #[test]
    fn next_class_skips_finished_sessions() {
        let table = SlotTable::standard();
        let courses = vec![
            course("CSE101", CourseKind::Theory, "A1"),
            course("MAT201", CourseKind::Theory, "TB1"),
        ];
        let s = WeeklySchedule::build(&table, &courses);
        let at = |h, m| TimeOfDay::hm(h, m);
        assert_eq!(
            s.next_class(Day::Mon, at(7, 0)).map(|x| x.course_code.as_str()),
            Some("CSE101")
        );
        // Still in progress at 08:49.
        assert_eq!(
            s.next_class(Day::Mon, at(8, 49)).map(|x| x.course_code.as_str()),
            Some("CSE101")
        );
        assert_eq!(
            s.next_class(Day::Mon, at(8, 50)).map(|x| x.course_code.as_str()),
            Some("MAT201")
        );
        assert!(s.next_class(Day::Mon, at(12, 0)).is_none());
        assert!(s.next_class(Day::Tue, at(7, 0)).is_none());
    }
}
