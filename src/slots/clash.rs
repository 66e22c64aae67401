use serde::Serialize;

use super::course::Course;
use super::resolve::atomic_tokens;
use super::table::{Day, SlotTable};

/// A weekly occurrence flattened to minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub day: Day,
    pub start: u16,
    pub end: u16,
}

impl Interval {
    /// Half-open overlap on the same weekday.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.day == other.day && self.start < other.end && self.end > other.start
    }
}

pub fn slot_intervals(table: &SlotTable, composite: &str) -> Vec<Interval> {
    atomic_tokens(composite)
        .flat_map(|token| table.occurrences(token))
        .map(|o| Interval {
            day: o.day,
            start: o.start.minutes(),
            end: o.end.minutes(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Clash {
    pub course_id: String,
    pub course_code: String,
    pub course_name: String,
    pub proposed: Interval,
    pub existing: Interval,
}

/// First pair of `composite`'s own intervals that overlap each other.
pub fn self_overlap(table: &SlotTable, composite: &str) -> Option<(Interval, Interval)> {
    let intervals = slot_intervals(table, composite);
    for (i, a) in intervals.iter().enumerate() {
        if let Some(b) = intervals[i + 1..].iter().find(|b| a.overlaps(b)) {
            return Some((*a, *b));
        }
    }
    None
}

/// Name of the first enrolled course whose slot overlaps `proposed`.
///
/// Scans existing courses in order, then proposed intervals, then that course's
/// intervals, and stops at the first overlap. Courses without a slot never clash,
/// nor does an empty proposal.
pub fn detect_clash<'a>(
    table: &SlotTable,
    proposed: &str,
    existing: &'a [Course],
) -> Option<&'a str> {
    if proposed.trim().is_empty() {
        return None;
    }
    let wanted = slot_intervals(table, proposed);
    for course in existing {
        let Some(slot) = course.slot() else {
            continue;
        };
        let held = slot_intervals(table, slot);
        for p in &wanted {
            if held.iter().any(|e| p.overlaps(e)) {
                return Some(&course.name);
            }
        }
    }
    None
}

/// Every overlapping (proposed, existing) pair, in the same order
/// [`detect_clash`] scans them.
pub fn find_clashes(table: &SlotTable, proposed: &str, existing: &[Course]) -> Vec<Clash> {
    let mut clashes = Vec::new();
    if proposed.trim().is_empty() {
        return clashes;
    }
    let wanted = slot_intervals(table, proposed);
    for course in existing {
        let Some(slot) = course.slot() else {
            continue;
        };
        let held = slot_intervals(table, slot);
        for p in &wanted {
            for e in held.iter().filter(|e| p.overlaps(e)) {
                clashes.push(Clash {
                    course_id: course.id.clone(),
                    course_code: course.code.clone(),
                    course_name: course.name.clone(),
                    proposed: *p,
                    existing: *e,
                });
            }
        }
    }
    clashes
}
