use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

use super::grid::{Period, LAB_BLOCKS};

/// Teaching weekday. The timetable never schedules weekends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Day {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
}

impl Day {
    pub const ALL: [Day; 5] = [Day::Mon, Day::Tue, Day::Wed, Day::Thu, Day::Fri];

    pub fn as_str(self) -> &'static str {
        match self {
            Day::Mon => "Mon",
            Day::Tue => "Tue",
            Day::Wed => "Wed",
            Day::Thu => "Thu",
            Day::Fri => "Fri",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Mon" => Some(Day::Mon),
            "Tue" => Some(Day::Tue),
            "Wed" => Some(Day::Wed),
            "Thu" => Some(Day::Thu),
            "Fri" => Some(Day::Fri),
            _ => None,
        }
    }

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    /// Maps a calendar weekday; Saturday and Sunday have no teaching day.
    pub fn from_weekday(wd: chrono::Weekday) -> Option<Self> {
        match wd {
            chrono::Weekday::Mon => Some(Day::Mon),
            chrono::Weekday::Tue => Some(Day::Tue),
            chrono::Weekday::Wed => Some(Day::Wed),
            chrono::Weekday::Thu => Some(Day::Thu),
            chrono::Weekday::Fri => Some(Day::Fri),
            chrono::Weekday::Sat | chrono::Weekday::Sun => None,
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minutes since midnight, no timezone. Renders as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const fn hm(hour: u16, minute: u16) -> Self {
        TimeOfDay(hour * 60 + minute)
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn from_minutes(minutes: u16) -> Option<Self> {
        (minutes < 24 * 60).then_some(TimeOfDay(minutes))
    }

    pub fn parse(s: &str) -> Option<Self> {
        let (h, m) = s.trim().split_once(':')?;
        let h = h.parse::<u16>().ok()?;
        let m = m.parse::<u16>().ok()?;
        if h > 23 || m > 59 {
            return None;
        }
        Some(TimeOfDay::hm(h, m))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    pub day: Day,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl Occurrence {
    pub const fn new(day: Day, start: TimeOfDay, end: TimeOfDay) -> Self {
        Occurrence { day, start, end }
    }

    pub fn in_period(day: Day, period: Period) -> Self {
        Occurrence::new(day, period.start, period.end)
    }
}

/// Immutable registry of atomic slot codes.
///
/// Built once (usually via [`SlotTable::standard`]) and shared by reference with the
/// resolver, eligibility generator and clash detector. Lookups of unknown codes are
/// not errors; they simply have no occurrences.
#[derive(Debug, Clone, Default)]
pub struct SlotTable {
    entries: HashMap<String, Vec<Occurrence>>,
    order: Vec<String>,
}

impl SlotTable {
    /// Builds a table from explicit entries. Later duplicates replace earlier ones.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<Occurrence>)>,
        S: Into<String>,
    {
        let mut table = SlotTable::default();
        for (code, occurrences) in entries {
            table.insert(code.into(), occurrences);
        }
        table
    }

    /// The institution's published grid: hand-authored theory slots plus the
    /// generated lab slots `L1`..`L60`.
    pub fn standard() -> Self {
        let mut table = SlotTable::from_entries(theory_entries());
        for (code, occurrence) in generate_lab_entries() {
            table.insert(code, vec![occurrence]);
        }
        table
    }

    fn insert(&mut self, code: String, occurrences: Vec<Occurrence>) {
        if !self.entries.contains_key(&code) {
            self.order.push(code.clone());
        }
        self.entries.insert(code, occurrences);
    }

    pub fn occurrences(&self, code: &str) -> &[Occurrence] {
        self.entries.get(code).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    /// Codes in the order they were added.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }
}

const fn occ(day: Day, sh: u16, sm: u16, eh: u16, em: u16) -> Occurrence {
    Occurrence::new(day, TimeOfDay::hm(sh, sm), TimeOfDay::hm(eh, em))
}

fn theory_entries() -> Vec<(&'static str, Vec<Occurrence>)> {
    use Day::*;
    vec![
        // Morning theory.
        ("A1", vec![occ(Mon, 8, 0, 8, 50), occ(Wed, 9, 0, 9, 50)]),
        ("B1", vec![occ(Tue, 8, 0, 8, 50), occ(Thu, 9, 0, 9, 50)]),
        ("C1", vec![occ(Wed, 8, 0, 8, 50), occ(Fri, 9, 0, 9, 50)]),
        ("D1", vec![occ(Mon, 10, 0, 10, 50), occ(Thu, 8, 0, 8, 50)]),
        ("E1", vec![occ(Tue, 10, 0, 10, 50), occ(Fri, 8, 0, 8, 50)]),
        ("F1", vec![occ(Mon, 9, 0, 9, 50), occ(Wed, 10, 0, 10, 50)]),
        ("G1", vec![occ(Tue, 9, 0, 9, 50), occ(Thu, 10, 0, 10, 50)]),
        ("TA1", vec![occ(Fri, 10, 0, 10, 50)]),
        ("TB1", vec![occ(Mon, 11, 0, 11, 50)]),
        ("TC1", vec![occ(Tue, 11, 0, 11, 50)]),
        ("TD1", vec![occ(Fri, 12, 0, 12, 50)]),
        ("TE1", vec![occ(Thu, 11, 0, 11, 50)]),
        ("TF1", vec![occ(Fri, 11, 0, 11, 50)]),
        ("TG1", vec![occ(Mon, 12, 0, 12, 50)]),
        ("TAA1", vec![occ(Tue, 12, 0, 12, 50)]),
        ("TCC1", vec![occ(Thu, 12, 0, 12, 50)]),
        // Afternoon theory.
        ("A2", vec![occ(Mon, 14, 0, 14, 50), occ(Wed, 15, 0, 15, 50)]),
        ("B2", vec![occ(Tue, 14, 0, 14, 50), occ(Thu, 15, 0, 15, 50)]),
        ("C2", vec![occ(Wed, 14, 0, 14, 50), occ(Fri, 15, 0, 15, 50)]),
        ("D2", vec![occ(Mon, 16, 0, 16, 50), occ(Thu, 14, 0, 14, 50)]),
        ("E2", vec![occ(Tue, 16, 0, 16, 50), occ(Fri, 14, 0, 14, 50)]),
        ("F2", vec![occ(Mon, 15, 0, 15, 50), occ(Wed, 16, 0, 16, 50)]),
        ("G2", vec![occ(Tue, 15, 0, 15, 50), occ(Thu, 16, 0, 16, 50)]),
        ("TA2", vec![occ(Fri, 16, 0, 16, 50)]),
        ("TB2", vec![occ(Mon, 17, 0, 17, 50)]),
        ("TC2", vec![occ(Tue, 17, 0, 17, 50)]),
        ("TD2", vec![occ(Wed, 17, 0, 17, 50)]),
        ("TE2", vec![occ(Thu, 17, 0, 17, 50)]),
        ("TF2", vec![occ(Fri, 17, 0, 17, 50)]),
        ("TG2", vec![occ(Mon, 18, 0, 18, 50)]),
        ("TAA2", vec![occ(Tue, 18, 0, 18, 50)]),
        ("TBB2", vec![occ(Wed, 18, 0, 18, 50)]),
        ("TCC2", vec![occ(Thu, 18, 0, 18, 50)]),
        ("TDD2", vec![occ(Fri, 18, 0, 18, 50)]),
    ]
}

pub const LAB_COUNT: usize = 60;
const LABS_PER_HALF: usize = 30;
const BLOCKS_PER_HALF: usize = 6;

/// Day and lab-grid block for lab slot `L{index}`, or `None` when the index falls
/// outside the five-day week.
pub fn lab_position(index: usize) -> Option<(Day, usize)> {
    if index == 0 {
        return None;
    }
    let (offset, block_base) = if index <= LABS_PER_HALF {
        (index - 1, 0)
    } else {
        (index - LABS_PER_HALF - 1, BLOCKS_PER_HALF)
    };
    let day = Day::from_index(offset / BLOCKS_PER_HALF)?;
    Some((day, block_base + offset % BLOCKS_PER_HALF))
}

fn generate_lab_entries() -> Vec<(String, Occurrence)> {
    let mut labs = Vec::with_capacity(LAB_COUNT);
    for i in 1..=LAB_COUNT {
        let Some((day, block)) = lab_position(i) else {
            continue;
        };
        let Some(period) = LAB_BLOCKS.get(block) else {
            continue;
        };
        labs.push((format!("L{}", i), Occurrence::in_period(day, *period)));
    }
    labs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_occurrence_is_well_formed() {
        let table = SlotTable::standard();
        for code in table.codes() {
            let occs = table.occurrences(code);
            assert!(!occs.is_empty(), "{} has no occurrences", code);
            for o in occs {
                assert!(o.start < o.end, "{} has start >= end", code);
                assert!(Day::ALL.contains(&o.day));
            }
        }
    }

    #[test]
    fn standard_table_has_theory_and_all_labs() {
        let table = SlotTable::standard();
        assert_eq!(table.len(), 34 + LAB_COUNT);
        assert!(table.contains("TDD2"));
        assert!(!table.contains("TBB1"));
        assert_eq!(table.codes().next(), Some("A1"));
    }

    #[test]
    fn first_lab_is_monday_first_block() {
        let table = SlotTable::standard();
        let l1 = table.occurrences("L1");
        assert_eq!(l1.len(), 1);
        assert_eq!(l1[0].day, Day::Mon);
        assert_eq!(l1[0].start, LAB_BLOCKS[0].start);
        assert_eq!(l1[0].end, LAB_BLOCKS[0].end);
        assert!(table.occurrences("L61").is_empty());
        assert!(table.occurrences("").is_empty());
    }

    #[test]
    fn lab_positions_split_morning_and_afternoon() {
        assert_eq!(lab_position(6), Some((Day::Mon, 5)));
        assert_eq!(lab_position(7), Some((Day::Tue, 0)));
        assert_eq!(lab_position(30), Some((Day::Fri, 5)));
        assert_eq!(lab_position(31), Some((Day::Mon, 6)));
        assert_eq!(lab_position(60), Some((Day::Fri, 11)));
        assert_eq!(lab_position(61), None);
        assert_eq!(lab_position(0), None);
    }

    #[test]
    fn afternoon_lab_uses_afternoon_block() {
        let table = SlotTable::standard();
        let l37 = table.occurrences("L37");
        assert_eq!(l37[0].day, Day::Tue);
        assert_eq!(l37[0].start.to_string(), "14:00");
        assert_eq!(l37[0].end.to_string(), "14:50");
    }

    #[test]
    fn time_of_day_parses_and_renders() {
        let t = TimeOfDay::parse("09:05").expect("parse");
        assert_eq!(t.minutes(), 545);
        assert_eq!(t.to_string(), "09:05");
        assert_eq!(TimeOfDay::parse("24:00"), None);
        assert_eq!(TimeOfDay::parse("nine"), None);
    }

    #[test]
    fn substitute_table_keeps_insertion_order() {
        let table = SlotTable::from_entries([
            ("X1", vec![occ(Day::Mon, 8, 0, 9, 0)]),
            ("Y1", vec![]),
        ]);
        assert_eq!(table.codes().collect::<Vec<_>>(), vec!["X1", "Y1"]);
        assert!(table.contains("Y1"));
        assert!(table.occurrences("Y1").is_empty());
    }
}
