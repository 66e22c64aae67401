use serde::Serialize;

use super::table::TimeOfDay;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

const fn period(sh: u16, sm: u16, eh: u16, em: u16) -> Period {
    Period {
        start: TimeOfDay::hm(sh, sm),
        end: TimeOfDay::hm(eh, em),
    }
}

/// Fifty-minute theory periods. Lunch runs 12:50 to 14:00.
pub const THEORY_PERIODS: [Period; 10] = [
    period(8, 0, 8, 50),
    period(9, 0, 9, 50),
    period(10, 0, 10, 50),
    period(11, 0, 11, 50),
    period(12, 0, 12, 50),
    period(14, 0, 14, 50),
    period(15, 0, 15, 50),
    period(16, 0, 16, 50),
    period(17, 0, 17, 50),
    period(18, 0, 18, 50),
];

/// Lab blocks: six morning, six afternoon. Lunch runs 13:20 to 14:00.
pub const LAB_BLOCKS: [Period; 12] = [
    period(8, 0, 8, 50),
    period(8, 50, 9, 40),
    period(9, 50, 10, 40),
    period(10, 40, 11, 30),
    period(11, 40, 12, 30),
    period(12, 30, 13, 20),
    period(14, 0, 14, 50),
    period(14, 50, 15, 40),
    period(15, 50, 16, 40),
    period(16, 40, 17, 30),
    period(17, 40, 18, 30),
    period(18, 30, 19, 20),
];

pub const THEORY_MORNING_PERIODS: usize = 5;
pub const LAB_MORNING_BLOCKS: usize = 6;

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_ordered(periods: &[Period]) {
        for w in periods.windows(2) {
            assert!(w[0].start < w[0].end);
            assert!(w[0].end <= w[1].start);
        }
    }

    #[test]
    fn grids_are_ordered_and_non_overlapping() {
        assert_ordered(&THEORY_PERIODS);
        assert_ordered(&LAB_BLOCKS);
    }

    #[test]
    fn lunch_gaps_sit_between_halves() {
        let theory_lunch = (
            THEORY_PERIODS[THEORY_MORNING_PERIODS - 1].end,
            THEORY_PERIODS[THEORY_MORNING_PERIODS].start,
        );
        assert_eq!(theory_lunch, (TimeOfDay::hm(12, 50), TimeOfDay::hm(14, 0)));

        let lab_lunch = (
            LAB_BLOCKS[LAB_MORNING_BLOCKS - 1].end,
            LAB_BLOCKS[LAB_MORNING_BLOCKS].start,
        );
        assert_eq!(lab_lunch, (TimeOfDay::hm(13, 20), TimeOfDay::hm(14, 0)));
    }

    #[test]
    fn every_block_is_fifty_minutes() {
        for p in THEORY_PERIODS.iter().chain(LAB_BLOCKS.iter()) {
            assert_eq!(p.end.minutes() - p.start.minutes(), 50);
        }
    }
}
