use super::course::CourseKind;
use super::resolve::atomic_tokens;
use super::table::{SlotTable, LAB_COUNT};

const BASE_LETTERS: [char; 7] = ['A', 'B', 'C', 'D', 'E', 'F', 'G'];
const LAB_DAYS: usize = 5;
const LAB_PAIRS_PER_HALF: usize = 3;

/// Composite codes a student may pick for a course of this kind and credit count.
///
/// Labs always offer the 30 two-block pairs regardless of credits. Theory offers
/// depend on credits (2, 3 or 4); four-credit offers are kept only when every
/// component exists in `table`. Anything else offers nothing.
pub fn eligible_slots(table: &SlotTable, kind: CourseKind, credits: i64) -> Vec<String> {
    match (kind, credits) {
        (CourseKind::Lab, _) => lab_pairs(),
        (CourseKind::Theory, 2) => theory_offers(|x, half| format!("{x}{half}")),
        (CourseKind::Theory, 3) => theory_offers(|x, half| format!("{x}{half}+T{x}{half}")),
        (CourseKind::Theory, 4) => {
            theory_offers(|x, half| format!("{x}{half}+T{x}{half}+T{x}{x}{half}"))
                .into_iter()
                .filter(|offer| atomic_tokens(offer).all(|t| table.contains(t)))
                .collect()
        }
        _ => Vec::new(),
    }
}

/// Morning variants (`X1`) for every letter, then afternoon variants (`X2`).
fn theory_offers(compose: impl Fn(char, u8) -> String) -> Vec<String> {
    [1u8, 2u8]
        .iter()
        .flat_map(|&half| BASE_LETTERS.iter().map(move |&x| (x, half)))
        .map(|(x, half)| compose(x, half))
        .collect()
}

fn lab_pairs() -> Vec<String> {
    let half = LAB_COUNT / 2;
    let blocks_per_day = LAB_PAIRS_PER_HALF * 2;
    let mut labs = Vec::with_capacity(LAB_DAYS * LAB_PAIRS_PER_HALF * 2);
    for day in 0..LAB_DAYS {
        for base in [day * blocks_per_day, half + day * blocks_per_day] {
            for pair in 0..LAB_PAIRS_PER_HALF {
                let first = base + pair * 2 + 1;
                labs.push(format!("L{}+L{}", first, first + 1));
            }
        }
    }
    labs
}
