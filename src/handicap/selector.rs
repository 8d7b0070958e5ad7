use serde::{Deserialize, Serialize};

use super::HandicapError;

/// `(minimum eligible rounds, differentials counted, adjustment)`, checked top down.
///
/// The one table every calculation goes through. Seven and eight rounds both
/// count the best three.
pub const SELECTION_TABLE: [(usize, usize, f64); 11] = [
    (20, 8, 0.0),
    (17, 7, 0.0),
    (15, 6, 0.0),
    (12, 5, 0.0),
    (9, 4, 0.0),
    (7, 3, 0.0),
    (6, 2, -1.0),
    (5, 1, 0.0),
    (4, 1, -1.0),
    (3, 1, -2.0),
    (1, 1, -2.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundSelection {
    pub count_to_use: usize,
    pub adjustment: f64,
}

/// How many of the best differentials count for `eligible_count` rounds.
///
/// Counts above twenty select like twenty.
pub fn select_rounds(eligible_count: usize) -> Result<RoundSelection, HandicapError> {
    SELECTION_TABLE
        .iter()
        .find(|(minimum, _, _)| eligible_count >= *minimum)
        .map(|&(_, count_to_use, adjustment)| RoundSelection {
            count_to_use,
            adjustment,
        })
        .ok_or(HandicapError::InsufficientRounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 1, -2.0)]
    #[case(2, 1, -2.0)]
    #[case(3, 1, -2.0)]
    #[case(4, 1, -1.0)]
    #[case(5, 1, 0.0)]
    #[case(6, 2, -1.0)]
    #[case(7, 3, 0.0)]
    #[case(8, 3, 0.0)]
    #[case(9, 4, 0.0)]
    #[case(11, 4, 0.0)]
    #[case(12, 5, 0.0)]
    #[case(14, 5, 0.0)]
    #[case(15, 6, 0.0)]
    #[case(16, 6, 0.0)]
    #[case(17, 7, 0.0)]
    #[case(19, 7, 0.0)]
    #[case(20, 8, 0.0)]
    #[case(35, 8, 0.0)]
    fn selects_by_sample_size(
        #[case] eligible: usize,
        #[case] count: usize,
        #[case] adjustment: f64,
    ) {
        let selection = select_rounds(eligible).unwrap();
        assert_eq!(selection.count_to_use, count);
        assert_eq!(selection.adjustment, adjustment);
    }

    #[test]
    fn zero_rounds_is_insufficient() {
        assert!(matches!(
            select_rounds(0),
            Err(HandicapError::InsufficientRounds)
        ));
    }

    #[test]
    fn never_counts_more_rounds_than_available() {
        for eligible in 1..=20 {
            let selection = select_rounds(eligible).unwrap();
            assert!(selection.count_to_use <= eligible);
        }
    }
}
