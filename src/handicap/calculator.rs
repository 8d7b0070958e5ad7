use tracing::{debug, error, instrument};

use super::{
    compute_differential, select_rounds, HandicapCalculation, HandicapError, HandicapScope, Round,
    RoundSource, INDEX_MULTIPLIER, MAX_INDEX, MAX_ROUNDS, MIN_INDEX,
};

/// Rounds half away from zero to one decimal place
pub fn round_to_tenth(value: f64) -> f64 {
    // adding 0.0 turns -0.0 into 0.0
    (value * 10.0).round() / 10.0 + 0.0
}

/// Computes an index from rounds ordered most recent first.
///
/// Only the first [`MAX_ROUNDS`] are considered. Rounds whose differential
/// cannot be computed are logged and skipped.
pub fn calculate_from_rounds(rounds: &[Round]) -> Result<HandicapCalculation, HandicapError> {
    let mut differentials: Vec<f64> = rounds
        .iter()
        .take(MAX_ROUNDS)
        .filter_map(|round| match compute_differential(round) {
            Ok(differential) => Some(differential),
            Err(err) => {
                error!(
                    round_id = %round.id,
                    error = %err,
                    "Round source returned an ineligible round, skipping"
                );
                None
            }
        })
        .collect();

    let selection = select_rounds(differentials.len())?;

    // stable, so equal differentials keep their recency order
    differentials.sort_by(|a, b| a.total_cmp(b));

    let best: Vec<f64> = differentials
        .iter()
        .take(selection.count_to_use)
        .copied()
        .collect();
    let average = best.iter().sum::<f64>() / best.len() as f64;
    let raw_index = average * INDEX_MULTIPLIER + selection.adjustment;
    let index = round_to_tenth(raw_index).clamp(MIN_INDEX, MAX_INDEX);

    debug!(
        rounds_used = differentials.len(),
        counted = best.len(),
        average,
        raw_index,
        index,
        "Calculated handicap index"
    );

    Ok(HandicapCalculation {
        index,
        rounds_used: differentials.len(),
        adjustment: selection.adjustment,
        best_differentials: best,
    })
}

/// Fetches the most recent eligible rounds for `(golfer_id, scope)` and
/// computes the index from them.
///
/// Fails with [`HandicapError::InsufficientRounds`] when none are eligible.
#[instrument(skip(round_source))]
pub async fn calculate_handicap_index(
    golfer_id: &str,
    scope: &HandicapScope,
    round_source: &dyn RoundSource,
) -> Result<HandicapCalculation, HandicapError> {
    let rounds = round_source
        .fetch_eligible_rounds(golfer_id, scope, MAX_ROUNDS)
        .await?;

    debug!(
        golfer_id = %golfer_id,
        scope = %scope,
        fetched = rounds.len(),
        "Fetched eligible rounds"
    );

    calculate_from_rounds(&rounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    /// Rounds on a standard-slope 72.0 course, so differential = gross - 72
    fn rounds_from_grosses(grosses: &[i32]) -> Vec<Round> {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        grosses
            .iter()
            .enumerate()
            .map(|(i, gross)| Round {
                id: format!("round-{}", i),
                gross_score: *gross,
                course_rating: 72.0,
                slope_rating: 113,
                tee_marker: "white".into(),
                completed_at: start - Duration::days(i as i64),
            })
            .collect()
    }

    #[test]
    fn twenty_rounds_average_best_eight() {
        // differentials 1..=20
        let grosses: Vec<i32> = (73..=92).collect();
        let calculation = calculate_from_rounds(&rounds_from_grosses(&grosses)).unwrap();

        assert_eq!(calculation.rounds_used, 20);
        assert_eq!(
            calculation.best_differentials,
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]
        );
        // 4.5 * 0.96 = 4.32
        assert_eq!(calculation.index, 4.3);
        assert_eq!(calculation.adjustment, 0.0);
    }

    #[test]
    fn only_most_recent_twenty_count() {
        let mut grosses: Vec<i32> = vec![90; 20];
        // an excellent but older round must be ignored
        grosses.push(60);
        let calculation = calculate_from_rounds(&rounds_from_grosses(&grosses)).unwrap();

        assert_eq!(calculation.rounds_used, 20);
        assert_eq!(calculation.index, round_to_tenth(18.0 * 0.96));
    }

    #[test]
    fn three_rounds_use_best_with_two_stroke_adjustment() {
        let calculation = calculate_from_rounds(&rounds_from_grosses(&[90, 84, 95])).unwrap();

        assert_eq!(calculation.best_differentials, vec![12.0]);
        assert_eq!(calculation.adjustment, -2.0);
        // 12 * 0.96 - 2 = 9.52
        assert_eq!(calculation.index, 9.5);
    }

    #[test]
    fn no_rounds_is_insufficient() {
        let result = calculate_from_rounds(&[]);
        assert!(matches!(result, Err(HandicapError::InsufficientRounds)));
    }

    #[test]
    fn invalid_rounds_are_skipped() {
        let mut rounds = rounds_from_grosses(&[80, 82, 84]);
        rounds[1].slope_rating = 0;

        let calculation = calculate_from_rounds(&rounds).unwrap();
        assert_eq!(calculation.rounds_used, 2);
        assert_eq!(calculation.best_differentials, vec![8.0]);
    }

    #[test]
    fn only_invalid_rounds_is_insufficient() {
        let mut rounds = rounds_from_grosses(&[80]);
        rounds[0].gross_score = 0;

        let result = calculate_from_rounds(&rounds);
        assert!(matches!(result, Err(HandicapError::InsufficientRounds)));
    }

    #[test]
    fn clamps_to_legal_range() {
        let high = calculate_from_rounds(&rounds_from_grosses(&[200; 20])).unwrap();
        assert_eq!(high.index, MAX_INDEX);

        let low = calculate_from_rounds(&rounds_from_grosses(&[50; 20])).unwrap();
        assert_eq!(low.index, MIN_INDEX);
    }

    #[test]
    fn plus_handicaps_stay_negative() {
        let calculation = calculate_from_rounds(&rounds_from_grosses(&[69; 20])).unwrap();
        // -3 * 0.96 = -2.88
        assert_eq!(calculation.index, -2.9);
    }

    #[test]
    fn repeated_calculation_is_identical() {
        let rounds = rounds_from_grosses(&[81, 79, 88, 92, 77, 85, 90, 83, 86, 80, 78]);
        let first = calculate_from_rounds(&rounds).unwrap();
        let second = calculate_from_rounds(&rounds).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.index.to_bits(), second.index.to_bits());
    }

    #[test]
    fn rounds_only_once_at_the_end() {
        // each differential is 0.26; rounding it first would give 0.3 * 0.96 -> 0.3
        let rounds: Vec<Round> = rounds_from_grosses(&[72; 20])
            .into_iter()
            .map(|mut r| {
                r.course_rating = 71.74;
                r
            })
            .collect();
        let calculation = calculate_from_rounds(&rounds).unwrap();
        assert_eq!(calculation.index, 0.2);
    }

    #[test]
    fn round_to_tenth_rounds_half_away_from_zero() {
        assert_eq!(round_to_tenth(4.25), 4.3);
        assert_eq!(round_to_tenth(-4.25), -4.3);
        assert_eq!(round_to_tenth(-0.04), 0.0);
        assert!(round_to_tenth(-0.04).is_sign_positive());
    }
}
