use super::{HandicapError, Round, STANDARD_SLOPE};

/// Score differential of one round: `(gross - rating) * 113 / slope`.
///
/// Carries full precision; rounding only happens on the final index.
pub fn compute_differential(round: &Round) -> Result<f64, HandicapError> {
    if round.gross_score <= 0 {
        return Err(HandicapError::invalid_round(
            &round.id,
            format!("gross score must be positive, got {}", round.gross_score),
        ));
    }
    if !(round.course_rating.is_finite() && round.course_rating > 0.0) {
        return Err(HandicapError::invalid_round(
            &round.id,
            format!("course rating must be positive, got {}", round.course_rating),
        ));
    }
    if round.slope_rating <= 0 {
        return Err(HandicapError::invalid_round(
            &round.id,
            format!("slope rating must be positive, got {}", round.slope_rating),
        ));
    }

    let over_rating = f64::from(round.gross_score) - round.course_rating;
    Ok(over_rating * f64::from(STANDARD_SLOPE) / f64::from(round.slope_rating))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn round(gross: i32, rating: f64, slope: i32) -> Round {
        Round {
            id: "round".into(),
            gross_score: gross,
            course_rating: rating,
            slope_rating: slope,
            tee_marker: "white".into(),
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn standard_slope_is_gross_minus_rating() {
        let diff = compute_differential(&round(76, 72.0, 113)).unwrap();
        assert_eq!(diff, 4.0);
    }

    #[test]
    fn harder_slope_shrinks_differential() {
        let diff = compute_differential(&round(90, 71.3, 131)).unwrap();
        let expected = (90.0 - 71.3) * 113.0 / 131.0;
        assert_eq!(diff, expected);
        assert!(diff < 90.0 - 71.3);
    }

    #[test]
    fn under_rating_gives_negative_differential() {
        let diff = compute_differential(&round(68, 72.0, 113)).unwrap();
        assert_eq!(diff, -4.0);
    }

    #[test]
    fn keeps_full_precision() {
        let diff = compute_differential(&round(85, 72.4, 125)).unwrap();
        assert_ne!(diff, (diff * 10.0).round() / 10.0);
    }

    #[test]
    fn rejects_non_positive_fields() {
        for bad in [round(0, 72.0, 113), round(80, 0.0, 113), round(80, 72.0, 0)] {
            let result = compute_differential(&bad);
            assert!(matches!(result, Err(HandicapError::InvalidRound { .. })));
        }
    }

    #[test]
    fn rejects_nan_rating() {
        let result = compute_differential(&round(80, f64::NAN, 113));
        assert!(matches!(result, Err(HandicapError::InvalidRound { .. })));
    }
}
