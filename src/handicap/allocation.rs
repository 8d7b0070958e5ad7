use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use tracing::warn;

use super::{CourseRating, HandicapError, HOLES, STANDARD_SLOPE};

/// Nearest whole stroke, ties away from zero. No clamping.
pub fn playing_strokes(handicap: f64) -> Result<i32, HandicapError> {
    if !handicap.is_finite() {
        return Err(HandicapError::InvalidHandicap(format!(
            "handicap must be finite, got {}",
            handicap
        )));
    }

    let rounded = handicap.round();
    if rounded.abs() > f64::from(i32::MAX) {
        return Err(HandicapError::InvalidHandicap(format!(
            "handicap {} is outside the representable stroke range",
            handicap
        )));
    }

    Ok(rounded as i32)
}

/// Strokes received on the hole with `stroke_index` (1 = hardest).
///
/// Plus handicaps come back negative and are given on the easiest holes first.
/// Over stroke indices 1..=18 the strokes sum to the rounded handicap.
pub fn strokes_for_hole(handicap: f64, stroke_index: u8) -> Result<i32, HandicapError> {
    if !(1..=HOLES).contains(&stroke_index) {
        return Err(HandicapError::InvalidStrokeIndex(stroke_index));
    }

    let playing = playing_strokes(handicap)?;
    let holes = i32::from(HOLES);
    let magnitude = playing.unsigned_abs() as i64;
    let full_strokes = (magnitude / i64::from(holes)) as i32;
    let remainder = (magnitude % i64::from(holes)) as i32;
    let stroke_index = i32::from(stroke_index);

    if playing >= 0 {
        Ok(full_strokes + i32::from(stroke_index <= remainder))
    } else {
        Ok(-(full_strokes + i32::from(stroke_index > holes - remainder)))
    }
}

/// Strokes per hole, in the order the course lists its holes.
///
/// `stroke_indices` must hold each of 1..=18 exactly once.
pub fn allocate_scorecard(handicap: f64, stroke_indices: &[u8]) -> Result<Vec<i32>, HandicapError> {
    if stroke_indices.len() != usize::from(HOLES) {
        return Err(HandicapError::Validation(format!(
            "scorecard needs {} stroke indices, got {}",
            HOLES,
            stroke_indices.len()
        )));
    }

    let mut seen = [false; HOLES as usize];
    for &stroke_index in stroke_indices {
        if !(1..=HOLES).contains(&stroke_index) {
            return Err(HandicapError::InvalidStrokeIndex(stroke_index));
        }
        let slot = &mut seen[usize::from(stroke_index - 1)];
        if *slot {
            return Err(HandicapError::Validation(format!(
                "stroke index {} appears more than once",
                stroke_index
            )));
        }
        *slot = true;
    }

    stroke_indices
        .iter()
        .map(|&stroke_index| strokes_for_hole(handicap, stroke_index))
        .collect()
}

/// Course handicap for one tee: `index * slope / 113 + (rating - par)`, rounded
pub fn course_handicap(handicap_index: f64, course: &CourseRating) -> Result<i32, HandicapError> {
    if course.slope <= 0 {
        return Err(HandicapError::Validation(format!(
            "slope rating must be positive, got {}",
            course.slope
        )));
    }

    let adjusted = handicap_index * f64::from(course.slope) / f64::from(STANDARD_SLOPE)
        + (course.rating - f64::from(course.par));
    playing_strokes(adjusted)
}

/// Competition formats with their handicap allowances
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlayFormat {
    Stroke,
    Stableford,
    MatchPlay,
    FourballStroke,
    FourballMatch,
    FoursomeStroke,
    FoursomeMatch,
    #[strum(serialize = "scramble_2")]
    #[serde(rename = "scramble_2")]
    Scramble2,
    #[strum(serialize = "scramble_4")]
    #[serde(rename = "scramble_4")]
    Scramble4,
}

impl PlayFormat {
    pub fn allowance(&self) -> f64 {
        match self {
            PlayFormat::Stroke | PlayFormat::Stableford | PlayFormat::MatchPlay => 1.0,
            PlayFormat::FourballStroke => 0.85,
            PlayFormat::FourballMatch => 0.90,
            PlayFormat::FoursomeStroke | PlayFormat::FoursomeMatch => 0.50,
            PlayFormat::Scramble2 => 0.35,
            PlayFormat::Scramble4 => 0.25,
        }
    }

    /// Unknown tags play off the full allowance
    pub fn from_tag(tag: &str) -> Self {
        tag.parse().unwrap_or_else(|_| {
            warn!(format = %tag, "Unknown play format, using full allowance");
            PlayFormat::Stroke
        })
    }
}

/// Course handicap scaled by the format's allowance, rounded
pub fn playing_handicap(course_handicap: i32, format: PlayFormat) -> i32 {
    (f64::from(course_handicap) * format.allowance()).round() as i32
}
