use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use super::{DEFAULT_COURSE_RATING, DEFAULT_PAR, STANDARD_SLOPE};

/// Which round subset a handicap index is computed from
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HandicapScope {
    /// Every eligible round, regardless of who organized it
    Universal,
    /// Only rounds played under one society
    Society(String),
}

impl HandicapScope {
    pub fn from_society_id(society_id: Option<String>) -> Self {
        match society_id {
            Some(id) => HandicapScope::Society(id),
            None => HandicapScope::Universal,
        }
    }

    pub fn society_id(&self) -> Option<&str> {
        match self {
            HandicapScope::Universal => None,
            HandicapScope::Society(id) => Some(id),
        }
    }

    /// A universal scope takes every round; a society scope only its own
    pub fn includes(&self, round_society_id: Option<&str>) -> bool {
        match self {
            HandicapScope::Universal => true,
            HandicapScope::Society(id) => round_society_id == Some(id.as_str()),
        }
    }
}

impl fmt::Display for HandicapScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandicapScope::Universal => write!(f, "universal"),
            HandicapScope::Society(id) => write!(f, "society:{}", id),
        }
    }
}

/// Rating, slope and par for one tee of a course
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CourseRating {
    pub rating: f64,
    pub slope: i32,
    pub par: i32,
}

impl Default for CourseRating {
    fn default() -> Self {
        Self {
            rating: DEFAULT_COURSE_RATING,
            slope: STANDARD_SLOPE,
            par: DEFAULT_PAR,
        }
    }
}

/// Tee entry as stored in a course's `tees` JSON array
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeeRating {
    pub name: Option<String>,
    pub rating: Option<f64>,
    pub slope: Option<i32>,
    pub par: Option<i32>,
}

impl TeeRating {
    pub fn matches(&self, tee_marker: &str) -> bool {
        self.name
            .as_deref()
            .is_some_and(|name| name.eq_ignore_ascii_case(tee_marker))
    }

    /// Missing or zero fields fall back to the standard values
    pub fn course_rating(&self) -> CourseRating {
        let defaults = CourseRating::default();
        CourseRating {
            rating: self
                .rating
                .filter(|r| *r > 0.0)
                .unwrap_or(defaults.rating),
            slope: self.slope.filter(|s| *s > 0).unwrap_or(defaults.slope),
            par: self.par.filter(|p| *p > 0).unwrap_or(defaults.par),
        }
    }
}

/// A round as stored, before any eligibility filtering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRecord {
    pub id: String,
    pub golfer_id: String,
    pub society_id: Option<String>,
    pub course_id: String,
    pub gross_score: Option<i32>,
    pub tee_marker: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl RoundRecord {
    /// Gross score and tee marker are both present
    pub fn is_complete(&self) -> bool {
        self.gross_score.is_some()
            && self
                .tee_marker
                .as_deref()
                .is_some_and(|tee| !tee.trim().is_empty())
    }

    /// Pairs the record with its resolved tee rating. `None` when incomplete.
    pub fn resolve(&self, course: CourseRating) -> Option<Round> {
        let gross_score = self.gross_score?;
        let tee_marker = self.tee_marker.clone().filter(|t| !t.trim().is_empty())?;

        Some(Round {
            id: self.id.clone(),
            gross_score,
            course_rating: course.rating,
            slope_rating: course.slope,
            tee_marker,
            completed_at: self.completed_at,
        })
    }
}

/// An eligible round with its rating and slope resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub id: String,
    pub gross_score: i32,
    pub course_rating: f64,
    pub slope_rating: i32,
    pub tee_marker: String,
    pub completed_at: DateTime<Utc>,
}

/// Output of one index calculation over a fixed round set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandicapCalculation {
    pub index: f64,
    /// Eligible differentials considered (at most 20)
    pub rounds_used: usize,
    pub adjustment: f64,
    /// The lowest differentials that were averaged, ascending
    pub best_differentials: Vec<f64>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
pub enum CalculationMethod {
    #[strum(serialize = "WHS-8of20")]
    #[serde(rename = "WHS-8of20")]
    Whs,
    #[strum(serialize = "MANUAL")]
    #[serde(rename = "MANUAL")]
    Manual,
}

/// Stored index for one (golfer, scope) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandicapRecord {
    pub golfer_id: String,
    pub scope: HandicapScope,
    pub index: f64,
    pub rounds_used: u32,
    pub calculation_method: CalculationMethod,
    pub last_calculated_at: DateTime<Utc>,
}

impl HandicapRecord {
    pub fn from_calculation(
        golfer_id: &str,
        scope: &HandicapScope,
        calculation: &HandicapCalculation,
        calculated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            golfer_id: golfer_id.to_string(),
            scope: scope.clone(),
            index: calculation.index,
            rounds_used: calculation.rounds_used as u32,
            calculation_method: CalculationMethod::Whs,
            last_calculated_at: calculated_at,
        }
    }

    pub fn manual(golfer_id: &str, scope: &HandicapScope, index: f64) -> Self {
        Self {
            golfer_id: golfer_id.to_string(),
            scope: scope.clone(),
            index,
            rounds_used: 0,
            calculation_method: CalculationMethod::Manual,
            last_calculated_at: Utc::now(),
        }
    }
}

/// One stored change of a golfer's index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandicapHistoryEntry {
    pub id: Uuid,
    pub golfer_id: String,
    pub scope: HandicapScope,
    pub old_index: Option<f64>,
    pub new_index: f64,
    pub change: f64,
    pub rounds_used: u32,
    pub calculated_at: DateTime<Utc>,
}

impl HandicapHistoryEntry {
    pub fn new(previous: Option<&HandicapRecord>, record: &HandicapRecord) -> Self {
        let old_index = previous.map(|p| p.index);
        let change = super::calculator::round_to_tenth(record.index - old_index.unwrap_or(0.0));

        Self {
            id: Uuid::new_v4(),
            golfer_id: record.golfer_id.clone(),
            scope: record.scope.clone(),
            old_index,
            new_index: record.index,
            change,
            rounds_used: record.rounds_used,
            calculated_at: record.last_calculated_at,
        }
    }
}

/// What the end user sees for one scope
#[derive(Debug, Clone, PartialEq)]
pub enum HandicapStatus {
    Established(HandicapRecord),
    NotYetEstablished,
}

impl fmt::Display for HandicapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandicapStatus::Established(record) => write!(f, "{:.1}", record.index),
            HandicapStatus::NotYetEstablished => write!(f, "handicap not yet established"),
        }
    }
}

/// Result of recalculating and persisting one (golfer, scope)
#[derive(Debug, Clone, PartialEq)]
pub enum RecalculationOutcome {
    Updated {
        previous: Option<HandicapRecord>,
        record: HandicapRecord,
    },
    /// A newer record was already stored; this one was dropped
    Stale { record: HandicapRecord },
    /// No eligible rounds; any existing record is left untouched
    NotYetEstablished { existing: Option<HandicapRecord> },
}

impl RecalculationOutcome {
    pub fn status(&self) -> HandicapStatus {
        match self {
            RecalculationOutcome::Updated { record, .. } => {
                HandicapStatus::Established(record.clone())
            }
            RecalculationOutcome::Stale { record } => HandicapStatus::Established(record.clone()),
            RecalculationOutcome::NotYetEstablished { existing: Some(record) } => {
                HandicapStatus::Established(record.clone())
            }
            RecalculationOutcome::NotYetEstablished { existing: None } => {
                HandicapStatus::NotYetEstablished
            }
        }
    }
}
