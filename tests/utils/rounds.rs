use chrono::{Duration, Utc};

use handicap_engine::handicap::RoundRecord;

// ============================================================================
// Round Builders
// ============================================================================

/// Builds completed rounds for one golfer, oldest first
pub struct RoundBuilder {
    golfer_id: String,
    society_id: Option<String>,
    course_id: String,
    tee_marker: Option<String>,
    rounds: Vec<RoundRecord>,
}

impl RoundBuilder {
    pub fn new(golfer_id: &str) -> Self {
        Self {
            golfer_id: golfer_id.to_string(),
            society_id: None,
            course_id: "royal".to_string(),
            tee_marker: Some("white".to_string()),
            rounds: vec![],
        }
    }

    pub fn in_society(mut self, society_id: &str) -> Self {
        self.society_id = Some(society_id.to_string());
        self
    }

    pub fn outside_society(mut self) -> Self {
        self.society_id = None;
        self
    }

    pub fn at_course(mut self, course_id: &str, tee_marker: &str) -> Self {
        self.course_id = course_id.to_string();
        self.tee_marker = Some(tee_marker.to_string());
        self
    }

    pub fn without_tee(mut self) -> Self {
        self.tee_marker = None;
        self
    }

    pub fn round(mut self, gross: i32) -> Self {
        let n = self.rounds.len();
        self.rounds.push(RoundRecord {
            id: format!("{}-round-{}", self.golfer_id, n + 1),
            golfer_id: self.golfer_id.clone(),
            society_id: self.society_id.clone(),
            course_id: self.course_id.clone(),
            gross_score: Some(gross),
            tee_marker: self.tee_marker.clone(),
            // later rounds are more recent
            completed_at: Utc::now() - Duration::days(365) + Duration::hours(n as i64),
        });
        self
    }

    pub fn rounds(self, grosses: &[i32]) -> Self {
        grosses.iter().fold(self, |builder, gross| builder.round(*gross))
    }

    pub fn build(self) -> Vec<RoundRecord> {
        self.rounds
    }
}
