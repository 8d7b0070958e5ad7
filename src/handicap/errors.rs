use thiserror::Error;

#[derive(Debug, Error)]
pub enum HandicapError {
    #[error("Invalid round {round_id}: {reason}")]
    InvalidRound { round_id: String, reason: String },

    #[error("Not enough eligible rounds to establish a handicap")]
    InsufficientRounds,

    #[error("Stroke index {0} is outside 1..=18")]
    InvalidStrokeIndex(u8),

    #[error("Invalid handicap: {0}")]
    InvalidHandicap(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl HandicapError {
    pub fn invalid_round(round_id: impl Into<String>, reason: impl Into<String>) -> Self {
        HandicapError::InvalidRound {
            round_id: round_id.into(),
            reason: reason.into(),
        }
    }

    /// Whether the caller should keep the last stored index instead of failing
    pub fn keeps_existing_index(&self) -> bool {
        matches!(self, HandicapError::InsufficientRounds)
    }
}

impl From<sqlx::Error> for HandicapError {
    fn from(err: sqlx::Error) -> Self {
        HandicapError::Repository(err.to_string())
    }
}
