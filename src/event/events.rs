use serde::{Deserialize, Serialize};

use crate::handicap::{HandicapRecord, HandicapScope};

/// Facts about rounds and handicaps that have already happened
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HandicapEvent {
    /// A round was stored as completed
    RoundCompleted {
        golfer_id: String,
        round_id: String,
        society_id: Option<String>,
    },

    /// A completed round's gross score or tee marker was repaired
    RoundCorrected {
        golfer_id: String,
        round_id: String,
        society_id: Option<String>,
    },

    /// A new index was stored
    HandicapUpdated {
        record: HandicapRecord,
        previous_index: Option<f64>,
    },

    /// Recalculation found no eligible rounds and nothing stored
    HandicapNotEstablished {
        golfer_id: String,
        scope: HandicapScope,
    },
}

impl HandicapEvent {
    pub fn golfer_id(&self) -> &str {
        match self {
            HandicapEvent::RoundCompleted { golfer_id, .. } => golfer_id,
            HandicapEvent::RoundCorrected { golfer_id, .. } => golfer_id,
            HandicapEvent::HandicapUpdated { record, .. } => &record.golfer_id,
            HandicapEvent::HandicapNotEstablished { golfer_id, .. } => golfer_id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            HandicapEvent::RoundCompleted { .. } => "round_completed",
            HandicapEvent::RoundCorrected { .. } => "round_corrected",
            HandicapEvent::HandicapUpdated { .. } => "handicap_updated",
            HandicapEvent::HandicapNotEstablished { .. } => "handicap_not_established",
        }
    }
}
