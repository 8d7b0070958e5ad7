use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error};

use crate::event::{EventBus, EventError, EventHandler, HandicapEvent};

use super::{HandicapError, HandicapScope, HandicapService, RecalculationOutcome};

/// Recalculates a golfer's universal index, and the society index when the
/// round belongs to one, whenever a round is completed or corrected.
pub struct RecalculationSubscriber {
    service: Arc<HandicapService>,
    event_bus: EventBus,
}

impl RecalculationSubscriber {
    pub fn new(service: Arc<HandicapService>, event_bus: EventBus) -> Self {
        Self { service, event_bus }
    }

    async fn recalculate_scopes(
        &self,
        golfer_id: &str,
        society_id: Option<&str>,
    ) -> Result<(), EventError> {
        let mut scopes = vec![HandicapScope::Universal];
        if let Some(society_id) = society_id {
            scopes.push(HandicapScope::Society(society_id.to_string()));
        }

        let mut first_error = None;
        for scope in scopes {
            match self.service.recalculate(golfer_id, &scope).await {
                Ok(outcome) => self.announce(golfer_id, scope, outcome),
                Err(err) => {
                    error!(
                        golfer_id = %golfer_id,
                        scope = %scope,
                        error = %err,
                        "Recalculation after round failed"
                    );
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            None => Ok(()),
            Some(HandicapError::Repository(msg)) => Err(EventError::retryable(msg)),
            Some(err) => Err(EventError::non_retryable(err.to_string())),
        }
    }

    fn announce(&self, golfer_id: &str, scope: HandicapScope, outcome: RecalculationOutcome) {
        match outcome {
            RecalculationOutcome::Updated { previous, record } => {
                self.event_bus.emit(HandicapEvent::HandicapUpdated {
                    previous_index: previous.map(|p| p.index),
                    record,
                });
            }
            RecalculationOutcome::NotYetEstablished { existing: None } => {
                self.event_bus.emit(HandicapEvent::HandicapNotEstablished {
                    golfer_id: golfer_id.to_string(),
                    scope,
                });
            }
            RecalculationOutcome::NotYetEstablished { existing: Some(_) }
            | RecalculationOutcome::Stale { .. } => {
                debug!(golfer_id = %golfer_id, scope = %scope, "Stored handicap unchanged");
            }
        }
    }
}

#[async_trait]
impl EventHandler for RecalculationSubscriber {
    async fn handle(&self, event: &HandicapEvent) -> Result<(), EventError> {
        match event {
            HandicapEvent::RoundCompleted {
                golfer_id,
                society_id,
                ..
            }
            | HandicapEvent::RoundCorrected {
                golfer_id,
                society_id,
                ..
            } => {
                self.recalculate_scopes(golfer_id, society_id.as_deref())
                    .await
            }
            _ => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        "RecalculationSubscriber"
    }
}
