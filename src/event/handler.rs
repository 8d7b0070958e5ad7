use async_trait::async_trait;
use thiserror::Error;

use super::events::HandicapEvent;

/// Errors that can occur when handling events
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Handler timed out")]
    Timeout,

    #[error("Retryable error: {0}")]
    Retryable(String),

    #[error("Non-retryable error: {0}")]
    NonRetryable(String),
}

impl EventError {
    /// Whether this error indicates the operation should be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, EventError::Retryable(_) | EventError::Timeout)
    }

    pub fn retryable(msg: impl Into<String>) -> Self {
        EventError::Retryable(msg.into())
    }

    pub fn non_retryable(msg: impl Into<String>) -> Self {
        EventError::NonRetryable(msg.into())
    }
}

/// Reacts to handicap events
///
/// Handlers should be idempotent: the dispatcher retries on retryable errors,
/// so the same event may be handled more than once.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &HandicapEvent) -> Result<(), EventError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
