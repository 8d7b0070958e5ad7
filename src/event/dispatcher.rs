use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::{
    bus::EventBus,
    events::HandicapEvent,
    handler::{EventError, EventHandler},
};

/// Routes events from the bus to every registered handler
///
/// Each handler runs in its own task, with a timeout and retries with
/// exponential backoff on retryable failures.
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
    event_bus: EventBus,
    handler_timeout: Duration,
    max_retries: u32,
}

impl EventDispatcher {
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            handlers: Vec::new(),
            event_bus,
            handler_timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    pub fn add_handler(&mut self, handler: Arc<dyn EventHandler>) {
        info!(handler_name = handler.name(), "Registering event handler");
        self.handlers.push(handler);
    }

    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Spawns the dispatch loop. It runs until every bus sender is dropped.
    pub fn start_listening(self) -> JoinHandle<()> {
        let handlers = self.handlers;
        let mut receiver = self.event_bus.subscribe();
        let handler_timeout = self.handler_timeout;
        let max_retries = self.max_retries;

        info!(
            handler_count = handlers.len(),
            timeout_ms = handler_timeout.as_millis() as u64,
            max_retries,
            "Starting event dispatcher"
        );

        tokio::spawn(async move {
            loop {
                let event = match receiver.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Event dispatcher lagged, events dropped");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                debug!(
                    event_type = event.event_type(),
                    golfer_id = event.golfer_id(),
                    "Dispatching event to {} handlers",
                    handlers.len()
                );

                for handler in &handlers {
                    let event = event.clone();
                    let handler = handler.clone();

                    tokio::spawn(async move {
                        if let Err(e) =
                            Self::handle_with_retry(handler, event, handler_timeout, max_retries)
                                .await
                        {
                            error!(error = ?e, "Handler failed permanently");
                        }
                    });
                }
            }

            info!("Event dispatcher stopped listening");
        })
    }

    async fn handle_with_retry(
        handler: Arc<dyn EventHandler>,
        event: HandicapEvent,
        handler_timeout: Duration,
        max_retries: u32,
    ) -> Result<(), EventError> {
        let handler_name = handler.name();
        let event_type = event.event_type();
        let mut attempt = 0;

        loop {
            let error = match timeout(handler_timeout, handler.handle(&event)).await {
                Ok(Ok(())) => {
                    if attempt > 0 {
                        info!(
                            handler = handler_name,
                            event_type,
                            attempt = attempt + 1,
                            "Handler succeeded after retry"
                        );
                    }
                    return Ok(());
                }
                Ok(Err(e)) => e,
                Err(_elapsed) => EventError::Timeout,
            };

            if !error.is_retryable() || attempt >= max_retries {
                error!(
                    handler = handler_name,
                    event_type,
                    attempt = attempt + 1,
                    error = ?error,
                    "Handler gave up"
                );
                return Err(error);
            }

            warn!(
                handler = handler_name,
                event_type,
                attempt = attempt + 1,
                error = ?error,
                "Handler failed, will retry"
            );
            tokio::time::sleep(Duration::from_millis(100 * 2_u64.pow(attempt))).await;
            attempt += 1;
        }
    }
}
