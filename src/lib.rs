// Library crate for the handicap engine
// This file exposes the public API for integration tests

pub mod config;
pub mod event;
pub mod handicap;
pub mod sweep;

// Re-export commonly used types for easier access in tests
pub use config::EngineConfig;
pub use event::{EventBus, EventDispatcher, EventHandler, HandicapEvent};
pub use handicap::{
    HandicapError, HandicapRecord, HandicapScope, HandicapService, HandicapStatus,
    RecalculationOutcome, RecalculationSubscriber,
};
pub use sweep::{start_sweep_task, SweepConfig};
