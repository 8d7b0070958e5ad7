// Event-driven recalculation
//
// Round writers emit events on the bus after the round is stored; the
// dispatcher routes them to handlers such as the recalculation subscriber.

// Public API - what other modules can use
pub use bus::EventBus;
pub use dispatcher::EventDispatcher;
pub use events::HandicapEvent;
pub use handler::{EventError, EventHandler};

// Internal modules
mod bus;
mod dispatcher;
mod events;
mod handler;
