//! Topic-based event bus for runtime events.
//!
//! Agent events drained by the world are stamped with the tick and published
//! to one of three topics; consumers subscribe only to the topics they need.

mod bus;
mod types;

pub use bus::EventBus;
pub use types::{Event, Topic};
