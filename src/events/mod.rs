//! Execution events emitted while a crew runs.

pub mod crew_events;
pub mod event_bus;

pub use crew_events::{CrewEvent, CrewEventKind};
pub use event_bus::{EventBus, EventListener};
