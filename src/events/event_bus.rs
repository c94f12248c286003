//! Per-crew event bus.
//!
//! Listeners are registered on the crew before a run and are called
//! synchronously, in registration order, from whichever task emits the
//! event. Keep them short: they run inside scheduler and worker loops.
//! A panicking listener is logged and skipped; it never interrupts a run.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use super::crew_events::{CrewEvent, CrewEventKind};

/// A synchronous event listener.
pub type EventListener = Arc<dyn Fn(&CrewEvent) + Send + Sync>;

/// Fans events of one run out to every registered listener.
#[derive(Clone)]
pub struct EventBus {
    run_id: Uuid,
    listeners: Arc<Vec<EventListener>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("run_id", &self.run_id)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EventBus {
    pub fn new(run_id: Uuid, listeners: Vec<EventListener>) -> Self {
        Self {
            run_id,
            listeners: Arc::new(listeners),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Emit an event to all listeners.
    pub fn emit(&self, kind: CrewEventKind) {
        if self.listeners.is_empty() {
            return;
        }
        let event = CrewEvent::new(self.run_id, kind);
        log::trace!("Emitting {} event", event.kind.event_type());
        for listener in self.listeners.iter() {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener(&event);
            }));
            if let Err(e) = result {
                log::error!(
                    "Listener panicked on {} event: {:?}",
                    event.kind.event_type(),
                    e
                );
            }
        }
    }
}
