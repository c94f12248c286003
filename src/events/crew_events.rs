//! Crew execution event types.
//!
//! Contains events for the run lifecycle (started, waves, completed) and
//! for each task (delegated, started, retrying, completed, failed, blocked).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::process::Process;
use crate::utilities::errors::{TaskError, TaskExecutionError};

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CrewEventKind {
    CrewStarted {
        process: Process,
        total_tasks: usize,
        max_concurrency: usize,
    },
    WaveStarted {
        wave: usize,
        tasks: Vec<String>,
    },
    TaskDelegated {
        task: String,
        agent: String,
        score: f64,
        fallback: bool,
    },
    TaskStarted {
        task: String,
        agent: String,
    },
    TaskRetrying {
        task: String,
        attempt: u32,
        max_attempts: u32,
        delay: Duration,
        error: TaskExecutionError,
    },
    TaskCompleted {
        task: String,
        agent: String,
        attempts: u32,
    },
    TaskFailed {
        task: String,
        error: TaskError,
    },
    TaskBlocked {
        task: String,
        dependencies: Vec<String>,
    },
    CrewCompleted {
        completed_tasks: usize,
        failed_tasks: usize,
        success_rate: f64,
    },
}

impl CrewEventKind {
    /// Event type discriminator string (e.g. `"task_started"`).
    pub fn event_type(&self) -> &'static str {
        match self {
            CrewEventKind::CrewStarted { .. } => "crew_started",
            CrewEventKind::WaveStarted { .. } => "wave_started",
            CrewEventKind::TaskDelegated { .. } => "task_delegated",
            CrewEventKind::TaskStarted { .. } => "task_started",
            CrewEventKind::TaskRetrying { .. } => "task_retrying",
            CrewEventKind::TaskCompleted { .. } => "task_completed",
            CrewEventKind::TaskFailed { .. } => "task_failed",
            CrewEventKind::TaskBlocked { .. } => "task_blocked",
            CrewEventKind::CrewCompleted { .. } => "crew_completed",
        }
    }

    /// Task this event concerns, if any.
    pub fn task_name(&self) -> Option<&str> {
        match self {
            CrewEventKind::TaskDelegated { task, .. }
            | CrewEventKind::TaskStarted { task, .. }
            | CrewEventKind::TaskRetrying { task, .. }
            | CrewEventKind::TaskCompleted { task, .. }
            | CrewEventKind::TaskFailed { task, .. }
            | CrewEventKind::TaskBlocked { task, .. } => Some(task),
            _ => None,
        }
    }
}

/// An event emitted during a crew run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrewEvent {
    /// Unique event identifier (UUID v4).
    pub event_id: Uuid,
    /// Run the event belongs to.
    pub run_id: Uuid,
    /// UTC timestamp of event creation.
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: CrewEventKind,
}

impl CrewEvent {
    pub fn new(run_id: Uuid, kind: CrewEventKind) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            run_id,
            timestamp: Utc::now(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = CrewEvent::new(
            Uuid::new_v4(),
            CrewEventKind::TaskStarted {
                task: "research".into(),
                agent: "analyst".into(),
            },
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "task_started");
        assert_eq!(json["task"], "research");
        assert_eq!(event.kind.event_type(), "task_started");
        assert_eq!(event.kind.task_name(), Some("research"));
    }
}
