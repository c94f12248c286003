//! Process types for crew execution.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the different processes that can be used to tackle tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Process {
    /// Tasks are executed one after another in declaration order.
    Sequential,
    /// A manager agent delegates unassigned tasks to specialist agents.
    Hierarchical,
    /// Independent tasks run in parallel up to the concurrency ceiling.
    Concurrent,
}

impl Process {
    /// Whether this process may run more than one task at a time.
    pub fn is_parallel(&self) -> bool {
        !matches!(self, Process::Sequential)
    }

    /// Whether unassigned tasks are routed through delegation.
    pub fn delegates(&self) -> bool {
        matches!(self, Process::Hierarchical)
    }
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Process::Sequential => write!(f, "sequential"),
            Process::Hierarchical => write!(f, "hierarchical"),
            Process::Concurrent => write!(f, "concurrent"),
        }
    }
}

impl Default for Process {
    fn default() -> Self {
        Process::Sequential
    }
}
