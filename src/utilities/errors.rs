//! Error types for the crew execution engine.
//!
//! Construction-time failures (`GraphError`, `DelegationError`, invalid
//! configuration) abort an `execute()` call before anything runs.
//! Execution-time failures (`TaskExecutionError`, `TaskError`) are
//! contained per task and reported through the run result.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while compiling the task dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A task lists a dependency that names no task in the crew.
    #[error("Task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency { task: String, dependency: String },

    /// The dependency graph contains a cycle. The path starts and ends on
    /// the same task.
    #[error("Dependency cycle detected: {}", .cycle.join(" -> "))]
    CycleDetected { cycle: Vec<String> },

    /// Two tasks share the same name.
    #[error("Duplicate task name: {name}")]
    DuplicateTask { name: String },
}

/// Errors raised by the delegation router.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DelegationError {
    /// No non-manager agent exists to receive the task.
    #[error("No eligible agent to delegate task '{task}' to")]
    NoEligibleAgent { task: String },
}

/// A single failed attempt at running a task through its agent runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskExecutionError {
    /// The agent runtime returned an error.
    #[error("Agent runtime error: {message}")]
    Runtime { message: String },

    /// The runtime call exceeded its time limit and was cancelled.
    #[error("Task timed out after {}ms", .after.as_millis())]
    Timeout { after: Duration },
}

impl TaskExecutionError {
    /// Wrap an error returned by an agent runtime.
    pub fn runtime(err: &anyhow::Error) -> Self {
        TaskExecutionError::Runtime {
            message: format!("{:#}", err),
        }
    }
}

/// Terminal error recorded on a failed task.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskError {
    /// Every attempt failed; carries the last attempt's error.
    #[error(transparent)]
    Execution(#[from] TaskExecutionError),

    /// The task was never dispatched because a dependency failed.
    #[error("Dependency failed: {}", .dependencies.join(", "))]
    DependencyFailed { dependencies: Vec<String> },
}

impl TaskError {
    /// Whether this error marks a task blocked by an upstream failure.
    pub fn is_dependency_failure(&self) -> bool {
        matches!(self, TaskError::DependencyFailed { .. })
    }
}

/// Errors that fail a whole `Crew::execute()` call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CrewError {
    /// The task graph is invalid.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Delegation could not find any agent.
    #[error(transparent)]
    Delegation(#[from] DelegationError),

    /// The crew definition is inconsistent with its process mode.
    #[error("Invalid crew configuration: {0}")]
    Configuration(String),

    /// Input interpolation into task templates failed.
    #[error("Failed to interpolate inputs: {0}")]
    Interpolation(String),
}

/// Result alias for crew-level operations.
pub type CrewResult<T> = Result<T, CrewError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_path() {
        let err = GraphError::CycleDetected {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "Dependency cycle detected: a -> b -> a");
    }

    #[test]
    fn test_crew_error_wraps_graph_error() {
        let err: CrewError = GraphError::DuplicateTask { name: "t".into() }.into();
        assert!(matches!(err, CrewError::Graph(GraphError::DuplicateTask { .. })));
        assert_eq!(err.to_string(), "Duplicate task name: t");
    }

    #[test]
    fn test_runtime_error_keeps_context_chain() {
        let err = anyhow::anyhow!("connection reset").context("calling model");
        let wrapped = TaskExecutionError::runtime(&err);
        assert_eq!(
            wrapped.to_string(),
            "Agent runtime error: calling model: connection reset"
        );
    }

    #[test]
    fn test_dependency_failure_flag() {
        let blocked = TaskError::DependencyFailed {
            dependencies: vec!["fetch".into()],
        };
        assert!(blocked.is_dependency_failure());
        let timeout = TaskError::from(TaskExecutionError::Timeout {
            after: Duration::from_millis(5),
        });
        assert!(!timeout.is_dependency_failure());
        assert_eq!(timeout.to_string(), "Task timed out after 5ms");
    }
}
