//! # Crew Engine
//!
//! Executes a crew of agents over a set of interdependent tasks.
//!
//! Tasks form a dependency graph that is validated once when the crew is
//! built. Each run schedules eligible tasks over a bounded worker pool in
//! one of three process modes (sequential, concurrent, hierarchical),
//! delegates unassigned tasks to the best-matching specialist in
//! hierarchical crews, retries failed attempts with exponential backoff,
//! and reports every task's outcome in a [`RunResult`]. A failed task
//! blocks its dependents but never aborts the run.
//!
//! The reasoning behind each task lives outside the engine, behind the
//! [`AgentRuntime`] trait.

pub mod agent;
pub mod crew;
pub mod crews;
pub mod events;
pub mod process;
pub mod task;
pub mod tasks;
pub mod tools;
pub mod utilities;

pub use agent::{runtime_fn, Agent, AgentKind, AgentProfile, AgentRuntime, RuntimeRequest};
pub use crew::{Crew, ExecuteOptions};
pub use crews::{DelegationDecision, RetryPolicy, RunResult, TaskResult};
pub use events::{CrewEvent, CrewEventKind};
pub use process::Process;
pub use task::Task;
pub use tasks::{TaskContext, TaskOutput, TaskStatus};
pub use tools::{BaseTool, Tool};
pub use utilities::{ConfigError, CrewConfig, CrewError, CrewResult, TaskError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
