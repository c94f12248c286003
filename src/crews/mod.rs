//! Crew execution machinery.
//!
//! `task_graph` compiles tasks into a DAG, `scheduler` drives a run over a
//! worker pool, `delegation` routes unassigned tasks in hierarchical crews,
//! `task_executor` runs one task with timeout and retries, and `run_result`
//! aggregates the outcome.

pub mod delegation;
pub mod run_result;
pub mod run_state;
pub mod scheduler;
pub mod task_executor;
pub mod task_graph;

pub use delegation::{DelegationDecision, DelegationRouter};
pub use run_result::{RunResult, TaskResult};
pub use run_state::{RunState, TaskRecord};
pub use scheduler::Scheduler;
pub use task_executor::{ExecutionJob, RetryPolicy, TaskExecutor};
pub use task_graph::{ReadyTracker, TaskGraph};
