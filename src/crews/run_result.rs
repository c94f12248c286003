//! Crew run result.
//!
//! Represents the outcome of one `Crew::execute()` call: per-task status,
//! agent, output or error, wave and timing, plus crew-level counts and the
//! success rate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use crate::process::Process;
use crate::tasks::task_output::TaskOutput;
use crate::tasks::task_status::TaskStatus;
use crate::utilities::errors::TaskError;

use super::delegation::DelegationDecision;
use super::run_state::RunState;
use super::task_graph::TaskGraph;

/// Outcome of a single task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Name of the task.
    pub name: String,
    /// Terminal status (`Completed` or `Failed`).
    pub status: TaskStatus,
    /// Agent that ran the task. `None` for a task that was never dispatched.
    pub agent: Option<String>,
    /// Whether the agent was chosen by delegation.
    pub delegated: bool,
    /// The delegation decision, when there was one.
    pub delegation: Option<DelegationDecision>,
    /// Output of a completed task.
    pub output: Option<TaskOutput>,
    /// Terminal error of a failed task.
    pub error: Option<TaskError>,
    /// Admission wave, 1-based. `None` for a blocked task.
    pub wave: Option<usize>,
    /// Runtime invocations made.
    pub attempts: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Wall-clock duration of execution, retries included.
    pub duration: Option<Duration>,
}

impl TaskResult {
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Whether the task was never dispatched because a dependency failed.
    pub fn is_blocked(&self) -> bool {
        self.error
            .as_ref()
            .map_or(false, TaskError::is_dependency_failure)
    }

    /// Raw output of a completed task.
    pub fn raw(&self) -> Option<&str> {
        self.output.as_ref().map(|o| o.raw.as_str())
    }
}

/// Class that represents the result of a crew run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Identifier of this run.
    pub id: Uuid,
    /// Fingerprint of the crew's agents and tasks.
    pub crew_key: String,
    /// Process mode the run used.
    pub process: Process,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    /// Failed tasks, blocked ones included.
    pub failed_tasks: usize,
    /// Failed tasks that were never dispatched.
    pub blocked_tasks: usize,
    /// `completed_tasks / total_tasks * 100`; 0.0 for an empty crew.
    pub success_rate: f64,
    /// Number of admission waves.
    pub waves: usize,
    /// Per-task results in declaration order.
    pub task_results: Vec<TaskResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunResult {
    /// Aggregate the terminal state of a run.
    pub(crate) fn aggregate(
        crew_key: String,
        process: Process,
        graph: &TaskGraph,
        state: &RunState,
        waves: usize,
    ) -> Self {
        let task_results: Vec<TaskResult> = (0..graph.len())
            .map(|idx| {
                let record = state.snapshot(idx);
                let duration = record.duration();
                TaskResult {
                    name: graph.name(idx).to_string(),
                    status: record.status,
                    agent: record.agent,
                    delegated: record.delegation.is_some(),
                    delegation: record.delegation,
                    output: record.output,
                    error: record.error,
                    wave: record.wave,
                    attempts: record.attempts,
                    started_at: record.started_at,
                    finished_at: record.finished_at,
                    duration,
                }
            })
            .collect();

        let total_tasks = task_results.len();
        let completed_tasks = task_results.iter().filter(|r| r.is_completed()).count();
        let failed_tasks = task_results
            .iter()
            .filter(|r| r.status == TaskStatus::Failed)
            .count();
        let blocked_tasks = task_results.iter().filter(|r| r.is_blocked()).count();

        Self {
            id: state.id(),
            crew_key,
            process,
            total_tasks,
            completed_tasks,
            failed_tasks,
            blocked_tasks,
            success_rate: success_rate(completed_tasks, total_tasks),
            waves,
            task_results,
            started_at: state.started_at(),
            finished_at: Utc::now(),
        }
    }

    /// Look up the result of a task by name.
    pub fn task(&self, name: &str) -> Option<&TaskResult> {
        self.task_results.iter().find(|r| r.name == name)
    }

    /// Output of the last declared task that completed.
    pub fn final_output(&self) -> Option<&TaskOutput> {
        self.task_results.iter().rev().find_map(|r| r.output.as_ref())
    }

    /// Whether every task completed.
    pub fn is_success(&self) -> bool {
        self.completed_tasks == self.total_tasks
    }

    /// Results of the tasks that failed, blocked ones included.
    pub fn failures(&self) -> impl Iterator<Item = &TaskResult> {
        self.task_results
            .iter()
            .filter(|r| r.status == TaskStatus::Failed)
    }
}

fn success_rate(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    completed as f64 / total as f64 * 100.0
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} tasks completed ({:.1}%), {} failed ({} blocked) in {} wave(s)",
            self.completed_tasks,
            self.total_tasks,
            self.success_rate,
            self.failed_tasks,
            self.blocked_tasks,
            self.waves
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;
    use crate::utilities::errors::TaskExecutionError;

    fn fixture() -> (TaskGraph, RunState) {
        let tasks = vec![
            Task::new("fetch", "Fetch data", "Rows"),
            Task::new("clean", "Clean data", "Rows").with_context(["fetch"]),
            Task::new("report", "Report", "Text").with_context(["clean"]),
            Task::new("notify", "Notify", "Mail"),
        ];
        let graph = TaskGraph::build(&tasks).unwrap();
        let state = RunState::new(Uuid::new_v4(), tasks.len());

        state.mark_dispatched(0, "ana", 1, None);
        state.mark_running(0);
        state.record_attempt(0);
        state.complete(0, TaskOutput::new("fetch", "Fetch data", "Rows", "ana", "rows"));

        state.mark_dispatched(1, "ana", 2, None);
        state.mark_running(1);
        state.record_attempt(1);
        state.fail(
            1,
            TaskError::from(TaskExecutionError::Runtime {
                message: "bad rows".into(),
            }),
        );
        state.block(2, vec!["clean".into()]);

        state.mark_dispatched(3, "bob", 1, None);
        state.mark_running(3);
        state.record_attempt(3);
        state.complete(3, TaskOutput::new("notify", "Notify", "Mail", "bob", "sent"));
        (graph, state)
    }

    #[test]
    fn test_counts_add_up() {
        let (graph, state) = fixture();
        let result = RunResult::aggregate("key".into(), Process::Concurrent, &graph, &state, 2);

        assert_eq!(result.total_tasks, 4);
        assert_eq!(result.completed_tasks, 2);
        assert_eq!(result.failed_tasks, 2);
        assert_eq!(result.blocked_tasks, 1);
        assert_eq!(result.completed_tasks + result.failed_tasks, result.total_tasks);
        assert_eq!(result.success_rate, 50.0);
        assert!(!result.is_success());
        assert_eq!(result.failures().count(), 2);
    }

    #[test]
    fn test_per_task_results_in_declaration_order() {
        let (graph, state) = fixture();
        let result = RunResult::aggregate("key".into(), Process::Concurrent, &graph, &state, 2);

        let names: Vec<&str> = result.task_results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["fetch", "clean", "report", "notify"]);

        let report = result.task("report").unwrap();
        assert!(report.is_blocked());
        assert_eq!(report.agent, None);
        assert_eq!(report.attempts, 0);
        assert_eq!(report.wave, None);

        assert_eq!(result.task("fetch").unwrap().raw(), Some("rows"));
        assert_eq!(result.final_output().unwrap().raw, "sent");
    }

    #[test]
    fn test_empty_crew_has_zero_success_rate() {
        let graph = TaskGraph::build(&[]).unwrap();
        let state = RunState::new(Uuid::new_v4(), 0);
        let result = RunResult::aggregate("key".into(), Process::Sequential, &graph, &state, 0);
        assert_eq!(result.success_rate, 0.0);
        assert_eq!(result.total_tasks, 0);
        assert!(result.final_output().is_none());
    }

    #[test]
    fn test_display_summarizes() {
        let (graph, state) = fixture();
        let result = RunResult::aggregate("key".into(), Process::Concurrent, &graph, &state, 2);
        assert_eq!(
            result.to_string(),
            "2/4 tasks completed (50.0%), 2 failed (1 blocked) in 2 wave(s)"
        );
    }
}
