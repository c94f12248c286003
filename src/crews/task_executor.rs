//! Runs one task to a terminal status.
//!
//! A worker hands the executor an [`ExecutionJob`]: the task index, the
//! agent chosen for it and the dependency context the scheduler gathered.
//! The executor invokes the agent runtime under the task's timeout,
//! retries with exponential backoff until the attempt budget is spent,
//! and records the outcome in the run state.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;

use crate::agent::runtime::RuntimeRequest;
use crate::agent::Agent;
use crate::events::{CrewEventKind, EventBus};
use crate::task::{Task, TaskCallback};
use crate::tasks::task_context::TaskContext;
use crate::tasks::task_output::TaskOutput;
use crate::tasks::task_status::TaskStatus;
use crate::utilities::errors::{TaskError, TaskExecutionError};

use super::run_state::RunState;

/// Exponential backoff between attempts of the same task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub base: Duration,
    /// Upper bound on any single delay.
    pub cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            cap: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    /// Delay before retry number `retry` (0-based): `base * 2^retry`, capped.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.cap)
    }
}

/// A dispatched task, ready to run.
#[derive(Debug, Clone)]
pub struct ExecutionJob {
    /// Index of the task in declaration order.
    pub index: usize,
    /// Agent that runs the task.
    pub agent: Agent,
    /// Outputs of the task's dependencies, in declaration order.
    pub context: TaskContext,
}

/// Executes jobs of one run. Shared by every worker of that run.
pub struct TaskExecutor {
    tasks: Arc<Vec<Task>>,
    state: Arc<RunState>,
    events: EventBus,
    retry: RetryPolicy,
    task_callback: Option<TaskCallback>,
}

impl std::fmt::Debug for TaskExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskExecutor")
            .field("tasks", &self.tasks.len())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl TaskExecutor {
    pub fn new(
        tasks: Arc<Vec<Task>>,
        state: Arc<RunState>,
        events: EventBus,
        retry: RetryPolicy,
        task_callback: Option<TaskCallback>,
    ) -> Self {
        Self {
            tasks,
            state,
            events,
            retry,
            task_callback,
        }
    }

    /// Tasks of the run, in declaration order.
    pub fn tasks(&self) -> &Arc<Vec<Task>> {
        &self.tasks
    }

    pub fn state(&self) -> &Arc<RunState> {
        &self.state
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Run a job until it completes or exhausts its attempts. A panicking
    /// runtime counts as a failed attempt instead of taking the worker down.
    pub async fn execute(&self, job: ExecutionJob) -> TaskStatus {
        let idx = job.index;
        let task = &self.tasks[idx];
        let agent = &job.agent;

        self.state.mark_running(idx);
        self.events.emit(CrewEventKind::TaskStarted {
            task: task.name.clone(),
            agent: agent.name.clone(),
        });
        log::debug!("Task '{}' started on agent '{}'", task.name, agent.name);

        let timeout = task.timeout.or(agent.max_execution_time);
        let max_attempts = task.max_attempts();

        loop {
            let attempt = self.state.record_attempt(idx);
            let request = RuntimeRequest {
                task_name: task.name.clone(),
                description: task.description.clone(),
                expected_output: task.expected_output.clone(),
                context: job.context.clone(),
                tools: task.tools.clone(),
                timeout,
                attempt,
                agent: agent.profile(),
            };

            let result = AssertUnwindSafe(Self::invoke(agent, request, timeout))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    log::error!("Agent runtime panicked while running task '{}'", task.name);
                    Err(TaskExecutionError::Runtime {
                        message: "agent runtime panicked".to_string(),
                    })
                });

            match result {
                Ok(raw) => {
                    let output = TaskOutput::new(
                        &task.name,
                        &task.description,
                        &task.expected_output,
                        &agent.name,
                        raw,
                    );
                    if !self.state.complete(idx, output.clone()) {
                        return self.state.status(idx);
                    }
                    self.events.emit(CrewEventKind::TaskCompleted {
                        task: task.name.clone(),
                        agent: agent.name.clone(),
                        attempts: attempt,
                    });
                    log::debug!("Task '{}' completed after {} attempt(s)", task.name, attempt);
                    self.run_callbacks(task, &output);
                    return TaskStatus::Completed;
                }
                Err(error) if attempt < max_attempts => {
                    let delay = self.retry.backoff(attempt - 1);
                    log::warn!(
                        "Task '{}' attempt {}/{} failed: {}; retrying in {:?}",
                        task.name,
                        attempt,
                        max_attempts,
                        error,
                        delay
                    );
                    self.events.emit(CrewEventKind::TaskRetrying {
                        task: task.name.clone(),
                        attempt,
                        max_attempts,
                        delay,
                        error,
                    });
                    tokio::time::sleep(delay).await;
                }
                Err(error) => {
                    log::warn!(
                        "Task '{}' failed after {} attempt(s): {}",
                        task.name,
                        attempt,
                        error
                    );
                    let error = TaskError::from(error);
                    if !self.state.fail(idx, error.clone()) {
                        return self.state.status(idx);
                    }
                    self.events.emit(CrewEventKind::TaskFailed {
                        task: task.name.clone(),
                        error,
                    });
                    return TaskStatus::Failed;
                }
            }
        }
    }

    async fn invoke(
        agent: &Agent,
        request: RuntimeRequest,
        timeout: Option<Duration>,
    ) -> Result<String, TaskExecutionError> {
        let call = agent.runtime.run(request);
        let result = match timeout {
            // Dropping the future on elapse cancels the in-flight call.
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => return Err(TaskExecutionError::Timeout { after: limit }),
            },
            None => call.await,
        };
        result.map_err(|e| TaskExecutionError::runtime(&e))
    }

    fn run_callbacks(&self, task: &Task, output: &TaskOutput) {
        let callbacks = task.callback.iter().chain(self.task_callback.iter());
        for callback in callbacks {
            match std::panic::catch_unwind(AssertUnwindSafe(|| callback(task, output))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    log::warn!("Completion callback for task '{}' failed: {:#}", task.name, e);
                }
                Err(_) => {
                    log::error!("Completion callback for task '{}' panicked", task.name);
                }
            }
        }
    }
}
