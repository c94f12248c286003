//! Main Task struct.
//!
//! A task is a declaration: what to do, who should do it, and which other
//! tasks it depends on. Its run-time status lives in the per-run state,
//! never on the task itself, so one crew can be executed many times.

use md5::{Digest, Md5};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::tasks::task_output::TaskOutput;
use crate::tools::base_tool::BaseTool;
use crate::utilities::string_utils::interpolate_only;

/// Default attempt budget per task.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Type alias for a task completion callback.
///
/// Invoked once after the task reaches `Completed`. An error is logged and
/// otherwise ignored; it never changes the task's status.
pub type TaskCallback = Arc<dyn Fn(&Task, &TaskOutput) -> anyhow::Result<()> + Send + Sync>;

/// Represents a task to be executed by a crew.
#[derive(Clone)]
pub struct Task {
    /// Unique identifier for the task.
    pub id: Uuid,
    /// Name of the task, unique within a crew. Dependencies refer to tasks by name.
    pub name: String,
    /// Descriptive text detailing the task's purpose and execution.
    pub description: String,
    /// Clear definition of expected task outcome.
    pub expected_output: String,
    /// Name of the agent responsible for execution. `None` is allowed only in
    /// a hierarchical crew, where the task is delegated.
    pub agent: Option<String>,
    /// Names of the tasks whose outputs become this task's context, in order.
    pub context: Vec<String>,
    /// Whether the task may be scheduled ahead of non-async siblings.
    pub async_execution: bool,
    /// Attempt budget: at most this many runtime invocations (minimum 1).
    pub max_retries: u32,
    /// Per-attempt time limit. Falls back to the agent's `max_execution_time`.
    pub timeout: Option<Duration>,
    /// Tools the agent is limited to use for this task.
    pub tools: Vec<Arc<dyn BaseTool>>,
    /// Capabilities an agent must declare to be a good delegation match.
    pub required_capabilities: Vec<String>,
    /// Task completion callback.
    pub callback: Option<TaskCallback>,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("description", &self.description)
            .field("agent", &self.agent)
            .field("context", &self.context)
            .field("async_execution", &self.async_execution)
            .finish_non_exhaustive()
    }
}

impl Task {
    /// Create a new Task with required fields.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        expected_output: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            expected_output: expected_output.into(),
            agent: None,
            context: Vec::new(),
            async_execution: false,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: None,
            tools: Vec::new(),
            required_capabilities: Vec::new(),
            callback: None,
        }
    }

    /// Builder: assign the task to an agent by name.
    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    /// Builder: set the dependencies whose outputs form the context.
    pub fn with_context<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.context = dependencies.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: mark the task as async.
    pub fn with_async_execution(mut self, async_execution: bool) -> Self {
        self.async_execution = async_execution;
        self
    }

    /// Builder: set the attempt budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Builder: set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builder: set per-task tool overrides.
    pub fn with_tools(mut self, tools: Vec<Arc<dyn BaseTool>>) -> Self {
        self.tools = tools;
        self
    }

    /// Builder: set capabilities required for delegation matching.
    pub fn with_required_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: set the completion callback.
    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Task, &TaskOutput) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Number of runtime invocations this task may make.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Compute the key property (MD5 hash of description|expected_output).
    pub fn key(&self) -> String {
        let source = format!("{}|{}", self.description, self.expected_output);
        let mut hasher = Md5::new();
        hasher.update(source.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Return a copy with `{placeholders}` in the description and expected
    /// output replaced from `inputs`.
    pub fn interpolated(&self, inputs: &HashMap<String, String>) -> Result<Task, String> {
        let mut task = self.clone();
        task.description = interpolate_only(&self.description, inputs)
            .map_err(|e| format!("task '{}': {}", self.name, e))?;
        task.expected_output = interpolate_only(&self.expected_output, inputs)
            .map_err(|e| format!("task '{}': {}", self.name, e))?;
        Ok(task)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Task(name={}, description={}, expected_output={})",
            self.name, self.description, self.expected_output
        )
    }
}
