//! Boundary to the external agent runtime.
//!
//! The engine never reasons about a task itself. It packages the task,
//! its dependency context and the agent profile into a [`RuntimeRequest`]
//! and awaits an [`AgentRuntime`]. The call may be cancelled at any await
//! point when the task's timeout elapses.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::tasks::task_context::TaskContext;
use crate::tools::base_tool::BaseTool;

/// Opaque profile strings of the agent a request is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentProfile {
    pub name: String,
    pub role: String,
    pub goal: String,
    pub backstory: String,
    /// Iteration budget for the runtime's reasoning loop.
    pub max_iter: u32,
    /// Whether the runtime may hand work to other agents.
    pub allow_delegation: bool,
}

/// One invocation of an agent runtime for one task attempt.
#[derive(Debug, Clone)]
pub struct RuntimeRequest {
    /// Name of the task being executed.
    pub task_name: String,
    /// Task description, after input interpolation.
    pub description: String,
    /// Free-text contract of what the task should produce.
    pub expected_output: String,
    /// Outputs of the task's dependencies, in declaration order.
    pub context: TaskContext,
    /// Per-task tool overrides.
    pub tools: Vec<Arc<dyn BaseTool>>,
    /// Time limit enforced by the engine for this attempt.
    pub timeout: Option<Duration>,
    /// 1-based attempt number.
    pub attempt: u32,
    /// The agent the request is addressed to.
    pub agent: AgentProfile,
}

impl RuntimeRequest {
    /// Dependency context rendered as a single string.
    pub fn context_text(&self) -> Option<String> {
        self.context.render()
    }

    /// Build the task prompt: description, expected output and, when present,
    /// the dependency context.
    pub fn prompt(&self) -> String {
        let mut slices = vec![
            self.description.clone(),
            format!("Expected Output: {}", self.expected_output),
        ];
        if let Some(context) = self.context_text() {
            slices.push(format!("Context:\n{}", context));
        }
        slices.join("\n")
    }
}

/// The reasoning/tool-use process behind an agent.
///
/// Implementations may take any amount of time and may fail; the engine
/// applies timeouts and retries around them.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    async fn run(&self, request: RuntimeRequest) -> anyhow::Result<String>;
}

/// Adapter turning an async closure into an [`AgentRuntime`].
pub struct FnRuntime<F> {
    func: F,
}

impl<F> FnRuntime<F> {
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> fmt::Debug for FnRuntime<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRuntime").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> AgentRuntime for FnRuntime<F>
where
    F: Fn(RuntimeRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
{
    async fn run(&self, request: RuntimeRequest) -> anyhow::Result<String> {
        (self.func)(request).await
    }
}

/// Wrap an async closure as a shared runtime.
pub fn runtime_fn<F, Fut>(func: F) -> Arc<dyn AgentRuntime>
where
    F: Fn(RuntimeRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
{
    Arc::new(FnRuntime::new(func))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RuntimeRequest {
        let mut context = TaskContext::new();
        context.push("research", "notes");
        RuntimeRequest {
            task_name: "write".into(),
            description: "Write the article".into(),
            expected_output: "An article".into(),
            context,
            tools: Vec::new(),
            timeout: None,
            attempt: 1,
            agent: AgentProfile {
                name: "writer".into(),
                role: "Writer".into(),
                goal: "Write".into(),
                backstory: String::new(),
                max_iter: 25,
                allow_delegation: false,
            },
        }
    }

    #[test]
    fn test_prompt_includes_context() {
        let prompt = request().prompt();
        assert_eq!(
            prompt,
            "Write the article\nExpected Output: An article\nContext:\nnotes"
        );
    }

    #[tokio::test]
    async fn test_fn_runtime_invokes_closure() {
        let runtime = runtime_fn(|req: RuntimeRequest| async move {
            Ok(format!("{} by {}", req.task_name, req.agent.name))
        });
        let out = runtime.run(request()).await.unwrap();
        assert_eq!(out, "write by writer");
    }
}
