//! Base tool definitions.
//!
//! Tools are invoked by an agent runtime while it works on a task, never by
//! the engine itself. The engine only forwards per-task tool overrides to
//! the runtime and uses tool names for delegation matching.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Abstract base trait for all tools an agent runtime can call.
pub trait BaseTool: Send + Sync + fmt::Debug {
    /// The unique name of the tool that clearly communicates its purpose.
    fn name(&self) -> &str;

    /// Description used to tell the model how/when/why to use the tool.
    fn description(&self) -> &str;

    /// Execute the tool with the given parameters.
    fn execute(&self, params: &HashMap<String, Value>) -> anyhow::Result<String>;
}

/// Type alias for a shared synchronous tool function.
pub type ToolFn = Arc<dyn Fn(&HashMap<String, Value>) -> anyhow::Result<String> + Send + Sync>;

/// Concrete tool that wraps a callable function.
#[derive(Clone)]
pub struct Tool {
    tool_name: String,
    tool_description: String,
    func: ToolFn,
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.tool_name)
            .field("description", &self.tool_description)
            .finish_non_exhaustive()
    }
}

impl Tool {
    pub fn new<F>(name: impl Into<String>, description: impl Into<String>, func: F) -> Self
    where
        F: Fn(&HashMap<String, Value>) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        Self {
            tool_name: name.into(),
            tool_description: description.into(),
            func: Arc::new(func),
        }
    }
}

impl BaseTool for Tool {
    fn name(&self) -> &str {
        &self.tool_name
    }

    fn description(&self) -> &str {
        &self.tool_description
    }

    fn execute(&self, params: &HashMap<String, Value>) -> anyhow::Result<String> {
        (self.func)(params)
    }
}

/// Names of the given tools, in order.
pub fn tool_names(tools: &[Arc<dyn BaseTool>]) -> Vec<String> {
    tools.iter().map(|t| t.name().to_string()).collect()
}
