//! Dependency context handed to a task's agent runtime.
//!
//! The engine assembles context as an ordered list of `(task, output)`
//! pairs following the order in which dependencies were declared. It is
//! rendered to text only when the runtime asks for it.

use serde::{Deserialize, Serialize};

/// Separator placed between dependency outputs when rendering context.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Output of one dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    /// Name of the dependency task.
    pub task: String,
    /// Raw output the dependency produced.
    pub output: String,
}

/// Ordered outputs of a task's dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskContext {
    entries: Vec<ContextEntry>,
}

impl TaskContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a dependency output. Callers push in declaration order.
    pub fn push(&mut self, task: impl Into<String>, output: impl Into<String>) {
        self.entries.push(ContextEntry {
            task: task.into(),
            output: output.into(),
        });
    }

    pub fn entries(&self) -> &[ContextEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Output of the named dependency, if present.
    pub fn get(&self, task: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.task == task)
            .map(|e| e.output.as_str())
    }

    /// Concatenate the outputs in order, or `None` when there are no
    /// dependencies.
    pub fn render(&self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        Some(
            self.entries
                .iter()
                .map(|e| e.output.as_str())
                .collect::<Vec<&str>>()
                .join(CONTEXT_SEPARATOR),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_preserves_push_order() {
        let mut ctx = TaskContext::new();
        ctx.push("a", "alpha");
        ctx.push("b", "beta");
        assert_eq!(ctx.render().unwrap(), format!("alpha{}beta", CONTEXT_SEPARATOR));
        assert_eq!(ctx.get("b"), Some("beta"));
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn test_empty_context_renders_none() {
        assert!(TaskContext::new().render().is_none());
    }
}
