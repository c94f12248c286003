//! Task output representation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Class that represents the result of a completed task.
///
/// # Fields
///
/// * `name` - Name of the task
/// * `description` - Description the agent worked from (after interpolation)
/// * `expected_output` - Expected output contract of the task
/// * `summary` - Summary of the task (auto-generated from description)
/// * `raw` - Raw output returned by the agent runtime
/// * `agent` - Name of the agent that executed the task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutput {
    /// Name of the task.
    pub name: String,
    /// Description of the task.
    pub description: String,
    /// Expected output of the task.
    pub expected_output: String,
    /// Summary of the task (auto-generated from description).
    pub summary: String,
    /// Raw output of the task.
    pub raw: String,
    /// Agent that executed the task.
    pub agent: String,
}

impl TaskOutput {
    /// Create a new TaskOutput with summary auto-generated from description.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        expected_output: impl Into<String>,
        agent: impl Into<String>,
        raw: impl Into<String>,
    ) -> Self {
        let description = description.into();
        let summary = Self::generate_summary(&description);
        Self {
            name: name.into(),
            description,
            expected_output: expected_output.into(),
            summary,
            raw: raw.into(),
            agent: agent.into(),
        }
    }

    /// Generate a summary from the first 10 words of the description.
    pub fn generate_summary(description: &str) -> String {
        let words: Vec<&str> = description.split_whitespace().collect();
        if words.len() <= 10 {
            words.join(" ")
        } else {
            format!("{}...", words[..10].join(" "))
        }
    }
}

impl fmt::Display for TaskOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_truncates_long_descriptions() {
        let output = TaskOutput::new(
            "t",
            "one two three four five six seven eight nine ten eleven",
            "",
            "agent",
            "done",
        );
        assert_eq!(
            output.summary,
            "one two three four five six seven eight nine ten..."
        );
        assert_eq!(output.to_string(), "done");
    }

    #[test]
    fn test_summary_keeps_short_descriptions() {
        assert_eq!(TaskOutput::generate_summary("  Write   a poem "), "Write a poem");
    }
}
