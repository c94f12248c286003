//! Core Agent struct.
//!
//! An agent is a named profile (role, goal, backstory, capabilities) bound
//! to an [`AgentRuntime`] that does the actual work. Agents are built once
//! before a run and are never mutated by the engine.

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::runtime::{AgentProfile, AgentRuntime};

/// Default iteration budget forwarded to the runtime.
pub const DEFAULT_MAX_ITER: u32 = 25;

/// The part an agent plays in a crew.
///
/// Only specialists are delegation targets. A manager coordinates a
/// hierarchical crew and runs only tasks explicitly assigned to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Specialist,
    Manager,
}

impl AgentKind {
    /// Whether the delegation router may hand tasks to this kind of agent.
    pub fn can_be_delegated_to(self) -> bool {
        matches!(self, AgentKind::Specialist)
    }
}

impl Default for AgentKind {
    fn default() -> Self {
        AgentKind::Specialist
    }
}

/// Represents an agent in a crew.
#[derive(Clone)]
pub struct Agent {
    /// Unique identifier for the agent.
    pub id: Uuid,
    /// Name of the agent, unique within a crew. Tasks reference agents by name.
    pub name: String,
    /// Role of the agent.
    pub role: String,
    /// Objective of the agent.
    pub goal: String,
    /// Backstory of the agent.
    pub backstory: String,
    /// Declared tool affinities, used for delegation matching.
    pub capabilities: Vec<String>,
    /// Specialist or manager.
    pub kind: AgentKind,
    /// Enable agent to delegate and ask questions among each other.
    pub allow_delegation: bool,
    /// Maximum iterations for an agent to execute a task.
    pub max_iter: u32,
    /// Maximum execution time for one task attempt. Used when the task sets
    /// no timeout of its own.
    pub max_execution_time: Option<Duration>,
    /// The runtime that executes tasks for this agent.
    pub runtime: Arc<dyn AgentRuntime>,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("role", &self.role)
            .field("kind", &self.kind)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

impl Agent {
    /// Create a new specialist agent.
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
        runtime: Arc<dyn AgentRuntime>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
            capabilities: Vec::new(),
            kind: AgentKind::Specialist,
            allow_delegation: false,
            max_iter: DEFAULT_MAX_ITER,
            max_execution_time: None,
            runtime,
        }
    }

    /// Create a manager agent. Managers may delegate by definition.
    pub fn manager(
        name: impl Into<String>,
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
        runtime: Arc<dyn AgentRuntime>,
    ) -> Self {
        let mut agent = Self::new(name, role, goal, backstory, runtime);
        agent.kind = AgentKind::Manager;
        agent.allow_delegation = true;
        agent
    }

    /// Builder: set declared tool capabilities.
    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: allow or forbid delegation.
    pub fn with_allow_delegation(mut self, allow: bool) -> Self {
        self.allow_delegation = allow;
        self
    }

    /// Builder: set the iteration budget.
    pub fn with_max_iter(mut self, max_iter: u32) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Builder: set the per-attempt execution time limit.
    pub fn with_max_execution_time(mut self, limit: Duration) -> Self {
        self.max_execution_time = Some(limit);
        self
    }

    pub fn is_manager(&self) -> bool {
        self.kind == AgentKind::Manager
    }

    /// Whether the delegation router may pick this agent.
    pub fn can_be_delegated_to(&self) -> bool {
        self.kind.can_be_delegated_to()
    }

    /// Whether the agent declares the given capability (case-insensitive).
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities
            .iter()
            .any(|c| c.eq_ignore_ascii_case(capability))
    }

    /// Profile forwarded to the runtime with every request.
    pub fn profile(&self) -> AgentProfile {
        AgentProfile {
            name: self.name.clone(),
            role: self.role.clone(),
            goal: self.goal.clone(),
            backstory: self.backstory.clone(),
            max_iter: self.max_iter,
            allow_delegation: self.allow_delegation,
        }
    }

    /// Compute the key property (MD5 hash of role|goal|backstory).
    pub fn key(&self) -> String {
        let source = format!("{}|{}|{}", self.role, self.goal, self.backstory);
        let mut hasher = Md5::new();
        hasher.update(source.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Agent(name={}, role={})", self.name, self.role)
    }
}
