//! Declarative crew configuration.
//!
//! A crew can be described in YAML or JSON and turned into a [`Crew`] once
//! every agent has been bound to a runtime.
//!
//! # Example YAML
//!
//! ```yaml
//! process: hierarchical
//! max_concurrency: 2
//! retry:
//!   base_ms: 250
//!   cap_ms: 5000
//! agents:
//!   - name: lead
//!     role: Project Manager
//!     goal: Coordinate the team
//!     manager: true
//!   - name: analyst
//!     role: Data Analyst
//!     goal: Analyze datasets
//!     capabilities: [sql]
//!     runtime: llm
//! tasks:
//!   - name: stats
//!     description: Analyze the {dataset} dataset
//!     expected_output: Summary statistics
//!     max_retries: 2
//!     timeout_secs: 30
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agent::{Agent, AgentRuntime};
use crate::crew::Crew;
use crate::crews::task_executor::RetryPolicy;
use crate::process::Process;
use crate::task::Task;
use crate::utilities::errors::CrewError;

/// Errors raised while loading a crew configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A value is out of range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// No runtime could be bound to an agent.
    #[error("No runtime for agent '{agent}': {message}")]
    Runtime { agent: String, message: String },

    /// The resulting crew failed validation.
    #[error(transparent)]
    Crew(#[from] CrewError),
}

/// Backoff settings in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_base_ms")]
    pub base_ms: u64,
    #[serde(default = "default_cap_ms")]
    pub cap_ms: u64,
}

fn default_base_ms() -> u64 {
    500
}

fn default_cap_ms() -> u64 {
    30_000
}

impl From<RetryConfig> for RetryPolicy {
    fn from(config: RetryConfig) -> Self {
        RetryPolicy::new(
            Duration::from_millis(config.base_ms),
            Duration::from_millis(config.cap_ms),
        )
    }
}

/// One agent entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    pub role: String,
    pub goal: String,
    #[serde(default)]
    pub backstory: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Whether the agent is the crew's manager.
    #[serde(default)]
    pub manager: bool,
    #[serde(default)]
    pub allow_delegation: Option<bool>,
    #[serde(default)]
    pub max_iter: Option<u32>,
    #[serde(default)]
    pub max_execution_time_secs: Option<f64>,
    /// Free-form hint telling the resolver which runtime to bind.
    #[serde(default)]
    pub runtime: Option<String>,
}

/// One task entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    pub name: String,
    pub description: String,
    pub expected_output: String,
    #[serde(default)]
    pub agent: Option<String>,
    /// Names of the tasks this one depends on.
    #[serde(default)]
    pub context: Vec<String>,
    #[serde(default)]
    pub async_execution: bool,
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub timeout_secs: Option<f64>,
    #[serde(default)]
    pub required_capabilities: Vec<String>,
}

/// A whole crew definition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CrewConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub process: Process,
    #[serde(default)]
    pub max_concurrency: Option<usize>,
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub agents: Vec<AgentConfig>,
    #[serde(default)]
    pub tasks: Vec<TaskConfig>,
}

impl CrewConfig {
    /// Parse a configuration from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration file. `.json` files are read as JSON, anything
    /// else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
        log::debug!("Loading crew configuration from {}", path.display());
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// Build the crew, asking `resolver` for each agent's runtime.
    pub fn into_crew<F>(self, resolver: F) -> Result<Crew, ConfigError>
    where
        F: Fn(&AgentConfig) -> anyhow::Result<Arc<dyn AgentRuntime>>,
    {
        let mut agents = Vec::with_capacity(self.agents.len());
        for config in &self.agents {
            let runtime = resolver(config).map_err(|e| ConfigError::Runtime {
                agent: config.name.clone(),
                message: format!("{:#}", e),
            })?;
            agents.push(build_agent(config, runtime)?);
        }

        let tasks = self
            .tasks
            .iter()
            .map(build_task)
            .collect::<Result<Vec<Task>, ConfigError>>()?;

        let mut crew = Crew::new(agents, tasks, self.process)?;
        if let Some(name) = self.name {
            crew = crew.with_name(name);
        }
        if let Some(max_concurrency) = self.max_concurrency {
            if max_concurrency == 0 {
                return Err(ConfigError::Invalid(
                    "max_concurrency must be at least 1".to_string(),
                ));
            }
            crew = crew.with_max_concurrency(max_concurrency);
        }
        if let Some(retry) = self.retry {
            crew = crew.with_retry_policy(retry.into());
        }
        Ok(crew)
    }
}

fn seconds(field: &str, owner: &str, value: f64) -> Result<Duration, ConfigError> {
    if value <= 0.0 {
        return Err(ConfigError::Invalid(format!(
            "{} of '{}' must be positive, got {}",
            field, owner, value
        )));
    }
    Duration::try_from_secs_f64(value)
        .map_err(|e| ConfigError::Invalid(format!("{} of '{}': {}", field, owner, e)))
}

fn build_agent(config: &AgentConfig, runtime: Arc<dyn AgentRuntime>) -> Result<Agent, ConfigError> {
    let agent = if config.manager {
        Agent::manager(&config.name, &config.role, &config.goal, &config.backstory, runtime)
    } else {
        Agent::new(&config.name, &config.role, &config.goal, &config.backstory, runtime)
    };
    let mut agent = agent.with_capabilities(config.capabilities.iter().cloned());

    if let Some(allow) = config.allow_delegation {
        agent = agent.with_allow_delegation(allow);
    }
    if let Some(max_iter) = config.max_iter {
        agent = agent.with_max_iter(max_iter);
    }
    if let Some(secs) = config.max_execution_time_secs {
        agent = agent.with_max_execution_time(seconds("max_execution_time_secs", &config.name, secs)?);
    }
    Ok(agent)
}

fn build_task(config: &TaskConfig) -> Result<Task, ConfigError> {
    let mut task = Task::new(&config.name, &config.description, &config.expected_output)
        .with_context(config.context.iter().cloned())
        .with_async_execution(config.async_execution)
        .with_required_capabilities(config.required_capabilities.iter().cloned());

    if let Some(agent) = &config.agent {
        task = task.with_agent(agent);
    }
    if let Some(max_retries) = config.max_retries {
        task = task.with_max_retries(max_retries);
    }
    if let Some(secs) = config.timeout_secs {
        task = task.with_timeout(seconds("timeout_secs", &config.name, secs)?);
    }
    Ok(task)
}
