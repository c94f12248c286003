//! Utility modules: errors, configuration loading, and string helpers.

pub mod config;
pub mod errors;
pub mod string_utils;

pub use config::{AgentConfig, ConfigError, CrewConfig, RetryConfig, TaskConfig};
pub use errors::{
    CrewError, CrewResult, DelegationError, GraphError, TaskError, TaskExecutionError,
};
