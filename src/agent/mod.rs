//! Agent module.
//!
//! Contains the `Agent` profile struct and the `AgentRuntime` boundary
//! through which the engine invokes the external reasoning process.

pub mod core;
pub mod runtime;

// Re-export the main Agent types.
pub use self::core::{Agent, AgentKind};
pub use self::runtime::{runtime_fn, AgentProfile, AgentRuntime, FnRuntime, RuntimeRequest};
