//! Tools handed to agent runtimes.
//!
//! The engine never invokes tools itself; it forwards a task's tool
//! overrides to the runtime with every request.

pub mod base_tool;

pub use base_tool::{tool_names, BaseTool, Tool, ToolFn};
