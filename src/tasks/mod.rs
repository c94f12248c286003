//! Task sub-modules for task output, run status, and dependency context.

pub mod task_context;
pub mod task_output;
pub mod task_status;

pub use task_context::{ContextEntry, TaskContext};
pub use task_output::TaskOutput;
pub use task_status::TaskStatus;
