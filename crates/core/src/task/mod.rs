//! Task state, persistence and the in-memory registry.

mod json_store;
mod registry;
mod store;
mod types;

pub use json_store::JsonTaskStore;
pub use registry::TaskRegistry;
pub use store::TaskStore;
pub use types::{
    step_name, StepRecord, StepStatus, Task, TaskError, TaskInputs, TaskStatus, TOTAL_STEPS,
};
