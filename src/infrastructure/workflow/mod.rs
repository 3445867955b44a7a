//! Workflow infrastructure implementations

mod publisher;
mod scheduler;
mod step_executor;

pub use scheduler::WorkflowEngine;
pub use step_executor::StepExecutor;
