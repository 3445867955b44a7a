//! Workflow domain module
//!
//! A workflow is a static set of named steps forming a DAG. Each step builds
//! a prompt from the shared context, calls one generation provider, and
//! stores its (optionally transformed) result under its own id.
//!
//! ## Placeholders
//!
//! Prompts and system prompts reference values with `{name}`:
//! - a named input supplied by the caller (`{jobDescription}`)
//! - the result of an earlier step, keyed by step id (`{skills}`)

mod context;
mod entity;
mod error;
mod outcome;
mod status;
pub mod template;
mod transform;

pub use context::{value_to_string, NamedInputs, WorkflowContext};
pub use entity::{
    validate_step_id, PlaceholderWarning, WorkflowDefinition, WorkflowStepDefinition,
    MAX_STEP_ID_LENGTH,
};
pub use error::{StepError, WorkflowError};
pub use outcome::{
    FailureReason, IncompleteRun, StepExecutionOutcome, StepFailure, StepState, StepStatus,
    WorkflowRunReport,
};
pub use status::{NoopStatusReporter, StatusReporter, StepStatusEvent};
pub use template::TemplateError;
pub use transform::{StepTransform, TransformFn, TransformKind};
