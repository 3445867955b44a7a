//! Domain layer - Core business logic and entities

pub mod error;
pub mod generation;
pub mod workflow;

pub use error::DomainError;
pub use generation::{
    GenerationClient, GenerationResponse, ProviderOptions, ProviderRegistry, SystemPrompt,
};
pub use workflow::{
    StatusReporter, StepError, StepStatusEvent, WorkflowContext, WorkflowDefinition,
    WorkflowError, WorkflowStepDefinition,
};
