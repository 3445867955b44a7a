//! Workflow error types

use serde::Serialize;
use thiserror::Error;

use super::outcome::IncompleteRun;

/// Why a single step failed. Never aborts the run on its own.
#[derive(Debug, Clone, Error, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepError {
    #[error("Missing dependency value in step '{step}': variable '{variable}' is not defined")]
    MissingVariable { step: String, variable: String },

    #[error("Step '{step}' uses provider '{provider}' which is not configured")]
    UnknownProvider { step: String, provider: String },

    #[error("Step '{step}' failed on provider '{provider}': {message}")]
    Provider {
        step: String,
        provider: String,
        message: String,
    },

    #[error("Transform failed in step '{step}': {message}")]
    Transform { step: String, message: String },

    #[error("Step '{step}' aborted: {message}")]
    Panicked { step: String, message: String },
}

impl StepError {
    pub fn missing_variable(step: impl Into<String>, variable: impl Into<String>) -> Self {
        Self::MissingVariable {
            step: step.into(),
            variable: variable.into(),
        }
    }

    pub fn unknown_provider(step: impl Into<String>, provider: impl Into<String>) -> Self {
        Self::UnknownProvider {
            step: step.into(),
            provider: provider.into(),
        }
    }

    pub fn provider(
        step: impl Into<String>,
        provider: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Provider {
            step: step.into(),
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn transform(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transform {
            step: step.into(),
            message: message.into(),
        }
    }

    pub fn panicked(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Panicked {
            step: step.into(),
            message: message.into(),
        }
    }

    pub fn step_id(&self) -> &str {
        match self {
            Self::MissingVariable { step, .. }
            | Self::UnknownProvider { step, .. }
            | Self::Provider { step, .. }
            | Self::Transform { step, .. }
            | Self::Panicked { step, .. } => step,
        }
    }
}

/// Run-level errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WorkflowError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Duplicate step id: {0}")]
    DuplicateStep(String),

    #[error("Step '{step}' depends on unknown step '{dependency}'")]
    UnknownDependency { step: String, dependency: String },

    #[error("Circular dependency detected among steps: {}", .steps.join(", "))]
    CircularDependency { steps: Vec<String> },

    #[error("Step '{step}' uses provider '{provider}' which is not configured")]
    UnknownProvider { step: String, provider: String },

    #[error("Deadlock: no step can become ready, stuck steps: {}", .steps.join(", "))]
    Deadlock { steps: Vec<String> },

    #[error("{0}")]
    Incomplete(Box<IncompleteRun>),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl WorkflowError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn duplicate_step(id: impl Into<String>) -> Self {
        Self::DuplicateStep(id.into())
    }

    pub fn unknown_dependency(step: impl Into<String>, dependency: impl Into<String>) -> Self {
        Self::UnknownDependency {
            step: step.into(),
            dependency: dependency.into(),
        }
    }

    pub fn circular_dependency(steps: Vec<String>) -> Self {
        Self::CircularDependency { steps }
    }

    pub fn unknown_provider(step: impl Into<String>, provider: impl Into<String>) -> Self {
        Self::UnknownProvider {
            step: step.into(),
            provider: provider.into(),
        }
    }

    pub fn deadlock(steps: Vec<String>) -> Self {
        Self::Deadlock { steps }
    }

    pub fn incomplete(run: IncompleteRun) -> Self {
        Self::Incomplete(Box::new(run))
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// The partial run, when the run executed but did not fully succeed
    pub fn incomplete_run(&self) -> Option<&IncompleteRun> {
        match self {
            Self::Incomplete(run) => Some(run),
            _ => None,
        }
    }
}
