//! Step lifecycle events and the reporter capability that consumes them

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::context::value_to_string;
use super::outcome::{StepExecutionOutcome, StepStatus};
use crate::domain::DomainError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepStatusEvent {
    pub run_id: Uuid,
    pub step_id: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub batch: usize,
    pub timestamp: DateTime<Utc>,
}

impl StepStatusEvent {
    pub fn processing(run_id: Uuid, step_id: impl Into<String>, batch: usize) -> Self {
        Self {
            run_id,
            step_id: step_id.into(),
            status: StepStatus::Processing,
            result: None,
            error: None,
            batch,
            timestamp: Utc::now(),
        }
    }

    pub fn success(run_id: Uuid, step_id: impl Into<String>, batch: usize, result: &Value) -> Self {
        Self {
            run_id,
            step_id: step_id.into(),
            status: StepStatus::Success,
            result: Some(value_to_string(result)),
            error: None,
            batch,
            timestamp: Utc::now(),
        }
    }

    pub fn error(
        run_id: Uuid,
        step_id: impl Into<String>,
        batch: usize,
        error: impl Into<String>,
    ) -> Self {
        Self {
            run_id,
            step_id: step_id.into(),
            status: StepStatus::Error,
            result: None,
            error: Some(error.into()),
            batch,
            timestamp: Utc::now(),
        }
    }

    /// Terminal event for a finished step
    pub fn from_outcome(run_id: Uuid, outcome: &StepExecutionOutcome) -> Self {
        match (&outcome.result, &outcome.error) {
            (Some(result), _) => Self::success(run_id, &outcome.step_id, outcome.batch, result),
            (None, Some(error)) => {
                Self::error(run_id, &outcome.step_id, outcome.batch, error.to_string())
            }
            (None, None) => Self::error(
                run_id,
                &outcome.step_id,
                outcome.batch,
                "Step finished without a result",
            ),
        }
    }
}

/// Best-effort sink for step status updates.
///
/// Implementations must tolerate concurrent calls from steps of the same
/// batch. The engine logs and discards any error returned here.
#[async_trait]
pub trait StatusReporter: Send + Sync + std::fmt::Debug {
    async fn report(&self, event: &StepStatusEvent) -> Result<(), DomainError>;
}

/// Reporter that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStatusReporter;

#[async_trait]
impl StatusReporter for NoopStatusReporter {
    async fn report(&self, _event: &StepStatusEvent) -> Result<(), DomainError> {
        Ok(())
    }
}
