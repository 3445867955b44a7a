//! Per-step outcomes and the aggregate result of a run

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::context::WorkflowContext;
use super::error::{StepError, WorkflowError};

/// Status values published to reporters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Processing,
    Success,
    Error,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Processing)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheduler-side lifecycle of a step within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepState {
    Pending,
    Ready,
    Running,
    Success,
    Error,
}

impl StepState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }
}

/// What happened to one executed step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepExecutionOutcome {
    pub step_id: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StepError>,
    /// Zero-based index of the batch the step ran in
    pub batch: usize,
    pub duration_ms: u64,
}

impl StepExecutionOutcome {
    pub fn success(step_id: impl Into<String>, result: Value, duration_ms: u64) -> Self {
        Self {
            step_id: step_id.into(),
            status: StepStatus::Success,
            result: Some(result),
            error: None,
            batch: 0,
            duration_ms,
        }
    }

    pub fn failure(error: StepError, duration_ms: u64) -> Self {
        Self {
            step_id: error.step_id().to_string(),
            status: StepStatus::Error,
            result: None,
            error: Some(error),
            batch: 0,
            duration_ms,
        }
    }

    pub fn with_batch(mut self, batch: usize) -> Self {
        self.batch = batch;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == StepStatus::Error
    }
}

/// Why a declared step did not reach success
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailureReason {
    /// The step ran and failed
    Error { error: StepError },
    /// The step never ran; `chain` runs from the failed root to this step
    Blocked { chain: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepFailure {
    pub step_id: String,
    #[serde(flatten)]
    pub reason: FailureReason,
}

impl StepFailure {
    pub fn error(error: StepError) -> Self {
        Self {
            step_id: error.step_id().to_string(),
            reason: FailureReason::Error { error },
        }
    }

    pub fn blocked(step_id: impl Into<String>, chain: Vec<String>) -> Self {
        Self {
            step_id: step_id.into(),
            reason: FailureReason::Blocked { chain },
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self.reason, FailureReason::Blocked { .. })
    }
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            FailureReason::Error { error } => write!(f, "{}", error),
            FailureReason::Blocked { chain } => write!(
                f,
                "Step '{}' blocked by predecessor ({})",
                self.step_id,
                chain.join(" -> ")
            ),
        }
    }
}

/// A run that executed but did not bring every step to success
#[derive(Debug, Clone, PartialEq)]
pub struct IncompleteRun {
    pub run_id: Uuid,
    /// Context holding every result that did succeed
    pub context: WorkflowContext,
    pub failures: Vec<StepFailure>,
    pub total_steps: usize,
}

impl IncompleteRun {
    pub fn failed_steps(&self) -> Vec<&str> {
        self.failures
            .iter()
            .filter(|f| !f.is_blocked())
            .map(|f| f.step_id.as_str())
            .collect()
    }

    pub fn blocked_steps(&self) -> Vec<&str> {
        self.failures
            .iter()
            .filter(|f| f.is_blocked())
            .map(|f| f.step_id.as_str())
            .collect()
    }
}

impl fmt::Display for IncompleteRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Workflow run incomplete: {} of {} steps did not complete",
            self.failures.len(),
            self.total_steps
        )?;

        for failure in &self.failures {
            write!(f, "\n  - {}", failure)?;
        }

        Ok(())
    }
}

/// Full account of a run: every outcome, the batch layering, and failures
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowRunReport {
    pub run_id: Uuid,
    pub context: WorkflowContext,
    /// Step ids per executed batch, in dispatch order
    pub batches: Vec<Vec<String>>,
    pub outcomes: BTreeMap<String, StepExecutionOutcome>,
    pub failures: Vec<StepFailure>,
    pub total_steps: usize,
    pub duration_ms: u64,
}

impl WorkflowRunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn outcome(&self, step_id: &str) -> Option<&StepExecutionOutcome> {
        self.outcomes.get(step_id)
    }

    pub fn batch_of(&self, step_id: &str) -> Option<usize> {
        self.outcomes.get(step_id).map(|o| o.batch)
    }

    pub fn failed_steps(&self) -> Vec<&str> {
        self.failures
            .iter()
            .filter(|f| !f.is_blocked())
            .map(|f| f.step_id.as_str())
            .collect()
    }

    pub fn blocked_steps(&self) -> Vec<&str> {
        self.failures
            .iter()
            .filter(|f| f.is_blocked())
            .map(|f| f.step_id.as_str())
            .collect()
    }

    /// Collapse into the plain `run` result shape
    pub fn into_result(self) -> Result<WorkflowContext, WorkflowError> {
        if self.failures.is_empty() {
            return Ok(self.context);
        }

        Err(WorkflowError::incomplete(IncompleteRun {
            run_id: self.run_id,
            context: self.context,
            failures: self.failures,
            total_steps: self.total_steps,
        }))
    }
}
