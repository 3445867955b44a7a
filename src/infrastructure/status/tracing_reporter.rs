use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::workflow::{StatusReporter, StepStatus, StepStatusEvent};
use crate::domain::DomainError;

/// Writes each status event to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingStatusReporter;

#[async_trait]
impl StatusReporter for TracingStatusReporter {
    async fn report(&self, event: &StepStatusEvent) -> Result<(), DomainError> {
        match event.status {
            StepStatus::Error => warn!(
                run_id = %event.run_id,
                step_id = %event.step_id,
                batch = event.batch,
                error = event.error.as_deref().unwrap_or_default(),
                "Step status: error"
            ),
            status => info!(
                run_id = %event.run_id,
                step_id = %event.step_id,
                batch = event.batch,
                result_len = event.result.as_ref().map(String::len),
                "Step status: {}",
                status
            ),
        }

        Ok(())
    }
}
