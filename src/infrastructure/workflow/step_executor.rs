//! Single-step execution

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::generation::ProviderRegistry;
use crate::domain::workflow::{
    template::{self, TemplateError},
    StepError, StepExecutionOutcome, WorkflowContext, WorkflowStepDefinition,
};
use crate::infrastructure::observability::{record_step_execution, StepMetricParams};

/// Runs one step against a read-only context snapshot.
///
/// Every failure is returned as an error outcome; nothing here panics or
/// aborts the surrounding run.
#[derive(Debug, Clone)]
pub struct StepExecutor {
    registry: Arc<ProviderRegistry>,
    step_timeout: Option<Duration>,
}

impl StepExecutor {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            step_timeout: None,
        }
    }

    /// Bound each provider call; expiry fails only that step
    pub fn with_step_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.step_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub async fn execute(
        &self,
        step: &WorkflowStepDefinition,
        context: &WorkflowContext,
    ) -> StepExecutionOutcome {
        let start = Instant::now();
        let result = self.try_execute(step, context).await;
        let elapsed = start.elapsed();
        let duration_ms = elapsed.as_millis() as u64;

        let outcome = match result {
            Ok(value) => {
                debug!(step_id = %step.id(), duration_ms, "Step succeeded");
                StepExecutionOutcome::success(step.id(), value, duration_ms)
            }
            Err(e) => {
                warn!(step_id = %step.id(), error = %e, "Step failed");
                StepExecutionOutcome::failure(e, duration_ms)
            }
        };

        record_step_execution(StepMetricParams {
            provider: step.provider(),
            status: outcome.status,
            duration: elapsed,
        });

        outcome
    }

    async fn try_execute(
        &self,
        step: &WorkflowStepDefinition,
        context: &WorkflowContext,
    ) -> Result<Value, StepError> {
        let provider = step.provider();

        let client = self
            .registry
            .resolve(provider)
            .map_err(|_| StepError::unknown_provider(step.id(), provider))?;

        // Nothing below this line may run for a step with unresolved placeholders
        template::validate_step(step, context)?;

        let missing = |e: TemplateError| match e {
            TemplateError::MissingVariable { name } => StepError::missing_variable(step.id(), name),
        };

        let prompt = template::interpolate(step.prompt_template(), context).map_err(missing)?;

        let mut options = step.options().clone();
        if let Some(system) = step.system_prompt_template() {
            let rendered = system
                .try_map(|block| template::interpolate(block, context))
                .map_err(missing)?;
            options.common_mut().system_prompt = Some(rendered);
        }

        debug!(
            step_id = %step.id(),
            provider = %provider,
            model = %options.model(),
            prompt_len = prompt.len(),
            "Dispatching step to provider"
        );

        let call = client.generate(&prompt, &options);
        let response = match self.step_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                StepError::provider(
                    step.id(),
                    provider,
                    format!("Timed out after {} ms", limit.as_millis()),
                )
            })?,
            None => call.await,
        }
        .map_err(|e| StepError::provider(step.id(), provider, e.message()))?;

        step.transform()
            .apply(&response, context)
            .map_err(|message| StepError::transform(step.id(), message))
    }
}
