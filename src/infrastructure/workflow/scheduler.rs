//! Batch-barrier DAG scheduler
//!
//! Each iteration collects every pending step whose dependencies have all
//! succeeded, runs that batch concurrently against one immutable context
//! snapshot, waits for the whole batch, then folds the successful results
//! into the next snapshot. Steps downstream of a failure never become ready
//! and are reported as blocked once no further batch can be formed.
//!
//! Status events go to a per-run background drain; a slow reporter never
//! holds up a batch.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::publisher::StatusPublisher;
use super::step_executor::StepExecutor;
use crate::config::EngineConfig;
use crate::domain::generation::ProviderRegistry;
use crate::domain::workflow::{
    NamedInputs, StatusReporter, StepError, StepExecutionOutcome, StepFailure, StepState,
    StepStatusEvent, WorkflowContext, WorkflowDefinition, WorkflowError, WorkflowRunReport,
    WorkflowStepDefinition,
};
use crate::infrastructure::observability::{record_batch, record_workflow_run};

/// Runs workflow definitions against a provider registry
#[derive(Debug, Clone)]
pub struct WorkflowEngine {
    executor: StepExecutor,
    reporter: Arc<dyn StatusReporter>,
    concurrency_limit: Option<usize>,
    reporter_timeout: Duration,
    reporter_flush_timeout: Duration,
}

impl WorkflowEngine {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        reporter: Arc<dyn StatusReporter>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            executor: StepExecutor::new(registry).with_step_timeout(config.step_timeout()),
            reporter,
            concurrency_limit: config.concurrency_limit(),
            reporter_timeout: config.reporter_timeout(),
            reporter_flush_timeout: config.reporter_flush_timeout(),
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        self.executor.registry()
    }

    /// Validate `steps` as a DAG, then run them
    pub async fn run_steps(
        &self,
        steps: Vec<WorkflowStepDefinition>,
        inputs: NamedInputs,
    ) -> Result<WorkflowContext, WorkflowError> {
        let definition = WorkflowDefinition::new(steps)?;
        self.run(&definition, inputs).await
    }

    /// Run to completion. Succeeds only if every step succeeded; otherwise
    /// the error carries the partial context and every failed or blocked step.
    pub async fn run(
        &self,
        definition: &WorkflowDefinition,
        inputs: NamedInputs,
    ) -> Result<WorkflowContext, WorkflowError> {
        self.run_with_report(definition, inputs).await?.into_result()
    }

    /// Run to completion and return the full per-step account.
    ///
    /// Only run-level failures (unconfigured provider, impossible stall) are
    /// `Err`; step failures are recorded in the report.
    pub async fn run_with_report(
        &self,
        definition: &WorkflowDefinition,
        inputs: NamedInputs,
    ) -> Result<WorkflowRunReport, WorkflowError> {
        self.ensure_providers(definition)?;

        let run_id = Uuid::new_v4();
        let span = info_span!(
            "workflow_run",
            %run_id,
            workflow = definition.name().unwrap_or("unnamed"),
            steps = definition.len()
        );

        self.execute_run(run_id, definition, inputs)
            .instrument(span)
            .await
    }

    /// Every step's provider must be registered before anything runs
    fn ensure_providers(&self, definition: &WorkflowDefinition) -> Result<(), WorkflowError> {
        match definition
            .steps()
            .iter()
            .find(|step| !self.registry().contains(step.provider()))
        {
            Some(step) => Err(WorkflowError::unknown_provider(step.id(), step.provider())),
            None => Ok(()),
        }
    }

    async fn execute_run(
        &self,
        run_id: Uuid,
        definition: &WorkflowDefinition,
        inputs: NamedInputs,
    ) -> Result<WorkflowRunReport, WorkflowError> {
        let start = Instant::now();
        let mut states: HashMap<&str, StepState> = definition
            .steps()
            .iter()
            .map(|step| (step.id(), StepState::Pending))
            .collect();
        let mut context = Arc::new(WorkflowContext::new(inputs));
        let mut batches: Vec<Vec<String>> = Vec::new();
        let mut outcomes: BTreeMap<String, StepExecutionOutcome> = BTreeMap::new();
        let publisher = StatusPublisher::spawn(Arc::clone(&self.reporter), self.reporter_timeout);

        info!("Workflow run started");

        loop {
            let ready: Vec<&WorkflowStepDefinition> = definition
                .steps()
                .iter()
                .filter(|step| states.get(step.id()) == Some(&StepState::Pending))
                .filter(|step| {
                    step.dependencies()
                        .iter()
                        .all(|dep| states.get(dep.as_str()) == Some(&StepState::Success))
                })
                .collect();

            if ready.is_empty() {
                break;
            }

            let batch = batches.len();
            let ids: Vec<String> = ready.iter().map(|step| step.id().to_string()).collect();
            info!(batch, steps = ?ids, "Dispatching batch");

            for step in &ready {
                states.insert(step.id(), StepState::Ready);
            }

            for step in &ready {
                publisher.publish(StepStatusEvent::processing(run_id, step.id(), batch));
            }

            for step in &ready {
                states.insert(step.id(), StepState::Running);
            }

            let finished = self
                .execute_batch(run_id, batch, &ready, Arc::clone(&context))
                .await;

            // Single write per batch, after the barrier
            context = Arc::new(context.with_results(finished.iter().filter_map(|outcome| {
                outcome
                    .result
                    .as_ref()
                    .map(|value| (outcome.step_id.clone(), value.clone()))
            })));

            for (step, outcome) in ready.iter().zip(&finished) {
                let state = if outcome.is_success() {
                    StepState::Success
                } else {
                    StepState::Error
                };
                states.insert(step.id(), state);
            }

            for outcome in &finished {
                publisher.publish(StepStatusEvent::from_outcome(run_id, outcome));
            }

            record_batch(ready.len());
            outcomes.extend(
                finished
                    .into_iter()
                    .map(|outcome| (outcome.step_id.clone(), outcome)),
            );
            batches.push(ids);
        }

        publisher.finish(self.reporter_flush_timeout).await;
        let failures = collect_failures(definition, &states, &outcomes)?;
        let duration = start.elapsed();
        let blocked = failures.iter().filter(|f| f.is_blocked()).count();

        record_workflow_run(failures.is_empty(), blocked, duration);

        if failures.is_empty() {
            info!(
                batches = batches.len(),
                duration_ms = duration.as_millis() as u64,
                "Workflow run completed"
            );
        } else {
            warn!(
                failed = failures.len() - blocked,
                blocked,
                duration_ms = duration.as_millis() as u64,
                "Workflow run incomplete"
            );
        }

        Ok(WorkflowRunReport {
            run_id,
            context: Arc::unwrap_or_clone(context),
            batches,
            outcomes,
            failures,
            total_steps: definition.len(),
            duration_ms: duration.as_millis() as u64,
        })
    }

    /// Run one batch concurrently and wait for all of it. Outcomes come back
    /// in the order of `ready`.
    async fn execute_batch(
        &self,
        run_id: Uuid,
        batch: usize,
        ready: &[&WorkflowStepDefinition],
        snapshot: Arc<WorkflowContext>,
    ) -> Vec<StepExecutionOutcome> {
        let semaphore = self.concurrency_limit.map(|limit| Arc::new(Semaphore::new(limit)));
        let mut tasks = JoinSet::new();

        for &step in ready {
            let step = step.clone();
            let executor = self.executor.clone();
            let snapshot = Arc::clone(&snapshot);
            let semaphore = semaphore.clone();
            let span = info_span!(
                "workflow_step",
                %run_id,
                step_id = %step.id(),
                provider = %step.provider(),
                batch
            );

            tasks.spawn(
                async move {
                    let _permit = match semaphore {
                        Some(semaphore) => semaphore.acquire_owned().await.ok(),
                        None => None,
                    };

                    debug!("Step started");
                    AssertUnwindSafe(executor.execute(&step, &snapshot))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|panic| {
                            StepExecutionOutcome::failure(
                                StepError::panicked(step.id(), panic_message(panic.as_ref())),
                                0,
                            )
                        })
                }
                .instrument(span),
            );
        }

        let mut finished: HashMap<String, StepExecutionOutcome> = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    finished.insert(outcome.step_id.clone(), outcome);
                }
                Err(e) => warn!(batch, error = %e, "Step task did not complete"),
            }
        }

        ready
            .iter()
            .map(|step| {
                finished.remove(step.id()).unwrap_or_else(|| {
                    StepExecutionOutcome::failure(
                        StepError::panicked(step.id(), "step task ended without an outcome"),
                        0,
                    )
                })
            })
            .map(|outcome| outcome.with_batch(batch))
            .collect()
    }
}

/// Every step that did not succeed, in declaration order
fn collect_failures(
    definition: &WorkflowDefinition,
    states: &HashMap<&str, StepState>,
    outcomes: &BTreeMap<String, StepExecutionOutcome>,
) -> Result<Vec<StepFailure>, WorkflowError> {
    let mut failures = Vec::new();
    let mut stuck = Vec::new();
    let mut chains: HashMap<String, Option<Vec<String>>> = HashMap::new();

    for step in definition.steps() {
        match states.get(step.id()) {
            Some(StepState::Success) => {}
            Some(StepState::Error) => {
                let error = outcomes
                    .get(step.id())
                    .and_then(|outcome| outcome.error.clone())
                    .unwrap_or_else(|| StepError::panicked(step.id(), "no outcome recorded"));
                failures.push(StepFailure::error(error));
            }
            _ => match blocking_chain(definition, states, step.id(), &mut chains) {
                Some(chain) => failures.push(StepFailure::blocked(step.id(), chain)),
                None => stuck.push(step.id().to_string()),
            },
        }
    }

    // Only reachable if a dependency cycle slipped past definition validation
    if !stuck.is_empty() {
        return Err(WorkflowError::deadlock(stuck));
    }

    Ok(failures)
}

/// Path from a failed step down to `step_id` through unfinished steps
fn blocking_chain(
    definition: &WorkflowDefinition,
    states: &HashMap<&str, StepState>,
    step_id: &str,
    memo: &mut HashMap<String, Option<Vec<String>>>,
) -> Option<Vec<String>> {
    if let Some(known) = memo.get(step_id) {
        return known.clone();
    }
    // Guards against revisiting a step while its own chain is being built
    memo.insert(step_id.to_string(), None);

    let step = definition.step(step_id)?;
    let mut chain = None;

    for dependency in step.dependencies() {
        let found = match states.get(dependency.as_str()) {
            Some(StepState::Error) => Some(vec![dependency.clone()]),
            Some(StepState::Success) => None,
            _ => blocking_chain(definition, states, dependency, memo),
        };

        if let Some(mut path) = found {
            path.push(step_id.to_string());
            chain = Some(path);
            break;
        }
    }

    memo.insert(step_id.to_string(), chain.clone());
    chain
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("step panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("step panicked: {}", message)
    } else {
        "step panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::generation::{MockGenerationClient, ProviderOptions};
    use crate::domain::workflow::{NoopStatusReporter, StepStatus};
    use serde_json::json;

    fn engine(client: Arc<MockGenerationClient>) -> WorkflowEngine {
        let registry = ProviderRegistry::new().with_client(client);
        WorkflowEngine::new(
            Arc::new(registry),
            Arc::new(NoopStatusReporter),
            &EngineConfig::default(),
        )
    }

    fn step(id: &str, prompt: &str, deps: &[&str]) -> WorkflowStepDefinition {
        WorkflowStepDefinition::new(id, prompt, ProviderOptions::custom("echo", "echo-1"))
            .with_dependencies(deps.iter().copied())
    }

    fn inputs() -> NamedInputs {
        let mut inputs = NamedInputs::new();
        inputs.insert("jobDescription".to_string(), json!("Senior Go engineer"));
        inputs
    }

    #[tokio::test]
    async fn test_batches_follow_dependencies() {
        let client = Arc::new(MockGenerationClient::new("echo"));
        let definition = WorkflowDefinition::new(vec![
            step("a", "A {jobDescription}", &[]),
            step("b", "B {a}", &["a"]),
            step("c", "C", &[]),
            step("d", "D {b} {c}", &["b", "c"]),
        ])
        .unwrap();

        let report = engine(client.clone())
            .run_with_report(&definition, inputs())
            .await
            .unwrap();

        assert!(report.is_success());
        assert_eq!(
            report.batches,
            vec![
                vec!["a".to_string(), "c".to_string()],
                vec!["b".to_string()],
                vec!["d".to_string()],
            ]
        );
        assert_eq!(report.batch_of("d"), Some(2));
        assert_eq!(report.context.result("d"), Some(&json!("D B A Senior Go engineer C")));
        assert_eq!(client.call_count(), 4);
    }

    #[tokio::test]
    async fn test_unknown_provider_is_run_level() {
        let client = Arc::new(MockGenerationClient::new("echo"));
        let definition = WorkflowDefinition::new(vec![
            step("a", "A", &[]),
            WorkflowStepDefinition::new("b", "B", ProviderOptions::openai("gpt-4o")),
        ])
        .unwrap();

        let err = engine(client.clone())
            .run(&definition, inputs())
            .await
            .unwrap_err();

        assert_eq!(err, WorkflowError::unknown_provider("b", "openai"));
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_blocks_descendants() {
        let client = Arc::new(MockGenerationClient::new("echo"));
        let definition = WorkflowDefinition::new(vec![
            step("a", "A {missing}", &[]),
            step("b", "B {a}", &["a"]),
            step("c", "C {b}", &["b"]),
            step("x", "X", &[]),
        ])
        .unwrap();

        let report = engine(client.clone())
            .run_with_report(&definition, inputs())
            .await
            .unwrap();

        assert_eq!(report.failed_steps(), vec!["a"]);
        assert_eq!(report.blocked_steps(), vec!["b", "c"]);
        assert_eq!(
            report.failures[2],
            StepFailure::blocked("c", vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
        assert_eq!(report.outcome("x").map(|o| o.status), Some(StepStatus::Success));
        assert!(report.outcome("b").is_none());
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_definition_succeeds() {
        let client = Arc::new(MockGenerationClient::new("echo"));
        let definition = WorkflowDefinition::new(vec![]).unwrap();

        let context = engine(client).run(&definition, inputs()).await.unwrap();

        assert!(context.intermediate_results().is_empty());
        assert_eq!(context.input("jobDescription"), Some(&json!("Senior Go engineer")));
    }

    #[test]
    fn test_blocking_chain_prefers_first_failed_dependency() {
        let definition = WorkflowDefinition::new(vec![
            step("a", "A", &[]),
            step("b", "B", &[]),
            step("c", "C", &["a", "b"]),
        ])
        .unwrap();

        let mut states = HashMap::new();
        states.insert("a", StepState::Success);
        states.insert("b", StepState::Error);
        states.insert("c", StepState::Pending);

        let chain = blocking_chain(&definition, &states, "c", &mut HashMap::new());
        assert_eq!(chain, Some(vec!["b".to_string(), "c".to_string()]));
    }

    #[test]
    fn test_panic_message() {
        let panic: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(panic.as_ref()), "step panicked: boom");

        let panic: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(panic.as_ref()), "step panicked");
    }
}
