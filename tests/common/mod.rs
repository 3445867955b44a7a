#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use resume_tailor_engine::config::EngineConfig;
use resume_tailor_engine::domain::generation::{
    GenerationClient, GenerationResponse, ProviderOptions, ProviderRegistry,
};
use resume_tailor_engine::domain::workflow::{
    NamedInputs, StatusReporter, StepStatusEvent, WorkflowStepDefinition,
};
use resume_tailor_engine::domain::DomainError;
use serde_json::json;

pub const ECHO: &str = "echo";

/// Echoes the prompt, optionally failing for prompts that start with a marker
#[derive(Debug, Default)]
pub struct EchoClient {
    fail_prefixes: HashSet<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl EchoClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, prefix: &str) -> Self {
        self.fail_prefixes.insert(prefix.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationClient for EchoClient {
    async fn generate(
        &self,
        prompt: &str,
        _options: &ProviderOptions,
    ) -> Result<GenerationResponse, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_prefixes.iter().any(|p| prompt.starts_with(p.as_str())) {
            return Err(DomainError::provider(ECHO, "rate limited"));
        }

        Ok(GenerationResponse::new(prompt))
    }

    fn provider_name(&self) -> &str {
        ECHO
    }
}

/// Records every event it receives
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<StepStatusEvent>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<StepStatusEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatusReporter for RecordingReporter {
    async fn report(&self, event: &StepStatusEvent) -> Result<(), DomainError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Rejects every event
#[derive(Debug, Default)]
pub struct FailingReporter {
    attempts: AtomicUsize,
}

impl FailingReporter {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusReporter for FailingReporter {
    async fn report(&self, _event: &StepStatusEvent) -> Result<(), DomainError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(DomainError::internal("status sink unavailable"))
    }
}

/// Never returns from `report`
#[derive(Debug, Default)]
pub struct HangingReporter {
    calls: AtomicUsize,
}

impl HangingReporter {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusReporter for HangingReporter {
    async fn report(&self, _event: &StepStatusEvent) -> Result<(), DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

pub fn registry(client: Arc<EchoClient>) -> Arc<ProviderRegistry> {
    Arc::new(ProviderRegistry::new().with_client(client))
}

pub fn config() -> EngineConfig {
    EngineConfig::default()
}

pub fn step(id: &str, prompt: &str, deps: &[&str]) -> WorkflowStepDefinition {
    WorkflowStepDefinition::new(id, prompt, ProviderOptions::custom(ECHO, "echo-1"))
        .with_dependencies(deps.iter().copied())
}

pub fn resume_inputs() -> NamedInputs {
    let mut inputs = NamedInputs::new();
    inputs.insert("jobDescription".to_string(), json!("Senior Go engineer"));
    inputs.insert("workHistory".to_string(), json!("5 years Python"));
    inputs
}
