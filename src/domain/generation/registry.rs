//! Explicit provider lookup for the step executor

use std::collections::HashMap;
use std::sync::Arc;

use super::GenerationClient;
use crate::domain::DomainError;

/// Maps provider names to generation clients.
///
/// Built once by the hosting layer and handed to the engine; there is no
/// process-wide provider state.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    clients: HashMap<String, Arc<dyn GenerationClient>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client under its own provider name
    pub fn register(&mut self, client: Arc<dyn GenerationClient>) {
        let name = client.provider_name().to_string();
        self.clients.insert(name, client);
    }

    /// Register a client under an explicit name
    pub fn register_as(&mut self, name: impl Into<String>, client: Arc<dyn GenerationClient>) {
        self.clients.insert(name.into(), client);
    }

    pub fn with_client(mut self, client: Arc<dyn GenerationClient>) -> Self {
        self.register(client);
        self
    }

    pub fn resolve(&self, provider: &str) -> Result<Arc<dyn GenerationClient>, DomainError> {
        self.clients.get(provider).cloned().ok_or_else(|| {
            DomainError::configuration(format!("Provider '{}' is not configured", provider))
        })
    }

    pub fn contains(&self, provider: &str) -> bool {
        self.clients.contains_key(provider)
    }

    /// Registered provider names, sorted
    pub fn provider_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.clients.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
