use std::sync::Arc;

use tracing::{debug, info};

use super::http_client::HttpClient;
use super::{AnthropicClient, GeminiClient, OpenAiClient};
use crate::config::{ProviderConfig, ProvidersConfig};
use crate::domain::generation::{GenerationClient, ProviderRegistry};
use crate::domain::DomainError;

/// Builds generation clients from configuration
#[derive(Debug)]
pub struct GenerationClientFactory;

impl GenerationClientFactory {
    /// A registry holding every provider that has an API key configured
    pub fn from_config(config: &ProvidersConfig) -> Result<ProviderRegistry, DomainError> {
        let mut registry = ProviderRegistry::new();

        if let Some(openai) = enabled(&config.openai) {
            registry.register(Self::create_openai(openai)?);
        }

        if let Some(anthropic) = enabled(&config.anthropic) {
            registry.register(Self::create_anthropic(anthropic)?);
        }

        if let Some(gemini) = enabled(&config.gemini) {
            registry.register(Self::create_gemini(gemini)?);
        }

        info!(providers = ?registry.provider_names(), "Generation providers configured");
        Ok(registry)
    }

    pub fn create_openai(config: &ProviderConfig) -> Result<Arc<dyn GenerationClient>, DomainError> {
        let http = HttpClient::with_timeout(config.timeout())?;

        let client: Arc<dyn GenerationClient> = match config.base_url {
            Some(ref base_url) => Arc::new(OpenAiClient::with_base_url(http, &config.api_key, base_url)),
            None => Arc::new(OpenAiClient::new(http, &config.api_key)),
        };

        Ok(client)
    }

    pub fn create_anthropic(
        config: &ProviderConfig,
    ) -> Result<Arc<dyn GenerationClient>, DomainError> {
        let http = HttpClient::with_timeout(config.timeout())?;

        let client: Arc<dyn GenerationClient> = match config.base_url {
            Some(ref base_url) => {
                Arc::new(AnthropicClient::with_base_url(http, &config.api_key, base_url))
            }
            None => Arc::new(AnthropicClient::new(http, &config.api_key)),
        };

        Ok(client)
    }

    pub fn create_gemini(config: &ProviderConfig) -> Result<Arc<dyn GenerationClient>, DomainError> {
        let http = HttpClient::with_timeout(config.timeout())?;

        let client: Arc<dyn GenerationClient> = match config.base_url {
            Some(ref base_url) => Arc::new(GeminiClient::with_base_url(http, &config.api_key, base_url)),
            None => Arc::new(GeminiClient::new(http, &config.api_key)),
        };

        Ok(client)
    }
}

fn enabled(config: &Option<ProviderConfig>) -> Option<&ProviderConfig> {
    match config {
        Some(provider) if provider.is_enabled() => Some(provider),
        Some(_) => {
            debug!("Skipping provider without API key");
            None
        }
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_skips_providers_without_key() {
        let config = ProvidersConfig {
            openai: Some(ProviderConfig::new("sk-test")),
            anthropic: Some(ProviderConfig::new("  ")),
            gemini: Some(ProviderConfig::new("g-key").with_base_url("http://localhost:9000")),
        };

        let registry = GenerationClientFactory::from_config(&config).unwrap();

        assert_eq!(registry.provider_names(), vec!["gemini", "openai"]);
        assert!(!registry.contains("anthropic"));
    }

    #[test]
    fn test_empty_config_gives_empty_registry() {
        let registry = GenerationClientFactory::from_config(&ProvidersConfig::default()).unwrap();
        assert!(registry.is_empty());
    }
}
