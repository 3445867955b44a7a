use async_trait::async_trait;
use std::fmt::Debug;

use super::{GenerationResponse, ProviderOptions};
use crate::domain::DomainError;

/// A text-generation capability (OpenAI, Anthropic, Gemini, ...)
#[async_trait]
pub trait GenerationClient: Send + Sync + Debug {
    /// Generate text for a fully interpolated prompt
    async fn generate(
        &self,
        prompt: &str,
        options: &ProviderOptions,
    ) -> Result<GenerationResponse, DomainError>;

    /// Registry key for this client
    fn provider_name(&self) -> &str;
}
