//! Text-generation capability consumed by workflow steps

mod client;
mod options;
mod registry;
mod response;

pub use client::GenerationClient;
pub use options::{
    AnthropicOptions, CommonOptions, CustomOptions, GeminiOptions, OpenAiOptions,
    ProviderOptions, ResponseFormat, SystemPrompt, ANTHROPIC_PROVIDER, GEMINI_PROVIDER,
    OPENAI_PROVIDER,
};
pub use registry::ProviderRegistry;
pub use response::{GenerationResponse, Usage};

#[cfg(test)]
pub use client::mock::MockGenerationClient;
