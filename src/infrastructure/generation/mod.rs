//! Generation provider adapters

mod anthropic;
mod factory;
mod gemini;
pub mod http_client;
mod openai;

pub use anthropic::AnthropicClient;
pub use factory::GenerationClientFactory;
pub use gemini::GeminiClient;
pub use http_client::{HttpClient, HttpClientTrait};
pub use openai::OpenAiClient;
