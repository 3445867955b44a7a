//! Provider-specific generation options
//!
//! Every provider accepts the common set (`model`, `temperature`, `max_tokens`,
//! `system_prompt`); each variant adds the knobs only its provider understands.

use serde::{Deserialize, Serialize};

pub const OPENAI_PROVIDER: &str = "openai";
pub const ANTHROPIC_PROVIDER: &str = "anthropic";
pub const GEMINI_PROVIDER: &str = "gemini";

/// System prompt as a single string or as ordered text blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SystemPrompt {
    Text(String),
    Blocks(Vec<String>),
}

impl SystemPrompt {
    /// All text blocks in order (a single block for `Text`)
    pub fn blocks(&self) -> Vec<&str> {
        match self {
            Self::Text(text) => vec![text.as_str()],
            Self::Blocks(blocks) => blocks.iter().map(String::as_str).collect(),
        }
    }

    /// Blocks joined with blank lines, for providers without multi-part support
    pub fn joined(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Blocks(blocks) => blocks.join("\n\n"),
        }
    }

    /// Map every block, keeping the shape
    pub fn try_map<E>(&self, mut f: impl FnMut(&str) -> Result<String, E>) -> Result<Self, E> {
        match self {
            Self::Text(text) => Ok(Self::Text(f(text)?)),
            Self::Blocks(blocks) => Ok(Self::Blocks(
                blocks
                    .iter()
                    .map(|block| f(block))
                    .collect::<Result<Vec<_>, E>>()?,
            )),
        }
    }
}

impl From<&str> for SystemPrompt {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SystemPrompt {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for SystemPrompt {
    fn from(value: Vec<String>) -> Self {
        Self::Blocks(value)
    }
}

/// Options every provider accepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonOptions {
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<SystemPrompt>,
}

impl CommonOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: None,
            max_tokens: None,
            system_prompt: None,
        }
    }
}

/// OpenAI response format hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    Text,
    JsonObject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiOptions {
    #[serde(flatten)]
    pub common: CommonOptions,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnthropicOptions {
    #[serde(flatten)]
    pub common: CommonOptions,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeminiOptions {
    #[serde(flatten)]
    pub common: CommonOptions,

    /// e.g. `application/json` for structured output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
}

/// Options for a provider registered under an arbitrary name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomOptions {
    pub name: String,

    #[serde(flatten)]
    pub common: CommonOptions,
}

/// Provider selection plus that provider's option shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum ProviderOptions {
    #[serde(rename = "openai")]
    OpenAi(OpenAiOptions),
    Anthropic(AnthropicOptions),
    Gemini(GeminiOptions),
    Custom(CustomOptions),
}

impl ProviderOptions {
    pub fn openai(model: impl Into<String>) -> Self {
        Self::OpenAi(OpenAiOptions {
            common: CommonOptions::new(model),
            response_format: None,
        })
    }

    pub fn anthropic(model: impl Into<String>) -> Self {
        Self::Anthropic(AnthropicOptions {
            common: CommonOptions::new(model),
            top_p: None,
        })
    }

    pub fn gemini(model: impl Into<String>) -> Self {
        Self::Gemini(GeminiOptions {
            common: CommonOptions::new(model),
            response_mime_type: None,
        })
    }

    pub fn custom(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self::Custom(CustomOptions {
            name: name.into(),
            common: CommonOptions::new(model),
        })
    }

    /// Registry key of the provider these options target
    pub fn provider_name(&self) -> &str {
        match self {
            Self::OpenAi(_) => OPENAI_PROVIDER,
            Self::Anthropic(_) => ANTHROPIC_PROVIDER,
            Self::Gemini(_) => GEMINI_PROVIDER,
            Self::Custom(options) => &options.name,
        }
    }

    pub fn common(&self) -> &CommonOptions {
        match self {
            Self::OpenAi(options) => &options.common,
            Self::Anthropic(options) => &options.common,
            Self::Gemini(options) => &options.common,
            Self::Custom(options) => &options.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut CommonOptions {
        match self {
            Self::OpenAi(options) => &mut options.common,
            Self::Anthropic(options) => &mut options.common,
            Self::Gemini(options) => &mut options.common,
            Self::Custom(options) => &mut options.common,
        }
    }

    pub fn model(&self) -> &str {
        &self.common().model
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.common_mut().temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.common_mut().max_tokens = Some(max_tokens);
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<SystemPrompt>) -> Self {
        self.common_mut().system_prompt = Some(system_prompt.into());
        self
    }

    /// Ask for JSON output using whatever hint the provider supports
    pub fn with_json_output(mut self) -> Self {
        match &mut self {
            Self::OpenAi(options) => options.response_format = Some(ResponseFormat::JsonObject),
            Self::Gemini(options) => {
                options.response_mime_type = Some("application/json".to_string())
            }
            Self::Anthropic(_) | Self::Custom(_) => {}
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_names() {
        assert_eq!(ProviderOptions::openai("gpt-4o").provider_name(), "openai");
        assert_eq!(
            ProviderOptions::anthropic("claude-sonnet-4-5").provider_name(),
            "anthropic"
        );
        assert_eq!(ProviderOptions::gemini("gemini-2.0-flash").provider_name(), "gemini");
        assert_eq!(ProviderOptions::custom("echo", "echo-1").provider_name(), "echo");
    }

    #[test]
    fn test_builder_sets_common_options() {
        let options = ProviderOptions::anthropic("claude-sonnet-4-5")
            .with_temperature(0.3)
            .with_max_tokens(2048)
            .with_system_prompt("You are a resume writer.");

        let common = options.common();
        assert_eq!(common.model, "claude-sonnet-4-5");
        assert_eq!(common.temperature, Some(0.3));
        assert_eq!(common.max_tokens, Some(2048));
        assert_eq!(
            common.system_prompt,
            Some(SystemPrompt::Text("You are a resume writer.".to_string()))
        );
    }

    #[test]
    fn test_json_output_hint_per_provider() {
        match ProviderOptions::openai("gpt-4o").with_json_output() {
            ProviderOptions::OpenAi(o) => {
                assert_eq!(o.response_format, Some(ResponseFormat::JsonObject))
            }
            other => panic!("unexpected options: {:?}", other),
        }

        match ProviderOptions::gemini("gemini-2.0-flash").with_json_output() {
            ProviderOptions::Gemini(o) => {
                assert_eq!(o.response_mime_type.as_deref(), Some("application/json"))
            }
            other => panic!("unexpected options: {:?}", other),
        }

        let anthropic = ProviderOptions::anthropic("claude").with_json_output();
        assert_eq!(anthropic, ProviderOptions::anthropic("claude"));
    }

    #[test]
    fn test_deserialize_tagged_options() {
        let json = serde_json::json!({
            "provider": "openai",
            "model": "gpt-4o-mini",
            "temperature": 0.5,
            "response_format": "json_object"
        });

        let options: ProviderOptions = serde_json::from_value(json).unwrap();
        assert_eq!(options.provider_name(), "openai");
        assert_eq!(options.model(), "gpt-4o-mini");
        assert_eq!(options.common().temperature, Some(0.5));
    }

    #[test]
    fn test_deserialize_custom_and_block_system_prompt() {
        let json = serde_json::json!({
            "provider": "custom",
            "name": "local-llm",
            "model": "llama",
            "system_prompt": ["Be concise.", "Use active voice."]
        });

        let options: ProviderOptions = serde_json::from_value(json).unwrap();
        assert_eq!(options.provider_name(), "local-llm");
        let system = options.common().system_prompt.clone().unwrap();
        assert_eq!(system.blocks(), vec!["Be concise.", "Use active voice."]);
        assert_eq!(system.joined(), "Be concise.\n\nUse active voice.");
    }

    #[test]
    fn test_system_prompt_try_map_keeps_shape() {
        let blocks = SystemPrompt::Blocks(vec!["a".to_string(), "b".to_string()]);
        let mapped: SystemPrompt = blocks
            .try_map(|b| Ok::<_, ()>(b.to_uppercase()))
            .unwrap();
        assert_eq!(
            mapped,
            SystemPrompt::Blocks(vec!["A".to_string(), "B".to_string()])
        );
    }
}
