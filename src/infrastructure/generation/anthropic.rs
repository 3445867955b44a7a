use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::http_client::HttpClientTrait;
use crate::domain::generation::{
    AnthropicOptions, GenerationClient, GenerationResponse, ProviderOptions, SystemPrompt, Usage,
    ANTHROPIC_PROVIDER,
};
use crate::domain::DomainError;

const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic messages API adapter
#[derive(Debug)]
pub struct AnthropicClient<C: HttpClientTrait> {
    client: C,
    api_key: String,
    base_url: String,
}

impl<C: HttpClientTrait> AnthropicClient<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_ANTHROPIC_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client,
            api_key: api_key.into(),
            base_url,
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    fn build_request(&self, prompt: &str, options: &AnthropicOptions) -> serde_json::Value {
        let common = &options.common;

        let mut body = json!({
            "model": common.model,
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": common.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        });

        // Multi-part system prompts map onto text content blocks
        match common.system_prompt {
            Some(SystemPrompt::Text(ref text)) => {
                body["system"] = json!(text);
            }
            Some(SystemPrompt::Blocks(ref blocks)) => {
                let blocks: Vec<serde_json::Value> = blocks
                    .iter()
                    .map(|text| json!({"type": "text", "text": text}))
                    .collect();
                body["system"] = json!(blocks);
            }
            None => {}
        }

        if let Some(temp) = common.temperature {
            body["temperature"] = json!(temp);
        }

        if let Some(top_p) = options.top_p {
            body["top_p"] = json!(top_p);
        }

        body
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("x-api-key", self.api_key.as_str()),
            ("anthropic-version", ANTHROPIC_VERSION),
            ("Content-Type", "application/json"),
        ]
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<GenerationResponse, DomainError> {
        let response: AnthropicResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider(ANTHROPIC_PROVIDER, format!("Failed to parse response: {}", e))
        })?;

        let text = response
            .content
            .into_iter()
            .filter_map(|block| {
                if block.content_type == "text" {
                    block.text
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("");

        let mut generation = GenerationResponse::new(text)
            .with_metadata("id", response.id)
            .with_metadata("model", response.model)
            .with_usage(&Usage::new(
                response.usage.input_tokens,
                response.usage.output_tokens,
            ));

        if let Some(reason) = response.stop_reason {
            generation = generation.with_metadata("finish_reason", reason);
        }

        Ok(generation)
    }
}

#[async_trait]
impl<C: HttpClientTrait> GenerationClient for AnthropicClient<C> {
    async fn generate(
        &self,
        prompt: &str,
        options: &ProviderOptions,
    ) -> Result<GenerationResponse, DomainError> {
        let ProviderOptions::Anthropic(options) = options else {
            return Err(DomainError::configuration(format!(
                "Anthropic client received options for provider '{}'",
                options.provider_name()
            )));
        };

        let url = self.messages_url();
        let body = self.build_request(prompt, options);
        let response = self
            .client
            .post_json(&url, self.headers(), &body)
            .await?;

        self.parse_response(response)
    }

    fn provider_name(&self) -> &str {
        ANTHROPIC_PROVIDER
    }
}

// Anthropic API types

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    id: String,
    model: String,
    content: Vec<AnthropicContentBlock>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::generation::http_client::mock::MockHttpClient;
    use std::sync::Arc;

    const TEST_URL: &str = "https://api.anthropic.com/v1/messages";

    fn message(text: &str) -> serde_json::Value {
        json!({
            "id": "msg_123",
            "type": "message",
            "role": "assistant",
            "model": "claude-sonnet-4-5",
            "content": [
                { "type": "text", "text": text }
            ],
            "stop_reason": "end_turn",
            "usage": { "input_tokens": 10, "output_tokens": 5 }
        })
    }

    #[tokio::test]
    async fn test_anthropic_generate_with_system_blocks() {
        let http = Arc::new(MockHttpClient::new().with_response(TEST_URL, message("Skills: Go")));
        let client = AnthropicClient::new(http.clone(), "test-api-key");

        let options = ProviderOptions::anthropic("claude-sonnet-4-5").with_system_prompt(vec![
            "You extract skills.".to_string(),
            "Reply as a list.".to_string(),
        ]);

        let response = client.generate("Job: Go engineer", &options).await.unwrap();

        assert_eq!(response.text, "Skills: Go");
        assert_eq!(response.metadata_value("finish_reason"), Some(&json!("end_turn")));
        assert_eq!(response.usage(), Some(Usage::new(10, 5)));

        let body = http.last_body().unwrap();
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["system"][0]["type"], "text");
        assert_eq!(body["system"][1]["text"], "Reply as a list.");
        assert_eq!(body["messages"][0]["content"], "Job: Go engineer");
    }

    #[tokio::test]
    async fn test_anthropic_plain_system_prompt() {
        let http = Arc::new(MockHttpClient::new().with_response(TEST_URL, message("ok")));
        let client = AnthropicClient::new(http.clone(), "key");

        let options = ProviderOptions::anthropic("claude-sonnet-4-5")
            .with_system_prompt("Be brief.")
            .with_max_tokens(256);
        client.generate("Hi", &options).await.unwrap();

        let body = http.last_body().unwrap();
        assert_eq!(body["system"], "Be brief.");
        assert_eq!(body["max_tokens"], 256);
    }

    #[tokio::test]
    async fn test_anthropic_error_handling() {
        let client = AnthropicClient::new(
            MockHttpClient::new().with_error(TEST_URL, "HTTP 401: invalid x-api-key"),
            "bad",
        );

        let result = client
            .generate("Hi", &ProviderOptions::anthropic("claude-sonnet-4-5"))
            .await;
        assert!(result.is_err());
    }
}
