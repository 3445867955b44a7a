use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::http_client::HttpClientTrait;
use crate::domain::generation::{
    GenerationClient, GenerationResponse, OpenAiOptions, ProviderOptions, ResponseFormat, Usage,
    OPENAI_PROVIDER,
};
use crate::domain::DomainError;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// OpenAI chat completions adapter
#[derive(Debug)]
pub struct OpenAiClient<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
}

impl<C: HttpClientTrait> OpenAiClient<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_OPENAI_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let auth_header = format!("Bearer {}", api_key.into());
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client,
            auth_header,
            base_url,
        }
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn build_request(&self, prompt: &str, options: &OpenAiOptions) -> serde_json::Value {
        let common = &options.common;
        let mut messages = Vec::new();

        if let Some(ref system) = common.system_prompt {
            messages.push(json!({"role": "system", "content": system.joined()}));
        }
        messages.push(json!({"role": "user", "content": prompt}));

        let mut body = json!({
            "model": common.model,
            "messages": messages,
        });

        if let Some(temp) = common.temperature {
            body["temperature"] = json!(temp);
        }

        if let Some(max_tokens) = common.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        match options.response_format {
            Some(ResponseFormat::JsonObject) => {
                body["response_format"] = json!({"type": "json_object"});
            }
            Some(ResponseFormat::Text) => {
                body["response_format"] = json!({"type": "text"});
            }
            None => {}
        }

        body
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<GenerationResponse, DomainError> {
        let response: OpenAiResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider(OPENAI_PROVIDER, format!("Failed to parse response: {}", e))
        })?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::provider(OPENAI_PROVIDER, "No choices in response"))?;

        let mut generation = GenerationResponse::new(choice.message.content.unwrap_or_default())
            .with_metadata("id", response.id)
            .with_metadata("model", response.model);

        if let Some(reason) = choice.finish_reason {
            generation = generation.with_metadata("finish_reason", reason);
        }

        if let Some(usage) = response.usage {
            generation =
                generation.with_usage(&Usage::new(usage.prompt_tokens, usage.completion_tokens));
        }

        Ok(generation)
    }
}

#[async_trait]
impl<C: HttpClientTrait> GenerationClient for OpenAiClient<C> {
    async fn generate(
        &self,
        prompt: &str,
        options: &ProviderOptions,
    ) -> Result<GenerationResponse, DomainError> {
        let ProviderOptions::OpenAi(options) = options else {
            return Err(DomainError::configuration(format!(
                "OpenAI client received options for provider '{}'",
                options.provider_name()
            )));
        };

        let url = self.chat_completions_url();
        let body = self.build_request(prompt, options);
        let response = self
            .client
            .post_json(&url, self.headers(), &body)
            .await?;

        self.parse_response(response)
    }

    fn provider_name(&self) -> &str {
        OPENAI_PROVIDER
    }
}

// OpenAI API types

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    id: String,
    model: String,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
