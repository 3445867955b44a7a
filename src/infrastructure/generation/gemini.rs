use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http_client::HttpClientTrait;
use crate::domain::generation::{
    GeminiOptions, GenerationClient, GenerationResponse, ProviderOptions, Usage, GEMINI_PROVIDER,
};
use crate::domain::DomainError;

const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini `generateContent` adapter
#[derive(Debug)]
pub struct GeminiClient<C: HttpClientTrait> {
    client: C,
    api_key: String,
    base_url: String,
}

impl<C: HttpClientTrait> GeminiClient<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_GEMINI_BASE_URL)
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

    fn generate_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    fn build_request(&self, prompt: &str, options: &GeminiOptions) -> GeminiRequest {
        let common = &options.common;

        let system_instruction = common.system_prompt.as_ref().map(|system| GeminiContent {
            role: None,
            parts: system
                .blocks()
                .into_iter()
                .map(|text| GeminiPart {
                    text: text.to_string(),
                })
                .collect(),
        });

        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            system_instruction,
            generation_config: GeminiGenerationConfig {
                temperature: common.temperature,
                max_output_tokens: common.max_tokens,
                response_mime_type: options.response_mime_type.clone(),
            },
        }
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("x-goog-api-key", self.api_key.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<GenerationResponse, DomainError> {
        let response: GeminiResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider(GEMINI_PROVIDER, format!("Failed to parse response: {}", e))
        })?;

        if let Some(error) = response.error {
            return Err(DomainError::provider(
                GEMINI_PROVIDER,
                format!("Gemini API error: {}", error.message),
            ));
        }

        let candidate = response
            .candidates
            .and_then(|c| c.into_iter().next())
            .ok_or_else(|| DomainError::provider(GEMINI_PROVIDER, "No content in response"))?;

        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let mut generation = GenerationResponse::new(text);

        if let Some(model) = response.model_version {
            generation = generation.with_metadata("model", model);
        }

        if let Some(id) = response.response_id {
            generation = generation.with_metadata("id", id);
        }

        if let Some(reason) = candidate.finish_reason {
            generation = generation.with_metadata("finish_reason", reason);
        }

        if let Some(usage) = response.usage_metadata {
            generation = generation.with_usage(&Usage::new(
                usage.prompt_token_count,
                usage.candidates_token_count,
            ));
        }

        Ok(generation)
    }
}

#[async_trait]
impl<C: HttpClientTrait> GenerationClient for GeminiClient<C> {
    async fn generate(
        &self,
        prompt: &str,
        options: &ProviderOptions,
    ) -> Result<GenerationResponse, DomainError> {
        let ProviderOptions::Gemini(options) = options else {
            return Err(DomainError::configuration(format!(
                "Gemini client received options for provider '{}'",
                options.provider_name()
            )));
        };

        let url = self.generate_url(&options.common.model);
        let request = self.build_request(prompt, options);
        let body = serde_json::to_value(&request).map_err(|e| {
            DomainError::internal(format!("Failed to serialize Gemini request: {}", e))
        })?;

        let response = self
            .client
            .post_json(&url, self.headers(), &body)
            .await?;

        self.parse_response(response)
    }

    fn provider_name(&self) -> &str {
        GEMINI_PROVIDER
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    usage_metadata: Option<GeminiUsage>,
    model_version: Option<String>,
    response_id: Option<String>,
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiPartResponse {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}
