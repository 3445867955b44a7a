//! Post-processing of raw generation output into a step's final result

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::context::WorkflowContext;
use crate::domain::generation::GenerationResponse;

pub type TransformFn =
    dyn Fn(&GenerationResponse, &WorkflowContext) -> Result<Value, String> + Send + Sync;

/// Named transforms available to declarative workflow files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    #[default]
    Identity,
    Json,
    Trim,
}

/// Maps a raw response (plus the context snapshot) to the stored result
#[derive(Clone, Default)]
pub enum StepTransform {
    /// The raw text as a JSON string
    #[default]
    Identity,
    /// Parse the text as JSON, tolerating a Markdown code fence
    Json,
    /// The text with surrounding whitespace removed
    Trim,
    Custom(Arc<TransformFn>),
}

impl StepTransform {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&GenerationResponse, &WorkflowContext) -> Result<Value, String>
            + Send
            + Sync
            + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    pub fn apply(
        &self,
        response: &GenerationResponse,
        context: &WorkflowContext,
    ) -> Result<Value, String> {
        match self {
            Self::Identity => Ok(Value::String(response.text.clone())),
            Self::Trim => Ok(Value::String(response.text.trim().to_string())),
            Self::Json => serde_json::from_str(strip_json_fences(&response.text))
                .map_err(|e| format!("Invalid JSON output: {}", e)),
            Self::Custom(f) => f(response, context),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Json => "json",
            Self::Trim => "trim",
            Self::Custom(_) => "custom",
        }
    }
}

impl From<TransformKind> for StepTransform {
    fn from(kind: TransformKind) -> Self {
        match kind {
            TransformKind::Identity => Self::Identity,
            TransformKind::Json => Self::Json,
            TransformKind::Trim => Self::Trim,
        }
    }
}

impl fmt::Debug for StepTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StepTransform::{}", self.kind_name())
    }
}

impl Serialize for StepTransform {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.kind_name())
    }
}

impl<'de> Deserialize<'de> for StepTransform {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        TransformKind::deserialize(deserializer).map(Self::from)
    }
}

/// Strips ```json ... ``` or ``` ... ``` fences from model output
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));

    match inner {
        Some(stripped) => stripped
            .trim_start()
            .strip_suffix("```")
            .unwrap_or(stripped)
            .trim(),
        None => text,
    }
}
