//! Prompt interpolation
//!
//! Placeholders use `{identifier}` syntax and resolve against the context:
//! named inputs first, then step results keyed by step id. Every placeholder
//! must resolve; there are no optional placeholders and no escape sequence,
//! so a template cannot contain a literal `{word}`.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use super::context::{value_to_string, WorkflowContext};
use super::entity::WorkflowStepDefinition;
use super::error::StepError;

/// Matches `{name}`; the name is everything up to the closing brace
static PLACEHOLDER_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^}]+)\}").unwrap());

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TemplateError {
    #[error("Missing required variable: {name}")]
    MissingVariable { name: String },
}

/// Names referenced by a template, trimmed and deduplicated
pub fn required_variables(template: &str) -> BTreeSet<String> {
    PLACEHOLDER_PATTERN
        .captures_iter(template)
        .filter_map(|caps| caps.get(1))
        .map(|name| name.as_str().trim().to_string())
        .collect()
}

/// Substitute every placeholder with its context value
pub fn interpolate(template: &str, context: &WorkflowContext) -> Result<String, TemplateError> {
    let mut rendered = String::with_capacity(template.len());
    let mut last = 0;

    for caps in PLACEHOLDER_PATTERN.captures_iter(template) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let name = name.as_str().trim();

        let value = context
            .lookup(name)
            .ok_or_else(|| TemplateError::MissingVariable {
                name: name.to_string(),
            })?;

        rendered.push_str(&template[last..whole.start()]);
        rendered.push_str(&value_to_string(value));
        last = whole.end();
    }

    rendered.push_str(&template[last..]);
    Ok(rendered)
}

/// Check that every placeholder in the step's prompt and system prompt
/// resolves against `context`. Reports the first missing name in sorted order.
pub fn validate_step(
    step: &WorkflowStepDefinition,
    context: &WorkflowContext,
) -> Result<(), StepError> {
    match step
        .required_variables()
        .into_iter()
        .find(|name| context.lookup(name).is_none())
    {
        Some(missing) => Err(StepError::missing_variable(step.id(), missing)),
        None => Ok(()),
    }
}
