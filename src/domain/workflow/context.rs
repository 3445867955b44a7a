//! Workflow execution context
//!
//! Holds the caller's named inputs (fixed for the whole run) and the final
//! result of every step that has succeeded so far. A context is never
//! mutated while steps read it: the scheduler folds a finished batch into a
//! new context with [`WorkflowContext::with_results`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entity::WorkflowDefinition;
use super::error::WorkflowError;

/// Caller-supplied top-level inputs (job description, work history, ...)
pub type NamedInputs = BTreeMap<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowContext {
    inputs: NamedInputs,

    /// Successful step results keyed by step id
    intermediate_results: BTreeMap<String, Value>,
}

impl WorkflowContext {
    pub fn new(inputs: NamedInputs) -> Self {
        Self {
            inputs,
            intermediate_results: BTreeMap::new(),
        }
    }

    /// Build a context from a JSON object of named inputs
    pub fn from_json(inputs: Value) -> Result<Self, WorkflowError> {
        match inputs {
            Value::Object(map) => Ok(Self::new(map.into_iter().collect())),
            Value::Null => Ok(Self::default()),
            other => Err(WorkflowError::invalid_input(format!(
                "Workflow inputs must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    pub fn inputs(&self) -> &NamedInputs {
        &self.inputs
    }

    pub fn intermediate_results(&self) -> &BTreeMap<String, Value> {
        &self.intermediate_results
    }

    pub fn input(&self, name: &str) -> Option<&Value> {
        self.inputs.get(name)
    }

    pub fn result(&self, step_id: &str) -> Option<&Value> {
        self.intermediate_results.get(step_id)
    }

    /// Resolve a placeholder name: named inputs first, then step results.
    /// `null` counts as undefined.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.inputs
            .get(name)
            .filter(|v| !v.is_null())
            .or_else(|| self.intermediate_results.get(name).filter(|v| !v.is_null()))
    }

    /// New context with the given step results folded in
    pub fn with_results<I>(&self, results: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut next = self.clone();
        next.intermediate_results.extend(results);
        next
    }

    /// Results of the steps flagged for downstream use
    pub fn downstream_results(&self, definition: &WorkflowDefinition) -> BTreeMap<String, Value> {
        definition
            .steps()
            .iter()
            .filter(|step| step.is_marked_for_downstream_use())
            .filter_map(|step| {
                self.intermediate_results
                    .get(step.id())
                    .map(|value| (step.id().to_string(), value.clone()))
            })
            .collect()
    }
}

/// Convert a JSON value to the text substituted into prompts
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),

        // For arrays and objects, use JSON representation
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
