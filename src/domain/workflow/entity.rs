//! Workflow step and definition entities

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::WorkflowError;
use super::template;
use super::transform::StepTransform;
use crate::domain::generation::{ProviderOptions, SystemPrompt};

/// Maximum length for step IDs
pub const MAX_STEP_ID_LENGTH: usize = 64;

/// Step ids double as placeholder names, so no braces or whitespace
static STEP_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_][a-zA-Z0-9_.-]*$").unwrap());

/// Validate a step ID string
pub fn validate_step_id(id: &str) -> Result<(), WorkflowError> {
    if id.is_empty() {
        return Err(WorkflowError::validation("Step ID cannot be empty"));
    }

    if id.len() > MAX_STEP_ID_LENGTH {
        return Err(WorkflowError::validation(format!(
            "Step ID '{}' exceeds maximum length of {} characters",
            id, MAX_STEP_ID_LENGTH
        )));
    }

    if !STEP_ID_PATTERN.is_match(id) {
        return Err(WorkflowError::validation(format!(
            "Invalid step ID '{}': must be alphanumeric with '_', '-' or '.'",
            id
        )));
    }

    Ok(())
}

/// One named unit of work producing a single generation result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStepDefinition {
    id: String,

    /// Prompt template with `{placeholder}` references
    prompt: String,

    /// Optional system prompt template (string or ordered blocks)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    system_prompt: Option<SystemPrompt>,

    /// Provider selection and provider-specific options
    options: ProviderOptions,

    /// Steps that must succeed before this one is eligible
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    dependencies: BTreeSet<String>,

    #[serde(default)]
    transform: StepTransform,

    /// Expose the result to a later consuming stage (e.g. document assembly)
    #[serde(default)]
    marked_for_downstream_use: bool,
}

impl WorkflowStepDefinition {
    pub fn new(id: impl Into<String>, prompt: impl Into<String>, options: ProviderOptions) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            system_prompt: None,
            options,
            dependencies: BTreeSet::new(),
            transform: StepTransform::default(),
            marked_for_downstream_use: false,
        }
    }

    pub fn with_dependency(mut self, step_id: impl Into<String>) -> Self {
        self.dependencies.insert(step_id.into());
        self
    }

    pub fn with_dependencies<I, S>(mut self, step_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies
            .extend(step_ids.into_iter().map(Into::into));
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<SystemPrompt>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_transform(mut self, transform: StepTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn marked_for_downstream_use(mut self) -> Self {
        self.marked_for_downstream_use = true;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn prompt_template(&self) -> &str {
        &self.prompt
    }

    /// The step's own system prompt, else the one carried in its options
    pub fn system_prompt_template(&self) -> Option<&SystemPrompt> {
        self.system_prompt
            .as_ref()
            .or(self.options.common().system_prompt.as_ref())
    }

    pub fn options(&self) -> &ProviderOptions {
        &self.options
    }

    /// Registry key of the provider this step calls
    pub fn provider(&self) -> &str {
        self.options.provider_name()
    }

    pub fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }

    pub fn transform(&self) -> &StepTransform {
        &self.transform
    }

    pub fn is_marked_for_downstream_use(&self) -> bool {
        self.marked_for_downstream_use
    }

    /// Every placeholder referenced by the prompt and system prompt
    pub fn required_variables(&self) -> BTreeSet<String> {
        let mut vars = template::required_variables(&self.prompt);

        if let Some(system) = self.system_prompt_template() {
            for block in system.blocks() {
                vars.extend(template::required_variables(block));
            }
        }

        vars
    }
}

/// A placeholder that names neither an input nor an ancestor step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderWarning {
    pub step: String,
    pub variable: String,
}

impl fmt::Display for PlaceholderWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "step '{}' references '{{{}}}' which is neither an input nor an ancestor step",
            self.step, self.variable
        )
    }
}

/// A validated set of steps forming a DAG
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawWorkflowDefinition", into = "RawWorkflowDefinition")]
pub struct WorkflowDefinition {
    name: Option<String>,
    steps: Vec<WorkflowStepDefinition>,
    index: HashMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawWorkflowDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default)]
    steps: Vec<WorkflowStepDefinition>,
}

impl TryFrom<RawWorkflowDefinition> for WorkflowDefinition {
    type Error = WorkflowError;

    fn try_from(raw: RawWorkflowDefinition) -> Result<Self, Self::Error> {
        let definition = Self::new(raw.steps)?;
        Ok(match raw.name {
            Some(name) => definition.with_name(name),
            None => definition,
        })
    }
}

impl From<WorkflowDefinition> for RawWorkflowDefinition {
    fn from(definition: WorkflowDefinition) -> Self {
        Self {
            name: definition.name,
            steps: definition.steps,
        }
    }
}

impl WorkflowDefinition {
    /// Validate a step list: unique well-formed ids, known dependencies, no cycles
    pub fn new(steps: Vec<WorkflowStepDefinition>) -> Result<Self, WorkflowError> {
        let mut index = HashMap::with_capacity(steps.len());

        for (position, step) in steps.iter().enumerate() {
            validate_step_id(step.id())?;

            if index.insert(step.id().to_string(), position).is_some() {
                return Err(WorkflowError::duplicate_step(step.id()));
            }
        }

        for step in &steps {
            for dependency in step.dependencies() {
                if !index.contains_key(dependency) {
                    return Err(WorkflowError::unknown_dependency(step.id(), dependency));
                }
            }
        }

        let definition = Self {
            name: None,
            steps,
            index,
        };

        let cyclic = definition.cyclic_steps();
        if !cyclic.is_empty() {
            return Err(WorkflowError::circular_dependency(cyclic));
        }

        Ok(definition)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn steps(&self) -> &[WorkflowStepDefinition] {
        &self.steps
    }

    pub fn step(&self, id: &str) -> Option<&WorkflowStepDefinition> {
        self.index.get(id).map(|&position| &self.steps[position])
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps that list `id` as a direct dependency, in declaration order
    pub fn dependents_of(&self, id: &str) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|step| step.dependencies().contains(id))
            .map(WorkflowStepDefinition::id)
            .collect()
    }

    /// Provider names used by any step
    pub fn required_providers(&self) -> BTreeSet<&str> {
        self.steps.iter().map(WorkflowStepDefinition::provider).collect()
    }

    /// Transitive dependencies of a step
    pub fn ancestors_of(&self, id: &str) -> BTreeSet<String> {
        let mut ancestors = BTreeSet::new();
        let mut stack: Vec<&str> = vec![id];

        while let Some(current) = stack.pop() {
            if let Some(step) = self.step(current) {
                for dependency in step.dependencies() {
                    if ancestors.insert(dependency.clone()) {
                        stack.push(dependency);
                    }
                }
            }
        }

        ancestors
    }

    /// Static layering by longest dependency path; batch `n` holds steps
    /// whose dependencies all sit in batches `< n`.
    pub fn topological_batches(&self) -> Vec<Vec<String>> {
        let mut remaining: Vec<&WorkflowStepDefinition> = self.steps.iter().collect();
        let mut placed: HashSet<&str> = HashSet::new();
        let mut batches = Vec::new();

        while !remaining.is_empty() {
            let (ready, blocked): (Vec<_>, Vec<_>) = remaining.into_iter().partition(|step| {
                step.dependencies()
                    .iter()
                    .all(|dependency| placed.contains(dependency.as_str()))
            });

            if ready.is_empty() {
                break;
            }

            placed.extend(ready.iter().map(|step| step.id()));
            batches.push(ready.iter().map(|step| step.id().to_string()).collect());
            remaining = blocked;
        }

        batches
    }

    /// Placeholders that cannot be satisfied by `input_names` or by an
    /// ancestor's result. Runtime validation stays authoritative; a step may
    /// still read a non-ancestor that happened to finish in an earlier batch.
    pub fn lint_placeholders<S: AsRef<str>>(&self, input_names: &[S]) -> Vec<PlaceholderWarning> {
        let inputs: HashSet<&str> = input_names.iter().map(AsRef::as_ref).collect();
        let mut warnings = Vec::new();

        for step in &self.steps {
            let ancestors = self.ancestors_of(step.id());

            for variable in step.required_variables() {
                if !inputs.contains(variable.as_str()) && !ancestors.contains(&variable) {
                    warnings.push(PlaceholderWarning {
                        step: step.id().to_string(),
                        variable,
                    });
                }
            }
        }

        warnings
    }

    /// Steps on (or between) dependency cycles, in declaration order
    fn cyclic_steps(&self) -> Vec<String> {
        // Kahn's algorithm over dependencies
        let mut in_degree: HashMap<&str, usize> = self
            .steps
            .iter()
            .map(|step| (step.id(), step.dependencies().len()))
            .collect();
        let mut queue: VecDeque<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| *id)
            .collect();

        while let Some(id) = queue.pop_front() {
            in_degree.remove(id);
            for dependent in self.dependents_of(id) {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(dependent);
                    }
                }
            }
        }

        if in_degree.is_empty() {
            return Vec::new();
        }

        // Drop steps that merely hang off a cycle: repeatedly remove any
        // leftover step that no other leftover step depends on
        let mut leftover: HashSet<&str> = in_degree.keys().copied().collect();
        loop {
            let sinks: Vec<&str> = leftover
                .iter()
                .copied()
                .filter(|id| {
                    !leftover.iter().any(|other| {
                        self.step(other)
                            .is_some_and(|step| step.dependencies().contains(*id))
                    })
                })
                .collect();

            if sinks.is_empty() {
                break;
            }
            for sink in sinks {
                leftover.remove(sink);
            }
        }

        self.steps
            .iter()
            .map(WorkflowStepDefinition::id)
            .filter(|id| leftover.contains(id))
            .map(str::to_string)
            .collect()
    }
}
