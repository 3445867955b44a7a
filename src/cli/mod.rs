//! CLI module for the resume tailoring engine
//!
//! Provides subcommands:
//! - `run`: execute a workflow file against configured providers
//! - `validate`: check a workflow file and preview its batches

pub mod run;
pub mod validate;

use std::path::Path;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::Value;

use crate::config::AppConfig;
use crate::domain::workflow::{NamedInputs, WorkflowContext, WorkflowDefinition};
use crate::infrastructure::logging;

/// Resume tailor - run generation workflows over a job description and work history
#[derive(Parser)]
#[command(name = "resume-tailor")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Execute a workflow and print the resulting context
    Run(run::RunArgs),

    /// Validate a workflow definition without calling any provider
    Validate(validate::ValidateArgs),
}

/// Load a workflow definition from a `.json` or `.toml` file
pub fn load_workflow(path: &Path) -> anyhow::Result<WorkflowDefinition> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read workflow file {}", path.display()))?;

    let definition = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&raw)
            .with_context(|| format!("Invalid workflow definition in {}", path.display()))?,
        Some("toml") => toml::from_str(&raw)
            .with_context(|| format!("Invalid workflow definition in {}", path.display()))?,
        other => bail!(
            "Unsupported workflow file extension {:?}; expected .json or .toml",
            other.unwrap_or("")
        ),
    };

    Ok(definition)
}

/// Load named inputs from a JSON object file
pub fn load_inputs(path: &Path) -> anyhow::Result<NamedInputs> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read inputs file {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("Inputs file {} is not valid JSON", path.display()))?;

    Ok(WorkflowContext::from_json(value)?.inputs().clone())
}

/// Load configuration (after `.env`) and install logging
pub(crate) fn bootstrap() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    logging::init_logging(&config.logging)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("{}-{}", uuid::Uuid::new_v4(), name));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_toml_workflow() {
        let path = write_temp(
            "workflow.toml",
            r#"
            name = "tailor"

            [[steps]]
            id = "summary"
            prompt = "Summarize: {jobDescription}"
            options = { provider = "openai", model = "gpt-4o" }

            [[steps]]
            id = "bullets"
            prompt = "Bullets from {summary}"
            dependencies = ["summary"]
            transform = "trim"
            marked_for_downstream_use = true
            options = { provider = "custom", name = "echo", model = "e" }
            "#,
        );

        let definition = load_workflow(&path).unwrap();

        assert_eq!(definition.name(), Some("tailor"));
        assert_eq!(definition.topological_batches().len(), 2);
        assert_eq!(definition.step("bullets").unwrap().provider(), "echo");
    }

    #[test]
    fn test_demo_workflow_is_valid() {
        let definition = load_workflow(Path::new("demos/tailor_resume.toml")).unwrap();
        let inputs = load_inputs(Path::new("demos/inputs.json")).unwrap();
        let names: Vec<&String> = inputs.keys().collect();

        assert_eq!(
            definition.topological_batches(),
            vec![
                vec!["job_analysis", "history_highlights"],
                vec!["skills_match", "summary"],
                vec!["tailored_bullets"],
            ]
        );
        assert!(definition.lint_placeholders(&names).is_empty());
    }

    #[test]
    fn test_load_workflow_rejects_unknown_extension() {
        let path = write_temp("workflow.yaml", "steps: []");
        assert!(load_workflow(&path).is_err());
    }

    #[test]
    fn test_load_inputs() {
        let path = write_temp("inputs.json", r#"{"jobDescription": "Rust engineer"}"#);
        let inputs = load_inputs(&path).unwrap();
        assert_eq!(inputs["jobDescription"], "Rust engineer");

        let path = write_temp("bad.json", "[1, 2]");
        assert!(load_inputs(&path).is_err());
    }
}
