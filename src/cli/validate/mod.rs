//! Validate command - static checks and batch preview

use std::path::PathBuf;

use clap::Args;

use super::{load_inputs, load_workflow};
use crate::domain::workflow::WorkflowDefinition;

/// Arguments for the validate command
#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// Workflow definition (.toml or .json)
    #[arg(long, short = 'w')]
    pub workflow: PathBuf,

    /// Optional inputs file, used to flag placeholders nothing will provide
    #[arg(long, short = 'i')]
    pub inputs: Option<PathBuf>,
}

/// Validate a workflow file and print its static batch layering
pub async fn run(args: ValidateArgs) -> anyhow::Result<()> {
    let definition = load_workflow(&args.workflow)?;

    let input_names: Vec<String> = match args.inputs {
        Some(ref path) => load_inputs(path)?.into_keys().collect(),
        None => Vec::new(),
    };

    print!("{}", render_preview(&definition, &input_names, args.inputs.is_some()));
    Ok(())
}

fn render_preview(definition: &WorkflowDefinition, input_names: &[String], lint: bool) -> String {
    let batches = definition.topological_batches();
    let mut out = format!(
        "Workflow '{}' is valid: {} steps in {} batches\n",
        definition.name().unwrap_or("unnamed"),
        definition.len(),
        batches.len()
    );

    for (index, batch) in batches.iter().enumerate() {
        out.push_str(&format!("  batch {}: {}\n", index, batch.join(", ")));
    }

    let providers: Vec<&str> = definition.required_providers().into_iter().collect();
    out.push_str(&format!("Providers: {}\n", providers.join(", ")));

    if lint {
        for warning in definition.lint_placeholders(input_names) {
            out.push_str(&format!("warning: {}\n", warning));
        }
    }

    out
}
