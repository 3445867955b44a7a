//! Run command - executes a workflow and prints the final context

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use serde_json::json;
use tokio_stream::StreamExt;
use tracing::{info, warn};

use super::{bootstrap, load_inputs, load_workflow};
use crate::infrastructure::generation::GenerationClientFactory;
use crate::infrastructure::observability;
use crate::infrastructure::status::{
    ChannelStatusReporter, CompositeStatusReporter, TracingStatusReporter,
};
use crate::infrastructure::workflow::WorkflowEngine;

/// Arguments for the run command
#[derive(Args, Clone)]
pub struct RunArgs {
    /// Workflow definition (.toml or .json)
    #[arg(long, short = 'w')]
    pub workflow: PathBuf,

    /// JSON object of named inputs (job description, work history, ...)
    #[arg(long, short = 'i')]
    pub inputs: PathBuf,

    /// Print Prometheus metrics to stderr after the run
    #[arg(long)]
    pub metrics: bool,
}

/// Run a workflow once
pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = bootstrap()?;
    let metrics = if args.metrics {
        observability::init_metrics()
    } else {
        None
    };

    let definition = load_workflow(&args.workflow)?;
    let inputs = load_inputs(&args.inputs)?;

    let input_names: Vec<&str> = inputs.keys().map(String::as_str).collect();
    for warning in definition.lint_placeholders(&input_names) {
        warn!("{}", warning);
    }

    let registry = GenerationClientFactory::from_config(&config.providers)?;
    let (channel, mut events) = ChannelStatusReporter::channel();
    let reporter = CompositeStatusReporter::new()
        .with(Arc::new(TracingStatusReporter))
        .with(Arc::new(channel));

    let progress = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            eprintln!("[{:>10}] {} (batch {})", event.status, event.step_id, event.batch);
        }
    });

    let engine = WorkflowEngine::new(Arc::new(registry), Arc::new(reporter), &config.engine);
    let report = engine.run_with_report(&definition, inputs).await;

    // Closes the event channel so the progress task can finish
    drop(engine);
    progress.await?;

    let report = report?;
    info!(run_id = %report.run_id, duration_ms = report.duration_ms, "Run finished");

    let output = json!({
        "run_id": report.run_id,
        "results": report.context.intermediate_results(),
        "downstream": report.context.downstream_results(&definition),
        "failures": report.failures,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    if let Some(metrics) = metrics {
        eprintln!("{}", metrics.render());
    }

    report.into_result()?;
    Ok(())
}
