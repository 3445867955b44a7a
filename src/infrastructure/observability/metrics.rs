//! Prometheus metrics for workflow runs

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::domain::workflow::StepStatus;

/// Handle onto the installed Prometheus recorder
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    /// Current metrics in the Prometheus text exposition format
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Install the global Prometheus recorder
pub fn init_metrics() -> Option<PrometheusMetrics> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            gauge!("resume_tailor_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
            tracing::info!("Prometheus metrics recorder installed");

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

/// Record one executed step
pub fn record_step_execution(params: StepMetricParams) {
    let labels = [
        ("provider", params.provider.to_string()),
        ("status", params.status.as_str().to_string()),
    ];

    counter!("workflow_steps_total", &labels).increment(1);
    histogram!("workflow_step_duration_seconds", &labels).record(params.duration.as_secs_f64());
}

/// Parameters for step metrics
pub struct StepMetricParams<'a> {
    pub provider: &'a str,
    pub status: StepStatus,
    pub duration: Duration,
}

pub fn record_batch(size: usize) {
    counter!("workflow_batches_total").increment(1);
    histogram!("workflow_batch_size").record(size as f64);
}

/// Record a finished run; `blocked` counts steps that never became ready
pub fn record_workflow_run(success: bool, blocked: usize, duration: Duration) {
    let status = if success { "success" } else { "incomplete" };

    counter!("workflow_runs_total", "status" => status).increment(1);
    histogram!("workflow_run_duration_seconds", "status" => status)
        .record(duration.as_secs_f64());

    if blocked > 0 {
        counter!("workflow_blocked_steps_total").increment(blocked as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_step_execution(StepMetricParams {
            provider: "openai",
            status: StepStatus::Success,
            duration: Duration::from_millis(120),
        });
        record_batch(3);
        record_workflow_run(false, 2, Duration::from_secs(1));
    }
}
