//! Observability infrastructure - Metrics

mod metrics;

pub use self::metrics::{
    init_metrics, record_batch, record_step_execution, record_workflow_run, PrometheusMetrics,
    StepMetricParams,
};
