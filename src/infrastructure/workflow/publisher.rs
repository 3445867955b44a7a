//! Off-path delivery of step status events

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn, Instrument};

use crate::domain::workflow::{StatusReporter, StepStatusEvent};

/// Queues a run's status events for a background drain task.
///
/// `publish` never waits on the reporter. Events reach the reporter in
/// publish order, each call bounded by `call_timeout`.
#[derive(Debug)]
pub(crate) struct StatusPublisher {
    sender: mpsc::UnboundedSender<StepStatusEvent>,
    drain: JoinHandle<()>,
}

impl StatusPublisher {
    pub(crate) fn spawn(reporter: Arc<dyn StatusReporter>, call_timeout: Duration) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<StepStatusEvent>();

        let drain = tokio::spawn(
            async move {
                while let Some(event) = receiver.recv().await {
                    deliver(reporter.as_ref(), &event, call_timeout).await;
                }
            }
            .in_current_span(),
        );

        Self { sender, drain }
    }

    pub(crate) fn publish(&self, event: StepStatusEvent) {
        if let Err(e) = self.sender.send(event) {
            warn!(step_id = %e.0.step_id, "Status drain stopped, event dropped");
        }
    }

    /// Close the queue and wait at most `grace` for it to empty. Events
    /// still queued after that keep draining in the background.
    pub(crate) async fn finish(self, grace: Duration) -> bool {
        drop(self.sender);

        match tokio::time::timeout(grace, self.drain).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(error = %e, "Status drain task failed");
                false
            }
            Err(_) => {
                debug!(
                    grace_ms = grace.as_millis() as u64,
                    "Status events still pending at run end"
                );
                false
            }
        }
    }
}

async fn deliver(reporter: &dyn StatusReporter, event: &StepStatusEvent, call_timeout: Duration) {
    match tokio::time::timeout(call_timeout, reporter.report(event)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(
            step_id = %event.step_id,
            status = %event.status,
            error = %e,
            "Status reporter failed"
        ),
        Err(_) => warn!(
            step_id = %event.step_id,
            status = %event.status,
            timeout_ms = call_timeout.as_millis() as u64,
            "Status reporter timed out"
        ),
    }
}
