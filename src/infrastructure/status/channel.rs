//! Status events as an async stream

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::domain::workflow::{StatusReporter, StepStatusEvent};
use crate::domain::DomainError;

/// Publishes every event onto an unbounded channel.
///
/// Sending never waits on the consumer. Once the receiving stream is
/// dropped, reports fail and the engine logs and ignores them.
#[derive(Debug, Clone)]
pub struct ChannelStatusReporter {
    sender: mpsc::UnboundedSender<StepStatusEvent>,
}

impl ChannelStatusReporter {
    /// A reporter and the stream of events it publishes
    pub fn channel() -> (Self, UnboundedReceiverStream<StepStatusEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, UnboundedReceiverStream::new(receiver))
    }
}

#[async_trait]
impl StatusReporter for ChannelStatusReporter {
    async fn report(&self, event: &StepStatusEvent) -> Result<(), DomainError> {
        self.sender
            .send(event.clone())
            .map_err(|_| DomainError::internal("Status event stream closed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let (reporter, events) = ChannelStatusReporter::channel();
        let run_id = Uuid::new_v4();

        reporter
            .report(&StepStatusEvent::processing(run_id, "a", 0))
            .await
            .unwrap();
        reporter
            .report(&StepStatusEvent::error(run_id, "a", 0, "boom"))
            .await
            .unwrap();
        drop(reporter);

        let received: Vec<StepStatusEvent> = events.collect().await;
        assert_eq!(received.len(), 2);
        assert_eq!(received[1].error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_closed_stream_is_an_error() {
        let (reporter, events) = ChannelStatusReporter::channel();
        drop(events);

        let result = reporter
            .report(&StepStatusEvent::processing(Uuid::new_v4(), "a", 0))
            .await;
        assert!(result.is_err());
    }
}
