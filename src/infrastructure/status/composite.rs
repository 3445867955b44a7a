use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use crate::domain::workflow::{StatusReporter, StepStatusEvent};
use crate::domain::DomainError;

/// Fans each event out to several reporters.
///
/// Every reporter sees every event; the first error (if any) is returned
/// after all of them ran.
#[derive(Debug, Clone, Default)]
pub struct CompositeStatusReporter {
    reporters: Vec<Arc<dyn StatusReporter>>,
}

impl CompositeStatusReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, reporter: Arc<dyn StatusReporter>) -> Self {
        self.reporters.push(reporter);
        self
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }
}

#[async_trait]
impl StatusReporter for CompositeStatusReporter {
    async fn report(&self, event: &StepStatusEvent) -> Result<(), DomainError> {
        let results = join_all(self.reporters.iter().map(|r| r.report(event))).await;
        results.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::status::InMemoryStatusStore;
    use uuid::Uuid;

    #[derive(Debug)]
    struct FailingReporter;

    #[async_trait]
    impl StatusReporter for FailingReporter {
        async fn report(&self, _event: &StepStatusEvent) -> Result<(), DomainError> {
            Err(DomainError::storage("status table unavailable"))
        }
    }

    #[tokio::test]
    async fn test_failure_does_not_skip_other_reporters() {
        let store = Arc::new(InMemoryStatusStore::new());
        let composite = CompositeStatusReporter::new()
            .with(Arc::new(FailingReporter))
            .with(store.clone());

        let run_id = Uuid::new_v4();
        let result = composite
            .report(&StepStatusEvent::processing(run_id, "a", 0))
            .await;

        assert!(result.is_err());
        assert_eq!(composite.len(), 2);
        assert!(store.step_status(run_id, "a").await.is_some());
    }
}
