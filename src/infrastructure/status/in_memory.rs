//! In-memory result store keyed by run

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::workflow::{StatusReporter, StepStatus, StepStatusEvent};
use crate::domain::DomainError;

/// Latest known state of one step within one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    pub status: StepStatus,
    pub result: Option<String>,
    pub error: Option<String>,
    pub batch: usize,
    pub updated_at: DateTime<Utc>,
    /// Every status this step has reported, oldest first
    pub transitions: Vec<StepStatus>,
}

/// Result store owned by whoever created it; concurrent runs stay apart
/// because every record is keyed by run id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStatusStore {
    runs: Arc<RwLock<HashMap<Uuid, BTreeMap<String, StepRecord>>>>,
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All step records of a run, keyed by step id
    pub async fn run_snapshot(&self, run_id: Uuid) -> Option<BTreeMap<String, StepRecord>> {
        let runs = self.runs.read().await;
        runs.get(&run_id).cloned()
    }

    pub async fn step_status(&self, run_id: Uuid, step_id: &str) -> Option<StepStatus> {
        let runs = self.runs.read().await;
        runs.get(&run_id)
            .and_then(|steps| steps.get(step_id))
            .map(|record| record.status)
    }

    pub async fn run_ids(&self) -> Vec<Uuid> {
        let runs = self.runs.read().await;
        runs.keys().copied().collect()
    }

    /// Drop everything recorded for a run
    pub async fn remove_run(&self, run_id: Uuid) -> bool {
        let mut runs = self.runs.write().await;
        runs.remove(&run_id).is_some()
    }
}

#[async_trait]
impl StatusReporter for InMemoryStatusStore {
    async fn report(&self, event: &StepStatusEvent) -> Result<(), DomainError> {
        let mut runs = self.runs.write().await;
        let steps = runs.entry(event.run_id).or_default();

        match steps.get_mut(&event.step_id) {
            Some(record) => {
                record.status = event.status;
                record.batch = event.batch;
                record.updated_at = event.timestamp;
                record.transitions.push(event.status);

                if event.result.is_some() {
                    record.result = event.result.clone();
                }
                if event.error.is_some() {
                    record.error = event.error.clone();
                }
            }
            None => {
                steps.insert(
                    event.step_id.clone(),
                    StepRecord {
                        status: event.status,
                        result: event.result.clone(),
                        error: event.error.clone(),
                        batch: event.batch,
                        updated_at: event.timestamp,
                        transitions: vec![event.status],
                    },
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_records_latest_status_and_transitions() {
        let store = InMemoryStatusStore::new();
        let run_id = Uuid::new_v4();

        store
            .report(&StepStatusEvent::processing(run_id, "summary", 0))
            .await
            .unwrap();
        store
            .report(&StepStatusEvent::success(run_id, "summary", 0, &json!("Go expert")))
            .await
            .unwrap();

        let snapshot = store.run_snapshot(run_id).await.unwrap();
        let record = &snapshot["summary"];

        assert_eq!(record.status, StepStatus::Success);
        assert_eq!(record.result.as_deref(), Some("Go expert"));
        assert_eq!(
            record.transitions,
            vec![StepStatus::Processing, StepStatus::Success]
        );
    }

    #[tokio::test]
    async fn test_runs_are_isolated() {
        let store = InMemoryStatusStore::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        store
            .report(&StepStatusEvent::error(first, "a", 0, "boom"))
            .await
            .unwrap();
        store
            .report(&StepStatusEvent::processing(second, "a", 0))
            .await
            .unwrap();

        assert_eq!(store.step_status(first, "a").await, Some(StepStatus::Error));
        assert_eq!(store.step_status(second, "a").await, Some(StepStatus::Processing));
        assert_eq!(store.run_ids().await.len(), 2);

        assert!(store.remove_run(first).await);
        assert!(store.run_snapshot(first).await.is_none());
    }
}
