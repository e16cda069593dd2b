// Copyright 2025 DataStax Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except
// in compliance with the License. You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express
// or implied. See the License for the specific language governing permissions and limitations under
// the License.

//! Shared compliance suite for [`HistoryStore`] implementations.
//!
//! Every store implementation runs the same behavioral checks from its own
//! tests, so the trait contract stays consistent across backends. Each
//! check uses fresh run ids, so the suite can run against a shared store.

use uuid::Uuid;

use durflow_core::{ActivityResult, RunOutcome, RunStatus};

use crate::{HistoryEntry, HistoryEvent, HistoryStore, RunDetails, SequenceNumber, StateError};

pub struct HistoryStoreComplianceTests;

impl HistoryStoreComplianceTests {
    /// Run every compliance check against the given store.
    pub async fn run_all(store: &dyn HistoryStore) {
        Self::test_run_lifecycle(store).await;
        Self::test_duplicate_create_rejected(store).await;
        Self::test_unknown_run_rejected(store).await;
        Self::test_append_orders_entries(store).await;
        Self::test_append_to_unknown_run_rejected(store).await;
        Self::test_latest_sequence(store).await;
        Self::test_flush_is_idempotent(store).await;
        Self::test_list_runs_filters_by_status(store).await;
    }

    fn sample_run() -> RunDetails {
        RunDetails::new(
            Uuid::new_v4(),
            "crm-analysis",
            serde_json::json!({"contacts_file": "contacts.csv"}).into(),
        )
    }

    fn sample_event(position: usize) -> HistoryEvent {
        HistoryEvent::ActivityCompleted {
            position,
            activity: "analyze_contacts".to_string(),
            args_digest: "00".repeat(32),
            attempt: 1,
            duration_ms: 5,
            result: ActivityResult::from(serde_json::json!({"total_contacts": 5})),
        }
    }

    async fn test_run_lifecycle(store: &dyn HistoryStore) {
        let run = Self::sample_run();
        let run_id = run.run_id;
        store.create_run(run.clone()).await.unwrap();

        let fetched = store.get_run(run_id).await.unwrap();
        assert_eq!(fetched.run_id, run_id);
        assert_eq!(fetched.workflow, "crm-analysis");
        assert_eq!(fetched.status, RunStatus::Running);
        assert!(fetched.outcome.is_none());
        assert!(fetched.completed_at.is_none());

        let outcome = RunOutcome::success(serde_json::json!({"status": "ok"}));
        store
            .update_run_status(run_id, RunStatus::Completed, Some(outcome.clone()))
            .await
            .unwrap();

        let fetched = store.get_run(run_id).await.unwrap();
        assert_eq!(fetched.status, RunStatus::Completed);
        assert_eq!(fetched.outcome, Some(outcome));
        assert!(fetched.completed_at.is_some());
    }

    async fn test_duplicate_create_rejected(store: &dyn HistoryStore) {
        let run = Self::sample_run();
        store.create_run(run.clone()).await.unwrap();

        let err = store.create_run(run.clone()).await.unwrap_err();
        assert!(matches!(
            err.current_context(),
            StateError::RunAlreadyExists { run_id } if *run_id == run.run_id
        ));
    }

    async fn test_unknown_run_rejected(store: &dyn HistoryStore) {
        let run_id = Uuid::new_v4();
        let err = store.get_run(run_id).await.unwrap_err();
        assert!(matches!(
            err.current_context(),
            StateError::RunNotFound { run_id: missing } if *missing == run_id
        ));

        let err = store
            .update_run_status(run_id, RunStatus::Failed, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err.current_context(),
            StateError::RunNotFound { .. }
        ));
    }

    async fn test_append_orders_entries(store: &dyn HistoryStore) {
        let run = Self::sample_run();
        let run_id = run.run_id;
        store.create_run(run).await.unwrap();

        for position in 0..3 {
            let seq = store
                .append(HistoryEntry::new(run_id, Self::sample_event(position)))
                .await
                .unwrap();
            assert_eq!(seq, SequenceNumber::new(position as u64));
        }

        let history = store.read_history(run_id).await.unwrap();
        assert_eq!(history.len(), 3);
        for (idx, (seq, entry)) in history.iter().enumerate() {
            assert_eq!(*seq, SequenceNumber::new(idx as u64));
            assert_eq!(entry.run_id, run_id);
            assert_eq!(entry.event, Self::sample_event(idx));
        }
    }

    async fn test_append_to_unknown_run_rejected(store: &dyn HistoryStore) {
        let run_id = Uuid::new_v4();
        let err = store
            .append(HistoryEntry::new(run_id, Self::sample_event(0)))
            .await
            .unwrap_err();
        assert!(matches!(
            err.current_context(),
            StateError::RunNotFound { .. }
        ));
    }

    async fn test_latest_sequence(store: &dyn HistoryStore) {
        let run = Self::sample_run();
        let run_id = run.run_id;
        store.create_run(run).await.unwrap();

        assert_eq!(store.latest_sequence(run_id).await.unwrap(), None);

        store
            .append(HistoryEntry::new(run_id, Self::sample_event(0)))
            .await
            .unwrap();
        assert_eq!(
            store.latest_sequence(run_id).await.unwrap(),
            Some(SequenceNumber::new(0))
        );

        store
            .append(HistoryEntry::new(run_id, Self::sample_event(1)))
            .await
            .unwrap();
        assert_eq!(
            store.latest_sequence(run_id).await.unwrap(),
            Some(SequenceNumber::new(1))
        );
    }

    async fn test_flush_is_idempotent(store: &dyn HistoryStore) {
        let run = Self::sample_run();
        let run_id = run.run_id;
        store.create_run(run).await.unwrap();

        // Flushing an empty history is a no-op.
        store.flush(run_id).await.unwrap();

        store
            .append(HistoryEntry::new(run_id, Self::sample_event(0)))
            .await
            .unwrap();
        store.flush(run_id).await.unwrap();
        store.flush(run_id).await.unwrap();

        assert_eq!(store.read_history(run_id).await.unwrap().len(), 1);
    }

    async fn test_list_runs_filters_by_status(store: &dyn HistoryStore) {
        let completed = Self::sample_run();
        let running = Self::sample_run();
        store.create_run(completed.clone()).await.unwrap();
        store.create_run(running.clone()).await.unwrap();
        store
            .update_run_status(
                completed.run_id,
                RunStatus::Completed,
                Some(RunOutcome::success(serde_json::json!({}))),
            )
            .await
            .unwrap();

        let all = store.list_runs(None).await.unwrap();
        assert!(all.iter().any(|run| run.run_id == completed.run_id));
        assert!(all.iter().any(|run| run.run_id == running.run_id));

        let completed_only = store.list_runs(Some(RunStatus::Completed)).await.unwrap();
        assert!(completed_only.iter().any(|run| run.run_id == completed.run_id));
        assert!(completed_only.iter().all(|run| run.status == RunStatus::Completed));
    }
}
