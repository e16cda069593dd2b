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

use std::collections::HashMap;

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt as _};
use tokio::sync::RwLock;
use uuid::Uuid;

use durflow_core::{RunOutcome, RunStatus};

use crate::{HistoryEntry, HistoryStore, RunDetails, SequenceNumber, StateError};

/// In-memory implementation of [`HistoryStore`].
///
/// Suitable for tests and for single-shot runs where crash recovery is not
/// required; nothing survives the process. The write locks serialize
/// appends, preserving the single-writer invariant for each run's history.
pub struct InMemoryHistoryStore {
    runs: RwLock<HashMap<Uuid, RunDetails>>,
    histories: RwLock<HashMap<Uuid, Vec<HistoryEntry>>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self {
            runs: RwLock::new(HashMap::new()),
            histories: RwLock::new(HashMap::new()),
        }
    }

    /// Remove all state for a run. Useful for cleanup after completion.
    pub async fn evict_run(&self, run_id: Uuid) {
        self.runs.write().await.remove(&run_id);
        self.histories.write().await.remove(&run_id);
    }
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStore for InMemoryHistoryStore {
    fn create_run(&self, run: RunDetails) -> BoxFuture<'_, error_stack::Result<(), StateError>> {
        async move {
            let mut runs = self.runs.write().await;
            if runs.contains_key(&run.run_id) {
                return Err(StateError::RunAlreadyExists { run_id: run.run_id }.into());
            }
            self.histories.write().await.insert(run.run_id, Vec::new());
            runs.insert(run.run_id, run);
            Ok(())
        }
        .boxed()
    }

    fn get_run(&self, run_id: Uuid) -> BoxFuture<'_, error_stack::Result<RunDetails, StateError>> {
        async move {
            let runs = self.runs.read().await;
            runs.get(&run_id)
                .cloned()
                .ok_or_else(|| StateError::RunNotFound { run_id }.into())
        }
        .boxed()
    }

    fn list_runs(
        &self,
        status: Option<RunStatus>,
    ) -> BoxFuture<'_, error_stack::Result<Vec<RunDetails>, StateError>> {
        async move {
            let runs = self.runs.read().await;
            let mut runs: Vec<_> = runs
                .values()
                .filter(|run| status.is_none_or(|s| run.status == s))
                .cloned()
                .collect();
            runs.sort_by_key(|run| run.created_at);
            Ok(runs)
        }
        .boxed()
    }

    fn update_run_status(
        &self,
        run_id: Uuid,
        status: RunStatus,
        outcome: Option<RunOutcome>,
    ) -> BoxFuture<'_, error_stack::Result<(), StateError>> {
        async move {
            let mut runs = self.runs.write().await;
            let run = runs
                .get_mut(&run_id)
                .ok_or(StateError::RunNotFound { run_id })?;
            run.status = status;
            if let Some(outcome) = outcome {
                run.outcome = Some(outcome);
            }
            if status.is_terminal() {
                run.completed_at = Some(Utc::now());
            }
            Ok(())
        }
        .boxed()
    }

    fn append(
        &self,
        entry: HistoryEntry,
    ) -> BoxFuture<'_, error_stack::Result<SequenceNumber, StateError>> {
        async move {
            let mut histories = self.histories.write().await;
            let history = histories
                .get_mut(&entry.run_id)
                .ok_or(StateError::RunNotFound {
                    run_id: entry.run_id,
                })?;
            let sequence = SequenceNumber::new(history.len() as u64);
            history.push(entry);
            Ok(sequence)
        }
        .boxed()
    }

    fn flush(&self, _run_id: Uuid) -> BoxFuture<'_, error_stack::Result<(), StateError>> {
        // Nothing is buffered; appends are immediately visible.
        async move { Ok(()) }.boxed()
    }

    fn read_history(
        &self,
        run_id: Uuid,
    ) -> BoxFuture<'_, error_stack::Result<Vec<(SequenceNumber, HistoryEntry)>, StateError>> {
        async move {
            let histories = self.histories.read().await;
            let entries = histories.get(&run_id).cloned().unwrap_or_default();
            Ok(entries
                .into_iter()
                .enumerate()
                .map(|(idx, entry)| (SequenceNumber::new(idx as u64), entry))
                .collect())
        }
        .boxed()
    }

    fn latest_sequence(
        &self,
        run_id: Uuid,
    ) -> BoxFuture<'_, error_stack::Result<Option<SequenceNumber>, StateError>> {
        async move {
            let histories = self.histories.read().await;
            Ok(histories.get(&run_id).and_then(|history| {
                history
                    .len()
                    .checked_sub(1)
                    .map(|last| SequenceNumber::new(last as u64))
            }))
        }
        .boxed()
    }
}
