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

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use durflow_core::{RunOutcome, RunStatus, ValueRef};

use crate::{HistoryEntry, SequenceNumber, StateError};

/// Record of a workflow run.
///
/// Created on submission; the status and outcome are mutated only through
/// [`HistoryStore::update_run_status`], driven by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDetails {
    pub run_id: Uuid,
    /// Name of the workflow definition.
    pub workflow: String,
    /// Input parameters the run was submitted with.
    pub params: ValueRef,
    pub status: RunStatus,
    /// Terminal result, present once the run has finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<RunOutcome>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl RunDetails {
    /// Create the record for a freshly submitted run.
    pub fn new(run_id: Uuid, workflow: impl Into<String>, params: ValueRef) -> Self {
        Self {
            run_id,
            workflow: workflow.into(),
            params,
            status: RunStatus::Running,
            outcome: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// Trait for storing run metadata and the append-only execution history.
///
/// The history supports a two-phase durability model:
///
/// 1. **Append**: records an entry. Appends are serialized per store, so
///    one run's history has a single writer even when activities complete
///    concurrently.
/// 2. **Flush**: a durability barrier. After `flush` returns, all
///    previously appended entries for the run are guaranteed to survive a
///    process crash.
///
/// The engine flushes before any recorded result is handed back to
/// workflow code, so that activities with side effects are never repeated
/// on recovery.
pub trait HistoryStore: Send + Sync {
    /// Create the record for a new run.
    ///
    /// Fails with [`StateError::RunAlreadyExists`] if the run id is taken.
    fn create_run(
        &self,
        run: RunDetails,
    ) -> BoxFuture<'_, error_stack::Result<(), StateError>>;

    /// Get the record for a run.
    fn get_run(
        &self,
        run_id: Uuid,
    ) -> BoxFuture<'_, error_stack::Result<RunDetails, StateError>>;

    /// List known runs, optionally filtered by status.
    fn list_runs(
        &self,
        status: Option<RunStatus>,
    ) -> BoxFuture<'_, error_stack::Result<Vec<RunDetails>, StateError>>;

    /// Update a run's status, recording the terminal outcome if given.
    fn update_run_status(
        &self,
        run_id: Uuid,
        status: RunStatus,
        outcome: Option<RunOutcome>,
    ) -> BoxFuture<'_, error_stack::Result<(), StateError>>;

    /// Append an entry to the run's history.
    ///
    /// Returns the sequence number assigned to the entry. The entry may be
    /// buffered; call [`flush`](Self::flush) to make it durable.
    fn append(
        &self,
        entry: HistoryEntry,
    ) -> BoxFuture<'_, error_stack::Result<SequenceNumber, StateError>>;

    /// Durability barrier for a run's history.
    fn flush(&self, run_id: Uuid) -> BoxFuture<'_, error_stack::Result<(), StateError>>;

    /// Read a run's full history in sequence order.
    fn read_history(
        &self,
        run_id: Uuid,
    ) -> BoxFuture<'_, error_stack::Result<Vec<(SequenceNumber, HistoryEntry)>, StateError>>;

    /// The latest sequence number in a run's history, or `None` if empty.
    fn latest_sequence(
        &self,
        run_id: Uuid,
    ) -> BoxFuture<'_, error_stack::Result<Option<SequenceNumber>, StateError>>;
}
