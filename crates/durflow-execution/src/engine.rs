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

use std::future::Future;
use std::sync::Arc;

use error_stack::ResultExt as _;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use durflow_core::{RunOutcome, RunStatus, ValueRef};
use durflow_state::{HistoryEntry, HistoryEvent, HistoryStore, RunDetails, StateError};
use durflow_worker::DynActivityWorker;

use crate::replay::ReplayState;
use crate::{ExecutionError, Result, WorkflowContext};

/// Engine that drives workflow runs to a terminal state.
///
/// One engine owns a history store and an activity worker and can drive
/// any number of runs, one [`submit`](Self::submit) or
/// [`resume`](Self::resume) call at a time per run. All appends to a
/// run's history go through the store's serialized writer, so each
/// history has a single writer even while activities execute
/// concurrently.
pub struct WorkflowEngine {
    store: Arc<dyn HistoryStore>,
    worker: Arc<DynActivityWorker<'static>>,
    cancellation: CancellationToken,
}

impl WorkflowEngine {
    pub fn new(store: Arc<dyn HistoryStore>, worker: Box<DynActivityWorker<'static>>) -> Self {
        Self {
            store,
            worker: Arc::from(worker),
            cancellation: CancellationToken::new(),
        }
    }

    /// Request cooperative cancellation of all in-flight work.
    ///
    /// In-flight worker invocations observe their context token; pending
    /// backoff timers are interrupted. Not exercised by the CRM pipeline,
    /// but part of the engine contract.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Submit a new run and drive it to a terminal state.
    pub async fn submit<D, F>(
        &self,
        workflow: &str,
        params: impl Into<ValueRef>,
        definition: D,
    ) -> Result<RunDetails>
    where
        D: FnOnce(WorkflowContext, ValueRef) -> F,
        F: Future<Output = Result<RunOutcome>>,
    {
        let params = params.into();
        let run_id = Uuid::new_v4();
        let run = RunDetails::new(run_id, workflow, params.clone());
        self.store
            .create_run(run)
            .await
            .change_context(ExecutionError::StateError)?;
        self.store
            .append(HistoryEntry::new(
                run_id,
                HistoryEvent::RunStarted {
                    workflow: workflow.to_string(),
                    params: params.clone(),
                },
            ))
            .await
            .change_context(ExecutionError::StateError)?;
        self.store
            .flush(run_id)
            .await
            .change_context(ExecutionError::StateError)?;

        tracing::info!(%run_id, workflow, "run submitted");
        self.drive(run_id, params, definition).await
    }

    /// Resume an interrupted run.
    ///
    /// The definition re-executes from the top; completed invocations
    /// short-circuit to their recorded results, pending timers re-arm
    /// with their remaining duration, and only unfinished work is
    /// dispatched. Resuming a run that already reached a terminal state
    /// returns its recorded details without executing anything.
    pub async fn resume<D, F>(&self, run_id: Uuid, definition: D) -> Result<RunDetails>
    where
        D: FnOnce(WorkflowContext, ValueRef) -> F,
        F: Future<Output = Result<RunOutcome>>,
    {
        let run = match self.store.get_run(run_id).await {
            Ok(run) => run,
            Err(report) => {
                let context = if matches!(report.current_context(), StateError::RunNotFound { .. })
                {
                    ExecutionError::RunNotFound(run_id)
                } else {
                    ExecutionError::StateError
                };
                return Err(report.change_context(context));
            }
        };

        if run.status.is_terminal() {
            tracing::info!(%run_id, status = %run.status, "run already terminal, nothing to resume");
            return Ok(run);
        }

        tracing::info!(%run_id, workflow = %run.workflow, "resuming run");
        self.drive(run_id, run.params.clone(), definition).await
    }

    async fn drive<D, F>(&self, run_id: Uuid, params: ValueRef, definition: D) -> Result<RunDetails>
    where
        D: FnOnce(WorkflowContext, ValueRef) -> F,
        F: Future<Output = Result<RunOutcome>>,
    {
        let history = self
            .store
            .read_history(run_id)
            .await
            .change_context(ExecutionError::StateError)?;
        let replay = ReplayState::from_history(&history);
        tracing::debug!(
            %run_id,
            entries = history.len(),
            recorded_positions = replay.recorded_positions(),
            "driving run"
        );

        let context = WorkflowContext::new(
            run_id,
            self.store.clone(),
            self.worker.clone(),
            replay,
            self.cancellation.child_token(),
        );

        let outcome = match definition(context, params).await {
            Ok(outcome) => outcome,
            Err(report) => {
                // An exhausted or permanent activity failure is a normal
                // terminal result; anything else is an engine failure.
                let failure = match report.current_context() {
                    ExecutionError::ActivityFailed {
                        activity, error, ..
                    } => Some(RunOutcome::failure(
                        format!("Activity '{activity}' failed"),
                        error.message.to_string(),
                    )),
                    _ => None,
                };
                match failure {
                    Some(outcome) => outcome,
                    None => {
                        tracing::error!(%run_id, "run failed with engine error");
                        if let Err(update) = self
                            .store
                            .update_run_status(run_id, RunStatus::Failed, None)
                            .await
                        {
                            tracing::error!(%run_id, ?update, "failed to mark run as failed");
                        }
                        return Err(report);
                    }
                }
            }
        };

        let status = if outcome.is_failure() {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };

        self.store
            .append(HistoryEntry::new(
                run_id,
                HistoryEvent::RunFinished {
                    status,
                    outcome: outcome.clone(),
                },
            ))
            .await
            .change_context(ExecutionError::StateError)?;
        self.store
            .flush(run_id)
            .await
            .change_context(ExecutionError::StateError)?;
        self.store
            .update_run_status(run_id, status, Some(outcome))
            .await
            .change_context(ExecutionError::StateError)?;

        tracing::info!(%run_id, %status, "run finished");
        self.store
            .get_run(run_id)
            .await
            .change_context(ExecutionError::StateError)
    }
}
