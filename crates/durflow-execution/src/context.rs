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

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use error_stack::ResultExt as _;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use durflow_core::{
    args_digest, ActivityError, ActivityResult, RetryDecision, ValueRef,
};
use durflow_state::{HistoryEntry, HistoryEvent, HistoryStore};
use durflow_worker::{ActivityContext, ActivityWorker as _, DynActivityWorker};

use crate::replay::ReplayState;
use crate::{ActivityOptions, ActivityRequest, ExecutionError, Result};

/// Scheduling handle passed to a workflow definition.
///
/// Every scheduling call suspends the definition until the invocation is
/// resolved — either replayed from history or freshly executed with its
/// outcome durably appended first. The definition must be deterministic:
/// its future behavior is a pure function of (params, history-so-far).
#[derive(Clone)]
pub struct WorkflowContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    run_id: Uuid,
    store: Arc<dyn HistoryStore>,
    worker: Arc<DynActivityWorker<'static>>,
    replay: Mutex<ReplayState>,
    cancellation: CancellationToken,
}

impl WorkflowContext {
    pub(crate) fn new(
        run_id: Uuid,
        store: Arc<dyn HistoryStore>,
        worker: Arc<DynActivityWorker<'static>>,
        replay: ReplayState,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                run_id,
                store,
                worker,
                replay: Mutex::new(replay),
                cancellation,
            }),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.inner.run_id
    }

    /// Schedule a single activity and suspend until it resolves.
    ///
    /// If the history already holds a completed invocation for this
    /// position, the stored result is returned without contacting the
    /// worker. Otherwise the activity is dispatched, retried per the
    /// policy, and its outcome appended to history before this returns.
    pub async fn schedule_activity(
        &self,
        activity: &str,
        args: impl Into<ValueRef>,
        options: ActivityOptions,
    ) -> Result<ValueRef> {
        let position = self.inner.replay.lock().await.allocate_position();
        self.execute_at(position, activity, args.into(), options)
            .await
    }

    /// Schedule several activities concurrently and join on all of them.
    ///
    /// Positions are assigned in declaration order before anything runs,
    /// so replay is deterministic regardless of real-time completion
    /// order. The join waits for every activity; if any ultimately
    /// failed, the failure of the first such request in declaration order
    /// is surfaced.
    pub async fn schedule_parallel(
        &self,
        requests: Vec<ActivityRequest>,
    ) -> Result<Vec<ValueRef>> {
        let mut positioned = Vec::with_capacity(requests.len());
        {
            let mut replay = self.inner.replay.lock().await;
            for request in requests {
                positioned.push((replay.allocate_position(), request));
            }
        }

        let futures = positioned.into_iter().map(|(position, request)| {
            let ActivityRequest {
                activity,
                args,
                options,
            } = request;
            async move { self.execute_at(position, &activity, args, options).await }
        });
        let results = futures::future::join_all(futures).await;

        let mut values = Vec::with_capacity(results.len());
        for result in results {
            values.push(result?);
        }
        Ok(values)
    }

    /// Drive one scheduling position to resolution.
    async fn execute_at(
        &self,
        position: usize,
        activity: &str,
        args: ValueRef,
        options: ActivityOptions,
    ) -> Result<ValueRef> {
        let digest = args_digest(&args);

        let recorded = self.inner.replay.lock().await.take_recorded(position);
        let mut attempt = 1;
        if let Some(recorded) = recorded {
            for rec in &recorded {
                if rec.activity != activity || rec.args_digest != digest {
                    return Err(ExecutionError::HistoryCorruption {
                        position,
                        message: format!(
                            "recorded invocation of '{}' does not match scheduled '{}'",
                            rec.activity, activity
                        ),
                    }
                    .into());
                }
            }

            for rec in &recorded {
                match &rec.result {
                    ActivityResult::Success { result } => {
                        tracing::debug!(position, activity, "replaying recorded result");
                        return Ok(result.clone());
                    }
                    ActivityResult::Failed { error } => {
                        if options.retry_policy.decide(rec.attempt, error.kind)
                            == RetryDecision::GiveUp
                        {
                            return Err(ExecutionError::ActivityFailed {
                                activity: activity.to_string(),
                                attempts: rec.attempt,
                                error: error.clone(),
                            }
                            .into());
                        }
                    }
                }
            }

            // All recorded attempts failed with budget remaining; resume
            // from the next attempt.
            attempt = recorded.last().map(|rec| rec.attempt).unwrap_or(0) + 1;
        }

        loop {
            // A durable timer may gate this attempt (armed before a crash).
            let timer = self.inner.replay.lock().await.take_timer(position, attempt);
            if let Some(fire_at) = timer {
                self.sleep_until(fire_at).await?;
            }

            tracing::debug!(position, activity, attempt, "dispatching activity");
            let context = ActivityContext::new(
                self.inner.run_id,
                activity,
                position,
                attempt,
                self.inner.cancellation.child_token(),
            );
            let started = std::time::Instant::now();
            let result = self
                .invoke(activity, context, args.clone(), options.timeout)
                .await?;
            let duration_ms = started.elapsed().as_millis() as u64;

            // The outcome must be durably recorded before anything gets to
            // consult it.
            self.record(HistoryEvent::ActivityCompleted {
                position,
                activity: activity.to_string(),
                args_digest: digest.clone(),
                attempt,
                duration_ms,
                result: result.clone(),
            })
            .await?;

            match result {
                ActivityResult::Success { result } => return Ok(result),
                ActivityResult::Failed { error } => {
                    match options.retry_policy.decide(attempt, error.kind) {
                        RetryDecision::Retry { delay } => {
                            let fire_at =
                                Utc::now() + chrono::Duration::milliseconds(delay.as_millis() as i64);
                            self.record(HistoryEvent::TimerScheduled {
                                position,
                                attempt: attempt + 1,
                                fire_at,
                            })
                            .await?;
                            tracing::debug!(
                                position,
                                activity,
                                attempt,
                                delay_ms = delay.as_millis() as u64,
                                "retrying after backoff"
                            );
                            self.sleep_until(fire_at).await?;
                            attempt += 1;
                        }
                        RetryDecision::GiveUp => {
                            tracing::warn!(
                                position,
                                activity,
                                attempt,
                                kind = %error.kind,
                                "activity failed, giving up"
                            );
                            return Err(ExecutionError::ActivityFailed {
                                activity: activity.to_string(),
                                attempts: attempt,
                                error,
                            }
                            .into());
                        }
                    }
                }
            }
        }
    }

    /// Dispatch one attempt to the worker, enforcing the timeout budget.
    async fn invoke(
        &self,
        activity: &str,
        context: ActivityContext,
        args: ValueRef,
        timeout: Duration,
    ) -> Result<ActivityResult> {
        let execute = self.inner.worker.execute(activity, context, args);
        tokio::select! {
            _ = self.inner.cancellation.cancelled() => {
                Err(ExecutionError::Cancelled(self.inner.run_id).into())
            }
            outcome = tokio::time::timeout(timeout, execute) => match outcome {
                Err(_) => Ok(ActivityResult::from(ActivityError::timeout(format!(
                    "no result within {}ms",
                    timeout.as_millis()
                )))),
                Ok(Ok(result)) => Ok(result),
                // Invocation-contract violations are permanent failures.
                Ok(Err(report)) => Ok(ActivityResult::from(ActivityError::permanent(
                    report.to_string(),
                ))),
            }
        }
    }

    /// Append an event to the run's history and flush the durability barrier.
    async fn record(&self, event: HistoryEvent) -> Result<()> {
        let entry = HistoryEntry::new(self.inner.run_id, event);
        self.inner
            .store
            .append(entry)
            .await
            .change_context(ExecutionError::StateError)?;
        self.inner
            .store
            .flush(self.inner.run_id)
            .await
            .change_context(ExecutionError::StateError)?;
        Ok(())
    }

    /// Sleep until `fire_at`, or return immediately if it already passed.
    async fn sleep_until(&self, fire_at: DateTime<Utc>) -> Result<()> {
        let remaining = (fire_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        if remaining.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = self.inner.cancellation.cancelled() => {
                Err(ExecutionError::Cancelled(self.inner.run_id).into())
            }
            _ = tokio::time::sleep(remaining) => Ok(()),
        }
    }
}
