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
use std::sync::Arc;
use std::time::Duration;

use error_stack::ResultExt as _;
use tokio::sync::Mutex;

use durflow_core::{ActivityError, ActivityResult, ValueRef};
use durflow_worker::{ActivityContext, ActivityInfo, ActivityWorker, DynActivityWorker, Result, WorkerError};

/// A single scripted response for a mock activity.
#[derive(Debug, Clone)]
pub struct MockBehavior {
    delay: Option<Duration>,
    response: MockResponse,
}

#[derive(Debug, Clone)]
enum MockResponse {
    /// Return the given result (success or classified failure).
    Result(ActivityResult),
    /// Produce a worker-level (contract) error.
    Error(String),
}

impl MockBehavior {
    pub fn result(result: impl Into<ActivityResult>) -> Self {
        Self {
            delay: None,
            response: MockResponse::Result(result.into()),
        }
    }

    pub fn failure(error: ActivityError) -> Self {
        Self::result(ActivityResult::from(error))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            delay: None,
            response: MockResponse::Error(message.into()),
        }
    }

    /// Delay the response, to exercise timeouts and completion ordering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

type BehaviorKey = (String, ValueRef);

#[derive(Default)]
struct MockState {
    /// Scripted behavior queues per (activity, input).
    behaviors: HashMap<BehaviorKey, Vec<MockBehavior>>,
    /// Next queue index per (activity, input).
    cursors: HashMap<BehaviorKey, usize>,
    /// Invocation counts per (activity, input).
    counts: HashMap<BehaviorKey, u32>,
}

/// A scripted activity worker for tests.
///
/// Behaviors are registered per (activity, input) as a queue: each
/// invocation consumes the next entry, and the final entry repeats once
/// the queue is exhausted, so "fail once, then succeed" scripts are a
/// two-entry queue. Invocations are counted per (activity, input), which
/// is what at-most-once and fail-fast assertions need.
///
/// Cloning shares all state, so tests can keep a handle for assertions
/// after boxing the worker into an engine.
#[derive(Clone, Default)]
pub struct MockWorker {
    state: Arc<Mutex<MockState>>,
}

impl MockWorker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a scripted behavior for the given activity and input.
    pub async fn mock_activity(
        &self,
        activity: &str,
        input: impl Into<ValueRef>,
        behavior: MockBehavior,
    ) {
        let mut state = self.state.lock().await;
        state
            .behaviors
            .entry((activity.to_string(), input.into()))
            .or_default()
            .push(behavior);
    }

    /// Total invocations of an activity across all inputs.
    pub async fn invocations(&self, activity: &str) -> u32 {
        let state = self.state.lock().await;
        state
            .counts
            .iter()
            .filter(|((name, _), _)| name == activity)
            .map(|(_, count)| *count)
            .sum()
    }

    /// Invocations of an activity with a specific input.
    pub async fn invocations_for(&self, activity: &str, input: impl Into<ValueRef>) -> u32 {
        let state = self.state.lock().await;
        state
            .counts
            .get(&(activity.to_string(), input.into()))
            .copied()
            .unwrap_or(0)
    }

    /// Box this worker for handing to an engine; the clone shares state.
    pub fn boxed(&self) -> Box<DynActivityWorker<'static>> {
        DynActivityWorker::boxed(self.clone())
    }
}

impl ActivityWorker for MockWorker {
    async fn activities(&self) -> Result<Vec<ActivityInfo>> {
        let state = self.state.lock().await;
        let mut names: Vec<_> = state
            .behaviors
            .keys()
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names.dedup();
        Ok(names
            .into_iter()
            .map(|name| ActivityInfo {
                name,
                description: None,
            })
            .collect())
    }

    async fn execute(
        &self,
        activity: &str,
        _context: ActivityContext,
        input: ValueRef,
    ) -> Result<ActivityResult> {
        let key = (activity.to_string(), input.clone());
        let behavior = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            *state.counts.entry(key.clone()).or_insert(0) += 1;

            let queue = state
                .behaviors
                .get(&key)
                .ok_or_else(|| WorkerError::UnknownActivity(activity.to_string()))
                .attach_printable_lazy(|| {
                    format!("no behavior defined for input {}", input.value())
                })?;

            let cursor = state.cursors.entry(key.clone()).or_insert(0);
            let index = (*cursor).min(queue.len() - 1);
            *cursor += 1;
            queue[index].clone()
        };

        if let Some(delay) = behavior.delay {
            tokio::time::sleep(delay).await;
        }

        match behavior.response {
            MockResponse::Result(result) => Ok(result),
            MockResponse::Error(message) => {
                Err(error_stack::report!(WorkerError::Internal)).attach_printable(message)
            }
        }
    }
}
