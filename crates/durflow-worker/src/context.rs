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

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Context handed to a worker for one activity invocation.
///
/// Cheap to clone; carries the run identity, the invocation's place in
/// the workflow, and a cancellation token that is triggered on
/// workflow-level abort. Long-running workers should observe the token
/// cooperatively.
#[derive(Clone, Debug)]
pub struct ActivityContext {
    run_id: Uuid,
    activity: String,
    position: usize,
    attempt: u32,
    cancellation: CancellationToken,
}

impl ActivityContext {
    pub fn new(
        run_id: Uuid,
        activity: impl Into<String>,
        position: usize,
        attempt: u32,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            run_id,
            activity: activity.into(),
            position,
            attempt,
            cancellation,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn activity(&self) -> &str {
        &self.activity
    }

    /// Declaration-order index of the scheduling call within the run.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Attempt number (1-based).
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
