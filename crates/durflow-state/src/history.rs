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

//! History entries and events.
//!
//! Each run owns exactly one history. Entries are appended in schedule
//! order as issued by the deterministic workflow definition; concurrent
//! activities may complete in any real-time order, but every entry carries
//! the activity's `position` (its declaration-order index), and replay
//! matches on position rather than on append order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use durflow_core::{ActivityResult, RunOutcome, RunStatus, ValueRef};

/// Sequence number assigned to a history entry.
///
/// Sequence numbers are monotonically increasing within one run's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SequenceNumber(pub u64);

impl SequenceNumber {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for SequenceNumber {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<SequenceNumber> for u64 {
    fn from(seq: SequenceNumber) -> Self {
        seq.0
    }
}

/// A timestamped execution event belonging to one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The run this entry belongs to.
    pub run_id: Uuid,
    /// When this event occurred.
    pub timestamp: DateTime<Utc>,
    /// The execution event.
    pub event: HistoryEvent,
}

impl HistoryEntry {
    /// Create a new history entry with the current timestamp.
    pub fn new(run_id: Uuid, event: HistoryEvent) -> Self {
        Self {
            run_id,
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Execution events recorded in a run's history.
///
/// These capture every state transition the engine must be able to
/// reconstruct after a crash. An `ActivityCompleted` entry is immutable
/// once appended — a retried attempt produces a new entry with the same
/// position and an incremented attempt number, never a mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryEvent {
    /// Run accepted with its input parameters.
    RunStarted {
        /// Name of the workflow definition.
        workflow: String,
        /// Input parameters for the run.
        params: ValueRef,
    },

    /// A single activity invocation resolved (success or classified failure).
    ActivityCompleted {
        /// Declaration-order index of the scheduling call within the run.
        position: usize,
        /// Activity name.
        activity: String,
        /// SHA-256 digest of the arguments, for replay matching.
        args_digest: String,
        /// Attempt number (1-based).
        attempt: u32,
        /// Wall-clock duration of the invocation in milliseconds.
        duration_ms: u64,
        /// The invocation outcome.
        result: ActivityResult,
    },

    /// A retry backoff timer was armed for an upcoming attempt.
    ///
    /// The timer is durable: on replay the engine re-arms the remaining
    /// duration, or fires immediately if `fire_at` has already passed.
    TimerScheduled {
        /// Declaration-order index of the scheduling call.
        position: usize,
        /// The attempt the timer gates (1-based).
        attempt: u32,
        /// Absolute time at which the timer fires.
        fire_at: DateTime<Utc>,
    },

    /// Run reached a terminal state.
    RunFinished {
        /// Final run status.
        status: RunStatus,
        /// The terminal result handed to the caller.
        outcome: RunOutcome,
    },
}
