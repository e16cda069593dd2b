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

use chrono::{DateTime, Utc};

use durflow_core::ActivityResult;
use durflow_state::{HistoryEntry, HistoryEvent, SequenceNumber};

/// One recorded invocation attempt, reconstructed from history.
#[derive(Debug, Clone)]
pub(crate) struct RecordedAttempt {
    pub activity: String,
    pub args_digest: String,
    pub attempt: u32,
    pub result: ActivityResult,
}

/// Replay cursor over a run's recorded history.
///
/// Positions are allocated in the order the (deterministic) workflow
/// definition issues scheduling calls, so a re-execution of the definition
/// visits the same positions in the same order and can short-circuit to
/// recorded outcomes.
#[derive(Debug, Default)]
pub(crate) struct ReplayState {
    /// Recorded attempts per position, in attempt order.
    completed: HashMap<usize, Vec<RecordedAttempt>>,
    /// Pending durable timers keyed by (position, gated attempt).
    timers: HashMap<(usize, u32), DateTime<Utc>>,
    /// Next position to hand out.
    next_position: usize,
}

impl ReplayState {
    pub fn from_history(entries: &[(SequenceNumber, HistoryEntry)]) -> Self {
        let mut state = Self::default();
        for (_, entry) in entries {
            match &entry.event {
                HistoryEvent::ActivityCompleted {
                    position,
                    activity,
                    args_digest,
                    attempt,
                    result,
                    ..
                } => {
                    state
                        .completed
                        .entry(*position)
                        .or_default()
                        .push(RecordedAttempt {
                            activity: activity.clone(),
                            args_digest: args_digest.clone(),
                            attempt: *attempt,
                            result: result.clone(),
                        });
                }
                HistoryEvent::TimerScheduled {
                    position,
                    attempt,
                    fire_at,
                } => {
                    state.timers.insert((*position, *attempt), *fire_at);
                }
                HistoryEvent::RunStarted { .. } | HistoryEvent::RunFinished { .. } => {}
            }
        }
        // Append order interleaves under parallel fan-out; replay matches
        // on attempt number, so keep each position's attempts sorted.
        for attempts in state.completed.values_mut() {
            attempts.sort_by_key(|rec| rec.attempt);
        }
        state
    }

    /// Number of positions with at least one recorded attempt.
    pub fn recorded_positions(&self) -> usize {
        self.completed.len()
    }

    pub fn allocate_position(&mut self) -> usize {
        let position = self.next_position;
        self.next_position += 1;
        position
    }

    /// Take the recorded attempts for a position, if any.
    pub fn take_recorded(&mut self, position: usize) -> Option<Vec<RecordedAttempt>> {
        self.completed.remove(&position)
    }

    /// Take the pending timer gating `attempt` at `position`, if any.
    pub fn take_timer(&mut self, position: usize, attempt: u32) -> Option<DateTime<Utc>> {
        self.timers.remove(&(position, attempt))
    }
}
