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

use durflow_core::ActivityError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, PartialEq)]
pub enum ExecutionError {
    /// An activity ultimately failed: attempts exhausted, or the failure
    /// was classified permanent. The engine converts this into the run's
    /// terminal `{error, reason}` record.
    #[error("activity '{activity}' failed after {attempts} attempt(s): {error}")]
    ActivityFailed {
        activity: String,
        attempts: u32,
        error: ActivityError,
    },

    /// The recorded history contradicts the workflow definition. There is
    /// no safe recovery; the run requires operator intervention.
    #[error("history corruption at position {position}: {message}")]
    HistoryCorruption { position: usize, message: String },

    #[error("error accessing history store")]
    StateError,

    #[error("run '{0}' not found")]
    RunNotFound(Uuid),

    #[error("run '{0}' was cancelled")]
    Cancelled(Uuid),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ExecutionError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

pub type Result<T, E = error_stack::Report<ExecutionError>> = std::result::Result<T, E>;
