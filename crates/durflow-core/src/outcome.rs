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

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ValueRef;

/// Terminal result of a workflow run.
///
/// Callers always receive one of these two shapes: the workflow's success
/// payload, or a structured `{error, reason}` record. Business rejections
/// (validation gates) and exhausted-retry failures share the failure shape
/// and differ only in their reason text.
///
/// The serialized form is untagged; the failure variant is tried first, so
/// any object carrying exactly `error` and `reason` decodes as a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RunOutcome {
    Failure { error: String, reason: String },
    Success(ValueRef),
}

impl RunOutcome {
    pub fn success(value: impl Into<ValueRef>) -> Self {
        Self::Success(value.into())
    }

    pub fn failure(error: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
            reason: reason.into(),
        }
    }

    pub fn as_success(&self) -> Option<&ValueRef> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_failure(&self) -> Option<(&str, &str)> {
        match self {
            Self::Failure { error, reason } => Some((error, reason)),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }
}
