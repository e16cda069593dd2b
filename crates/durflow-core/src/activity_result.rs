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

use std::borrow::Cow;

use schemars::JsonSchema;

use crate::ValueRef;

/// Classification of an activity failure, driving retry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Infrastructure failure (network, rate limit) that may succeed on retry.
    Transient,
    /// The invocation exceeded its timeout budget. Retried like a transient failure.
    Timeout,
    /// Malformed input or contract violation. Never retried.
    Permanent,
}

impl FailureKind {
    pub fn is_retriable(&self) -> bool {
        !matches!(self, FailureKind::Permanent)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Transient => "transient",
            FailureKind::Timeout => "timeout",
            FailureKind::Permanent => "permanent",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error reported from an activity invocation.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, JsonSchema)]
pub struct ActivityError {
    pub kind: FailureKind,
    pub message: Cow<'static, str>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ValueRef>,
}

impl std::fmt::Display for ActivityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failure: {}", self.kind, self.message)
    }
}

impl ActivityError {
    pub fn new(kind: FailureKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
        }
    }

    pub fn transient(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(FailureKind::Transient, message)
    }

    pub fn timeout(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(FailureKind::Timeout, message)
    }

    pub fn permanent(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(FailureKind::Permanent, message)
    }

    pub fn with_data<D: serde::Serialize>(self, data: D) -> Result<Self, serde_json::Error> {
        let data = serde_json::to_value(data)?.into();
        Ok(Self {
            data: Some(data),
            ..self
        })
    }

    pub fn is_retriable(&self) -> bool {
        self.kind.is_retriable()
    }
}

/// The recorded outcome of a single activity invocation.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ActivityResult {
    /// The invocation completed and produced a result.
    Success { result: ValueRef },
    /// The invocation failed with the given error.
    Failed { error: ActivityError },
}

impl From<serde_json::Value> for ActivityResult {
    fn from(value: serde_json::Value) -> Self {
        let result = ValueRef::new(value);
        Self::Success { result }
    }
}

impl From<ActivityError> for ActivityResult {
    fn from(error: ActivityError) -> Self {
        Self::Failed { error }
    }
}

impl ActivityResult {
    pub fn success(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Success { result } => Some(result.as_ref()),
            _ => None,
        }
    }

    pub fn failed(&self) -> Option<&ActivityError> {
        match self {
            Self::Failed { error } => Some(error),
            _ => None,
        }
    }
}
