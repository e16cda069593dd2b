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

use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::FailureKind;

/// Backoff strategy applied between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", tag = "strategy")]
pub enum Backoff {
    /// Retry immediately.
    None,
    /// Wait a fixed delay before every retry.
    #[serde(rename_all = "camelCase")]
    Fixed { delay_ms: u64 },
}

impl Backoff {
    pub fn fixed(delay: Duration) -> Self {
        Self::Fixed {
            delay_ms: delay.as_millis() as u64,
        }
    }

    /// The delay to wait before the next attempt.
    pub fn delay(&self) -> Duration {
        match self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed { delay_ms } => Duration::from_millis(*delay_ms),
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::None
    }
}

/// Retry policy attached to a scheduled activity.
///
/// Each scheduled activity carries its own policy; there is no global
/// default. `maximum_attempts` counts every invocation, including the
/// first, so a policy of 2 allows exactly one retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Total number of attempts allowed, including the first.
    pub maximum_attempts: u32,

    #[serde(default, skip_serializing_if = "Backoff::is_default")]
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(maximum_attempts: u32) -> Self {
        Self {
            maximum_attempts,
            backoff: Backoff::None,
        }
    }

    pub fn with_fixed_backoff(mut self, delay: Duration) -> Self {
        self.backoff = Backoff::fixed(delay);
        self
    }

    /// Decide whether another attempt should run.
    ///
    /// `attempts` is the number of completed invocations so far, the most
    /// recent of which failed with `kind`. Permanent failures are never
    /// retried regardless of the remaining budget.
    pub fn decide(&self, attempts: u32, kind: FailureKind) -> RetryDecision {
        if !kind.is_retriable() || attempts >= self.maximum_attempts {
            RetryDecision::GiveUp
        } else {
            RetryDecision::Retry {
                delay: self.backoff.delay(),
            }
        }
    }
}

/// Outcome of consulting a [`RetryPolicy`] after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Run another attempt after waiting `delay`.
    Retry { delay: Duration },
    /// Surface the failure to the workflow.
    GiveUp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_failures_retry_until_exhausted() {
        let policy = RetryPolicy::new(2);
        assert_eq!(
            policy.decide(1, FailureKind::Transient),
            RetryDecision::Retry {
                delay: Duration::ZERO
            }
        );
        assert_eq!(policy.decide(2, FailureKind::Transient), RetryDecision::GiveUp);
    }

    #[test]
    fn test_timeouts_are_retried_like_transients() {
        let policy = RetryPolicy::new(3).with_fixed_backoff(Duration::from_secs(1));
        assert_eq!(
            policy.decide(2, FailureKind::Timeout),
            RetryDecision::Retry {
                delay: Duration::from_secs(1)
            }
        );
    }

    #[test]
    fn test_permanent_failures_never_retry() {
        let policy = RetryPolicy::new(5);
        assert_eq!(policy.decide(1, FailureKind::Permanent), RetryDecision::GiveUp);
    }

    #[test]
    fn test_policy_serialization() {
        let policy = RetryPolicy::new(2).with_fixed_backoff(Duration::from_millis(500));
        let json = serde_json::to_value(policy).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "maximumAttempts": 2,
                "backoff": {"strategy": "fixed", "delayMs": 500},
            })
        );

        let back: RetryPolicy = serde_json::from_value(json).unwrap();
        assert_eq!(back, policy);
    }

    #[test]
    fn test_default_backoff_not_serialized() {
        let policy = RetryPolicy::new(3);
        let json = serde_json::to_value(policy).unwrap();
        assert_eq!(json, serde_json::json!({"maximumAttempts": 3}));
    }
}
