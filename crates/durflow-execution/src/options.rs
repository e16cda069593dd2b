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

use durflow_core::{RetryPolicy, ValueRef};

/// Per-activity scheduling options: the timeout budget for each attempt
/// and the retry policy applied across attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivityOptions {
    pub timeout: Duration,
    pub retry_policy: RetryPolicy,
}

impl ActivityOptions {
    pub fn new(timeout: Duration, retry_policy: RetryPolicy) -> Self {
        Self {
            timeout,
            retry_policy,
        }
    }
}

/// A scheduling call, used for parallel fan-out.
///
/// The order of requests passed to
/// [`schedule_parallel`](crate::WorkflowContext::schedule_parallel) is the
/// declaration order: it fixes each activity's position in the history
/// regardless of real-time completion order.
#[derive(Debug, Clone)]
pub struct ActivityRequest {
    pub activity: String,
    pub args: ValueRef,
    pub options: ActivityOptions,
}

impl ActivityRequest {
    pub fn new(
        activity: impl Into<String>,
        args: impl Into<ValueRef>,
        options: ActivityOptions,
    ) -> Self {
        Self {
            activity: activity.into(),
            args: args.into(),
            options,
        }
    }
}
