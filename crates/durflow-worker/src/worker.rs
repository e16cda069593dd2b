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

use serde::{Deserialize, Serialize};

use durflow_core::{ActivityResult, ValueRef};

use crate::{ActivityContext, Result};

/// Description of an activity a worker can execute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ActivityInfo {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
        }
    }
}

#[trait_variant::make(Send)]
#[dynosaur::dynosaur(pub DynActivityWorker = dyn ActivityWorker)]
pub trait ActivityWorker: Send + Sync {
    /// List all activities this worker can execute.
    async fn activities(&self) -> Result<Vec<ActivityInfo>>;

    /// Execute the named activity with fully resolved input.
    ///
    /// Activity-level failures, including their transient/permanent
    /// classification, are reported inside the returned
    /// [`ActivityResult`]. An `Err` means the invocation contract itself
    /// was violated (unknown activity, undecodable input envelope) and is
    /// treated as permanent by the engine.
    async fn execute(
        &self,
        activity: &str,
        context: ActivityContext,
        input: ValueRef,
    ) -> Result<ActivityResult>;
}
