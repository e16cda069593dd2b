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

#[derive(Debug, thiserror::Error)]
pub enum MainError {
    #[error("failed to initialize tracing")]
    TracingInit,

    #[error("configuration error")]
    Configuration,

    #[error("workflow execution error")]
    Execution,
}

pub type Result<T, E = error_stack::Report<MainError>> = std::result::Result<T, E>;
