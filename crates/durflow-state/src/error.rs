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

use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("History store initialization error")]
    Initialization,

    #[error("Internal history store error")]
    Internal,

    #[error("Serialization error")]
    Serialization,

    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: Uuid },

    #[error("Run already exists: {run_id}")]
    RunAlreadyExists { run_id: Uuid },
}

pub type Result<T, E = error_stack::Report<StateError>> = std::result::Result<T, E>;
