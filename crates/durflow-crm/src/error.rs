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

use durflow_core::FailureKind;

#[derive(Debug, thiserror::Error)]
pub enum CrmError {
    #[error("failed to read source file '{path}'")]
    SourceFile { path: String },

    #[error("malformed CSV record in '{path}'")]
    Csv { path: String },

    #[error("model request failed")]
    Model,

    #[error("model returned an unusable response")]
    ModelResponse,

    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),
}

impl CrmError {
    /// How a failure of this kind should be reported across the activity
    /// boundary. Model trouble (transport errors, unusable responses) may
    /// resolve on retry; everything else is an input problem.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            CrmError::Model | CrmError::ModelResponse => FailureKind::Transient,
            CrmError::SourceFile { .. } | CrmError::Csv { .. } | CrmError::MissingEnv(_) => {
                FailureKind::Permanent
            }
        }
    }
}

pub type Result<T, E = error_stack::Report<CrmError>> = std::result::Result<T, E>;
