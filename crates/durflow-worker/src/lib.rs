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

//! The activity invoker boundary.
//!
//! An [`ActivityWorker`] executes a single named unit of work given
//! serializable input and returns a serializable result or a classified
//! failure. Workers are stateless per call; the engine never assumes an
//! invocation is idempotent, which is exactly why it replays completed
//! invocations from history instead of re-executing them.

mod context;
mod error;
mod worker;

pub use context::ActivityContext;
pub use error::{Result, WorkerError};
pub use worker::{ActivityInfo, ActivityWorker, DynActivityWorker};
