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

//! The durable workflow orchestration engine.
//!
//! The engine drives a deterministic workflow definition against an
//! append-only history. Every scheduling call first consults the history:
//! an invocation recorded as completed is never dispatched again — its
//! stored result is returned (replay). Fresh invocations are dispatched to
//! the activity worker, and their outcome is durably appended before
//! control returns to workflow code. A crash therefore re-executes the
//! definition from the top but never re-performs completed side-effecting
//! work.

mod context;
mod engine;
mod error;
mod options;
mod replay;

pub use context::WorkflowContext;
pub use engine::WorkflowEngine;
pub use error::{ExecutionError, Result};
pub use options::{ActivityOptions, ActivityRequest};
