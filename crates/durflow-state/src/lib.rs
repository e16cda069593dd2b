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

//! Durable execution history for workflow runs.
//!
//! The history is an append-only, crash-surviving record of everything a
//! run has done: activity invocations with their outcomes, scheduled
//! backoff timers, and the run's terminal result. It is the source of
//! truth for replay — on restart the engine reconstructs a run's progress
//! entirely from its history and never re-executes recorded work.

pub mod compliance;
mod error;
mod file;
mod history;
mod in_memory;
mod store;

pub use error::{Result, StateError};
pub use file::FileHistoryStore;
pub use history::{HistoryEntry, HistoryEvent, SequenceNumber};
pub use in_memory::InMemoryHistoryStore;
pub use store::{HistoryStore, RunDetails};
