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

mod activity_result;
mod digest;
mod outcome;
mod retry;
mod status;
mod value;

pub use activity_result::{ActivityError, ActivityResult, FailureKind};
pub use digest::args_digest;
pub use outcome::RunOutcome;
pub use retry::{Backoff, RetryDecision, RetryPolicy};
pub use status::RunStatus;
pub use value::ValueRef;
