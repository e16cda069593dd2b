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

use sha2::{Digest as _, Sha256};

use crate::ValueRef;

/// Hex-encoded SHA-256 digest of an activity's arguments.
///
/// Replay matches a recorded invocation by (position, activity, digest),
/// which keeps full argument payloads out of the comparison path. The
/// serialized form of a JSON value is deterministic, so equal arguments
/// always produce equal digests.
pub fn args_digest(args: &ValueRef) -> String {
    let mut hasher = Sha256::new();
    hasher.update(args.value().to_string().as_bytes());
    hex::encode(hasher.finalize())
}
