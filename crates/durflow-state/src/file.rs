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

//! Filesystem-backed history store.
//!
//! Each run gets its own directory named by the run id:
//!
//! - `<dir>/<run_id>/run.json` — run metadata, written atomically
//!   (temp file + rename) so readers never observe a partial record.
//! - `<dir>/<run_id>/history.jsonl` — the append-only history, one JSON
//!   entry per line. Appends go through the OS page cache; `flush` is the
//!   durability barrier that fsyncs the file.
//!
//! Supports two modes:
//! - **Explicit directory**: state survives restarts (the resume path)
//! - **Temporary directory**: created on demand and cleaned up on drop

use std::collections::HashMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::Utc;
use error_stack::ResultExt as _;
use futures::future::{BoxFuture, FutureExt as _};
use tokio::sync::Mutex;
use uuid::Uuid;

use durflow_core::{RunOutcome, RunStatus};

use crate::{HistoryEntry, HistoryStore, RunDetails, SequenceNumber, StateError};

/// Directory handle that is either an owned path or a temp directory (auto-cleaned on drop).
enum DirHandle {
    /// User-specified directory path.
    Explicit(PathBuf),
    /// Temporary directory that is cleaned up when dropped.
    Temp(tempfile::TempDir),
}

impl DirHandle {
    fn path(&self) -> &Path {
        match self {
            DirHandle::Explicit(p) => p,
            DirHandle::Temp(t) => t.path(),
        }
    }
}

/// Filesystem-backed implementation of [`HistoryStore`].
pub struct FileHistoryStore {
    dir: DirHandle,
    /// Serializes all writes, preserving the single-writer invariant per
    /// run history, and caches the next sequence number per run.
    state: Mutex<HashMap<Uuid, u64>>,
}

impl FileHistoryStore {
    /// Create a store rooted at an explicit directory.
    ///
    /// The directory is created if it doesn't exist. Histories written by
    /// a previous process in the same directory are picked up as-is.
    pub fn new(directory: PathBuf) -> error_stack::Result<Self, StateError> {
        std::fs::create_dir_all(&directory)
            .change_context(StateError::Initialization)
            .attach_printable_lazy(|| {
                format!("Failed to create state directory: {}", directory.display())
            })?;
        Ok(Self {
            dir: DirHandle::Explicit(directory),
            state: Mutex::new(HashMap::new()),
        })
    }

    /// Create a store in a temporary directory, deleted when dropped.
    pub fn temp() -> error_stack::Result<Self, StateError> {
        let temp_dir = tempfile::tempdir()
            .change_context(StateError::Initialization)
            .attach_printable("Failed to create temporary state directory")?;
        Ok(Self {
            dir: DirHandle::Temp(temp_dir),
            state: Mutex::new(HashMap::new()),
        })
    }

    fn run_dir(&self, run_id: Uuid) -> PathBuf {
        self.dir.path().join(run_id.simple().to_string())
    }

    fn run_path(&self, run_id: Uuid) -> PathBuf {
        self.run_dir(run_id).join("run.json")
    }

    fn history_path(&self, run_id: Uuid) -> PathBuf {
        self.run_dir(run_id).join("history.jsonl")
    }

    fn read_run(&self, run_id: Uuid) -> error_stack::Result<RunDetails, StateError> {
        let path = self.run_path(run_id);
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StateError::RunNotFound { run_id }.into());
            }
            Err(e) => {
                return Err(error_stack::report!(StateError::Internal))
                    .attach_printable(format!("Failed to read run file: {}", path.display()))
                    .attach_printable(e);
            }
        };
        serde_json::from_slice(&bytes)
            .change_context(StateError::Serialization)
            .attach_printable_lazy(|| format!("Failed to parse run file: {}", path.display()))
    }

    fn write_run(&self, run: &RunDetails) -> error_stack::Result<(), StateError> {
        let path = self.run_path(run.run_id);
        let json = serde_json::to_vec_pretty(run).change_context(StateError::Serialization)?;

        // Write atomically: write to temp file then rename to avoid partial reads
        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, &json)
            .change_context(StateError::Internal)
            .attach_printable_lazy(|| {
                format!("Failed to write run file: {}", temp_path.display())
            })?;
        std::fs::rename(&temp_path, &path)
            .change_context(StateError::Internal)
            .attach_printable_lazy(|| format!("Failed to rename run file: {}", path.display()))?;
        Ok(())
    }

    /// Number of entries already persisted for a run.
    fn persisted_entries(&self, run_id: Uuid) -> error_stack::Result<u64, StateError> {
        let path = self.history_path(run_id);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(error_stack::report!(StateError::Internal))
                    .attach_printable(format!(
                        "Failed to read history file: {}",
                        path.display()
                    ))
                    .attach_printable(e);
            }
        };
        Ok(content.lines().filter(|line| !line.is_empty()).count() as u64)
    }
}

impl HistoryStore for FileHistoryStore {
    fn create_run(&self, run: RunDetails) -> BoxFuture<'_, error_stack::Result<(), StateError>> {
        async move {
            let _guard = self.state.lock().await;
            let run_dir = self.run_dir(run.run_id);
            if run_dir.exists() {
                return Err(StateError::RunAlreadyExists { run_id: run.run_id }.into());
            }
            std::fs::create_dir_all(&run_dir)
                .change_context(StateError::Internal)
                .attach_printable_lazy(|| {
                    format!("Failed to create run directory: {}", run_dir.display())
                })?;
            self.write_run(&run)
        }
        .boxed()
    }

    fn get_run(&self, run_id: Uuid) -> BoxFuture<'_, error_stack::Result<RunDetails, StateError>> {
        async move { self.read_run(run_id) }.boxed()
    }

    fn list_runs(
        &self,
        status: Option<RunStatus>,
    ) -> BoxFuture<'_, error_stack::Result<Vec<RunDetails>, StateError>> {
        async move {
            let entries = std::fs::read_dir(self.dir.path())
                .change_context(StateError::Internal)
                .attach_printable_lazy(|| {
                    format!("Failed to list state directory: {}", self.dir.path().display())
                })?;

            let mut runs = Vec::new();
            for entry in entries {
                let entry = entry.change_context(StateError::Internal)?;
                let run_path = entry.path().join("run.json");
                if !run_path.is_file() {
                    continue;
                }
                let bytes = std::fs::read(&run_path).change_context(StateError::Internal)?;
                let run: RunDetails = serde_json::from_slice(&bytes)
                    .change_context(StateError::Serialization)
                    .attach_printable_lazy(|| {
                        format!("Failed to parse run file: {}", run_path.display())
                    })?;
                if status.is_none_or(|s| run.status == s) {
                    runs.push(run);
                }
            }
            runs.sort_by_key(|run| run.created_at);
            Ok(runs)
        }
        .boxed()
    }

    fn update_run_status(
        &self,
        run_id: Uuid,
        status: RunStatus,
        outcome: Option<RunOutcome>,
    ) -> BoxFuture<'_, error_stack::Result<(), StateError>> {
        async move {
            let _guard = self.state.lock().await;
            let mut run = self.read_run(run_id)?;
            run.status = status;
            if let Some(outcome) = outcome {
                run.outcome = Some(outcome);
            }
            if status.is_terminal() {
                run.completed_at = Some(Utc::now());
            }
            self.write_run(&run)
        }
        .boxed()
    }

    fn append(
        &self,
        entry: HistoryEntry,
    ) -> BoxFuture<'_, error_stack::Result<SequenceNumber, StateError>> {
        async move {
            let run_id = entry.run_id;
            let mut state = self.state.lock().await;

            if !self.run_path(run_id).is_file() {
                return Err(StateError::RunNotFound { run_id }.into());
            }

            let next = match state.get(&run_id) {
                Some(next) => *next,
                None => self.persisted_entries(run_id)?,
            };

            let line = serde_json::to_string(&entry).change_context(StateError::Serialization)?;
            let path = self.history_path(run_id);
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .change_context(StateError::Internal)
                .attach_printable_lazy(|| {
                    format!("Failed to open history file: {}", path.display())
                })?;
            writeln!(file, "{line}")
                .change_context(StateError::Internal)
                .attach_printable_lazy(|| {
                    format!("Failed to append history entry: {}", path.display())
                })?;

            state.insert(run_id, next + 1);
            Ok(SequenceNumber::new(next))
        }
        .boxed()
    }

    fn flush(&self, run_id: Uuid) -> BoxFuture<'_, error_stack::Result<(), StateError>> {
        async move {
            let _guard = self.state.lock().await;
            let path = self.history_path(run_id);
            match std::fs::OpenOptions::new().append(true).open(&path) {
                Ok(file) => file
                    .sync_all()
                    .change_context(StateError::Internal)
                    .attach_printable_lazy(|| {
                        format!("Failed to sync history file: {}", path.display())
                    }),
                // No entries appended yet; nothing to make durable.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(error_stack::report!(StateError::Internal))
                    .attach_printable(format!("Failed to open history file: {}", path.display()))
                    .attach_printable(e),
            }
        }
        .boxed()
    }

    fn read_history(
        &self,
        run_id: Uuid,
    ) -> BoxFuture<'_, error_stack::Result<Vec<(SequenceNumber, HistoryEntry)>, StateError>> {
        async move {
            let path = self.history_path(run_id);
            let content = match std::fs::read_to_string(&path) {
                Ok(c) => c,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => {
                    return Err(error_stack::report!(StateError::Internal))
                        .attach_printable(format!(
                            "Failed to read history file: {}",
                            path.display()
                        ))
                        .attach_printable(e);
                }
            };

            let mut entries = Vec::new();
            for (idx, line) in content.lines().filter(|line| !line.is_empty()).enumerate() {
                let entry: HistoryEntry = serde_json::from_str(line)
                    .change_context(StateError::Serialization)
                    .attach_printable_lazy(|| {
                        format!("Corrupt history entry at line {} of {}", idx + 1, path.display())
                    })?;
                entries.push((SequenceNumber::new(idx as u64), entry));
            }
            Ok(entries)
        }
        .boxed()
    }

    fn latest_sequence(
        &self,
        run_id: Uuid,
    ) -> BoxFuture<'_, error_stack::Result<Option<SequenceNumber>, StateError>> {
        async move {
            let state = self.state.lock().await;
            let count = match state.get(&run_id) {
                Some(next) => *next,
                None => self.persisted_entries(run_id)?,
            };
            Ok(count.checked_sub(1).map(SequenceNumber::new))
        }
        .boxed()
    }
}
