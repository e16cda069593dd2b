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

use std::path::PathBuf;
use std::sync::Arc;

use error_stack::ResultExt as _;
use uuid::Uuid;

use durflow_core::RunStatus;
use durflow_crm::{crm_analysis, CrmAnalysisParams, CrmWorker, OpenAiModelClient, WORKFLOW_NAME};
use durflow_execution::WorkflowEngine;
use durflow_state::{FileHistoryStore, HistoryStore, InMemoryHistoryStore};

use crate::error::{MainError, Result};

/// Durflow command line application.
///
/// Runs the CRM analysis workflow with durable, crash-recoverable state.
#[derive(clap::Parser, Debug)]
#[command(name = "durflow", version, about, long_about = None)]
pub struct Cli {
    /// Omit stack traces (line numbers of errors).
    #[arg(long = "omit-stack-trace", global = true)]
    pub omit_stack_trace: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Run the CRM analysis workflow.
    ///
    /// Submits a new run (or resumes an interrupted one with --run-id) and
    /// prints the terminal result: either the combined analysis report or
    /// a structured error record.
    ///
    /// # Examples
    ///
    /// ```bash
    ///
    /// # Run with in-memory state
    ///
    /// durflow run --contacts=crm_contacts.csv --opportunities=crm_opportunities.csv
    ///
    /// # Run with durable state for crash recovery
    ///
    /// durflow run --contacts=contacts.csv --opportunities=opportunities.csv --state-dir=.durflow
    ///
    /// # Resume an interrupted run
    ///
    /// durflow run --contacts=contacts.csv --opportunities=opportunities.csv \
    ///     --state-dir=.durflow --run-id=6fe7a731c5a548a0a54b86f4c7a1de19
    ///
    /// ```
    Run {
        /// Path to the contacts CSV file.
        #[arg(long = "contacts", value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
        contacts_file: PathBuf,

        /// Path to the opportunities CSV file.
        #[arg(long = "opportunities", value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
        opportunities_file: PathBuf,

        /// Directory for durable run state.
        ///
        /// Without it, state is held in memory and a crash cannot be
        /// recovered from.
        #[arg(long = "state-dir", value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
        state_dir: Option<PathBuf>,

        /// Resume the given run instead of submitting a new one.
        #[arg(long = "run-id", value_name = "RUN_ID", requires = "state_dir")]
        run_id: Option<Uuid>,

        /// Model used by the analysis activities.
        #[arg(long = "model", value_name = "MODEL", default_value = "gpt-4o-mini")]
        model: String,

        /// Write the result to a file instead of stdout.
        #[arg(long = "output", short = 'o', value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
        output_path: Option<PathBuf>,
    },
    /// List runs recorded in a state directory.
    Runs {
        /// Directory holding durable run state.
        #[arg(long = "state-dir", value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
        state_dir: PathBuf,

        /// Only show runs with this status (running, completed, failed).
        #[arg(long = "status", value_name = "STATUS")]
        status: Option<String>,
    },
    /// Print the recorded history of a run, one JSON entry per line.
    History {
        /// Directory holding durable run state.
        #[arg(long = "state-dir", value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
        state_dir: PathBuf,

        /// The run to inspect.
        #[arg(value_name = "RUN_ID")]
        run_id: Uuid,
    },
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Command::Run {
                contacts_file,
                opportunities_file,
                state_dir,
                run_id,
                model,
                output_path,
            } => {
                run_workflow(
                    contacts_file,
                    opportunities_file,
                    state_dir,
                    run_id,
                    model,
                    output_path,
                )
                .await
            }
            Command::Runs { state_dir, status } => list_runs(state_dir, status).await,
            Command::History { state_dir, run_id } => show_history(state_dir, run_id).await,
        }
    }
}

fn open_store(state_dir: Option<PathBuf>) -> Result<Arc<dyn HistoryStore>> {
    match state_dir {
        Some(dir) => {
            let store = FileHistoryStore::new(dir).change_context(MainError::Configuration)?;
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("no --state-dir given; run state will not survive a crash");
            Ok(Arc::new(InMemoryHistoryStore::new()))
        }
    }
}

#[allow(clippy::print_stdout)]
async fn run_workflow(
    contacts_file: PathBuf,
    opportunities_file: PathBuf,
    state_dir: Option<PathBuf>,
    run_id: Option<Uuid>,
    model: String,
    output_path: Option<PathBuf>,
) -> Result<()> {
    let store = open_store(state_dir)?;
    let worker = CrmWorker::with_client(OpenAiModelClient::new(model));
    let engine = WorkflowEngine::new(store, worker.boxed());

    let run = match run_id {
        Some(run_id) => engine
            .resume(run_id, crm_analysis)
            .await
            .change_context(MainError::Execution)?,
        None => {
            let params = CrmAnalysisParams {
                contacts_file: contacts_file.display().to_string(),
                opportunities_file: opportunities_file.display().to_string(),
            };
            let params =
                serde_json::to_value(&params).change_context(MainError::Configuration)?;
            engine
                .submit(WORKFLOW_NAME, params, crm_analysis)
                .await
                .change_context(MainError::Execution)?
        }
    };

    eprintln!("run_id: {}", run.run_id.simple());

    let outcome = run
        .outcome
        .ok_or(MainError::Execution)
        .attach_printable("run ended without a terminal result")?;
    let json = serde_json::to_string_pretty(&outcome).change_context(MainError::Execution)?;

    match output_path {
        Some(path) => {
            std::fs::write(&path, format!("{json}\n"))
                .change_context(MainError::Configuration)
                .attach_printable_lazy(|| {
                    format!("Failed to write output file: {}", path.display())
                })?;
            eprintln!("Result written to {}", path.display());
        }
        None => println!("{json}"),
    }

    // Callers can distinguish validation rejections from exhausted
    // retries only by the reason text; both exit non-zero.
    if outcome.is_failure() {
        std::process::exit(1);
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
async fn list_runs(state_dir: PathBuf, status: Option<String>) -> Result<()> {
    let status = match status.as_deref() {
        None => None,
        Some("running") => Some(RunStatus::Running),
        Some("completed") => Some(RunStatus::Completed),
        Some("failed") => Some(RunStatus::Failed),
        Some(other) => {
            return Err(error_stack::report!(MainError::Configuration))
                .attach_printable(format!("unknown status filter: {other}"));
        }
    };

    let store = FileHistoryStore::new(state_dir).change_context(MainError::Configuration)?;
    let runs = store
        .list_runs(status)
        .await
        .change_context(MainError::Execution)?;

    for run in runs {
        println!(
            "{}  {:<9}  {}  {}",
            run.run_id.simple(),
            run.status.to_string(),
            run.created_at.to_rfc3339(),
            run.workflow,
        );
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
async fn show_history(state_dir: PathBuf, run_id: Uuid) -> Result<()> {
    let store = FileHistoryStore::new(state_dir).change_context(MainError::Configuration)?;
    let history = store
        .read_history(run_id)
        .await
        .change_context(MainError::Execution)?;

    for (sequence, entry) in history {
        let line = serde_json::to_string(&entry).change_context(MainError::Execution)?;
        println!("{:>4}  {}", sequence.value(), line);
    }
    Ok(())
}
