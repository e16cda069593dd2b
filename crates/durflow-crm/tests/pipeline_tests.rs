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

use std::sync::Arc;

use durflow_core::{args_digest, ActivityError, ActivityResult, RunOutcome, RunStatus, ValueRef};
use durflow_crm::{crm_analysis, CrmWorker, ModelClient, ModelRequest, WORKFLOW_NAME};
use durflow_execution::WorkflowEngine;
use durflow_mock::{MockBehavior, MockWorker};
use durflow_state::{
    FileHistoryStore, HistoryEntry, HistoryEvent, HistoryStore, InMemoryHistoryStore, RunDetails,
};
use uuid::Uuid;

fn params() -> serde_json::Value {
    serde_json::json!({
        "contacts_file": "contacts.csv",
        "opportunities_file": "opportunities.csv",
    })
}

fn contacts_payload() -> serde_json::Value {
    serde_json::json!({
        "total_contacts": 5,
        "unique_companies": 3,
        "top_company": {"name": "Acme", "count": 3},
        "companies_distribution": {"Acme": 3, "Beta": 1, "Gamma": 1},
        "unique_titles": 5,
    })
}

fn opportunities_payload() -> serde_json::Value {
    serde_json::json!({
        "total_opportunities": 4,
        "total_pipeline_value": 130000.0,
        "won_value": 80000.0,
        "stages_breakdown": {"Closed Won": 2, "Negotiation": 1, "Prospecting": 1},
        "win_rate": 0.6154,
    })
}

fn analyze_contacts_args() -> serde_json::Value {
    serde_json::json!({"file_path": "contacts.csv"})
}

fn analyze_opportunities_args() -> serde_json::Value {
    serde_json::json!({"file_path": "opportunities.csv"})
}

fn validate_contacts_args() -> serde_json::Value {
    serde_json::json!({
        "analysis_type": "contacts",
        "analysis": contacts_payload(),
        "source_file": "contacts.csv",
    })
}

fn validate_opportunities_args() -> serde_json::Value {
    serde_json::json!({
        "analysis_type": "opportunities",
        "analysis": opportunities_payload(),
        "source_file": "opportunities.csv",
    })
}

fn combine_args() -> serde_json::Value {
    serde_json::json!({
        "contact_analysis": contacts_payload(),
        "opp_analysis": opportunities_payload(),
    })
}

fn report_payload() -> serde_json::Value {
    serde_json::json!({
        "crm_summary": {
            "contacts": contacts_payload(),
            "opportunities": opportunities_payload(),
        },
        "key_insights": ["Managing 5 contacts across 3 companies"],
        "status": "analysis_completed_successfully",
    })
}

/// Script the happy path up to (but excluding) the combine step.
async fn script_through_validations(mock: &MockWorker) {
    mock.mock_activity(
        "analyze_contacts",
        analyze_contacts_args(),
        MockBehavior::result(contacts_payload()),
    )
    .await;
    mock.mock_activity(
        "analyze_opportunities",
        analyze_opportunities_args(),
        MockBehavior::result(opportunities_payload()),
    )
    .await;
    mock.mock_activity(
        "validate_analysis",
        validate_contacts_args(),
        MockBehavior::result(serde_json::json!({"passed": true, "reason": "ok"})),
    )
    .await;
    mock.mock_activity(
        "validate_analysis",
        validate_opportunities_args(),
        MockBehavior::result(serde_json::json!({"passed": true, "reason": "ok"})),
    )
    .await;
}

#[tokio::test(start_paused = true)]
async fn pipeline_completes_and_schedules_in_order() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let mock = MockWorker::new();
    script_through_validations(&mock).await;
    mock.mock_activity(
        "combine_analysis",
        combine_args(),
        MockBehavior::result(report_payload()),
    )
    .await;

    let engine = WorkflowEngine::new(store.clone(), mock.boxed());
    let run = engine.submit(WORKFLOW_NAME, params(), crm_analysis).await.unwrap();

    assert_eq!(run.status, RunStatus::Completed);
    let outcome = run.outcome.unwrap();
    let value = outcome.as_success().unwrap();
    assert_eq!(value.value()["status"], "analysis_completed_successfully");

    assert_eq!(mock.invocations("analyze_contacts").await, 1);
    assert_eq!(mock.invocations("analyze_opportunities").await, 1);
    assert_eq!(mock.invocations("validate_analysis").await, 2);
    assert_eq!(mock.invocations("combine_analysis").await, 1);

    // Validation of contacts is scheduled before opportunities, and the
    // combine step last, whatever the parallel phase's real-time order.
    let history = store.read_history(run.run_id).await.unwrap();
    let scheduled: Vec<(usize, String)> = history
        .iter()
        .filter_map(|(_, entry)| match &entry.event {
            HistoryEvent::ActivityCompleted {
                position, activity, ..
            } => Some((*position, activity.clone())),
            _ => None,
        })
        .collect();
    let mut by_position = scheduled.clone();
    by_position.sort_by_key(|(position, _)| *position);
    assert_eq!(
        by_position
            .iter()
            .map(|(_, activity)| activity.as_str())
            .collect::<Vec<_>>(),
        vec![
            "analyze_contacts",
            "analyze_opportunities",
            "validate_analysis",
            "validate_analysis",
            "combine_analysis",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn contacts_validation_failure_fails_fast() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let mock = MockWorker::new();
    mock.mock_activity(
        "analyze_contacts",
        analyze_contacts_args(),
        MockBehavior::result(contacts_payload()),
    )
    .await;
    mock.mock_activity(
        "analyze_opportunities",
        analyze_opportunities_args(),
        MockBehavior::result(opportunities_payload()),
    )
    .await;
    mock.mock_activity(
        "validate_analysis",
        validate_contacts_args(),
        MockBehavior::result(serde_json::json!({
            "passed": false,
            "reason": "total_contacts mismatch: reported 6, actual 5",
        })),
    )
    .await;

    let engine = WorkflowEngine::new(store, mock.boxed());
    let run = engine.submit(WORKFLOW_NAME, params(), crm_analysis).await.unwrap();

    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(
        run.outcome.unwrap(),
        RunOutcome::failure(
            "Contact analysis validation failed",
            "total_contacts mismatch: reported 6, actual 5",
        )
    );

    // Fail-fast: opportunities validation and combine are never scheduled.
    assert_eq!(
        mock.invocations_for("validate_analysis", validate_opportunities_args())
            .await,
        0
    );
    assert_eq!(mock.invocations("combine_analysis").await, 0);
}

#[tokio::test(start_paused = true)]
async fn opportunity_validation_failure_skips_combine() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let mock = MockWorker::new();
    mock.mock_activity(
        "analyze_contacts",
        analyze_contacts_args(),
        MockBehavior::result(contacts_payload()),
    )
    .await;
    mock.mock_activity(
        "analyze_opportunities",
        analyze_opportunities_args(),
        MockBehavior::result(opportunities_payload()),
    )
    .await;
    mock.mock_activity(
        "validate_analysis",
        validate_contacts_args(),
        MockBehavior::result(serde_json::json!({"passed": true, "reason": "ok"})),
    )
    .await;
    mock.mock_activity(
        "validate_analysis",
        validate_opportunities_args(),
        MockBehavior::result(serde_json::json!({
            "passed": false,
            "reason": "win_rate does not match won_value / total_pipeline_value",
        })),
    )
    .await;

    let engine = WorkflowEngine::new(store, mock.boxed());
    let run = engine.submit(WORKFLOW_NAME, params(), crm_analysis).await.unwrap();

    assert_eq!(run.status, RunStatus::Failed);
    let outcome = run.outcome.unwrap();
    let (error, _) = outcome.as_failure().unwrap();
    assert_eq!(error, "Opportunity analysis validation failed");
    assert_eq!(mock.invocations("combine_analysis").await, 0);
}

#[tokio::test(start_paused = true)]
async fn analysis_failure_after_retries_fails_run() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let mock = MockWorker::new();
    // Contacts analysis fails transiently on every attempt (max 2).
    mock.mock_activity(
        "analyze_contacts",
        analyze_contacts_args(),
        MockBehavior::failure(ActivityError::transient("model rate limited")),
    )
    .await;
    mock.mock_activity(
        "analyze_opportunities",
        analyze_opportunities_args(),
        MockBehavior::result(opportunities_payload()),
    )
    .await;

    let engine = WorkflowEngine::new(store, mock.boxed());
    let run = engine.submit(WORKFLOW_NAME, params(), crm_analysis).await.unwrap();

    assert_eq!(run.status, RunStatus::Failed);
    let outcome = run.outcome.unwrap();
    let (error, reason) = outcome.as_failure().unwrap();
    assert_eq!(error, "Activity 'analyze_contacts' failed");
    assert_eq!(reason, "model rate limited");

    // Exactly two attempts, no partial continuation of the pipeline.
    assert_eq!(mock.invocations("analyze_contacts").await, 2);
    assert_eq!(mock.invocations("validate_analysis").await, 0);
    assert_eq!(mock.invocations("combine_analysis").await, 0);
}

#[tokio::test(start_paused = true)]
async fn resume_replays_recorded_analyses() {
    let temp = tempfile::tempdir().unwrap();
    let store = Arc::new(FileHistoryStore::new(temp.path().to_path_buf()).unwrap());
    let run_id = Uuid::new_v4();

    // History as a crashed process left it: both analyses completed.
    let run_params: ValueRef = params().into();
    store
        .create_run(RunDetails::new(run_id, WORKFLOW_NAME, run_params.clone()))
        .await
        .unwrap();
    store
        .append(HistoryEntry::new(
            run_id,
            HistoryEvent::RunStarted {
                workflow: WORKFLOW_NAME.to_string(),
                params: run_params,
            },
        ))
        .await
        .unwrap();
    for (position, activity, args, payload) in [
        (0usize, "analyze_contacts", analyze_contacts_args(), contacts_payload()),
        (
            1usize,
            "analyze_opportunities",
            analyze_opportunities_args(),
            opportunities_payload(),
        ),
    ] {
        let args: ValueRef = args.into();
        store
            .append(HistoryEntry::new(
                run_id,
                HistoryEvent::ActivityCompleted {
                    position,
                    activity: activity.to_string(),
                    args_digest: args_digest(&args),
                    attempt: 1,
                    duration_ms: 7,
                    result: ActivityResult::from(payload),
                },
            ))
            .await
            .unwrap();
    }
    store.flush(run_id).await.unwrap();

    // The resumed worker only knows the remaining steps.
    let mock = MockWorker::new();
    mock.mock_activity(
        "validate_analysis",
        validate_contacts_args(),
        MockBehavior::result(serde_json::json!({"passed": true, "reason": "ok"})),
    )
    .await;
    mock.mock_activity(
        "validate_analysis",
        validate_opportunities_args(),
        MockBehavior::result(serde_json::json!({"passed": true, "reason": "ok"})),
    )
    .await;
    mock.mock_activity(
        "combine_analysis",
        combine_args(),
        MockBehavior::result(report_payload()),
    )
    .await;

    let engine = WorkflowEngine::new(store.clone(), mock.boxed());
    let run = engine.resume(run_id, crm_analysis).await.unwrap();

    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(mock.invocations("analyze_contacts").await, 0);
    assert_eq!(mock.invocations("analyze_opportunities").await, 0);
    assert_eq!(mock.invocations("validate_analysis").await, 2);
    assert_eq!(mock.invocations("combine_analysis").await, 1);
}

struct StubModel;

impl ModelClient for StubModel {
    async fn complete(&self, request: ModelRequest) -> durflow_crm::Result<String> {
        if request.system.contains("data quality validator") {
            Ok(r#"{"passed": true, "reason": "Semantically consistent"}"#.to_string())
        } else if request.system.contains("CRM data analyst") {
            // unique_titles is deliberately wrong: the activity overrides
            // it with the deterministic count before returning.
            Ok(serde_json::json!({
                "total_contacts": 5,
                "unique_companies": 3,
                "top_company": {"name": "Acme", "count": 3},
                "companies_distribution": {"Acme": 3, "Beta": 1, "Gamma": 1},
                "unique_titles": 2,
            })
            .to_string())
        } else {
            Ok(opportunities_payload().to_string())
        }
    }
}

#[tokio::test]
async fn end_to_end_with_real_activities() {
    let dir = tempfile::tempdir().unwrap();
    let contacts_path = dir.path().join("contacts.csv");
    let opportunities_path = dir.path().join("opportunities.csv");
    std::fs::write(
        &contacts_path,
        "name,company,title,email\n\
         Alice Chen,Acme,CEO,alice@acme.test\n\
         Bob Park,Acme,CTO,bob@acme.test\n\
         Carol Diaz,Acme,VP Sales,carol@acme.test\n\
         Dan Webb,Beta,Engineer,dan@beta.test\n\
         Eve Stone,Gamma,Designer,eve@gamma.test\n",
    )
    .unwrap();
    std::fs::write(
        &opportunities_path,
        "name,stage,amount\n\
         Acme expansion,Closed Won,50000\n\
         Beta pilot,Closed Won,30000\n\
         Gamma renewal,Negotiation,40000\n\
         Delta intro,Prospecting,10000\n",
    )
    .unwrap();

    let store = Arc::new(InMemoryHistoryStore::new());
    let worker = CrmWorker::with_client(StubModel);
    let engine = WorkflowEngine::new(store, worker.boxed());

    let run = engine
        .submit(
            WORKFLOW_NAME,
            serde_json::json!({
                "contacts_file": contacts_path.to_string_lossy(),
                "opportunities_file": opportunities_path.to_string_lossy(),
            }),
            crm_analysis,
        )
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Completed);
    let outcome = run.outcome.unwrap();
    let report = outcome.as_success().unwrap();

    assert_eq!(report.value()["status"], "analysis_completed_successfully");
    assert_eq!(
        report.value()["key_insights"],
        serde_json::json!([
            "Managing 5 contacts across 3 companies",
            "Top customer: Acme (3 contacts)",
            "Pipeline value: $130,000 across 4 opportunities",
            "Closed revenue: $80,000 (Win rate: 61.5%)",
        ])
    );
    // The deterministic override replaced the model's bad title count.
    assert_eq!(
        report.value()["crm_summary"]["contacts"]["unique_titles"],
        serde_json::json!(5)
    );
}
