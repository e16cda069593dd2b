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
use std::time::Duration;

use durflow_core::{args_digest, ActivityError, ActivityResult, RetryPolicy, RunOutcome, RunStatus, ValueRef};
use durflow_execution::{
    ActivityOptions, ActivityRequest, ExecutionError, WorkflowContext, WorkflowEngine,
};
use durflow_mock::{MockBehavior, MockWorker};
use durflow_state::{
    HistoryEntry, HistoryEvent, HistoryStore, InMemoryHistoryStore, RunDetails,
};
use uuid::Uuid;

fn options(maximum_attempts: u32) -> ActivityOptions {
    ActivityOptions::new(Duration::from_secs(30), RetryPolicy::new(maximum_attempts))
}

fn engine_with(store: Arc<dyn HistoryStore>, mock: &MockWorker) -> WorkflowEngine {
    WorkflowEngine::new(store, mock.boxed())
}

fn event_kinds(history: &[(durflow_state::SequenceNumber, HistoryEntry)]) -> Vec<&'static str> {
    history
        .iter()
        .map(|(_, entry)| match entry.event {
            HistoryEvent::RunStarted { .. } => "run_started",
            HistoryEvent::ActivityCompleted { .. } => "activity_completed",
            HistoryEvent::TimerScheduled { .. } => "timer_scheduled",
            HistoryEvent::RunFinished { .. } => "run_finished",
        })
        .collect()
}

async fn single_step(
    ctx: WorkflowContext,
    _params: ValueRef,
) -> durflow_execution::Result<RunOutcome> {
    let result = ctx
        .schedule_activity("step", serde_json::json!({"n": 1}), options(2))
        .await?;
    Ok(RunOutcome::success(result))
}

async fn two_steps(
    ctx: WorkflowContext,
    _params: ValueRef,
) -> durflow_execution::Result<RunOutcome> {
    let a = ctx
        .schedule_activity("step_a", serde_json::json!({"n": 1}), options(2))
        .await?;
    let b = ctx
        .schedule_activity("step_b", serde_json::json!({"n": 2}), options(2))
        .await?;
    Ok(RunOutcome::success(serde_json::json!({
        "a": a.value(),
        "b": b.value(),
    })))
}

#[tokio::test]
async fn single_activity_completes() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let mock = MockWorker::new();
    mock.mock_activity(
        "step",
        serde_json::json!({"n": 1}),
        MockBehavior::result(serde_json::json!({"answer": 42})),
    )
    .await;

    let engine = engine_with(store.clone(), &mock);
    let run = engine
        .submit("test", serde_json::json!({}), single_step)
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Completed);
    let outcome = run.outcome.unwrap();
    assert_eq!(
        outcome.as_success().unwrap().value()["answer"],
        serde_json::json!(42)
    );
    assert_eq!(mock.invocations("step").await, 1);

    let history = store.read_history(run.run_id).await.unwrap();
    assert_eq!(
        event_kinds(&history),
        vec!["run_started", "activity_completed", "run_finished"]
    );
}

#[tokio::test]
async fn completed_activities_replay_without_reinvocation() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let run_id = Uuid::new_v4();

    // History as left behind by a crash after step_a completed.
    let params: ValueRef = serde_json::json!({}).into();
    store
        .create_run(RunDetails::new(run_id, "test", params.clone()))
        .await
        .unwrap();
    store
        .append(HistoryEntry::new(
            run_id,
            HistoryEvent::RunStarted {
                workflow: "test".to_string(),
                params,
            },
        ))
        .await
        .unwrap();
    let args_a: ValueRef = serde_json::json!({"n": 1}).into();
    store
        .append(HistoryEntry::new(
            run_id,
            HistoryEvent::ActivityCompleted {
                position: 0,
                activity: "step_a".to_string(),
                args_digest: args_digest(&args_a),
                attempt: 1,
                duration_ms: 3,
                result: ActivityResult::from(serde_json::json!({"from": "history"})),
            },
        ))
        .await
        .unwrap();

    let mock = MockWorker::new();
    // Only step_b has a behavior: replay must never reach the worker for step_a.
    mock.mock_activity(
        "step_b",
        serde_json::json!({"n": 2}),
        MockBehavior::result(serde_json::json!({"fresh": true})),
    )
    .await;

    let engine = engine_with(store.clone(), &mock);
    let run = engine.resume(run_id, two_steps).await.unwrap();

    assert_eq!(run.status, RunStatus::Completed);
    let outcome = run.outcome.unwrap();
    let value = outcome.as_success().unwrap();
    assert_eq!(value.value()["a"]["from"], serde_json::json!("history"));
    assert_eq!(value.value()["b"]["fresh"], serde_json::json!(true));

    assert_eq!(mock.invocations("step_a").await, 0);
    assert_eq!(mock.invocations("step_b").await, 1);
}

#[tokio::test]
async fn resuming_terminal_run_executes_nothing() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let mock = MockWorker::new();
    mock.mock_activity(
        "step",
        serde_json::json!({"n": 1}),
        MockBehavior::result(serde_json::json!({"answer": 42})),
    )
    .await;

    let engine = engine_with(store.clone(), &mock);
    let first = engine
        .submit("test", serde_json::json!({}), single_step)
        .await
        .unwrap();
    assert_eq!(mock.invocations("step").await, 1);

    let second = engine.resume(first.run_id, single_step).await.unwrap();
    assert_eq!(second.status, RunStatus::Completed);
    assert_eq!(second.outcome, first.outcome);
    assert_eq!(mock.invocations("step").await, 1);
}

#[tokio::test]
async fn transient_failures_retry_until_success() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let mock = MockWorker::new();
    mock.mock_activity(
        "step",
        serde_json::json!({"n": 1}),
        MockBehavior::failure(ActivityError::transient("rate limited")),
    )
    .await;
    mock.mock_activity(
        "step",
        serde_json::json!({"n": 1}),
        MockBehavior::result(serde_json::json!({"answer": 42})),
    )
    .await;

    let engine = engine_with(store.clone(), &mock);
    let run = engine
        .submit("test", serde_json::json!({}), single_step)
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(mock.invocations("step").await, 2);

    // Each attempt is its own record; the backoff timer is durable.
    let history = store.read_history(run.run_id).await.unwrap();
    assert_eq!(
        event_kinds(&history),
        vec![
            "run_started",
            "activity_completed",
            "timer_scheduled",
            "activity_completed",
            "run_finished",
        ]
    );
}

#[tokio::test]
async fn retry_exhaustion_fails_run_after_exact_attempts() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let mock = MockWorker::new();
    mock.mock_activity(
        "step",
        serde_json::json!({"n": 1}),
        MockBehavior::failure(ActivityError::transient("connection reset")),
    )
    .await;

    let engine = engine_with(store.clone(), &mock);
    let run = engine
        .submit("test", serde_json::json!({}), single_step)
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Failed);
    let (error, reason) = run.outcome.unwrap().as_failure().map(|(e, r)| (e.to_string(), r.to_string())).unwrap();
    assert_eq!(error, "Activity 'step' failed");
    assert_eq!(reason, "connection reset");

    // Maximum of 2 attempts means exactly 2 invocations, not more.
    assert_eq!(mock.invocations("step").await, 2);
}

#[tokio::test]
async fn permanent_failures_are_not_retried() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let mock = MockWorker::new();
    mock.mock_activity(
        "step",
        serde_json::json!({"n": 1}),
        MockBehavior::failure(ActivityError::permanent("malformed csv header")),
    )
    .await;

    let engine = engine_with(store.clone(), &mock);
    let run = engine
        .submit("test", serde_json::json!({}), single_step)
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(mock.invocations("step").await, 1);
}

#[tokio::test(start_paused = true)]
async fn timeouts_classify_as_transient_and_retry() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let mock = MockWorker::new();
    mock.mock_activity(
        "step",
        serde_json::json!({"n": 1}),
        MockBehavior::result(serde_json::json!({"late": true}))
            .with_delay(Duration::from_secs(120)),
    )
    .await;
    mock.mock_activity(
        "step",
        serde_json::json!({"n": 1}),
        MockBehavior::result(serde_json::json!({"answer": 42})),
    )
    .await;

    let engine = engine_with(store.clone(), &mock);
    let run = engine
        .submit("test", serde_json::json!({}), single_step)
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(mock.invocations("step").await, 2);

    let history = store.read_history(run.run_id).await.unwrap();
    let first_attempt = history
        .iter()
        .find_map(|(_, entry)| match &entry.event {
            HistoryEvent::ActivityCompleted { attempt: 1, result, .. } => result.failed(),
            _ => None,
        })
        .expect("first attempt should be recorded as failed");
    assert_eq!(first_attempt.kind, durflow_core::FailureKind::Timeout);
}

#[tokio::test(start_paused = true)]
async fn parallel_results_join_in_declaration_order() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let mock = MockWorker::new();
    // The first-declared activity finishes last in real time.
    mock.mock_activity(
        "slow",
        serde_json::json!({"side": "left"}),
        MockBehavior::result(serde_json::json!({"order": "first"}))
            .with_delay(Duration::from_secs(5)),
    )
    .await;
    mock.mock_activity(
        "fast",
        serde_json::json!({"side": "right"}),
        MockBehavior::result(serde_json::json!({"order": "second"})),
    )
    .await;

    async fn fan_out(
        ctx: WorkflowContext,
        _params: ValueRef,
    ) -> durflow_execution::Result<RunOutcome> {
        let results = ctx
            .schedule_parallel(vec![
                ActivityRequest::new("slow", serde_json::json!({"side": "left"}), options(2)),
                ActivityRequest::new("fast", serde_json::json!({"side": "right"}), options(2)),
            ])
            .await?;
        Ok(RunOutcome::success(serde_json::json!({
            "first": results[0].value(),
            "second": results[1].value(),
        })))
    }

    let engine = engine_with(store.clone(), &mock);
    let run = engine
        .submit("test", serde_json::json!({}), fan_out)
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Completed);
    let outcome = run.outcome.unwrap();
    let value = outcome.as_success().unwrap();
    // Declaration order, not completion order, decides the join order.
    assert_eq!(value.value()["first"]["order"], serde_json::json!("first"));
    assert_eq!(value.value()["second"]["order"], serde_json::json!("second"));

    // The fast activity completed (and was recorded) before the slow one.
    let history = store.read_history(run.run_id).await.unwrap();
    let completed_positions: Vec<usize> = history
        .iter()
        .filter_map(|(_, entry)| match &entry.event {
            HistoryEvent::ActivityCompleted { position, .. } => Some(*position),
            _ => None,
        })
        .collect();
    assert_eq!(completed_positions, vec![1, 0]);
}

#[tokio::test]
async fn parallel_failure_surfaces_first_declared() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let mock = MockWorker::new();
    mock.mock_activity(
        "step_a",
        serde_json::json!({"n": 1}),
        MockBehavior::failure(ActivityError::permanent("left broke")),
    )
    .await;
    mock.mock_activity(
        "step_b",
        serde_json::json!({"n": 2}),
        MockBehavior::failure(ActivityError::permanent("right broke")),
    )
    .await;

    async fn fan_out(
        ctx: WorkflowContext,
        _params: ValueRef,
    ) -> durflow_execution::Result<RunOutcome> {
        let results = ctx
            .schedule_parallel(vec![
                ActivityRequest::new("step_a", serde_json::json!({"n": 1}), options(2)),
                ActivityRequest::new("step_b", serde_json::json!({"n": 2}), options(2)),
            ])
            .await?;
        Ok(RunOutcome::success(serde_json::json!(results.len())))
    }

    let engine = engine_with(store.clone(), &mock);
    let run = engine
        .submit("test", serde_json::json!({}), fan_out)
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Failed);
    let outcome = run.outcome.unwrap();
    let (error, reason) = outcome.as_failure().unwrap();
    assert_eq!(error, "Activity 'step_a' failed");
    assert_eq!(reason, "left broke");

    // The join is a barrier: both activities still ran to completion.
    assert_eq!(mock.invocations("step_a").await, 1);
    assert_eq!(mock.invocations("step_b").await, 1);
}

#[tokio::test]
async fn history_mismatch_is_corruption() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let run_id = Uuid::new_v4();
    let params: ValueRef = serde_json::json!({}).into();
    store
        .create_run(RunDetails::new(run_id, "test", params.clone()))
        .await
        .unwrap();
    let args: ValueRef = serde_json::json!({"n": 1}).into();
    store
        .append(HistoryEntry::new(
            run_id,
            HistoryEvent::ActivityCompleted {
                position: 0,
                activity: "something_else".to_string(),
                args_digest: args_digest(&args),
                attempt: 1,
                duration_ms: 1,
                result: ActivityResult::from(serde_json::json!({})),
            },
        ))
        .await
        .unwrap();

    let mock = MockWorker::new();
    let engine = engine_with(store.clone(), &mock);
    let err = engine.resume(run_id, single_step).await.unwrap_err();
    assert!(matches!(
        err.current_context(),
        ExecutionError::HistoryCorruption { position: 0, .. }
    ));

    // Corruption is fatal: the run is marked failed with no outcome.
    let run = store.get_run(run_id).await.unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.outcome.is_none());
}

#[tokio::test(start_paused = true)]
async fn durable_timer_rearms_on_resume() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let run_id = Uuid::new_v4();
    let params: ValueRef = serde_json::json!({}).into();
    store
        .create_run(RunDetails::new(run_id, "test", params.clone()))
        .await
        .unwrap();

    // A crash left behind one failed attempt and an armed backoff timer.
    let args: ValueRef = serde_json::json!({"n": 1}).into();
    store
        .append(HistoryEntry::new(
            run_id,
            HistoryEvent::ActivityCompleted {
                position: 0,
                activity: "step".to_string(),
                args_digest: args_digest(&args),
                attempt: 1,
                duration_ms: 1,
                result: ActivityResult::from(ActivityError::transient("flaky")),
            },
        ))
        .await
        .unwrap();
    store
        .append(HistoryEntry::new(
            run_id,
            HistoryEvent::TimerScheduled {
                position: 0,
                attempt: 2,
                fire_at: chrono::Utc::now() + chrono::Duration::seconds(60),
            },
        ))
        .await
        .unwrap();

    let mock = MockWorker::new();
    mock.mock_activity(
        "step",
        serde_json::json!({"n": 1}),
        MockBehavior::result(serde_json::json!({"answer": 42})),
    )
    .await;

    let engine = engine_with(store.clone(), &mock);
    let run = engine.resume(run_id, single_step).await.unwrap();

    assert_eq!(run.status, RunStatus::Completed);
    // Attempt 1 is replayed from history; only attempt 2 hits the worker.
    assert_eq!(mock.invocations("step").await, 1);
}

#[tokio::test]
async fn resume_unknown_run_fails() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let mock = MockWorker::new();
    let engine = engine_with(store, &mock);

    let missing = Uuid::new_v4();
    let err = engine.resume(missing, single_step).await.unwrap_err();
    assert!(matches!(
        err.current_context(),
        ExecutionError::RunNotFound(run_id) if *run_id == missing
    ));
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_inflight_work() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let mock = MockWorker::new();
    mock.mock_activity(
        "step",
        serde_json::json!({"n": 1}),
        MockBehavior::result(serde_json::json!({"late": true}))
            .with_delay(Duration::from_secs(60)),
    )
    .await;

    let engine = Arc::new(engine_with(store, &mock));
    let handle = tokio::spawn({
        let engine = engine.clone();
        async move {
            engine
                .submit("test", serde_json::json!({}), single_step)
                .await
        }
    });

    // Let the run reach its in-flight invocation, then abort.
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    engine.cancel();

    let err = handle.await.unwrap().unwrap_err();
    assert!(matches!(
        err.current_context(),
        ExecutionError::Cancelled(_)
    ));
}
