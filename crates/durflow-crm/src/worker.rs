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

use error_stack::ResultExt as _;
use serde::Deserialize;

use durflow_core::{ActivityError, ActivityResult, ValueRef};
use durflow_worker::{
    ActivityContext, ActivityInfo, ActivityWorker, DynActivityWorker, Result as WorkerResult,
    WorkerError,
};

use crate::model::{DynModelClient, ModelClient};
use crate::schemas::{AnalysisType, ContactAnalysis, OpportunityAnalysis};
use crate::{analyze_contacts, analyze_opportunities, combine_analysis, validate_analysis};

#[derive(Deserialize)]
struct AnalyzeInput {
    file_path: String,
}

#[derive(Deserialize)]
struct ValidateInput {
    analysis_type: AnalysisType,
    analysis: ValueRef,
    #[serde(default)]
    source_file: Option<String>,
}

#[derive(Deserialize)]
struct CombineInput {
    contact_analysis: ContactAnalysis,
    opp_analysis: OpportunityAnalysis,
}

/// Worker executing the four CRM analysis activities.
pub struct CrmWorker {
    model: Arc<DynModelClient<'static>>,
}

impl CrmWorker {
    pub fn new(model: Box<DynModelClient<'static>>) -> Self {
        Self {
            model: Arc::from(model),
        }
    }

    /// Build a worker around a concrete model client.
    pub fn with_client(client: impl ModelClient + 'static) -> Self {
        Self::new(DynModelClient::boxed(client))
    }

    /// Box this worker for handing to an engine.
    pub fn boxed(self) -> Box<DynActivityWorker<'static>> {
        DynActivityWorker::boxed(self)
    }
}

impl ActivityWorker for CrmWorker {
    async fn activities(&self) -> WorkerResult<Vec<ActivityInfo>> {
        Ok(vec![
            ActivityInfo::new(
                "analyze_contacts",
                "Analyze a contacts CSV file with the analyst model",
            ),
            ActivityInfo::new(
                "analyze_opportunities",
                "Analyze an opportunities CSV file with the analyst model",
            ),
            ActivityInfo::new(
                "validate_analysis",
                "Deterministically and semantically validate an analysis payload",
            ),
            ActivityInfo::new(
                "combine_analysis",
                "Combine both analyses into the final CRM report",
            ),
        ])
    }

    async fn execute(
        &self,
        activity: &str,
        context: ActivityContext,
        input: ValueRef,
    ) -> WorkerResult<ActivityResult> {
        tracing::debug!(
            activity,
            run_id = %context.run_id(),
            attempt = context.attempt(),
            "executing activity"
        );

        match activity {
            "analyze_contacts" => {
                let args: AnalyzeInput = decode(activity, &input)?;
                to_activity_result(analyze_contacts(&self.model, &args.file_path).await)
            }
            "analyze_opportunities" => {
                let args: AnalyzeInput = decode(activity, &input)?;
                to_activity_result(analyze_opportunities(&self.model, &args.file_path).await)
            }
            "validate_analysis" => {
                let args: ValidateInput = decode(activity, &input)?;
                to_activity_result(
                    validate_analysis(
                        &self.model,
                        args.analysis_type,
                        &args.analysis,
                        args.source_file.as_deref(),
                    )
                    .await,
                )
            }
            "combine_analysis" => {
                let args: CombineInput = decode(activity, &input)?;
                let report = combine_analysis(&args.contact_analysis, &args.opp_analysis);
                let value =
                    serde_json::to_value(report).change_context(WorkerError::Internal)?;
                Ok(ActivityResult::from(value))
            }
            _ => Err(WorkerError::UnknownActivity(activity.to_string()).into()),
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(
    activity: &str,
    input: &ValueRef,
) -> WorkerResult<T> {
    input.deserialize().change_context(WorkerError::InvalidInput {
        activity: activity.to_string(),
    })
}

/// Map an activity outcome into the engine-visible result, carrying the
/// failure classification across the boundary.
fn to_activity_result<T: serde::Serialize>(
    result: crate::Result<T>,
) -> WorkerResult<ActivityResult> {
    match result {
        Ok(payload) => {
            let value = serde_json::to_value(payload).change_context(WorkerError::Internal)?;
            Ok(ActivityResult::from(value))
        }
        Err(report) => {
            let kind = report.current_context().failure_kind();
            tracing::warn!(%kind, "activity failed: {report:?}");
            Ok(ActivityResult::from(ActivityError::new(
                kind,
                report.to_string(),
            )))
        }
    }
}
