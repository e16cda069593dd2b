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

//! The CRM analysis workflow definition.
//!
//! A deterministic pipeline over the engine's scheduling primitives:
//!
//! 1. Fan out `analyze_contacts` and `analyze_opportunities` in parallel
//!    and join on both.
//! 2. Validate the contact analysis, then the opportunity analysis —
//!    always in that order, whatever finished first. A rejection ends the
//!    run immediately with a business error; nothing further is
//!    scheduled.
//! 3. Combine both payloads into the final report.

use std::time::Duration;

use error_stack::ResultExt as _;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use durflow_core::{RetryPolicy, RunOutcome, ValueRef};
use durflow_execution::{
    ActivityOptions, ActivityRequest, ExecutionError, WorkflowContext,
};

use crate::schemas::ValidationOutcome;

pub const WORKFLOW_NAME: &str = "crm-analysis";

const ANALYSIS_TIMEOUT: Duration = Duration::from_secs(120);
const VALIDATION_TIMEOUT: Duration = Duration::from_secs(30);
const COMBINE_TIMEOUT: Duration = Duration::from_secs(30);
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Parameters for a CRM analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CrmAnalysisParams {
    pub contacts_file: String,
    pub opportunities_file: String,
}

/// Run the CRM analysis pipeline to its terminal result.
pub async fn crm_analysis(
    ctx: WorkflowContext,
    params: ValueRef,
) -> durflow_execution::Result<RunOutcome> {
    let params: CrmAnalysisParams = params
        .deserialize()
        .change_context(ExecutionError::internal("invalid CRM analysis parameters"))?;

    let analysis_policy = RetryPolicy::new(2).with_fixed_backoff(RETRY_BACKOFF);

    // Parallel execution: analyze contacts and opportunities concurrently.
    let analyses = ctx
        .schedule_parallel(vec![
            ActivityRequest::new(
                "analyze_contacts",
                serde_json::json!({"file_path": params.contacts_file.clone()}),
                ActivityOptions::new(ANALYSIS_TIMEOUT, analysis_policy),
            ),
            ActivityRequest::new(
                "analyze_opportunities",
                serde_json::json!({"file_path": params.opportunities_file.clone()}),
                ActivityOptions::new(ANALYSIS_TIMEOUT, analysis_policy),
            ),
        ])
        .await?;
    let [contact_analysis, opportunity_analysis]: [ValueRef; 2] = analyses
        .try_into()
        .map_err(|_| ExecutionError::internal("parallel analysis returned unexpected arity"))?;

    // Checkpoint: both analyses complete and recorded.

    let validation_options = ActivityOptions::new(VALIDATION_TIMEOUT, analysis_policy);
    let contact_validation: ValidationOutcome = ctx
        .schedule_activity(
            "validate_analysis",
            serde_json::json!({
                "analysis_type": "contacts",
                "analysis": contact_analysis.value(),
                "source_file": params.contacts_file,
            }),
            validation_options,
        )
        .await?
        .deserialize()
        .change_context(ExecutionError::internal("malformed validation outcome"))?;

    if !contact_validation.passed {
        return Ok(RunOutcome::failure(
            "Contact analysis validation failed",
            contact_validation.reason,
        ));
    }

    let opp_validation: ValidationOutcome = ctx
        .schedule_activity(
            "validate_analysis",
            serde_json::json!({
                "analysis_type": "opportunities",
                "analysis": opportunity_analysis.value(),
                "source_file": params.opportunities_file,
            }),
            validation_options,
        )
        .await?
        .deserialize()
        .change_context(ExecutionError::internal("malformed validation outcome"))?;

    if !opp_validation.passed {
        return Ok(RunOutcome::failure(
            "Opportunity analysis validation failed",
            opp_validation.reason,
        ));
    }

    // Checkpoint: validations passed.

    let report = ctx
        .schedule_activity(
            "combine_analysis",
            serde_json::json!({
                "contact_analysis": contact_analysis.value(),
                "opp_analysis": opportunity_analysis.value(),
            }),
            ActivityOptions::new(
                COMBINE_TIMEOUT,
                RetryPolicy::new(3).with_fixed_backoff(RETRY_BACKOFF),
            ),
        )
        .await?;

    Ok(RunOutcome::success(report))
}
