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

use error_stack::ResultExt as _;

use crate::model::{parse_structured, DynModelClient, ModelClient, ModelRequest};
use crate::records::load_opportunities;
use crate::schemas::OpportunityAnalysis;
use crate::{CrmError, Result};

pub(crate) const OPPORTUNITIES_SYSTEM: &str =
    "You are a sales pipeline analyst. Analyze opportunity data and extract revenue insights. \
     Respond with a single JSON object and nothing else.";

/// Analyze an opportunities CSV file with the analyst model.
pub async fn analyze_opportunities(
    model: &DynModelClient<'_>,
    file_path: &str,
) -> Result<OpportunityAnalysis> {
    tracing::info!(file_path, "analyzing opportunities");

    let records = load_opportunities(file_path)?;
    let data = serde_json::to_string_pretty(&records).change_context(CrmError::Csv {
        path: file_path.to_string(),
    })?;
    let prompt = format!(
        r#"Analyze this CRM opportunities data:

{data}

Extract:
- total_opportunities: total number of opportunities
- total_pipeline_value: sum of all amounts
- won_value: sum of amounts where stage is "Closed Won"
- stages_breakdown: all stages with their opportunity counts (object of stage: count)
- win_rate: won_value / total_pipeline_value (between 0 and 1)

Respond with a JSON object containing exactly these fields."#
    );

    let response = model
        .complete(ModelRequest::new(OPPORTUNITIES_SYSTEM, prompt))
        .await?;
    parse_structured(&response)
}
