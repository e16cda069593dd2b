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
use crate::records::{self, load_contacts};
use crate::schemas::ContactAnalysis;
use crate::{CrmError, Result};

pub(crate) const CONTACTS_SYSTEM: &str =
    "You are a CRM data analyst. Analyze contact data and extract key insights. \
     Respond with a single JSON object and nothing else.";

/// Analyze a contacts CSV file with the analyst model.
///
/// `unique_titles` is recomputed from the source data and overrides the
/// model's count before the result leaves this activity, so the value
/// recorded in history is already deterministic.
pub async fn analyze_contacts(
    model: &DynModelClient<'_>,
    file_path: &str,
) -> Result<ContactAnalysis> {
    tracing::info!(file_path, "analyzing contacts");

    let records = load_contacts(file_path)?;
    let unique_titles = records::unique_titles(&records) as i64;

    let data = serde_json::to_string_pretty(&records).change_context(CrmError::Csv {
        path: file_path.to_string(),
    })?;
    let prompt = format!(
        r#"Analyze this CRM contacts data:

{data}

Extract:
- total_contacts: total number of contacts (count all rows)
- unique_companies: number of unique companies (count distinct company values)
- top_company: company with most contacts (object with name and count)
- companies_distribution: all companies with their contact counts (object of company_name: count)
- unique_titles: number of unique job titles (count distinct title values - be careful to count each unique title exactly once)

IMPORTANT: Count unique_titles by examining each distinct title value in the data. Do not skip any titles.
Respond with a JSON object containing exactly these fields."#
    );

    let response = model
        .complete(ModelRequest::new(CONTACTS_SYSTEM, prompt))
        .await?;
    let mut analysis: ContactAnalysis = parse_structured(&response)?;

    // Override with the deterministic count; the model miscounts titles.
    analysis.unique_titles = unique_titles;

    Ok(analysis)
}
