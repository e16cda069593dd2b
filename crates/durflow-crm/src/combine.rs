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

use crate::schemas::{AnalysisReport, ContactAnalysis, CrmSummary, OpportunityAnalysis};

/// Combine both analyses into the final CRM report.
///
/// Pure aggregation over already-validated payloads; no model involved.
pub fn combine_analysis(
    contacts: &ContactAnalysis,
    opportunities: &OpportunityAnalysis,
) -> AnalysisReport {
    tracing::info!("combining analyses into final report");

    AnalysisReport {
        crm_summary: CrmSummary {
            contacts: contacts.clone(),
            opportunities: opportunities.clone(),
        },
        key_insights: vec![
            format!(
                "Managing {} contacts across {} companies",
                contacts.total_contacts, contacts.unique_companies
            ),
            format!(
                "Top customer: {} ({} contacts)",
                contacts.top_company.name, contacts.top_company.count
            ),
            format!(
                "Pipeline value: ${} across {} opportunities",
                format_thousands(opportunities.total_pipeline_value),
                opportunities.total_opportunities
            ),
            format!(
                "Closed revenue: ${} (Win rate: {})",
                format_thousands(opportunities.won_value),
                format_percent(opportunities.win_rate)
            ),
        ],
        status: "analysis_completed_successfully".to_string(),
    }
}

/// Round to whole units and group digits with commas: 130000.0 → "130,000".
fn format_thousands(value: f64) -> String {
    let negative = value < 0.0;
    let digits = (value.abs().round() as u64).to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if negative {
        grouped.push('-');
    }
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Render a 0..=1 rate as a percentage with one decimal: 0.6154 → "61.5%".
fn format_percent(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}
