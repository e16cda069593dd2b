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

//! Hybrid analysis validation.
//!
//! Deterministic checks run first and fail fast: schema shape, value
//! ranges, internal consistency, and a cross-reference of every count
//! against the source file. Contacts validation stops there — the source
//! cross-reference already verifies all counts. Opportunities validation
//! escalates to the model for a semantic review of what deterministic
//! checks cannot see (hallucinated values, win-rate reasoning).

use std::path::Path;

use durflow_core::ValueRef;

use crate::model::{parse_structured, DynModelClient, ModelClient, ModelRequest};
use crate::records::{self, load_contacts};
use crate::schemas::{AnalysisType, ContactAnalysis, OpportunityAnalysis, ValidationOutcome};
use crate::Result;

pub(crate) const VALIDATOR_SYSTEM: &str =
    "You are a data quality validator. Check for semantic issues and hallucinations. \
     Respond with a single JSON object and nothing else.";

/// Validate an analysis payload.
///
/// Returns a [`ValidationOutcome`]; `passed = false` is a successful
/// invocation carrying a rejection, not an error. Only infrastructure
/// trouble (unreadable source file, model transport) produces an `Err`.
pub async fn validate_analysis(
    model: &DynModelClient<'_>,
    analysis_type: AnalysisType,
    analysis: &ValueRef,
    source_file: Option<&str>,
) -> Result<ValidationOutcome> {
    tracing::info!(%analysis_type, "validating analysis");

    let deterministic = match analysis_type {
        AnalysisType::Contacts => validate_contacts(analysis, source_file)?,
        AnalysisType::Opportunities => validate_opportunities(analysis),
    };
    if !deterministic.passed {
        // Fail fast, save model costs.
        return Ok(deterministic);
    }

    match analysis_type {
        // The source cross-reference already verified every count; a model
        // pass would add nothing.
        AnalysisType::Contacts => Ok(ValidationOutcome::passed(
            "Deterministic validation passed - all counts verified against source data",
        )),
        AnalysisType::Opportunities => semantic_validate(model, analysis).await,
    }
}

fn validate_contacts(
    analysis: &ValueRef,
    source_file: Option<&str>,
) -> Result<ValidationOutcome> {
    let analysis: ContactAnalysis = match analysis.deserialize() {
        Ok(analysis) => analysis,
        Err(e) => {
            return Ok(ValidationOutcome::failed(format!(
                "Missing or invalid fields: {e}"
            )));
        }
    };

    let counts = [
        ("total_contacts", analysis.total_contacts),
        ("unique_companies", analysis.unique_companies),
        ("unique_titles", analysis.unique_titles),
        ("top_company.count", analysis.top_company.count),
    ];
    for (key, value) in counts {
        if value < 0 {
            return Ok(ValidationOutcome::failed(format!(
                "Negative value for {key}: {value}"
            )));
        }
    }
    for (company, count) in &analysis.companies_distribution {
        if *count < 0 {
            return Ok(ValidationOutcome::failed(format!(
                "Negative value for companies_distribution[{company}]: {count}"
            )));
        }
    }

    if analysis.total_contacts < analysis.unique_companies {
        return Ok(ValidationOutcome::failed("total_contacts < unique_companies"));
    }

    // The distribution must account for every contact, whatever the source.
    let dist_sum: i64 = analysis.companies_distribution.values().sum();
    if dist_sum != analysis.total_contacts {
        return Ok(ValidationOutcome::failed(format!(
            "companies_distribution sum ({dist_sum}) doesn't match total_contacts ({})",
            analysis.total_contacts
        )));
    }

    // Cross-reference with the actual data if available.
    if let Some(path) = source_file.filter(|path| Path::new(path).exists()) {
        let source = load_contacts(path)?;
        let actual_total = source.len() as i64;
        let actual_unique_companies = records::unique_companies(&source) as i64;
        let actual_unique_titles = records::unique_titles(&source) as i64;

        if analysis.total_contacts != actual_total {
            return Ok(ValidationOutcome::failed(format!(
                "total_contacts mismatch: reported {}, actual {actual_total}",
                analysis.total_contacts
            )));
        }
        if analysis.unique_companies != actual_unique_companies {
            return Ok(ValidationOutcome::failed(format!(
                "unique_companies mismatch: reported {}, actual {actual_unique_companies}",
                analysis.unique_companies
            )));
        }
        if analysis.unique_titles != actual_unique_titles {
            return Ok(ValidationOutcome::failed(format!(
                "unique_titles mismatch: reported {}, actual {actual_unique_titles}",
                analysis.unique_titles
            )));
        }
    }

    Ok(ValidationOutcome::passed("Deterministic checks passed"))
}

fn validate_opportunities(analysis: &ValueRef) -> ValidationOutcome {
    let analysis: OpportunityAnalysis = match analysis.deserialize() {
        Ok(analysis) => analysis,
        Err(e) => {
            return ValidationOutcome::failed(format!("Missing or invalid fields: {e}"));
        }
    };

    if analysis.total_opportunities < 0 {
        return ValidationOutcome::failed(format!(
            "Negative value for total_opportunities: {}",
            analysis.total_opportunities
        ));
    }
    for (key, value) in [
        ("total_pipeline_value", analysis.total_pipeline_value),
        ("won_value", analysis.won_value),
    ] {
        if value < 0.0 {
            return ValidationOutcome::failed(format!("Negative value for {key}: {value}"));
        }
    }
    for (stage, count) in &analysis.stages_breakdown {
        if *count < 0 {
            return ValidationOutcome::failed(format!(
                "Negative value for stages_breakdown[{stage}]: {count}"
            ));
        }
    }

    if !(0.0..=1.0).contains(&analysis.win_rate) {
        return ValidationOutcome::failed(format!(
            "Invalid rate win_rate: {}",
            analysis.win_rate
        ));
    }

    if analysis.won_value > analysis.total_pipeline_value {
        return ValidationOutcome::failed("won_value > total_pipeline_value");
    }

    ValidationOutcome::passed("Deterministic checks passed")
}

async fn semantic_validate(
    model: &DynModelClient<'_>,
    analysis: &ValueRef,
) -> Result<ValidationOutcome> {
    let data = serde_json::to_string_pretty(analysis.value()).unwrap_or_default();
    let prompt = format!(
        r#"Validate this opportunities analysis for semantic correctness.

Data: {data}

IMPORTANT CONTEXT:
- win_rate is calculated as VALUE-BASED, not count-based: win_rate = won_value / total_pipeline_value
- This means win_rate represents the percentage of revenue won, not the percentage of opportunities won
- For example: if won_value=$80,000 and total_pipeline_value=$130,000, then win_rate=0.6154 (61.54%)
- Do NOT expect win_rate to equal (number of Closed Won opportunities) / (total opportunities)

Check for:
1. Hallucinated or nonsensical values (e.g., impossible company names, weird numbers)
2. Semantic inconsistencies (e.g., distributions don't match totals)
3. win_rate should equal won_value / total_pipeline_value (value-based calculation)

The data already passed basic checks (fields exist, no negatives, rates are 0-1).
Focus ONLY on semantic/logical issues an LLM might introduce.

Respond with a JSON object: {{"passed": true}} if semantically valid, {{"passed": false, "reason": "..."}} if you detect hallucinations. Always include a reason string."#
    );

    let response = model
        .complete(ModelRequest::new(VALIDATOR_SYSTEM, prompt))
        .await?;
    parse_structured(&response)
}
