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

//! Typed payload schemas for the CRM activities.
//!
//! Every field is required: a payload missing a field fails
//! deserialization at the boundary instead of surviving as a partially
//! populated record. The engine itself treats these payloads as opaque
//! values; only the activities and the workflow definition decode them.

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The company with the most contacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TopCompany {
    pub name: String,
    pub count: i64,
}

/// Structured summary of a contacts file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ContactAnalysis {
    pub total_contacts: i64,
    pub unique_companies: i64,
    pub top_company: TopCompany,
    /// Contact count per company. Ordered, so serialized output is stable.
    pub companies_distribution: IndexMap<String, i64>,
    pub unique_titles: i64,
}

/// Structured summary of an opportunities file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OpportunityAnalysis {
    pub total_opportunities: i64,
    pub total_pipeline_value: f64,
    pub won_value: f64,
    /// Opportunity count per stage. Ordered, so serialized output is stable.
    pub stages_breakdown: IndexMap<String, i64>,
    /// Value-based win rate: `won_value / total_pipeline_value`, in 0..=1.
    pub win_rate: f64,
}

/// Which analysis a validation call refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    Contacts,
    Opportunities,
}

impl std::fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisType::Contacts => write!(f, "contacts"),
            AnalysisType::Opportunities => write!(f, "opportunities"),
        }
    }
}

/// Pass/fail outcome of a validation activity.
///
/// A failed validation is a successful invocation carrying `passed =
/// false`; it is never retried. The workflow turns it into a terminal
/// business error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationOutcome {
    pub passed: bool,
    pub reason: String,
}

impl ValidationOutcome {
    pub fn passed(reason: impl Into<String>) -> Self {
        Self {
            passed: true,
            reason: reason.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason: reason.into(),
        }
    }
}

/// Both analyses side by side, embedded in the final report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CrmSummary {
    pub contacts: ContactAnalysis,
    pub opportunities: OpportunityAnalysis,
}

/// The workflow's terminal success payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisReport {
    pub crm_summary: CrmSummary,
    pub key_insights: Vec<String>,
    pub status: String,
}
