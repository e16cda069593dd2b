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

//! The CRM analysis pipeline.
//!
//! Four activities — two model-backed analyses, a hybrid validator, and a
//! deterministic aggregation — plus the workflow definition that wires
//! them into a parallel-then-gate pipeline on top of the Durflow engine.

mod combine;
mod contacts;
mod error;
mod model;
mod opportunities;
mod pipeline;
mod records;
mod schemas;
mod validate;
mod worker;

pub use combine::combine_analysis;
pub use contacts::analyze_contacts;
pub use error::{CrmError, Result};
pub use model::{DynModelClient, ModelClient, ModelRequest, OpenAiModelClient};
pub use opportunities::analyze_opportunities;
pub use pipeline::{crm_analysis, CrmAnalysisParams, WORKFLOW_NAME};
pub use records::{load_contacts, load_opportunities, ContactRecord, OpportunityRecord};
pub use schemas::{
    AnalysisReport, AnalysisType, ContactAnalysis, CrmSummary, OpportunityAnalysis, TopCompany,
    ValidationOutcome,
};
pub use validate::validate_analysis;
pub use worker::CrmWorker;
