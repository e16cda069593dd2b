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

//! Source CSV records and the deterministic counts derived from them.

use std::collections::HashSet;

use error_stack::ResultExt as _;
use serde::{Deserialize, Serialize};

use crate::{CrmError, Result};

/// One row of a contacts CSV file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub email: String,
}

/// One row of an opportunities CSV file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunityRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub stage: String,
    #[serde(default)]
    pub amount: f64,
}

pub fn load_contacts(path: &str) -> Result<Vec<ContactRecord>> {
    read_records(path)
}

pub fn load_opportunities(path: &str) -> Result<Vec<OpportunityRecord>> {
    read_records(path)
}

fn read_records<T: serde::de::DeserializeOwned>(path: &str) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path).change_context_lazy(|| CrmError::SourceFile {
        path: path.to_string(),
    })?;
    reader
        .deserialize()
        .collect::<std::result::Result<Vec<T>, _>>()
        .change_context_lazy(|| CrmError::Csv {
            path: path.to_string(),
        })
}

/// Number of distinct non-empty company values.
pub(crate) fn unique_companies(records: &[ContactRecord]) -> usize {
    records
        .iter()
        .filter(|record| !record.company.is_empty())
        .map(|record| record.company.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// Number of distinct non-empty title values.
pub(crate) fn unique_titles(records: &[ContactRecord]) -> usize {
    records
        .iter()
        .filter(|record| !record.title.is_empty())
        .map(|record| record.title.as_str())
        .collect::<HashSet<_>>()
        .len()
}
