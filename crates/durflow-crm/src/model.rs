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

//! The analyst model boundary.
//!
//! Activities talk to the model through [`ModelClient`], so tests can
//! substitute a scripted client and never touch the network.

use error_stack::ResultExt as _;
use openai_api_rs::v1::{api::OpenAIClient, chat_completion};

use crate::{CrmError, Result};

/// A single structured-output request to the analyst model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    /// Role description for the model.
    pub system: String,
    /// The task prompt. Instructs strict-JSON output.
    pub prompt: String,
}

impl ModelRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
        }
    }
}

#[trait_variant::make(Send)]
#[dynosaur::dynosaur(pub DynModelClient = dyn ModelClient)]
pub trait ModelClient: Send + Sync {
    /// Generate a completion for the request and return the raw text.
    async fn complete(&self, request: ModelRequest) -> Result<String>;
}

/// OpenAI chat-completion backed model client.
pub struct OpenAiModelClient {
    model: String,
    api_key: Option<String>,
}

impl OpenAiModelClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_key: None,
        }
    }

    /// Override the API key instead of reading `OPENAI_API_KEY`.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

impl ModelClient for OpenAiModelClient {
    async fn complete(&self, request: ModelRequest) -> Result<String> {
        let api_key = if let Some(api_key) = &self.api_key {
            api_key.to_owned()
        } else if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            api_key
        } else {
            error_stack::bail!(CrmError::MissingEnv("OPENAI_API_KEY"));
        };

        let mut client = OpenAIClient::builder()
            .with_api_key(api_key)
            .build()
            .map_err(|e| {
                tracing::error!("OpenAI client error: {:?}", e);
                error_stack::report!(CrmError::Model)
            })?;

        let messages = vec![
            chat_completion::ChatCompletionMessage {
                role: chat_completion::MessageRole::system,
                content: chat_completion::Content::Text(request.system),
                name: None,
                tool_calls: None,
                tool_call_id: None,
            },
            chat_completion::ChatCompletionMessage {
                role: chat_completion::MessageRole::user,
                content: chat_completion::Content::Text(request.prompt),
                name: None,
                tool_calls: None,
                tool_call_id: None,
            },
        ];

        let req = chat_completion::ChatCompletionRequest::new(self.model.clone(), messages);

        let result = client
            .chat_completion(req)
            .await
            .change_context(CrmError::Model)
            .attach_printable("generating completion")?;

        let choice = result
            .choices
            .first()
            .ok_or(CrmError::ModelResponse)
            .attach_printable("missing completion choice")?;
        Ok(choice.message.content.clone().unwrap_or_default())
    }
}

/// Parse a model response into a typed payload.
///
/// Tolerates a Markdown code fence around the JSON body, which chat
/// models emit even when told not to.
pub(crate) fn parse_structured<T: serde::de::DeserializeOwned>(response: &str) -> Result<T> {
    let body = response.trim();
    let body = body
        .strip_prefix("```json")
        .or_else(|| body.strip_prefix("```"))
        .map(str::trim_start)
        .unwrap_or(body);
    let body = body.strip_suffix("```").map(str::trim_end).unwrap_or(body);

    serde_json::from_str(body)
        .change_context(CrmError::ModelResponse)
        .attach_printable_lazy(|| format!("unparseable model response: {body}"))
}
