//! Reasoning service abstraction and OpenAI Responses API implementation.
//!
//! This module provides a generic [`ReasoningClient`] trait for asking a
//! hosted model for a schema-constrained answer, along with concrete
//! implementations:
//!
//! - [`OpenAiClient`]: production client for the OpenAI Responses API
//! - [`MockReasoningClient`]: test double for unit tests
//!
//! Clients return the raw decoded JSON body. Picking the answer out of the
//! many shapes that body can take is the assessment engine's job.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::config::Config;
use crate::diagnostics::Diagnostics;

/// Characters of the raw response kept in the diagnostics log.
const LOGGED_BODY_CHARS: usize = 800;

/// Characters of an error body carried into the error message.
const ERROR_DETAIL_CHARS: usize = 180;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while asking the reasoning service.
#[derive(Debug, Error)]
pub enum ReasoningError {
    /// No API key is configured.
    #[error("OPENAI_API_KEY is not configured")]
    MissingApiKey,

    /// The service answered with a non-2xx status.
    #[error("OpenAI HTTP {status}: {detail}")]
    Http { status: u16, detail: String },

    /// Connection or transport failure.
    #[error("OpenAI request failed: {0}")]
    Network(String),

    /// The response body was not valid JSON.
    #[error("OpenAI JSON parse failed: {0}")]
    Parse(String),

    /// The body decoded but held nothing matching the declared schema.
    #[error("No assessment returned.")]
    NoAssessment,
}

// ============================================================================
// Request Type
// ============================================================================

/// A structured prompt plus the JSON schema the answer must follow.
#[derive(Debug, Clone, PartialEq)]
pub struct ReasoningRequest {
    /// System-level instructions.
    pub system: String,
    /// User turn, split into separate text blocks.
    pub user: Vec<String>,
    /// Name the response schema is registered under.
    pub schema_name: String,
    /// JSON schema of the structured answer.
    pub schema: Value,
}

// ============================================================================
// ReasoningClient Trait
// ============================================================================

/// Generic interface for reasoning-service clients.
#[async_trait]
pub trait ReasoningClient: Send + Sync {
    /// Send a request and return the decoded response body.
    async fn respond(&self, request: &ReasoningRequest) -> Result<Value, ReasoningError>;
}

// ============================================================================
// OpenAI Responses API Implementation
// ============================================================================

/// Client for the OpenAI Responses API.
pub struct OpenAiClient {
    api_key: String,
    model: String,
    endpoint: String,
    client: reqwest::Client,
    diagnostics: Arc<dyn Diagnostics>,
}

/// Request body for the Responses API.
#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    text: TextOptions<'a>,
    input: Vec<InputMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct TextOptions<'a> {
    format: ResponseFormat<'a>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    name: &'a str,
    schema: &'a Value,
}

#[derive(Debug, Serialize)]
struct InputMessage<'a> {
    role: &'static str,
    content: Vec<InputText<'a>>,
}

#[derive(Debug, Serialize)]
struct InputText<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

impl OpenAiClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ReasoningError::MissingApiKey`] if no key is configured.
    pub fn from_config(
        config: &Config,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Result<Self, ReasoningError> {
        let api_key = config
            .openai_api_key
            .clone()
            .ok_or(ReasoningError::MissingApiKey)?;
        Ok(Self::new(
            api_key,
            config.openai_model.clone(),
            &config.openai_base_url,
            diagnostics,
        ))
    }

    /// Create a client with an explicit key, model and API base URL.
    pub fn new(
        api_key: String,
        model: String,
        base_url: &str,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Self {
        Self {
            api_key,
            model,
            endpoint: format!("{base_url}/responses"),
            client: reqwest::Client::new(),
            diagnostics,
        }
    }
}

fn responses_body<'a>(model: &'a str, request: &'a ReasoningRequest) -> ResponsesRequest<'a> {
    let input_text = |text: &'a String| InputText {
        kind: "input_text",
        text: text.as_str(),
    };

    ResponsesRequest {
        model,
        text: TextOptions {
            format: ResponseFormat {
                kind: "json_schema",
                name: &request.schema_name,
                schema: &request.schema,
            },
        },
        input: vec![
            InputMessage {
                role: "system",
                content: vec![input_text(&request.system)],
            },
            InputMessage {
                role: "user",
                content: request.user.iter().map(input_text).collect(),
            },
        ],
    }
}

#[async_trait]
impl ReasoningClient for OpenAiClient {
    async fn respond(&self, request: &ReasoningRequest) -> Result<Value, ReasoningError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&responses_body(&self.model, request))
            .send()
            .await
            .map_err(|e| ReasoningError::Network(e.to_string()))?;

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default();
        let raw_body = response
            .text()
            .await
            .map_err(|e| ReasoningError::Network(e.to_string()))?;

        self.diagnostics
            .append(
                "openai",
                "response",
                json!({
                    "status": status.as_u16(),
                    "statusText": status_text,
                    "body": truncate_chars(&raw_body, LOGGED_BODY_CHARS),
                }),
            )
            .await;

        if !status.is_success() {
            let detail = truncate_chars(&raw_body, ERROR_DETAIL_CHARS);
            return Err(ReasoningError::Http {
                status: status.as_u16(),
                detail: if detail.is_empty() {
                    status_text.to_string()
                } else {
                    detail
                },
            });
        }

        serde_json::from_str(&raw_body).map_err(|e| ReasoningError::Parse(e.to_string()))
    }
}

/// Keep at most `max` characters of `text`.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

// ============================================================================
// Mock Implementation (Test Only)
// ============================================================================

/// Mock reasoning client for testing. Returns pre-programmed results in FIFO order.
#[cfg(test)]
pub struct MockReasoningClient {
    /// Pre-programmed results to return in FIFO order.
    pub responses: std::sync::Mutex<std::collections::VecDeque<Result<Value, ReasoningError>>>,
    /// Every request received, in order.
    pub requests: std::sync::Mutex<Vec<ReasoningRequest>>,
}

#[cfg(test)]
impl MockReasoningClient {
    /// Create a mock answering each call with the next body in `responses`.
    pub fn new(responses: Vec<Value>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    /// Create a mock that can also fail.
    pub fn with_results(results: Vec<Result<Value, ReasoningError>>) -> Self {
        Self {
            responses: std::sync::Mutex::new(results.into()),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[cfg(test)]
#[async_trait]
impl ReasoningClient for MockReasoningClient {
    async fn respond(&self, request: &ReasoningRequest) -> Result<Value, ReasoningError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("MockReasoningClient: no more responses available")
    }
}

// ============================================================================
// Tests
// ============================================================================
