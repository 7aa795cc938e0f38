// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for OpenAI-compatible chat-completion endpoints.
//!
//! One bounded, non-streaming request per call. There is deliberately no
//! retry here: the analysis batcher treats a failed unit as lost for the
//! pass, and retrying inside the client would reintroduce the poison-batch
//! loop that policy exists to prevent.

use std::time::Duration;

use async_trait::async_trait;
use earshot_core::{ChatProvider, ChatRequest, ChatResponse, EarshotError};
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, ApiMessage, ChatCompletionRequest, ChatCompletionResponse};

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    timeout: Duration,
}

impl OpenAiClient {
    /// Creates a new client.
    ///
    /// # Arguments
    /// * `api_base` - Base URL, e.g. `https://api.openai.com/v1`
    /// * `api_key` - Bearer credential
    /// * `model` - Model identifier sent with every request
    /// * `timeout` - Per-request wall-clock bound
    pub fn new(
        api_base: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, EarshotError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|e| {
                EarshotError::Config(format!("invalid API key header value: {e}"))
            })?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| EarshotError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            model: model.to_string(),
            timeout,
        })
    }
}

#[async_trait]
impl ChatProvider for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, EarshotError> {
        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| ApiMessage {
                    role: m.role.clone(),
                    content: m.content.clone(),
                })
                .collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let started = std::time::Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EarshotError::Timeout {
                        duration: self.timeout,
                    }
                } else {
                    EarshotError::Provider {
                        message: format!("HTTP request failed: {e}"),
                        source: Some(Box::new(e)),
                    }
                }
            })?;

        let status = response.status();
        let latency_ms = started.elapsed().as_millis() as u64;
        debug!(status = %status, latency_ms, "completion response received");

        let text = response.text().await.map_err(|e| EarshotError::Provider {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ApiErrorResponse>(&text) {
                Ok(api_err) => format!(
                    "API error ({}): {}",
                    api_err.error.type_.as_deref().unwrap_or("unknown"),
                    api_err.error.message
                ),
                Err(_) => format!("API returned {status}: {text}"),
            };
            warn!(status = %status, latency_ms, "completion request failed");
            return Err(EarshotError::Provider {
                message,
                source: None,
            });
        }

        let parsed: ChatCompletionResponse =
            serde_json::from_str(&text).map_err(|e| EarshotError::Provider {
                message: format!("failed to parse API response: {e}"),
                source: Some(Box::new(e)),
            })?;

        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            EarshotError::Provider {
                message: "API response contained no choices".into(),
                source: None,
            }
        })?;

        Ok(ChatResponse {
            content: choice.message.content,
            model: parsed.model.unwrap_or_else(|| self.model.clone()),
            latency_ms,
        })
    }
}
