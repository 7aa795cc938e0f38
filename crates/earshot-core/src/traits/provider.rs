// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat-completion provider trait.
//!
//! The analysis client talks to the model exclusively through this trait so
//! tests can substitute a queue-backed mock and the HTTP implementation can
//! live in its own crate.

use async_trait::async_trait;

use crate::error::EarshotError;

/// One message in a chat-completion request.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    /// "system", "user", or "assistant".
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A single chat-completion request.
///
/// The provider supplies the model identifier itself; callers only shape the
/// conversation and sampling parameters.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A completed (non-streaming) chat response.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Raw assistant text, unparsed.
    pub content: String,
    /// Model that produced the response.
    pub model: String,
    /// Wall-clock latency of the call, for observability.
    pub latency_ms: u64,
}

/// Adapter for chat-completion model backends.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Human-readable provider name for logs.
    fn name(&self) -> &str;

    /// Send one request and wait for the full response.
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, EarshotError>;
}
