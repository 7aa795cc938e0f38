// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat provider for deterministic testing.
//!
//! `MockProvider` implements `ChatProvider` with pre-configured outcomes,
//! enabling fast, CI-runnable tests without external API calls.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use earshot_core::{ChatProvider, ChatRequest, ChatResponse, EarshotError};

/// A mock provider that pops outcomes from a FIFO queue.
///
/// When the queue is empty, a valid empty-result payload (`{"events":[]}`)
/// is returned so accidental extra calls parse cleanly instead of failing
/// unrelated assertions.
pub struct MockProvider {
    outcomes: Arc<Mutex<VecDeque<Result<String, String>>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl MockProvider {
    /// Create a new mock provider with an empty outcome queue.
    pub fn new() -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock provider pre-loaded with successful responses.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(responses.into_iter().map(Ok).collect())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a successful response.
    pub async fn add_response(&self, text: impl Into<String>) {
        self.outcomes.lock().await.push_back(Ok(text.into()));
    }

    /// Queue a provider failure.
    pub async fn add_failure(&self, message: impl Into<String>) {
        self.outcomes.lock().await.push_back(Err(message.into()));
    }

    /// Requests received so far, in call order.
    pub async fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().await.clone()
    }

    /// Number of calls made.
    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, EarshotError> {
        self.requests.lock().await.push(request);

        let outcome = self
            .outcomes
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(r#"{"events":[]}"#.to_string()));

        match outcome {
            Ok(content) => Ok(ChatResponse {
                content,
                model: "mock-model".to_string(),
                latency_ms: 1,
            }),
            Err(message) => Err(EarshotError::Provider {
                message,
                source: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use earshot_core::ChatMessage;

    fn request() -> ChatRequest {
        ChatRequest {
            messages: vec![ChatMessage::user("hello")],
            temperature: 0.3,
            max_tokens: 100,
        }
    }

    #[tokio::test]
    async fn responses_returned_in_order_then_default() {
        let provider = MockProvider::with_responses(vec!["first".into(), "second".into()]);
        assert_eq!(provider.complete(request()).await.unwrap().content, "first");
        assert_eq!(provider.complete(request()).await.unwrap().content, "second");
        assert_eq!(
            provider.complete(request()).await.unwrap().content,
            r#"{"events":[]}"#
        );
        assert_eq!(provider.call_count().await, 3);
    }

    #[tokio::test]
    async fn queued_failure_surfaces_as_provider_error() {
        let provider = MockProvider::new();
        provider.add_failure("simulated outage").await;
        let err = provider.complete(request()).await.unwrap_err();
        assert!(err.to_string().contains("simulated outage"));
    }

    #[tokio::test]
    async fn requests_are_recorded() {
        let provider = MockProvider::new();
        provider.complete(request()).await.unwrap();
        let seen = provider.requests().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].messages[0].content, "hello");
    }
}
