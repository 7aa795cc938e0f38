// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serde types for the OpenAI-compatible chat-completions wire format.

use serde::{Deserialize, Serialize};

/// Request body for `POST /chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ApiMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// One chat message on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    pub role: String,
    pub content: String,
}

/// Response body for a successful completion.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub model: Option<String>,
}

/// One completion choice.
#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ApiMessage,
}

/// Error body returned by OpenAI-compatible endpoints.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

/// The inner error detail.
#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_expected_shape() {
        let request = ChatCompletionRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![ApiMessage {
                role: "user".into(),
                content: "hi".into(),
            }],
            temperature: 0.3,
            max_tokens: 2000,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 2000);
    }

    #[test]
    fn response_deserializes_choices() {
        let body = r#"{
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "ok"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 5, "completion_tokens": 1, "total_tokens": 6}
        }"#;
        let response: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.choices.len(), 1);
        assert_eq!(response.choices[0].message.content, "ok");
        assert_eq!(response.model.as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn error_body_deserializes() {
        let body = r#"{"error": {"message": "Rate limited", "type": "rate_limit_error"}}"#;
        let err: ApiErrorResponse = serde_json::from_str(body).unwrap();
        assert_eq!(err.error.message, "Rate limited");
        assert_eq!(err.error.type_.as_deref(), Some("rate_limit_error"));
    }
}
