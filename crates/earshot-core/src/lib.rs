// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the earshot daemon.
//!
//! Provides the error type, the domain model (messages, analyzed events,
//! analysis tasks), the civil-time clock abstraction, and the chat-provider
//! trait. Everything else in the workspace builds on this crate.

pub mod clock;
pub mod error;
pub mod traits;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::EarshotError;
pub use traits::{ChatMessage, ChatProvider, ChatRequest, ChatResponse};
pub use types::{
    AnalysisTask, AnalyzedEvent, ConversationId, EventKind, EventStatus, NewEvent, NewMessage,
    Priority, StoredMessage, TaskStatus,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_construct() {
        let _config = EarshotError::Config("bad".into());
        let _storage = EarshotError::Storage {
            source: Box::new(std::io::Error::other("io")),
        };
        let _channel = EarshotError::Channel {
            message: "closed".into(),
            source: None,
        };
        let _provider = EarshotError::Provider {
            message: "api".into(),
            source: None,
        };
        let _timeout = EarshotError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = EarshotError::Internal("oops".into());
    }

    #[test]
    fn error_messages_render() {
        let err = EarshotError::Provider {
            message: "model unreachable".into(),
            source: None,
        };
        assert_eq!(err.to_string(), "provider error: model unreachable");
    }
}
