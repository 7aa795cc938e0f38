// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits implemented by pluggable backends.

pub mod provider;

pub use provider::{ChatMessage, ChatProvider, ChatRequest, ChatResponse};
