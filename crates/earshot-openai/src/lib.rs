// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible chat-completion provider for the earshot daemon.

pub mod client;
pub mod types;

pub use client::OpenAiClient;
