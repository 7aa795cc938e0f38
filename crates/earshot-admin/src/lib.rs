// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator command channel for the earshot daemon.
//!
//! Applies only to private messages from the single configured operator id.
//! Commands manage the event store; anything that isn't a command is
//! analyzed immediately as one unit, reusing the same analysis client the
//! batcher runs on.

pub mod command;
pub mod service;

pub use command::{AdminCommand, parse_command};
pub use service::AdminService;
