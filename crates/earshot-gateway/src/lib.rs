// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket gateway listener for the earshot daemon.
//!
//! The external message gateway reverse-connects here. This crate owns the
//! connection registry, frame classification, and both outbound send paths
//! (`send` to one connection, `broadcast` to all). Accepted message events
//! leave through an mpsc channel; the ingestion loop lives elsewhere.

pub mod auth;
pub mod registry;
pub mod server;
pub mod wire;
pub mod ws;

pub use auth::AuthConfig;
pub use registry::{ConnectionRegistry, RegistrySnapshot};
pub use server::{GatewayState, ServerConfig, start_server};
pub use wire::{Envelope, Frame, InboundEvent, MessagePayload, Segment, Sender, private_message_action};
