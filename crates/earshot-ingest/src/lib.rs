// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingestion for the earshot daemon: the classifier's filter chain and the
//! controller that wires gateway events into either the operator channel or
//! the passive message queue.

pub mod classifier;
pub mod controller;

pub use classifier::MessageFilter;
pub use controller::{HandleOutcome, IngestController, IngestStats, run_loop};
