// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the earshot daemon.
//!
//! One [`Database`] handle per process; all writes funnel through
//! tokio-rusqlite's single background thread, so concurrent ingestion never
//! sees `SQLITE_BUSY`. Schema lives in embedded refinery migrations.

pub mod database;
pub mod migrations;
pub mod queries;

pub use database::Database;
