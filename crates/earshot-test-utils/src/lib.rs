// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared mocks and harnesses for earshot tests.

pub mod harness;
pub mod mock_provider;

pub use harness::TestDb;
pub use mock_provider::MockProvider;
