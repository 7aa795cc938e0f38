// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator command grammar.
//!
//! The first whitespace-delimited token decides, case-insensitively. Any
//! unrecognized first token means the whole message is free-form content
//! for immediate analysis -- operators mostly just talk to the daemon.

/// A parsed operator message.
#[derive(Debug, Clone, PartialEq)]
pub enum AdminCommand {
    /// List every non-completed event, expired included.
    ListAll,
    /// Delete one event by id.
    Delete(i64),
    /// A delete alias without a usable numeric argument.
    DeleteUsage,
    /// Static help text.
    Help,
    /// Everything else: analyze the message as a single immediate unit.
    FreeForm(String),
}

const LIST_ALIASES: [&str; 3] = ["all", "/all", "ls"];
const DELETE_ALIASES: [&str; 5] = ["del", "/del", "delete", "/delete", "rm"];
const HELP_ALIASES: [&str; 2] = ["help", "/help"];

/// Parse one operator message into a command.
pub fn parse_command(text: &str) -> AdminCommand {
    let trimmed = text.trim();
    let lower = trimmed.to_lowercase();
    let mut tokens = lower.split_whitespace();
    let first = tokens.next().unwrap_or("");

    if LIST_ALIASES.contains(&first) {
        return AdminCommand::ListAll;
    }

    if DELETE_ALIASES.contains(&first) {
        return match tokens.next().and_then(|arg| arg.parse::<i64>().ok()) {
            Some(id) => AdminCommand::Delete(id),
            None => AdminCommand::DeleteUsage,
        };
    }

    if HELP_ALIASES.contains(&first) {
        return AdminCommand::Help;
    }

    AdminCommand::FreeForm(trimmed.to_string())
}
