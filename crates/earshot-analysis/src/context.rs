// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt context construction.
//!
//! The model sees two clearly delimited blocks: recent conversation history
//! (context only, never an analysis subject) and the messages under
//! analysis. Keeping the delimiters stable matters -- the system instruction
//! refers to them by name when telling the model what to skip.

use earshot_core::clock;
use earshot_core::types::StoredMessage;

/// Render one message as a prompt line.
pub fn render_line(msg: &StoredMessage) -> String {
    let time = clock::from_unix(msg.timestamp).format("%Y-%m-%d %H:%M:%S");
    format!("{} said at {}: {}", msg.display_name(), time, msg.text)
}

/// Build the user-turn content for one analysis unit.
///
/// History renders first (when present) so the to-analyze block sits
/// closest to the model's answer.
pub fn build_context(unit: &[StoredMessage], history: &[StoredMessage]) -> String {
    let mut out = String::new();

    if !history.is_empty() {
        out.push_str("<history>\n");
        for msg in history {
            out.push_str(&render_line(msg));
            out.push('\n');
        }
        out.push_str("</history>\n\n");
    }

    out.push_str("<to-analyze>\n");
    for msg in unit {
        out.push_str(&render_line(msg));
        out.push('\n');
    }
    out.push_str("</to-analyze>");

    out
}

/// Build the user-turn content for an operator free-form request: a single
/// message, no history lane.
pub fn build_freeform_context(text: &str, now: &chrono::DateTime<chrono::FixedOffset>) -> String {
    format!(
        "<to-analyze>\noperator said at {}: {}\n</to-analyze>",
        now.format("%Y-%m-%d %H:%M:%S"),
        text
    )
}
