// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The analysis client: prompt assembly, the external call, and validation.
//!
//! Without an API credential the provider is absent and every call is a
//! no-op returning zero events -- ingestion and storage keep running, the
//! daemon just stops extracting until a key is configured.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use earshot_config::model::ModelConfig;
use earshot_core::types::StoredMessage;
use earshot_core::{ChatMessage, ChatProvider, ChatRequest, Clock, EarshotError};
use tracing::{debug, warn};

use crate::context;
use crate::parse::{self, ParsedEvent};

/// Fixed system instruction: the three categories, the output contract, and
/// the domain rules. The current civil time is appended per request.
const SYSTEM_INSTRUCTION: &str = "\
You analyze group chat logs and extract actionable items. Exactly three \
categories exist:\n\
- todo: a task someone needs to complete (homework, errands, work items)\n\
- notification: an announcement, reminder, or important information\n\
- entertainment: a social or leisure activity (gatherings, games, outings)\n\n\
The input contains a <to-analyze> block and sometimes a <history> block. \
Extract events ONLY from <to-analyze>; <history> is context for resolving \
references. Do not re-emit anything already stated in <history>.\n\n\
Rules:\n\
- Never split one real event into multiple records.\n\
- If nothing qualifies, return an empty array. Never invent content.\n\
- due_date format: YYYY-MM-DD HH:MM:SS (omit the field if there is none). \
Resolve relative dates against the current time given below.\n\n\
Respond with a single JSON object and nothing else:\n\
{\"events\": [{\"type\": \"todo|notification|entertainment\", \
\"title\": \"short title\", \"description\": \"details\", \
\"priority\": \"low|medium|high\", \"due_date\": \"YYYY-MM-DD HH:MM:SS\"}]}";

/// Client shared by the batcher and the operator channel.
pub struct AnalysisClient {
    provider: Option<Arc<dyn ChatProvider>>,
    clock: Arc<dyn Clock>,
    temperature: f32,
    max_tokens: u32,
    /// Warn about the missing credential once, not per unit.
    warned_disabled: AtomicBool,
}

impl AnalysisClient {
    /// Build the client. `provider` is `None` when no API key is configured.
    pub fn new(
        provider: Option<Arc<dyn ChatProvider>>,
        clock: Arc<dyn Clock>,
        config: &ModelConfig,
    ) -> Self {
        Self {
            provider,
            clock,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            warned_disabled: AtomicBool::new(false),
        }
    }

    /// True when a provider is configured and calls will actually go out.
    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// Analyze one unit (a single message or a chunk) with its history
    /// window as context. Returns the validated events.
    pub async fn analyze_unit(
        &self,
        unit: &[StoredMessage],
        history: &[StoredMessage],
    ) -> Result<Vec<ParsedEvent>, EarshotError> {
        self.run(context::build_context(unit, history)).await
    }

    /// Analyze one free-form operator message as a single immediate unit.
    pub async fn analyze_text(&self, text: &str) -> Result<Vec<ParsedEvent>, EarshotError> {
        let now = self.clock.now();
        self.run(context::build_freeform_context(text, &now)).await
    }

    async fn run(&self, user_content: String) -> Result<Vec<ParsedEvent>, EarshotError> {
        let Some(provider) = &self.provider else {
            if !self.warned_disabled.swap(true, Ordering::Relaxed) {
                warn!("no model credential configured; analysis calls are no-ops");
            }
            return Ok(Vec::new());
        };

        let system = format!(
            "{SYSTEM_INSTRUCTION}\n\nCurrent time: {}",
            self.clock.now().format("%Y-%m-%d %H:%M:%S %:z")
        );

        let request = ChatRequest {
            messages: vec![ChatMessage::system(system), ChatMessage::user(user_content)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        match provider.complete(request).await {
            Ok(response) => {
                debug!(
                    provider = provider.name(),
                    latency_ms = response.latency_ms,
                    raw_len = response.content.len(),
                    "model call succeeded"
                );
                Ok(parse::parse_result(&response.content))
            }
            Err(e) => {
                warn!(provider = provider.name(), error = %e, "model call failed");
                Err(e)
            }
        }
    }
}
