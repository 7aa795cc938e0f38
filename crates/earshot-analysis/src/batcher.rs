// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The analysis batcher: drains the unprocessed backlog into bounded model
//! work units.
//!
//! One pass fetches at most `max_messages_per_analysis` messages, partitions
//! them by conversation, splits each conversation into a priority lane
//! (size-1 units for privileged senders and long messages) and a bulk lane
//! (fixed-size chunks of the remaining short chatter), and walks the units
//! strictly sequentially -- one model call in flight at a time.
//!
//! Commit semantics are whole-pass: every fetched id is marked processed
//! once, after all units have been attempted, regardless of per-unit
//! success. A unit that fails is never retried within the pass; its
//! messages are consumed and the recall loss is accepted.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use earshot_config::model::AnalysisConfig;
use earshot_core::types::{AnalysisTask, ConversationId, NewEvent, StoredMessage, TaskStatus};
use earshot_core::{Clock, EarshotError, clock};
use earshot_storage::Database;
use earshot_storage::queries::{messages, stats, tasks};
use tracing::{debug, info, warn};

use crate::client::AnalysisClient;

/// Which lane a unit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    /// Privileged-sender or long messages, analyzed individually.
    Priority,
    /// Short chatter, chunked in timestamp order.
    Bulk,
}

/// One bounded piece of analysis work.
#[derive(Debug)]
pub struct AnalysisUnit {
    pub conversation: ConversationId,
    pub lane: Lane,
    pub messages: Vec<StoredMessage>,
}

impl AnalysisUnit {
    fn row_ids(&self) -> Vec<i64> {
        self.messages.iter().map(|m| m.id).collect()
    }
}

/// Split a timestamp-ordered backlog into analysis units.
///
/// Partition by conversation (first-seen order), then within each
/// conversation: messages from privileged senders and messages longer than
/// `long_threshold` characters each become a size-1 priority unit; the
/// remaining short messages are chunked into groups of `chunk_size`,
/// preserving timestamp order. Priority units precede bulk units so
/// high-value content is analyzed with the least latency.
pub fn partition_units(
    backlog: Vec<StoredMessage>,
    long_threshold: usize,
    chunk_size: usize,
) -> Vec<AnalysisUnit> {
    let mut order: Vec<ConversationId> = Vec::new();
    let mut by_conversation: HashMap<ConversationId, Vec<StoredMessage>> = HashMap::new();
    for msg in backlog {
        if !by_conversation.contains_key(&msg.conversation) {
            order.push(msg.conversation);
        }
        by_conversation.entry(msg.conversation).or_default().push(msg);
    }

    let mut units = Vec::new();
    for conversation in order {
        let msgs = by_conversation.remove(&conversation).unwrap_or_default();
        let (priority, bulk): (Vec<StoredMessage>, Vec<StoredMessage>) =
            msgs.into_iter().partition(|m| {
                m.sender_is_privileged
                    || m.is_admin_message
                    || m.text.chars().count() > long_threshold
            });

        for msg in priority {
            units.push(AnalysisUnit {
                conversation,
                lane: Lane::Priority,
                messages: vec![msg],
            });
        }

        let mut chunk = Vec::new();
        for msg in bulk {
            chunk.push(msg);
            if chunk.len() == chunk_size {
                units.push(AnalysisUnit {
                    conversation,
                    lane: Lane::Bulk,
                    messages: std::mem::take(&mut chunk),
                });
            }
        }
        if !chunk.is_empty() {
            units.push(AnalysisUnit {
                conversation,
                lane: Lane::Bulk,
                messages: chunk,
            });
        }
    }

    units
}

/// Aggregate result of one batcher pass.
#[derive(Debug, Clone)]
pub struct PassOutcome {
    pub task_id: String,
    pub messages_processed: usize,
    pub events_found: usize,
    pub units_total: usize,
    pub units_failed: usize,
}

/// Drains the backlog. Triggered by the scheduler or manually; both paths
/// call [`Batcher::run_pass`] and nothing else.
pub struct Batcher {
    db: Database,
    client: Arc<AnalysisClient>,
    config: AnalysisConfig,
    clock: Arc<dyn Clock>,
}

impl Batcher {
    pub fn new(
        db: Database,
        client: Arc<AnalysisClient>,
        config: AnalysisConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            db,
            client,
            config,
            clock,
        }
    }

    /// Run one full pass over the backlog.
    ///
    /// Returns an error only when the pass itself could not run (backlog
    /// fetch or the final processed-commit failed); individual unit
    /// failures are absorbed and counted.
    pub async fn run_pass(&self) -> Result<PassOutcome, EarshotError> {
        let task_id = uuid::Uuid::new_v4().to_string();
        debug!(%task_id, "analysis pass starting");

        let mut task = AnalysisTask {
            task_id: task_id.clone(),
            status: TaskStatus::Running,
            message_count: 0,
            events_found: 0,
            error: None,
        };
        if let Err(e) = tasks::record_task(&self.db, &task).await {
            warn!(%task_id, error = %e, "could not record pass start");
        }

        let backlog = match messages::unprocessed(
            &self.db,
            self.config.max_messages_per_analysis as i64,
        )
        .await
        {
            Ok(backlog) => backlog,
            Err(e) => {
                task.status = TaskStatus::Failed;
                task.error = Some(e.to_string());
                let _ = tasks::record_task(&self.db, &task).await;
                return Err(e);
            }
        };

        if backlog.is_empty() {
            debug!(%task_id, "backlog empty; nothing to analyze");
            task.status = TaskStatus::Completed;
            let _ = tasks::record_task(&self.db, &task).await;
            return Ok(PassOutcome {
                task_id,
                messages_processed: 0,
                events_found: 0,
                units_total: 0,
                units_failed: 0,
            });
        }

        let fetched_ids: Vec<i64> = backlog.iter().map(|m| m.id).collect();
        let units = partition_units(
            backlog,
            self.config.long_message_threshold,
            self.config.batch_size,
        );
        info!(
            %task_id,
            messages = fetched_ids.len(),
            units = units.len(),
            "backlog partitioned"
        );

        let mut events_found = 0usize;
        let mut units_failed = 0usize;

        for unit in &units {
            let history = self.history_for(unit).await;
            match self.client.analyze_unit(&unit.messages, &history).await {
                Ok(parsed) => {
                    for event in parsed {
                        let new_event = NewEvent {
                            kind: event.kind,
                            title: event.title,
                            description: event.description,
                            source_message_ids: unit.row_ids(),
                            conversation: unit.conversation,
                            due_date: event.due_date,
                            priority: event.priority,
                        };
                        match earshot_storage::queries::events::insert_event(&self.db, &new_event)
                            .await
                        {
                            Ok(id) => {
                                events_found += 1;
                                info!(%task_id, event_id = id, kind = %new_event.kind, "event extracted");
                            }
                            Err(e) => {
                                // Only this record is lost; the pass goes on.
                                warn!(%task_id, error = %e, "event insert failed");
                            }
                        }
                    }
                }
                Err(e) => {
                    units_failed += 1;
                    warn!(
                        %task_id,
                        conversation = %unit.conversation,
                        lane = ?unit.lane,
                        unit_size = unit.messages.len(),
                        error = %e,
                        "unit analysis failed; not retried this pass"
                    );
                }
            }
        }

        // Whole-pass commit: consumed ids flip to processed exactly once,
        // after every unit has been attempted.
        if let Err(e) = messages::mark_processed(&self.db, &fetched_ids).await {
            task.status = TaskStatus::Failed;
            task.message_count = fetched_ids.len() as i64;
            task.events_found = events_found as i64;
            task.error = Some(e.to_string());
            let _ = tasks::record_task(&self.db, &task).await;
            return Err(e);
        }

        task.status = TaskStatus::Completed;
        task.message_count = fetched_ids.len() as i64;
        task.events_found = events_found as i64;
        if let Err(e) = tasks::record_task(&self.db, &task).await {
            warn!(%task_id, error = %e, "could not record pass completion");
        }

        // Best-effort observability stats.
        let now = clock::storage_string(&self.clock.now());
        let _ = stats::upsert_stat(&self.db, "last_analysis_time", &now).await;
        let _ = stats::upsert_stat(&self.db, "total_events_found", &events_found.to_string()).await;

        info!(
            %task_id,
            messages = fetched_ids.len(),
            units = units.len(),
            units_failed,
            events_found,
            "analysis pass complete"
        );

        Ok(PassOutcome {
            task_id,
            messages_processed: fetched_ids.len(),
            events_found,
            units_total: units.len(),
            units_failed,
        })
    }

    /// Fetch the recent-history window for a unit's conversation, minus the
    /// unit's own messages (they are analysis subjects, not context).
    async fn history_for(&self, unit: &AnalysisUnit) -> Vec<StoredMessage> {
        let history = match messages::recent_history(
            &self.db,
            unit.conversation,
            self.config.history_limit as i64,
        )
        .await
        {
            Ok(history) => history,
            Err(e) => {
                warn!(conversation = %unit.conversation, error = %e, "history fetch failed; continuing without context");
                return Vec::new();
            }
        };
        let unit_ids: HashSet<i64> = unit.messages.iter().map(|m| m.id).collect();
        history
            .into_iter()
            .filter(|m| !unit_ids.contains(&m.id))
            .collect()
    }
}
