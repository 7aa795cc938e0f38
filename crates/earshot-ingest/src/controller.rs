// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The ingestion controller: the single entry point for accepted gateway
//! events.
//!
//! Operator private messages divert to the admin service and never enter
//! the passive queue; everything else runs the filter chain and, if
//! accepted, is persisted unprocessed for the batcher. A failure anywhere
//! in here becomes an outcome value -- it must never tear down the
//! connection's event stream.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use earshot_admin::AdminService;
use earshot_core::{Clock, clock};
use earshot_gateway::wire::InboundEvent;
use earshot_storage::Database;
use earshot_storage::queries::{messages, stats};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::classifier::MessageFilter;

/// Process-wide ingestion counters with read accessors.
#[derive(Debug, Default)]
pub struct IngestStats {
    total_received: AtomicU64,
    processed: AtomicU64,
}

impl IngestStats {
    pub fn total_received(&self) -> u64 {
        self.total_received.load(Ordering::Relaxed)
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    fn record_received(&self) -> u64 {
        self.total_received.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn record_processed(&self) -> u64 {
        self.processed.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// What happened to one inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum HandleOutcome {
    /// Delegated to the operator channel.
    Admin,
    /// Persisted to the unprocessed queue.
    Processed {
        message_id: i64,
        /// Text length exceeded the long-message threshold; the batcher
        /// will route it through the priority lane.
        long: bool,
    },
    /// Rejected by the filter chain. A normal, quiet path.
    Ignored,
    /// Storage or downstream failure, absorbed here.
    Error(String),
}

/// Routes every accepted gateway event.
pub struct IngestController {
    db: Database,
    filter: MessageFilter,
    admin: Option<Arc<AdminService>>,
    stats: IngestStats,
    clock: Arc<dyn Clock>,
    long_message_threshold: usize,
}

impl IngestController {
    pub fn new(
        db: Database,
        filter: MessageFilter,
        admin: Option<Arc<AdminService>>,
        clock: Arc<dyn Clock>,
        long_message_threshold: usize,
    ) -> Self {
        Self {
            db,
            filter,
            admin,
            stats: IngestStats::default(),
            clock,
            long_message_threshold,
        }
    }

    /// Ingestion counters.
    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    /// Handle one inbound event end to end.
    pub async fn handle_event(&self, event: &InboundEvent) -> HandleOutcome {
        self.stats.record_received();
        let envelope = &event.envelope;

        // The operator's private channel bypasses the passive queue
        // entirely.
        if let Some(admin) = &self.admin
            && envelope.message_type.as_deref() == Some("private")
            && envelope.user_id == Some(admin.operator_id())
        {
            let text = self.filter.extract_text(envelope);
            info!(operator_id = admin.operator_id(), "operator message received");
            admin.handle_message(&text).await;
            return HandleOutcome::Admin;
        }

        if !self.filter.should_process(envelope) {
            debug!(
                post_type = %envelope.post_type,
                group_id = ?envelope.group_id,
                "event ignored by filter"
            );
            return HandleOutcome::Ignored;
        }

        let record = self.filter.transform(envelope, &event.raw);
        let long = record.text.chars().count() > self.long_message_threshold;

        match messages::insert_message(&self.db, &record).await {
            Ok(message_id) => {
                let processed_total = self.stats.record_processed();
                info!(
                    message_id,
                    conversation = %record.conversation,
                    sender_id = record.sender_id,
                    long,
                    "message ingested"
                );
                self.update_stat_rows(processed_total).await;
                HandleOutcome::Processed { message_id, long }
            }
            Err(e) => {
                error!(error = %e, "message persistence failed");
                HandleOutcome::Error(e.to_string())
            }
        }
    }

    /// Best-effort stat rows; a failure here is logged and swallowed.
    async fn update_stat_rows(&self, processed_total: u64) {
        let received = self.stats.total_received().to_string();
        if let Err(e) = stats::upsert_stat(&self.db, "total_messages_received", &received).await {
            debug!(error = %e, "stat update failed");
        }
        if let Err(e) = stats::upsert_stat(
            &self.db,
            "total_messages_processed",
            &processed_total.to_string(),
        )
        .await
        {
            debug!(error = %e, "stat update failed");
        }
        let now = clock::storage_string(&self.clock.now());
        if let Err(e) = stats::upsert_stat(&self.db, "last_message_time", &now).await {
            debug!(error = %e, "stat update failed");
        }
    }
}

/// Drain the gateway's inbound channel into the controller until the
/// channel closes. The binary spawns this as its ingestion loop.
pub async fn run_loop(controller: Arc<IngestController>, mut rx: mpsc::Receiver<InboundEvent>) {
    while let Some(event) = rx.recv().await {
        let outcome = controller.handle_event(&event).await;
        debug!(connection_id = %event.connection_id, outcome = ?outcome, "event handled");
    }
    info!("ingestion loop stopped: gateway channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use earshot_analysis::AnalysisClient;
    use earshot_config::model::ModelConfig;
    use earshot_core::types::ConversationId;
    use earshot_core::{FixedClock, SystemClock};
    use earshot_gateway::ConnectionRegistry;
    use earshot_gateway::wire::Envelope;
    use earshot_test_utils::{MockProvider, TestDb};
    use serde_json::json;

    fn test_clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(
            clock::civil_offset().with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        ))
    }

    fn inbound(value: serde_json::Value) -> InboundEvent {
        let envelope: Envelope = serde_json::from_value(value.clone()).unwrap();
        InboundEvent {
            connection_id: "c1".into(),
            envelope,
            raw: value,
        }
    }

    fn group_message(group_id: i64, user_id: i64, text: &str) -> InboundEvent {
        inbound(json!({
            "post_type": "message",
            "message_type": "group",
            "message_id": 42,
            "group_id": group_id,
            "user_id": user_id,
            "self_id": 10001,
            "sender": {"nickname": "alice", "role": "member"},
            "message": text,
            "time": 1700000000
        }))
    }

    fn controller(db: &Database, admin: Option<Arc<AdminService>>) -> IngestController {
        IngestController::new(
            db.clone(),
            MessageFilter::new(&[100001]),
            admin,
            test_clock(),
            50,
        )
    }

    async fn admin_service(db: &Database) -> (Arc<AdminService>, tokio::sync::mpsc::Receiver<String>) {
        let provider = Arc::new(MockProvider::new());
        let client = Arc::new(AnalysisClient::new(
            Some(provider),
            test_clock(),
            &ModelConfig::default(),
        ));
        let registry = Arc::new(ConnectionRegistry::new(Arc::new(SystemClock)));
        let (tx, rx) = tokio::sync::mpsc::channel(8);
        registry.register("gw-1", "127.0.0.1:1", tx);
        let service = AdminService::new(db.clone(), client, registry, 900001, test_clock());
        (Arc::new(service), rx)
    }

    #[tokio::test]
    async fn filtered_event_is_never_persisted() {
        let harness = TestDb::new().await;
        let ctl = controller(&harness.db, None);

        // Unlisted group.
        let outcome = ctl.handle_event(&group_message(999999, 20002, "hello")).await;
        assert_eq!(outcome, HandleOutcome::Ignored);

        let backlog = messages::unprocessed(&harness.db, 50).await.unwrap();
        assert!(backlog.is_empty(), "nothing persisted, nothing to process");
        assert_eq!(ctl.stats().total_received(), 1);
        assert_eq!(ctl.stats().processed(), 0);

        harness.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn accepted_event_is_persisted_unprocessed() {
        let harness = TestDb::new().await;
        let ctl = controller(&harness.db, None);

        let outcome = ctl.handle_event(&group_message(100001, 20002, "short note")).await;
        let HandleOutcome::Processed { message_id, long } = outcome else {
            panic!("expected Processed, got {outcome:?}");
        };
        assert!(message_id > 0);
        assert!(!long);

        let backlog = messages::unprocessed(&harness.db, 50).await.unwrap();
        assert_eq!(backlog.len(), 1);
        assert_eq!(backlog[0].conversation, ConversationId::Group(100001));
        assert!(!backlog[0].processed);

        let stat_rows = stats::get_stats(&harness.db).await.unwrap();
        assert_eq!(stat_rows["total_messages_processed"], "1");

        harness.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn long_text_is_flagged() {
        let harness = TestDb::new().await;
        let ctl = controller(&harness.db, None);

        let text = "x".repeat(60);
        let outcome = ctl.handle_event(&group_message(100001, 20002, &text)).await;
        assert!(matches!(outcome, HandleOutcome::Processed { long: true, .. }));

        harness.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn operator_private_message_routes_to_admin_not_queue() {
        let harness = TestDb::new().await;
        let (admin, mut outbound) = admin_service(&harness.db).await;
        let ctl = controller(&harness.db, Some(admin));

        let event = inbound(json!({
            "post_type": "message",
            "message_type": "private",
            "message_id": 7,
            "user_id": 900001,
            "self_id": 10001,
            "sender": {"nickname": "op"},
            "message": "help",
            "time": 1700000000
        }));
        let outcome = ctl.handle_event(&event).await;
        assert_eq!(outcome, HandleOutcome::Admin);

        // The admin channel replied; the passive queue stayed empty.
        assert!(outbound.recv().await.is_some());
        assert!(messages::unprocessed(&harness.db, 50).await.unwrap().is_empty());

        harness.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn private_message_from_non_operator_is_ignored() {
        let harness = TestDb::new().await;
        let (admin, mut outbound) = admin_service(&harness.db).await;
        let ctl = controller(&harness.db, Some(admin));

        let event = inbound(json!({
            "post_type": "message",
            "message_type": "private",
            "user_id": 555,
            "self_id": 10001,
            "message": "rm 1",
            "time": 1700000000
        }));
        let outcome = ctl.handle_event(&event).await;
        assert_eq!(outcome, HandleOutcome::Ignored);
        assert!(outbound.try_recv().is_err(), "no reply to strangers");

        harness.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn storage_failure_becomes_error_outcome() {
        let harness = TestDb::new().await;
        let ctl = controller(&harness.db, None);

        // Force a failing insert by dropping the messages table.
        harness
            .db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("DROP TABLE messages;")?;
                Ok(())
            })
            .await
            .unwrap();

        let outcome = ctl.handle_event(&group_message(100001, 20002, "hello")).await;
        assert!(matches!(outcome, HandleOutcome::Error(_)), "got {outcome:?}");
    }

    #[tokio::test]
    async fn run_loop_drains_channel_until_close() {
        let harness = TestDb::new().await;
        let ctl = Arc::new(controller(&harness.db, None));
        let (tx, rx) = mpsc::channel(8);

        let loop_task = tokio::spawn(run_loop(ctl.clone(), rx));
        tx.send(group_message(100001, 20002, "one")).await.unwrap();
        tx.send(group_message(100001, 20002, "two")).await.unwrap();
        drop(tx);
        loop_task.await.unwrap();

        assert_eq!(ctl.stats().total_received(), 2);
        assert_eq!(messages::unprocessed(&harness.db, 50).await.unwrap().len(), 2);

        harness.db.close().await.unwrap();
    }
}
