// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The operator service: command dispatch and the one-reply guarantee.
//!
//! Every operator private message produces exactly one outbound reply,
//! internal errors included. Replies leave as `send_private_msg` action
//! frames over the gateway broadcast path -- with more than one gateway
//! connected the operator may receive duplicates, which is logged.

use std::sync::Arc;

use earshot_analysis::{AnalysisClient, ParsedEvent};
use earshot_core::types::{AnalyzedEvent, ConversationId, EventKind, NewEvent, Priority};
use earshot_core::{Clock, EarshotError};
use earshot_gateway::{ConnectionRegistry, private_message_action};
use earshot_storage::Database;
use earshot_storage::queries::events;
use tracing::{error, info, warn};

use crate::command::{AdminCommand, parse_command};

const HELP_TEXT: &str = "\
Available commands:\n\
1. list all events: all, /all, ls\n\
2. delete an event: del <id>, rm <id>\n\
3. this help: help, /help\n\
Anything else is analyzed as a new message.";

fn kind_emoji(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Todo => "\u{1F4DD}",          // 📝
        EventKind::Notification => "\u{1F4E2}",  // 📢
        EventKind::Entertainment => "\u{1F389}", // 🎉
    }
}

fn priority_emoji(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "\u{1F7E2}",    // 🟢
        Priority::Medium => "\u{1F7E1}", // 🟡
        Priority::High => "\u{1F534}",   // 🔴
    }
}

fn kind_heading(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Todo => "Todos",
        EventKind::Notification => "Notifications",
        EventKind::Entertainment => "Entertainment",
    }
}

/// Handles private messages from the configured operator.
pub struct AdminService {
    db: Database,
    client: Arc<AnalysisClient>,
    registry: Arc<ConnectionRegistry>,
    operator_id: i64,
    clock: Arc<dyn Clock>,
}

impl AdminService {
    pub fn new(
        db: Database,
        client: Arc<AnalysisClient>,
        registry: Arc<ConnectionRegistry>,
        operator_id: i64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            db,
            client,
            registry,
            operator_id,
            clock,
        }
    }

    /// The configured operator account id.
    pub fn operator_id(&self) -> i64 {
        self.operator_id
    }

    /// Handle one operator private message.
    ///
    /// Always sends exactly one reply; a failing handler degrades to an
    /// error summary instead of silence.
    pub async fn handle_message(&self, text: &str) {
        let reply = match self.dispatch(text).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, "operator command failed");
                format!("Something went wrong handling that message: {e}")
            }
        };
        self.send_to_operator(&reply).await;
    }

    async fn dispatch(&self, text: &str) -> Result<String, EarshotError> {
        match parse_command(text) {
            AdminCommand::ListAll => self.render_all_events().await,
            AdminCommand::Delete(id) => self.delete_event(id).await,
            AdminCommand::DeleteUsage => {
                Ok("Usage: del <event id> -- the id is numeric, see `ls`.".to_string())
            }
            AdminCommand::Help => Ok(HELP_TEXT.to_string()),
            AdminCommand::FreeForm(content) => self.analyze_freeform(&content).await,
        }
    }

    /// Send one text reply to the operator over every live connection.
    async fn send_to_operator(&self, text: &str) -> bool {
        let action = private_message_action(self.operator_id, text);
        let delivered = self.registry.broadcast(&action).await;
        match delivered {
            0 => warn!("no gateway connection; operator reply dropped"),
            1 => {}
            n => warn!(delivered = n, "reply broadcast to multiple gateways; operator may see duplicates"),
        }
        delivered > 0
    }

    async fn render_all_events(&self) -> Result<String, EarshotError> {
        let all = events::recent(&self.db, 100, None, true).await?;
        if all.is_empty() {
            return Ok("No active events or tasks right now.".to_string());
        }

        let now = self.clock.now().format("%Y-%m-%d %H:%M:%S");
        let mut out = format!("All events ({now}):\n");
        for kind in EventKind::ALL {
            let of_kind: Vec<&AnalyzedEvent> = all.iter().filter(|e| e.kind == kind).collect();
            if of_kind.is_empty() {
                continue;
            }
            out.push_str(&format!(
                "\n{} {} ({}):\n",
                kind_emoji(kind),
                kind_heading(kind),
                of_kind.len()
            ));
            for event in of_kind {
                out.push_str(&format!("[ID:{}] {}\n", event.id, event.title));
                if let Some(due) = &event.due_date {
                    out.push_str(&format!("   due: {}\n", due.format("%Y-%m-%d %H:%M:%S")));
                }
                out.push_str(&format!(
                    "   priority: {} {}\n",
                    priority_emoji(event.priority),
                    event.priority
                ));
            }
        }
        out.push_str("\nTip: send \"del <id>\" to delete an event");
        Ok(out)
    }

    async fn delete_event(&self, id: i64) -> Result<String, EarshotError> {
        let Some(event) = events::find_by_id(&self.db, id).await? else {
            return Ok(format!("No event with id {id}."));
        };

        if events::delete(&self.db, id).await? {
            info!(event_id = id, "event deleted by operator");
            Ok(format!(
                "Deleted: {} {}",
                kind_emoji(event.kind),
                event.title
            ))
        } else {
            Ok(format!("Could not delete event {id}; try again."))
        }
    }

    async fn analyze_freeform(&self, content: &str) -> Result<String, EarshotError> {
        let parsed = self.client.analyze_text(content).await?;

        if parsed.is_empty() {
            return Ok("No todos, notifications, or activities found in that message.".to_string());
        }

        // Persist first; the summary promises the events are saved.
        let mut saved = Vec::new();
        for event in &parsed {
            let new_event = to_new_event(event);
            match events::insert_event(&self.db, &new_event).await {
                Ok(id) => saved.push((id, event)),
                Err(e) => warn!(error = %e, "freeform event insert failed"),
            }
        }

        Ok(render_analysis_summary(&saved))
    }
}

fn to_new_event(parsed: &ParsedEvent) -> NewEvent {
    NewEvent {
        kind: parsed.kind,
        title: parsed.title.clone(),
        description: parsed.description.clone(),
        // Operator messages never enter the passive queue, so there are no
        // stored source rows to point at.
        source_message_ids: Vec::new(),
        conversation: ConversationId::Private,
        due_date: parsed.due_date,
        priority: parsed.priority,
    }
}

fn render_analysis_summary(saved: &[(i64, &ParsedEvent)]) -> String {
    let mut out = format!("Found {} event(s):\n", saved.len());
    for (index, (id, event)) in saved.iter().enumerate() {
        out.push_str(&format!(
            "{}. {} {} [ID:{}]\n",
            index + 1,
            kind_emoji(event.kind),
            event.title,
            id
        ));
        out.push_str(&format!(
            "   priority: {} {}\n",
            priority_emoji(event.priority),
            event.priority
        ));
        if let Some(due) = &event.due_date {
            out.push_str(&format!("   due: {}\n", due.format("%Y-%m-%d %H:%M:%S")));
        }
        out.push_str(&format!("   {}\n", event.description));
    }
    out.push_str("Saved. They will show up in `ls`.");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use earshot_config::model::ModelConfig;
    use earshot_core::types::EventStatus;
    use earshot_core::{FixedClock, SystemClock, clock};
    use earshot_test_utils::{MockProvider, TestDb};
    use tokio::sync::mpsc;

    struct Fixture {
        harness: TestDb,
        service: AdminService,
        provider: Arc<MockProvider>,
        outbound: mpsc::Receiver<String>,
    }

    async fn fixture() -> Fixture {
        let harness = TestDb::new().await;
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(
            clock::civil_offset().with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        ));
        let provider = Arc::new(MockProvider::new());
        let client = Arc::new(AnalysisClient::new(
            Some(provider.clone()),
            clock.clone(),
            &ModelConfig::default(),
        ));
        let registry = Arc::new(ConnectionRegistry::new(Arc::new(SystemClock)));
        let (tx, outbound) = mpsc::channel(16);
        registry.register("gw-1", "127.0.0.1:1", tx);

        let service = AdminService::new(harness.db.clone(), client, registry, 900001, clock);
        Fixture {
            harness,
            service,
            provider,
            outbound,
        }
    }

    /// Pull the reply text out of the outbound action frame.
    fn reply_text(frame: &str) -> String {
        let value: serde_json::Value = serde_json::from_str(frame).unwrap();
        assert_eq!(value["action"], "send_private_msg");
        assert_eq!(value["params"]["user_id"], "900001");
        value["params"]["message"][0]["data"]["text"]
            .as_str()
            .unwrap()
            .to_string()
    }

    async fn seed_event(db: &Database, kind: EventKind, title: &str) -> i64 {
        events::insert_event(
            db,
            &NewEvent {
                kind,
                title: title.into(),
                description: "details".into(),
                source_message_ids: vec![1],
                conversation: ConversationId::Group(100),
                due_date: None,
                priority: Priority::Medium,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn delete_missing_event_reports_not_found_without_mutation() {
        let mut fx = fixture().await;

        fx.service.handle_message("rm 7").await;

        let reply = reply_text(&fx.outbound.recv().await.unwrap());
        assert!(reply.contains("No event with id 7"));
        assert!(fx.outbound.try_recv().is_err(), "exactly one reply");

        fx.harness.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_existing_event_confirms_with_title() {
        let mut fx = fixture().await;
        let id = seed_event(&fx.harness.db, EventKind::Todo, "hand in report").await;

        fx.service.handle_message(&format!("rm {id}")).await;

        let reply = reply_text(&fx.outbound.recv().await.unwrap());
        assert!(reply.contains("Deleted"));
        assert!(reply.contains("hand in report"));
        assert!(events::find_by_id(&fx.harness.db, id).await.unwrap().is_none());

        fx.harness.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_finds_expired_events_too() {
        let mut fx = fixture().await;
        let db = fx.harness.db.clone();
        let event = NewEvent {
            kind: EventKind::Todo,
            title: "stale".into(),
            description: "d".into(),
            source_message_ids: vec![],
            conversation: ConversationId::Group(100),
            due_date: Some(clock::civil_offset().with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap()),
            priority: Priority::Low,
        };
        let id = events::insert_event(&db, &event).await.unwrap();
        events::mark_expired(&db, &clock::civil_offset().with_ymd_and_hms(2026, 2, 2, 9, 0, 0).unwrap())
            .await
            .unwrap();

        fx.service.handle_message(&format!("del {id}")).await;
        let reply = reply_text(&fx.outbound.recv().await.unwrap());
        assert!(reply.contains("Deleted"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_all_groups_by_kind_and_includes_expired() {
        let mut fx = fixture().await;
        let db = fx.harness.db.clone();
        seed_event(&db, EventKind::Todo, "todo one").await;
        seed_event(&db, EventKind::Entertainment, "board games").await;

        let overdue_id = events::insert_event(
            &db,
            &NewEvent {
                kind: EventKind::Notification,
                title: "expired notice".into(),
                description: "d".into(),
                source_message_ids: vec![],
                conversation: ConversationId::Group(100),
                due_date: Some(clock::civil_offset().with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap()),
                priority: Priority::High,
            },
        )
        .await
        .unwrap();
        events::mark_expired(&db, &clock::civil_offset().with_ymd_and_hms(2026, 2, 2, 9, 0, 0).unwrap())
            .await
            .unwrap();
        assert_eq!(
            events::find_by_id(&db, overdue_id).await.unwrap().unwrap().status,
            EventStatus::Expired
        );

        fx.service.handle_message("ls").await;
        let reply = reply_text(&fx.outbound.recv().await.unwrap());
        assert!(reply.contains("todo one"));
        assert!(reply.contains("board games"));
        assert!(reply.contains("expired notice"), "expired events listed: {reply}");
        assert!(reply.contains("Todos (1)"));
        assert!(reply.contains(&format!("[ID:{overdue_id}]")));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_all_with_nothing_says_so() {
        let mut fx = fixture().await;
        fx.service.handle_message("all").await;
        let reply = reply_text(&fx.outbound.recv().await.unwrap());
        assert!(reply.contains("No active events"));
        fx.harness.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn help_lists_commands() {
        let mut fx = fixture().await;
        fx.service.handle_message("/help").await;
        let reply = reply_text(&fx.outbound.recv().await.unwrap());
        assert!(reply.contains("del <id>"));
        assert!(reply.contains("/all"));
        fx.harness.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn freeform_with_findings_persists_and_summarizes() {
        let mut fx = fixture().await;
        fx.provider
            .add_response(
                r#"{"events":[{"type":"todo","title":"dentist","description":"tuesday 3pm","priority":"high","due_date":"2026-03-03 15:00:00"}]}"#,
            )
            .await;

        fx.service.handle_message("dentist on tuesday at 3pm").await;

        let reply = reply_text(&fx.outbound.recv().await.unwrap());
        assert!(reply.contains("Found 1 event(s)"));
        assert!(reply.contains("dentist"));
        assert!(reply.contains("Saved"));

        let stored = events::recent(&fx.harness.db, 10, None, false).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].conversation, ConversationId::Private);

        fx.harness.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn freeform_with_no_findings_states_none() {
        let mut fx = fixture().await;
        fx.provider.add_response(r#"{"events":[]}"#).await;

        fx.service.handle_message("just thinking out loud").await;

        let reply = reply_text(&fx.outbound.recv().await.unwrap());
        assert!(reply.contains("No todos, notifications, or activities"));
        assert!(fx.outbound.try_recv().is_err(), "exactly one reply");

        fx.harness.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn internal_error_still_yields_exactly_one_reply() {
        let mut fx = fixture().await;
        fx.provider.add_failure("model unreachable").await;

        fx.service.handle_message("anything freeform").await;

        let reply = reply_text(&fx.outbound.recv().await.unwrap());
        assert!(reply.contains("Something went wrong"));
        assert!(fx.outbound.try_recv().is_err(), "exactly one reply");

        fx.harness.db.close().await.unwrap();
    }
}
