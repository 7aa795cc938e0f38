// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event lifecycle: the expiration sweep.
//!
//! Active events whose due date is behind the civil-time clock become
//! expired. The transition is one-way; nothing un-expires an event, and
//! deletion is a separate, operator-driven operation.

use earshot_core::{Clock, EarshotError};
use earshot_storage::Database;
use earshot_storage::queries::events;
use tracing::{debug, info};

/// Run one expiration sweep. Returns the number of events transitioned.
pub async fn run_expiration_sweep(db: &Database, clock: &dyn Clock) -> Result<usize, EarshotError> {
    let now = clock.now();
    let expired = events::mark_expired(db, &now).await?;
    if expired > 0 {
        info!(expired, "expiration sweep transitioned events");
    } else {
        debug!("expiration sweep found nothing past due");
    }
    Ok(expired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use earshot_core::types::{ConversationId, EventKind, EventStatus, NewEvent, Priority};
    use earshot_core::{FixedClock, clock};
    use earshot_test_utils::TestDb;

    fn civil(y: i32, mo: u32, d: u32, h: u32) -> chrono::DateTime<chrono::FixedOffset> {
        clock::civil_offset().with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn sweep_expires_only_past_due_and_is_idempotent() {
        let harness = TestDb::new().await;
        let db = &harness.db;

        let event = NewEvent {
            kind: EventKind::Todo,
            title: "submit form".into(),
            description: "before the deadline".into(),
            source_message_ids: vec![1],
            conversation: ConversationId::Group(100),
            due_date: Some(civil(2026, 3, 1, 9)),
            priority: Priority::Medium,
        };
        let id = events::insert_event(db, &event).await.unwrap();

        // Clock before the due date: nothing happens.
        let before = FixedClock(civil(2026, 3, 1, 8));
        assert_eq!(run_expiration_sweep(db, &before).await.unwrap(), 0);
        assert_eq!(
            events::find_by_id(db, id).await.unwrap().unwrap().status,
            EventStatus::Active
        );

        // Clock after the due date: one transition, then a no-op.
        let after = FixedClock(civil(2026, 3, 1, 10));
        assert_eq!(run_expiration_sweep(db, &after).await.unwrap(), 1);
        assert_eq!(
            events::find_by_id(db, id).await.unwrap().unwrap().status,
            EventStatus::Expired
        );
        assert_eq!(run_expiration_sweep(db, &after).await.unwrap(), 0);
        assert_eq!(
            events::find_by_id(db, id).await.unwrap().unwrap().status,
            EventStatus::Expired
        );

        db.close().await.unwrap();
    }
}
