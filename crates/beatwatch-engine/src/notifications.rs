//! Post-commit notification outbox and its dispatcher
//!
//! Operations enqueue after their transaction commits. Neither enqueue
//! nor delivery can fail the operation that produced the message.

#![allow(clippy::result_large_err)]

use beatwatch_core::notify::{Notification, NotificationSender, NotificationTopic};
use beatwatch_core::{log_op_end, log_op_error, log_op_start};
use beatwatch_store::repo::OutboxRepo;
use beatwatch_store::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::context::EngineContext;

/// Outcome of one dispatch pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub sent: u32,
    pub failed: u32,
}

/// Queue a message for `contact`; failures are logged and dropped
///
/// Returns the outbox id when the row was written. A missing contact
/// queues nothing.
pub fn enqueue(
    conn: &Connection,
    contact: Option<&str>,
    topic: NotificationTopic,
    message: impl Into<String>,
    now: DateTime<Utc>,
) -> Option<i64> {
    let contact = contact.map(str::trim).filter(|c| !c.is_empty())?;
    let notification = Notification::to_contact(contact, topic, message);
    match OutboxRepo::enqueue(conn, &notification, now) {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::warn!(
                topic = topic.as_str(),
                err_code = e.code(),
                error = %e,
                "notification enqueue failed"
            );
            None
        }
    }
}

/// Deliver up to `limit` pending notifications through `sender`
///
/// Each row is marked Sent or Failed independently; the dispatcher never
/// retries.
///
/// # Errors
///
/// Only a failure to read the outbox itself is returned.
pub fn dispatch_pending(
    ctx: &EngineContext,
    sender: &dyn NotificationSender,
    limit: u32,
    conn: &Connection,
) -> Result<DispatchReport> {
    log_op_start!("dispatch_pending", limit = limit);
    let start = std::time::Instant::now();

    let entries = OutboxRepo::pending(conn, limit).map_err(|e| {
        log_op_error!(
            "dispatch_pending",
            &e,
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    let mut report = DispatchReport::default();
    for entry in entries {
        let n = &entry.notification;
        let delivered = sender.send(n.recipient.expose(), &n.message, n.channel);
        let now = ctx.now();
        let recorded = if delivered {
            report.sent += 1;
            OutboxRepo::mark_sent(conn, entry.id, now)
        } else {
            report.failed += 1;
            tracing::warn!(
                outbox_id = entry.id,
                recipient = %n.recipient.masked(),
                channel = n.channel.as_str(),
                "notification delivery failed"
            );
            OutboxRepo::mark_failed(conn, entry.id, "sender rejected delivery", now)
        };
        if let Err(e) = recorded {
            tracing::warn!(outbox_id = entry.id, error = %e, "outbox status update failed");
        }
    }

    log_op_end!(
        "dispatch_pending",
        duration_ms = start.elapsed().as_millis() as u64,
        sent = report.sent,
        failed = report.failed
    );
    Ok(report)
}
