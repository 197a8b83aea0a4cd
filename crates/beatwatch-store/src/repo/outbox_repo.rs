#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use crate::repo::rows::{ms, parsed_at};
use beatwatch_core::notify::{Channel, Notification, NotificationTopic};
use beatwatch_core_types::Sensitive;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};

pub struct OutboxRepo;

/// A queued notification with its delivery bookkeeping
#[derive(Debug, Clone)]
pub struct OutboxEntry {
    pub id: i64,
    pub notification: Notification,
    pub attempts: u32,
}

/// Outbox rows per delivery status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutboxCounts {
    pub pending: u64,
    pub sent: u64,
    pub failed: u64,
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<OutboxEntry> {
    let recipient: String = row.get(1)?;
    Ok(OutboxEntry {
        id: row.get(0)?,
        notification: Notification {
            recipient: Sensitive::new(recipient),
            channel: parsed_at(row, 2, Channel::parse)?,
            topic: parsed_at(row, 3, NotificationTopic::parse)?,
            message: row.get(4)?,
        },
        attempts: row.get(5)?,
    })
}

impl OutboxRepo {
    /// Queue a notification; returns the outbox row id
    pub fn enqueue(conn: &Connection, n: &Notification, now: DateTime<Utc>) -> Result<i64> {
        conn.execute(
            "INSERT INTO notification_outbox (recipient, channel, topic, message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                n.recipient.expose(),
                n.channel.as_str(),
                n.topic.as_str(),
                n.message,
                ms(now),
            ],
        )
        .map_err(from_rusqlite)?;
        Ok(conn.last_insert_rowid())
    }

    /// Oldest Pending entries first
    pub fn pending(conn: &Connection, limit: u32) -> Result<Vec<OutboxEntry>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, recipient, channel, topic, message, attempts
                 FROM notification_outbox WHERE status = 'Pending'
                 ORDER BY id LIMIT ?1",
            )
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([limit], map_row)
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(rows)
    }

    pub fn mark_sent(conn: &Connection, id: i64, now: DateTime<Utc>) -> Result<()> {
        conn.execute(
            "UPDATE notification_outbox
             SET status = 'Sent', attempts = attempts + 1, dispatched_at = ?2
             WHERE id = ?1",
            rusqlite::params![id, ms(now)],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn mark_failed(conn: &Connection, id: i64, reason: &str, now: DateTime<Utc>) -> Result<()> {
        conn.execute(
            "UPDATE notification_outbox
             SET status = 'Failed', attempts = attempts + 1, dispatched_at = ?2, last_error = ?3
             WHERE id = ?1",
            rusqlite::params![id, ms(now), reason],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn counts(conn: &Connection) -> Result<OutboxCounts> {
        let mut stmt = conn
            .prepare("SELECT status, COUNT(*) FROM notification_outbox GROUP BY status")
            .map_err(from_rusqlite)?;
        let mut rows = stmt.query([]).map_err(from_rusqlite)?;
        let mut counts = OutboxCounts::default();
        while let Some(row) = rows.next().map_err(from_rusqlite)? {
            let status: String = row.get(0).map_err(from_rusqlite)?;
            let n: i64 = row.get(1).map_err(from_rusqlite)?;
            let n = u64::try_from(n).unwrap_or(0);
            match status.as_str() {
                "Pending" => counts.pending = n,
                "Sent" => counts.sent = n,
                "Failed" => counts.failed = n,
                _ => {}
            }
        }
        Ok(counts)
    }
}
