use chrono::{DateTime, Utc};
use rusqlite::{Result as SqlResult, Row, params};
use std::path::Path;

use super::database::Database;
use crate::common::types::validate_content;
use crate::common::{ChatMessage, FeedEvent};
use crate::error::Result;
use crate::network::PersistenceGateway;
use crate::network::watcher::{ChangeBatch, ChangeLog};

/// SQLite-backed message table.
pub struct MessageDatabase {
    db: Database,
}

impl MessageDatabase {
    /// Open (or create) the database file at `path`.
    pub fn with_path<P: AsRef<Path>>(path: P) -> SqlResult<Self> {
        let db = Database::new(path)?;
        let message_db = Self { db };
        message_db.init_schema()?;
        Ok(message_db)
    }

    pub fn in_memory() -> SqlResult<Self> {
        let message_db = Self {
            db: Database::in_memory()?,
        };
        message_db.init_schema()?;
        Ok(message_db)
    }

    fn init_schema(&self) -> SqlResult<()> {
        let conn = self.db.connection();

        // created_at is milliseconds since the Unix epoch
        conn.execute(
            "CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_messages_created_at ON messages(created_at)",
            [],
        )?;

        // Change log filled by triggers, so writes from any connection or
        // process show up for every watcher of the same file.
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS message_changes (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                message_id TEXT NOT NULL,
                recorded_at INTEGER NOT NULL
                    DEFAULT (CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER))
            );
            CREATE TRIGGER IF NOT EXISTS trg_messages_insert AFTER INSERT ON messages
            BEGIN
                INSERT INTO message_changes (kind, message_id) VALUES ('INSERT', NEW.id);
            END;
            CREATE TRIGGER IF NOT EXISTS trg_messages_delete AFTER DELETE ON messages
            BEGIN
                INSERT INTO message_changes (kind, message_id) VALUES ('DELETE', OLD.id);
            END;",
        )?;

        Ok(())
    }

    pub fn insert_message(&self, message: &ChatMessage) -> SqlResult<()> {
        let conn = self.db.connection();
        conn.execute(
            "INSERT INTO messages (id, username, content, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                message.id,
                message.username,
                message.content,
                message.created_at.timestamp_millis()
            ],
        )?;
        Ok(())
    }

    /// The newest `limit` messages, oldest first.
    pub fn get_recent_messages(&self, limit: usize) -> SqlResult<Vec<ChatMessage>> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(
            "SELECT id, username, content, created_at FROM (
                 SELECT id, username, content, created_at, rowid AS seq
                 FROM messages
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?1
             )
             ORDER BY created_at ASC, seq ASC",
        )?;

        let messages = stmt
            .query_map(params![sql_limit(limit)], message_from_row)?
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(messages)
    }

    /// Returns whether a row was removed.
    pub fn delete_message(&self, id: &str) -> SqlResult<bool> {
        let conn = self.db.connection();
        let removed = conn.execute("DELETE FROM messages WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    pub fn message_count(&self) -> SqlResult<usize> {
        let conn = self.db.connection();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Sequence number of the newest change, 0 when there is none.
    pub fn latest_change_seq(&self) -> SqlResult<i64> {
        let conn = self.db.connection();
        conn.query_row(
            "SELECT COALESCE(MAX(seq), 0) FROM message_changes",
            [],
            |row| row.get(0),
        )
    }

    /// Up to `limit` changes recorded after `after`, oldest first.
    ///
    /// An insert whose row has since been deleted is skipped; its delete
    /// follows later in the log.
    pub fn get_changes_since(&self, after: i64, limit: usize) -> SqlResult<ChangeBatch> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(
            "SELECT c.seq, c.kind, c.message_id, m.username, m.content, m.created_at
             FROM message_changes c
             LEFT JOIN messages m ON c.kind = 'INSERT' AND m.id = c.message_id
             WHERE c.seq > ?1
             ORDER BY c.seq ASC
             LIMIT ?2",
        )?;

        let mut rows = stmt.query(params![after, sql_limit(limit)])?;
        let mut batch = ChangeBatch {
            last_seq: after,
            events: Vec::new(),
        };
        while let Some(row) = rows.next()? {
            batch.last_seq = row.get(0)?;
            let kind: String = row.get(1)?;
            let id: String = row.get(2)?;
            match kind.as_str() {
                "DELETE" => batch.events.push(FeedEvent::Delete { id }),
                _ => {
                    let Some(millis) = row.get::<_, Option<i64>>(5)? else {
                        continue;
                    };
                    batch.events.push(FeedEvent::Insert(ChatMessage {
                        id,
                        username: row.get(3)?,
                        content: row.get(4)?,
                        created_at: timestamp_from_millis(millis, 5)?,
                    }));
                }
            }
        }

        Ok(batch)
    }

    /// Drop change-log entries recorded before `cutoff_ms`.
    pub fn prune_changes_before(&self, cutoff_ms: i64) -> SqlResult<usize> {
        let conn = self.db.connection();
        conn.execute(
            "DELETE FROM message_changes WHERE recorded_at < ?1",
            params![cutoff_ms],
        )
    }
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn timestamp_from_millis(millis: i64, column: usize) -> SqlResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(column, millis))
}

fn message_from_row(row: &Row<'_>) -> SqlResult<ChatMessage> {
    let millis: i64 = row.get(3)?;
    Ok(ChatMessage {
        id: row.get(0)?,
        username: row.get(1)?,
        content: row.get(2)?,
        created_at: timestamp_from_millis(millis, 3)?,
    })
}

impl PersistenceGateway for MessageDatabase {
    fn fetch_recent(&self, limit: usize) -> Result<Vec<ChatMessage>> {
        Ok(self.get_recent_messages(limit)?)
    }

    fn insert(&self, content: &str, username: &str) -> Result<ChatMessage> {
        validate_content(content)?;
        let message = ChatMessage::new(username, content);
        self.insert_message(&message)?;
        log::debug!("Stored message {} from {}", message.id, message.username);
        Ok(message)
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let removed = self.delete_message(id)?;
        if !removed {
            log::debug!("Delete for unknown message {id}");
        }
        Ok(removed)
    }
}

impl ChangeLog for MessageDatabase {
    fn latest_change(&self) -> Result<i64> {
        Ok(self.latest_change_seq()?)
    }

    fn changes_since(&self, after: i64, limit: usize) -> Result<ChangeBatch> {
        Ok(self.get_changes_since(after, limit)?)
    }

    fn prune_before(&self, cutoff_ms: i64) -> Result<usize> {
        Ok(self.prune_changes_before(cutoff_ms)?)
    }
}
