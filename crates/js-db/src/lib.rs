//! Storage layer for jira-stats.
//!
//! Persists fetched tickets and the incremental fetch cursor using `rusqlite`.
//!
//! # Thread Safety
//!
//! [`Database`] wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! Commands open one database each and never share it across threads; report
//! computation runs on already loaded tickets.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 with millisecond precision and a
//! `Z` suffix (e.g. `2024-01-15T10:30:00.000Z`). The fixed width keeps
//! lexicographic ordering equal to chronological ordering, which the
//! `create_time <= ?` candidate query relies on.
//!
//! ## Changelog Storage
//!
//! The `changelog` column stores the ticket's changelog entries as JSON. Only
//! status-relevant changes are kept by the fetcher, so rows stay small.
//! Entries gain fields through `#[serde(default)]`; removing or renaming a
//! field requires rewriting stored rows.

use std::path::Path;

use chrono::{DateTime, Utc};
use js_core::{ChangelogEntry, Ticket, TicketId, TicketKey, ValidationError, format_timestamp};
use rusqlite::{Connection, OptionalExtension, Row, params};
use thiserror::Error;

/// Config row holding the fetch cursor.
const LAST_UPDATE_KEY: &str = "LastUpdate";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Stored changelog JSON could not be encoded or decoded.
    #[error("invalid changelog for ticket {ticket}")]
    Json {
        ticket: String,
        #[source]
        source: serde_json::Error,
    },
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for {owner}: {timestamp}")]
    TimestampParse {
        owner: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored id or key is empty.
    #[error("invalid stored ticket {ticket}")]
    InvalidTicket {
        ticket: String,
        #[source]
        source: ValidationError,
    },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// Raw `tickets` row before decoding.
struct TicketRow {
    id: String,
    key: String,
    state: String,
    kind: String,
    title: String,
    create_time: String,
    update_time: String,
    changelog: String,
}

impl TicketRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            key: row.get(1)?,
            state: row.get(2)?,
            kind: row.get(3)?,
            title: row.get(4)?,
            create_time: row.get(5)?,
            update_time: row.get(6)?,
            changelog: row.get(7)?,
        })
    }

    fn decode(self) -> Result<Ticket, DbError> {
        let invalid = |source| DbError::InvalidTicket {
            ticket: self.key.clone(),
            source,
        };
        let id = TicketId::new(self.id.clone()).map_err(invalid)?;
        let key = TicketKey::new(self.key.clone()).map_err(invalid)?;
        let create_time = parse_timestamp(&self.create_time, &self.key)?;
        let update_time = parse_timestamp(&self.update_time, &self.key)?;
        let changelog: Vec<ChangelogEntry> =
            serde_json::from_str(&self.changelog).map_err(|source| DbError::Json {
                ticket: self.key.clone(),
                source,
            })?;

        Ok(Ticket {
            id,
            key,
            state: self.state,
            kind: self.kind,
            title: self.title,
            create_time,
            update_time,
            changelog,
        })
    }
}

const TICKET_COLUMNS: &str =
    "id, key, state, kind, title, create_time, update_time, changelog";

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- Tickets table: one row per issue, replaced on every fetch
            -- create_time/update_time: RFC 3339 UTC with millis
            -- changelog: JSON array of changelog entries
            CREATE TABLE IF NOT EXISTS tickets (
                id TEXT PRIMARY KEY,
                key TEXT NOT NULL,
                state TEXT NOT NULL,
                kind TEXT NOT NULL,
                title TEXT NOT NULL,
                create_time TEXT NOT NULL,
                update_time TEXT NOT NULL,
                changelog TEXT NOT NULL DEFAULT '[]'
            );

            CREATE INDEX IF NOT EXISTS idx_tickets_key ON tickets(key);
            CREATE INDEX IF NOT EXISTS idx_tickets_create_time ON tickets(create_time);
            CREATE INDEX IF NOT EXISTS idx_tickets_update_time ON tickets(update_time);

            CREATE TABLE IF NOT EXISTS config (
                name TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Stores one ticket, replacing any previous version with the same id.
    pub fn store_ticket(&mut self, ticket: &Ticket) -> Result<(), DbError> {
        self.store_tickets(std::slice::from_ref(ticket))?;
        Ok(())
    }

    /// Stores a batch of tickets in one transaction, replacing existing rows by id.
    pub fn store_tickets(&mut self, tickets: &[Ticket]) -> Result<usize, DbError> {
        if tickets.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut stored = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT OR REPLACE INTO tickets
                (id, key, state, kind, title, create_time, update_time, changelog)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ",
            )?;
            for ticket in tickets {
                let changelog =
                    serde_json::to_string(&ticket.changelog).map_err(|source| DbError::Json {
                        ticket: ticket.key.to_string(),
                        source,
                    })?;
                stored += stmt.execute(params![
                    ticket.id.as_str(),
                    ticket.key.as_str(),
                    ticket.state,
                    ticket.kind,
                    ticket.title,
                    format_timestamp(ticket.create_time),
                    format_timestamp(ticket.update_time),
                    changelog,
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!(count = stored, "stored tickets");
        Ok(stored)
    }

    /// Looks up a ticket by its key (e.g. `ABC-123`).
    pub fn get_ticket(&self, key: &str) -> Result<Option<Ticket>, DbError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE key = ?"),
                [key],
                TicketRow::from_row,
            )
            .optional()?;
        row.map(TicketRow::decode).transpose()
    }

    /// Lists tickets created on or before `window_end`.
    ///
    /// These are the only tickets that can have development time inside a
    /// window ending at `window_end`.
    pub fn tickets_active_before(&self, window_end: DateTime<Utc>) -> Result<Vec<Ticket>, DbError> {
        let window_end = format_timestamp(window_end);
        self.query_tickets(
            &format!(
                "SELECT {TICKET_COLUMNS} FROM tickets
                 WHERE create_time <= ?
                 ORDER BY create_time ASC, id ASC"
            ),
            &[&window_end as &dyn rusqlite::ToSql],
        )
    }

    /// Number of stored tickets.
    pub fn ticket_count(&self) -> Result<usize, DbError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM tickets", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Update time of the newest ticket already fetched.
    ///
    /// Defaults to the Unix epoch when nothing has been fetched yet.
    pub fn last_update(&self) -> Result<DateTime<Utc>, DbError> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM config WHERE name = ?",
                [LAST_UPDATE_KEY],
                |row| row.get(0),
            )
            .optional()?;
        value.map_or(Ok(DateTime::UNIX_EPOCH), |value| {
            parse_timestamp(&value, LAST_UPDATE_KEY)
        })
    }

    pub fn store_last_update(&mut self, timestamp: DateTime<Utc>) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO config (name, value) VALUES (?, ?)
            ON CONFLICT(name) DO UPDATE SET value = excluded.value
            ",
            params![LAST_UPDATE_KEY, format_timestamp(timestamp)],
        )?;
        Ok(())
    }

    fn query_tickets(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<Ticket>, DbError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, TicketRow::from_row)?;
        let mut tickets = Vec::new();
        for row in rows {
            tickets.push(row?.decode()?);
        }
        Ok(tickets)
    }
}

fn parse_timestamp(timestamp: &str, owner: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            owner: owner.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}
