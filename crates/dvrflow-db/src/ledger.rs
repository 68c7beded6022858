//! Ledger of recordings already scheduled for transcoding.
//!
//! The ledger is append-only: an identifier, once present, stays present for
//! the lifetime of the database file. Writes are single `INSERT OR IGNORE`
//! statements, so a racing publisher that loses simply observes
//! [`MarkOutcome::AlreadyPresent`].

use chrono::{DateTime, Utc};
use dvrflow_common::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::pool::{get_conn, init_memory_pool, init_pool, DbPool};

/// Table name used by earlier publisher releases.
const LEGACY_TABLE: &str = "uuid_recordings";

/// Result of [`Ledger::mark_scheduled`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// A new row was written.
    Inserted,
    /// The identifier was already present; nothing changed.
    AlreadyPresent,
}

/// One row of the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub uuid: String,
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Durable set of scheduled recording identifiers.
#[derive(Clone)]
pub struct Ledger {
    pool: DbPool,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("connections", &self.pool.state().connections)
            .finish()
    }
}

impl Ledger {
    /// Open (creating if needed) the ledger file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let pool = init_pool(path)?;
        Ok(Self { pool })
    }

    /// A throwaway ledger for tests and dry runs.
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            pool: init_memory_pool()?,
        })
    }

    pub fn from_pool(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Whether `uuid` has been scheduled before. Never writes.
    pub fn already_scheduled(&self, uuid: &str) -> Result<bool> {
        let conn = get_conn(&self.pool)?;
        already_scheduled(&conn, uuid)
    }

    /// Durably record `uuid` as scheduled.
    pub fn mark_scheduled(&self, uuid: &str) -> Result<MarkOutcome> {
        let conn = get_conn(&self.pool)?;
        mark_scheduled(&conn, uuid)
    }

    pub fn get(&self, uuid: &str) -> Result<LedgerEntry> {
        let conn = get_conn(&self.pool)?;
        get_entry(&conn, uuid)
    }

    pub fn count(&self) -> Result<u64> {
        let conn = get_conn(&self.pool)?;
        count(&conn)
    }

    /// Most recently scheduled entries first.
    pub fn list(&self, limit: usize) -> Result<Vec<LedgerEntry>> {
        let conn = get_conn(&self.pool)?;
        list_recent(&conn, limit)
    }

    /// Copy identifiers out of the legacy `uuid_recordings` table, if the
    /// database file still has one. Returns how many were new.
    pub fn import_legacy(&self) -> Result<usize> {
        let conn = get_conn(&self.pool)?;
        import_legacy_table(&conn)
    }
}

/// Check for an identifier.
pub fn already_scheduled(conn: &Connection, uuid: &str) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM scheduled_recordings WHERE uuid = ?)",
        [uuid],
        |row| row.get::<_, bool>(0),
    )
    .map_err(|e| Error::database(e.to_string()))
}

/// Insert an identifier unless it is already present.
pub fn mark_scheduled(conn: &Connection, uuid: &str) -> Result<MarkOutcome> {
    let changed = conn
        .execute(
            "INSERT OR IGNORE INTO scheduled_recordings (uuid, scheduled_at) VALUES (?, ?)",
            params![uuid, Utc::now().to_rfc3339()],
        )
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(if changed == 1 {
        MarkOutcome::Inserted
    } else {
        MarkOutcome::AlreadyPresent
    })
}

/// Get a single entry by identifier.
pub fn get_entry(conn: &Connection, uuid: &str) -> Result<LedgerEntry> {
    conn.query_row(
        "SELECT uuid, scheduled_at FROM scheduled_recordings WHERE uuid = ?",
        [uuid],
        row_to_entry,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))?
    .ok_or_else(|| Error::not_found(format!("ledger entry {uuid}")))
}

/// Count all entries.
pub fn count(conn: &Connection) -> Result<u64> {
    conn.query_row("SELECT COUNT(*) FROM scheduled_recordings", [], |row| {
        row.get::<_, i64>(0)
    })
    .map(|n| n as u64)
    .map_err(|e| Error::database(e.to_string()))
}

/// List entries, newest first.
pub fn list_recent(conn: &Connection, limit: usize) -> Result<Vec<LedgerEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT uuid, scheduled_at FROM scheduled_recordings
             ORDER BY scheduled_at DESC, uuid ASC LIMIT ?",
        )
        .map_err(|e| Error::database(e.to_string()))?;

    let entries = stmt
        .query_map([limit as i64], row_to_entry)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(entries)
}

/// Import identifiers from the legacy table.
pub fn import_legacy_table(conn: &Connection) -> Result<usize> {
    let exists: bool = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
            [LEGACY_TABLE],
            |row| row.get(0),
        )
        .map_err(|e| Error::database(e.to_string()))?;
    if !exists {
        return Ok(0);
    }

    conn.execute(
        &format!(
            "INSERT OR IGNORE INTO scheduled_recordings (uuid) SELECT uuid FROM {LEGACY_TABLE} WHERE uuid IS NOT NULL"
        ),
        [],
    )
    .map_err(|e| Error::database(e.to_string()))
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<LedgerEntry> {
    Ok(LedgerEntry {
        uuid: row.get(0)?,
        scheduled_at: row
            .get::<_, Option<String>>(1)?
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc)),
    })
}
