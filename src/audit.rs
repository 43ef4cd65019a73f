use crate::error::DashboardResult;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One administrative action ("every change is an event")
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AuditEntry {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub action: String,
}

impl AuditEntry {
    pub fn new(actor: &str, action: impl Into<String>) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            actor: actor.to_string(),
            action: action.into(),
        }
    }
}

/// Append-only audit trail
pub trait AuditLog {
    fn append(&mut self, entry: &AuditEntry) -> DashboardResult<()>;

    /// All entries, oldest first
    fn entries(&self) -> DashboardResult<Vec<AuditEntry>>;
}

// ============================================================================
// IN-MEMORY
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    entries: Vec<AuditEntry>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditLog for MemoryAuditLog {
    fn append(&mut self, entry: &AuditEntry) -> DashboardResult<()> {
        self.entries.push(entry.clone());
        Ok(())
    }

    fn entries(&self) -> DashboardResult<Vec<AuditEntry>> {
        Ok(self.entries.clone())
    }
}

// ============================================================================
// SQLITE
// ============================================================================

pub struct SqliteAuditLog {
    conn: Connection,
}

impl SqliteAuditLog {
    /// Open (or create) the audit database. File databases use WAL mode.
    pub fn open(path: &Path) -> DashboardResult<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        setup_audit_table(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> DashboardResult<Self> {
        let conn = Connection::open_in_memory()?;
        setup_audit_table(&conn)?;
        Ok(Self { conn })
    }
}

fn setup_audit_table(conn: &Connection) -> DashboardResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS audit_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            actor TEXT NOT NULL,
            action TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_events(timestamp)",
        [],
    )?;

    Ok(())
}

impl AuditLog for SqliteAuditLog {
    fn append(&mut self, entry: &AuditEntry) -> DashboardResult<()> {
        self.conn.execute(
            "INSERT INTO audit_events (event_id, timestamp, actor, action)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.event_id,
                entry.timestamp.to_rfc3339(),
                entry.actor,
                entry.action,
            ],
        )?;

        Ok(())
    }

    fn entries(&self) -> DashboardResult<Vec<AuditEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT event_id, timestamp, actor, action
             FROM audit_events
             ORDER BY id ASC",
        )?;

        let entries = stmt
            .query_map([], |row| {
                let timestamp_str: String = row.get(1)?;

                Ok(AuditEntry {
                    event_id: row.get(0)?,
                    timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                        .map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
                        })?
                        .with_timezone(&Utc),
                    actor: row.get(2)?,
                    action: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }
}
