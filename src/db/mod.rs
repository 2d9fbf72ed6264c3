use crate::errors::{AppError, AppResult};
use crate::models::{
    AuditEntityType, AuditLogEntry, CrownItemReason, EntityCounts, MusicCrownItem, MusicEvent,
    MusicPending, MusicSummary, PendingReason, ACTION_UPDATE_REASON,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

const SCHEMA_SQL: &str = include_str!("schema.sql");

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    Memory,
    File(PathBuf),
}

impl DatabaseLocation {
    /// Accepts `sqlite://path`, `sqlite:path`, `file:path`, a bare path, or
    /// `:memory:` / `sqlite::memory:`.
    pub fn from_url(url: &str) -> AppResult<Self> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(AppError::Config("DATABASE_URL is empty".to_string()));
        }
        if matches!(trimmed, ":memory:" | "sqlite::memory:" | "sqlite://:memory:") {
            return Ok(Self::Memory);
        }

        for prefix in ["sqlite://", "sqlite:", "file:"] {
            if let Some(rest) = trimmed.strip_prefix(prefix) {
                let path = rest.split_once('?').map_or(rest, |(path, _)| path);
                if path.is_empty() {
                    return Err(AppError::Config(format!("DATABASE_URL has no path: {trimmed}")));
                }
                return Ok(Self::File(PathBuf::from(path)));
            }
        }

        if let Some((scheme, _)) = trimmed.split_once("://") {
            return Err(AppError::Config(format!(
                "unsupported DATABASE_URL scheme '{scheme}' (expected sqlite)"
            )));
        }
        Ok(Self::File(PathBuf::from(trimmed)))
    }
}

#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
    location: DatabaseLocation,
}

impl Database {
    pub fn open_url(url: &str) -> AppResult<Self> {
        match DatabaseLocation::from_url(url)? {
            DatabaseLocation::Memory => Self::open_in_memory(),
            DatabaseLocation::File(path) => Self::new(&path),
        }
    }

    pub fn new(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn, DatabaseLocation::File(path.to_path_buf()))
    }

    pub fn open_in_memory() -> AppResult<Self> {
        Self::init(Connection::open_in_memory()?, DatabaseLocation::Memory)
    }

    fn init(conn: Connection, location: DatabaseLocation) -> AppResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
            location,
        })
    }

    pub fn location(&self) -> &DatabaseLocation {
        &self.location
    }

    fn conn(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("database mutex poisoned".to_string()))
    }

    /// Closes the connection, surfacing errors that `Drop` would swallow.
    pub fn close(self) -> AppResult<()> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        conn.close().map_err(|(_, err)| AppError::from(err))
    }

    pub fn upsert_event(&self, event: &MusicEvent) -> AppResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO music_events (id, event_date, planned_count, decided_count, status, note)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
               event_date = excluded.event_date,
               planned_count = excluded.planned_count,
               decided_count = excluded.decided_count,
               status = excluded.status,
               note = excluded.note",
            params![
                event.id,
                event.event_date,
                event.planned_count,
                event.decided_count,
                event.status,
                event.note
            ],
        )?;
        Ok(())
    }

    pub fn upsert_crown_item(&self, item: &MusicCrownItem) -> AppResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO music_crown_items (
               timeline_index, event_id, crown_date, title, card_received_date, note, reason
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(timeline_index) DO UPDATE SET
               event_id = excluded.event_id,
               crown_date = excluded.crown_date,
               title = excluded.title,
               card_received_date = excluded.card_received_date,
               note = excluded.note,
               reason = excluded.reason",
            params![
                item.timeline_index,
                item.event_id,
                item.crown_date,
                item.title,
                item.card_received_date,
                item.note,
                item.reason
            ],
        )?;
        Ok(())
    }

    pub fn upsert_pending(&self, pending: &MusicPending) -> AppResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO music_pending (pending_id, temp_code, title, reason)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(pending_id) DO UPDATE SET
               temp_code = excluded.temp_code,
               title = excluded.title,
               reason = excluded.reason",
            params![pending.pending_id, pending.temp_code, pending.title, pending.reason],
        )?;
        Ok(())
    }

    pub fn entity_counts(&self) -> AppResult<EntityCounts> {
        let conn = self.conn()?;
        let count = |table: &str| -> rusqlite::Result<i64> {
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        };
        Ok(EntityCounts {
            events: count("music_events")?,
            items: count("music_crown_items")?,
            pending: count("music_pending")?,
        })
    }

    pub fn music_summary(&self) -> AppResult<MusicSummary> {
        let counts = self.entity_counts()?;
        let conn = self.conn()?;
        let last_event_date: Option<String> = conn.query_row(
            "SELECT MAX(event_date) FROM music_events WHERE event_date <> ''",
            [],
            |row| row.get(0),
        )?;
        Ok(MusicSummary {
            counts,
            last_event_date,
        })
    }

    pub fn list_events(&self) -> AppResult<Vec<MusicEvent>> {
        let conn = self.conn()?;
        let mut statement = conn.prepare(
            "SELECT id, event_date, planned_count, decided_count, status, note
             FROM music_events ORDER BY event_date ASC, id ASC",
        )?;
        let rows = statement.query_map([], parse_event_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    pub fn list_crown_items(&self) -> AppResult<Vec<MusicCrownItem>> {
        let conn = self.conn()?;
        let mut statement = conn.prepare(
            "SELECT timeline_index, event_id, crown_date, title, card_received_date, note, reason
             FROM music_crown_items ORDER BY timeline_index ASC",
        )?;
        let rows = statement.query_map([], parse_crown_item_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    pub fn list_pending(&self) -> AppResult<Vec<MusicPending>> {
        let conn = self.conn()?;
        let mut statement = conn.prepare(
            "SELECT pending_id, temp_code, title, reason FROM music_pending ORDER BY pending_id ASC",
        )?;
        let rows = statement.query_map([], parse_pending_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    pub fn get_crown_item(&self, timeline_index: i64) -> AppResult<Option<MusicCrownItem>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT timeline_index, event_id, crown_date, title, card_received_date, note, reason
             FROM music_crown_items WHERE timeline_index = ?1",
            [timeline_index],
            parse_crown_item_row,
        )
        .optional()
        .map_err(AppError::from)
    }

    pub fn get_pending(&self, pending_id: &str) -> AppResult<Option<MusicPending>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT pending_id, temp_code, title, reason FROM music_pending WHERE pending_id = ?1",
            [pending_id],
            parse_pending_row,
        )
        .optional()
        .map_err(AppError::from)
    }

    /// Sets `reason` and records the before/after snapshot in one transaction.
    /// Returns `None` when no such item exists.
    pub fn update_crown_item_reason(
        &self,
        timeline_index: i64,
        reason: &str,
    ) -> AppResult<Option<CrownItemReason>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let Some(before) = select_crown_item_reason(&tx, timeline_index)? else {
            return Ok(None);
        };
        tx.execute(
            "UPDATE music_crown_items SET reason = ?1 WHERE timeline_index = ?2",
            params![reason, timeline_index],
        )?;
        let after = select_crown_item_reason(&tx, timeline_index)?.ok_or_else(|| {
            AppError::Internal(format!("crown item {timeline_index} vanished during update"))
        })?;

        insert_audit_log(
            &tx,
            AuditEntityType::MusicCrownItem,
            &timeline_index.to_string(),
            ACTION_UPDATE_REASON,
            &before,
            &after,
        )?;
        tx.commit()?;
        Ok(Some(after))
    }

    pub fn update_pending_reason(
        &self,
        pending_id: &str,
        reason: &str,
    ) -> AppResult<Option<PendingReason>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let Some(before) = select_pending_reason(&tx, pending_id)? else {
            return Ok(None);
        };
        tx.execute(
            "UPDATE music_pending SET reason = ?1 WHERE pending_id = ?2",
            params![reason, pending_id],
        )?;
        let after = select_pending_reason(&tx, pending_id)?.ok_or_else(|| {
            AppError::Internal(format!("pending {pending_id} vanished during update"))
        })?;

        insert_audit_log(
            &tx,
            AuditEntityType::MusicPending,
            pending_id,
            ACTION_UPDATE_REASON,
            &before,
            &after,
        )?;
        tx.commit()?;
        Ok(Some(after))
    }

    pub fn list_audit_logs(
        &self,
        entity_type: AuditEntityType,
        entity_id: &str,
    ) -> AppResult<Vec<AuditLogEntry>> {
        let conn = self.conn()?;
        let mut statement = conn.prepare(
            "SELECT id, entity_type, entity_id, action, before_json, after_json, created_at
             FROM audit_logs WHERE entity_type = ?1 AND entity_id = ?2
             ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = statement.query_map(params![entity_type.as_str(), entity_id], parse_audit_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }
}

fn select_crown_item_reason(
    tx: &Transaction<'_>,
    timeline_index: i64,
) -> AppResult<Option<CrownItemReason>> {
    tx.query_row(
        "SELECT timeline_index, title, reason, event_id FROM music_crown_items WHERE timeline_index = ?1",
        [timeline_index],
        |row| {
            Ok(CrownItemReason {
                timeline_index: row.get(0)?,
                title: row.get(1)?,
                reason: row.get(2)?,
                event_id: row.get(3)?,
            })
        },
    )
    .optional()
    .map_err(AppError::from)
}

fn select_pending_reason(tx: &Transaction<'_>, pending_id: &str) -> AppResult<Option<PendingReason>> {
    tx.query_row(
        "SELECT pending_id, temp_code, title, reason FROM music_pending WHERE pending_id = ?1",
        [pending_id],
        |row| {
            Ok(PendingReason {
                pending_id: row.get(0)?,
                temp_code: row.get(1)?,
                title: row.get(2)?,
                reason: row.get(3)?,
            })
        },
    )
    .optional()
    .map_err(AppError::from)
}

fn insert_audit_log<B: Serialize, A: Serialize>(
    tx: &Transaction<'_>,
    entity_type: AuditEntityType,
    entity_id: &str,
    action: &str,
    before: &B,
    after: &A,
) -> AppResult<AuditLogEntry> {
    let entry = AuditLogEntry {
        id: Uuid::new_v4().to_string(),
        entity_type: entity_type.as_str().to_string(),
        entity_id: entity_id.to_string(),
        action: action.to_string(),
        before: serde_json::to_value(before)?,
        after: serde_json::to_value(after)?,
        created_at: Utc::now(),
    };

    tx.execute(
        "INSERT INTO audit_logs (id, entity_type, entity_id, action, before_json, after_json, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            entry.id,
            entry.entity_type,
            entry.entity_id,
            entry.action,
            serde_json::to_string(&entry.before)?,
            serde_json::to_string(&entry.after)?,
            entry.created_at.to_rfc3339()
        ],
    )?;
    tracing::info!(
        entity_type = %entry.entity_type,
        entity_id = %entry.entity_id,
        action = %entry.action,
        "audit entry written"
    );
    Ok(entry)
}

fn parse_event_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MusicEvent> {
    Ok(MusicEvent {
        id: row.get(0)?,
        event_date: row.get(1)?,
        planned_count: row.get(2)?,
        decided_count: row.get(3)?,
        status: row.get(4)?,
        note: row.get(5)?,
    })
}

fn parse_crown_item_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MusicCrownItem> {
    Ok(MusicCrownItem {
        timeline_index: row.get(0)?,
        event_id: row.get(1)?,
        crown_date: row.get(2)?,
        title: row.get(3)?,
        card_received_date: row.get(4)?,
        note: row.get(5)?,
        reason: row.get(6)?,
    })
}

fn parse_pending_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MusicPending> {
    Ok(MusicPending {
        pending_id: row.get(0)?,
        temp_code: row.get(1)?,
        title: row.get(2)?,
        reason: row.get(3)?,
    })
}

fn parse_audit_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditLogEntry> {
    let before_json: String = row.get(4)?;
    let after_json: String = row.get(5)?;
    let created_at: String = row.get(6)?;
    Ok(AuditLogEntry {
        id: row.get(0)?,
        entity_type: row.get(1)?,
        entity_id: row.get(2)?,
        action: row.get(3)?,
        before: parse_json(4, &before_json)?,
        after: parse_json(5, &after_json)?,
        created_at: parse_time(6, &created_at)?,
    })
}

fn parse_json(column: usize, raw: &str) -> rusqlite::Result<serde_json::Value> {
    serde_json::from_str(raw).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
    })
}

fn parse_time(column: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
        })
}
