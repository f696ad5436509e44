//! Typed query helpers for every table in the contentvc database.
//!
//! Version and restore helpers take a `&Connection` so they can run inside a
//! [`Database::transaction`]. They perform no tenant checks of their own.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use super::Database;
use crate::errors::DatabaseError;
use crate::models::{
    body_hash, AuditAction, ContentVersion, NewRestoreRecord, NewVersion, RestoreRecord, TenantId,
};

/// A row from the `audit_log` table.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub tenant_id: i64,
    pub action: String,
    pub content_id: Option<i64>,
    pub version_id: Option<i64>,
    pub actor_id: Option<i64>,
    pub details: Option<String>,
    pub created_at: String,
}

const VERSION_COLUMNS: &str = "id, tenant_id, content_id, version_number, body, body_hash,
     author_id, is_current, tags, created_at, restored_from";

const RESTORE_COLUMNS: &str =
    "id, tenant_id, content_id, version_id, new_version_id, restored_by, restored_at, notes";

// -- content_versions -------------------------------------------------------

/// Append a new head version for `new.content_id`, demoting the previous
/// head. Must run inside a transaction.
pub fn insert_version(
    conn: &Connection,
    tenant: TenantId,
    new: &NewVersion,
    version_number: i64,
) -> Result<ContentVersion, DatabaseError> {
    let created_at = Utc::now();
    let hash = body_hash(&new.body);
    let tags = serde_json::to_string(&new.tags)?;

    conn.execute(
        "UPDATE content_versions SET is_current = 0 WHERE content_id = ?1 AND is_current = 1",
        params![new.content_id],
    )?;
    conn.execute(
        "INSERT INTO content_versions
         (tenant_id, content_id, version_number, body, body_hash, author_id, is_current, tags,
          created_at, restored_from)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?8, ?9)",
        params![
            tenant.0,
            new.content_id,
            version_number,
            new.body,
            hash,
            new.author_id,
            tags,
            created_at.to_rfc3339(),
            new.restored_from
        ],
    )?;
    let id = conn.last_insert_rowid();
    debug!(id, content_id = new.content_id, version_number, "inserted content version");

    Ok(ContentVersion {
        id,
        content_id: new.content_id,
        tenant_id: tenant,
        version_number,
        body: new.body.clone(),
        body_hash: hash,
        created_at,
        author_id: new.author_id,
        is_current: true,
        tags: new.tags.clone(),
        restored_from: new.restored_from,
    })
}

/// Fetch a version row by ID, regardless of tenant.
pub fn get_version(conn: &Connection, id: i64) -> Result<Option<ContentVersion>, DatabaseError> {
    let sql = format!("SELECT {VERSION_COLUMNS} FROM content_versions WHERE id = ?1");
    let version = conn
        .query_row(&sql, params![id], version_from_row)
        .optional()?;
    Ok(version)
}

/// All versions of a content item, newest first.
pub fn list_versions(
    conn: &Connection,
    content_id: i64,
) -> Result<Vec<ContentVersion>, DatabaseError> {
    let sql = format!(
        "SELECT {VERSION_COLUMNS} FROM content_versions
         WHERE content_id = ?1 ORDER BY version_number DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let versions = stmt
        .query_map(params![content_id], version_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(versions)
}

/// The head version of a content item.
pub fn current_version(
    conn: &Connection,
    content_id: i64,
) -> Result<Option<ContentVersion>, DatabaseError> {
    let sql = format!(
        "SELECT {VERSION_COLUMNS} FROM content_versions
         WHERE content_id = ?1 AND is_current = 1"
    );
    let version = conn
        .query_row(&sql, params![content_id], version_from_row)
        .optional()?;
    Ok(version)
}

/// The tenant that owns `content_id`, if any version exists.
pub fn content_owner(conn: &Connection, content_id: i64) -> Result<Option<TenantId>, DatabaseError> {
    let owner = conn
        .query_row(
            "SELECT tenant_id FROM content_versions WHERE content_id = ?1 LIMIT 1",
            params![content_id],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(owner.map(TenantId))
}

/// Highest version number assigned to `content_id`, or 0.
pub fn max_version_number(conn: &Connection, content_id: i64) -> Result<i64, DatabaseError> {
    let max: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version_number), 0) FROM content_versions WHERE content_id = ?1",
        params![content_id],
        |row| row.get(0),
    )?;
    Ok(max)
}

fn version_from_row(row: &Row<'_>) -> rusqlite::Result<ContentVersion> {
    let tags_json: String = row.get(8)?;
    let tags: BTreeSet<String> = serde_json::from_str(&tags_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(e)))?;
    let created_at: String = row.get(9)?;
    let is_current: i64 = row.get(7)?;

    Ok(ContentVersion {
        id: row.get(0)?,
        tenant_id: TenantId(row.get(1)?),
        content_id: row.get(2)?,
        version_number: row.get(3)?,
        body: row.get(4)?,
        body_hash: row.get(5)?,
        author_id: row.get(6)?,
        is_current: is_current == 1,
        tags,
        created_at: parse_datetime(9, &created_at)?,
        restored_from: row.get(10)?,
    })
}

// -- restore_records --------------------------------------------------------

/// Append a restore record.
pub fn insert_restore_record(
    conn: &Connection,
    tenant: TenantId,
    record: &NewRestoreRecord,
) -> Result<RestoreRecord, DatabaseError> {
    let restored_at = Utc::now();
    conn.execute(
        "INSERT INTO restore_records
         (tenant_id, content_id, version_id, new_version_id, restored_by, restored_at, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            tenant.0,
            record.content_id,
            record.version_id,
            record.new_version_id,
            record.restored_by,
            restored_at.to_rfc3339(),
            record.notes
        ],
    )?;
    let id = conn.last_insert_rowid();
    debug!(
        id,
        version_id = record.version_id,
        new_version_id = record.new_version_id,
        "inserted restore record"
    );

    Ok(RestoreRecord {
        id,
        tenant_id: tenant,
        content_id: record.content_id,
        version_id: record.version_id,
        new_version_id: record.new_version_id,
        restored_by: record.restored_by,
        restored_at,
        notes: record.notes.clone(),
    })
}

/// Restore records for one content item, newest first.
pub fn list_restore_records(
    conn: &Connection,
    tenant: TenantId,
    content_id: i64,
) -> Result<Vec<RestoreRecord>, DatabaseError> {
    let sql = format!(
        "SELECT {RESTORE_COLUMNS} FROM restore_records
         WHERE tenant_id = ?1 AND content_id = ?2 ORDER BY id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let records = stmt
        .query_map(params![tenant.0, content_id], |row| {
            let restored_at: String = row.get(6)?;
            Ok(RestoreRecord {
                id: row.get(0)?,
                tenant_id: TenantId(row.get(1)?),
                content_id: row.get(2)?,
                version_id: row.get(3)?,
                new_version_id: row.get(4)?,
                restored_by: row.get(5)?,
                restored_at: parse_datetime(6, &restored_at)?,
                notes: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

// -- audit_log --------------------------------------------------------------

/// Write an audit-log entry.
pub fn insert_audit_log(
    conn: &Connection,
    tenant: TenantId,
    action: AuditAction,
    content_id: Option<i64>,
    version_id: Option<i64>,
    actor_id: Option<i64>,
    details: Option<&str>,
) -> Result<i64, DatabaseError> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO audit_log (tenant_id, action, content_id, version_id, actor_id, details, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            tenant.0,
            action.to_string(),
            content_id,
            version_id,
            actor_id,
            details,
            now
        ],
    )?;
    let id = conn.last_insert_rowid();
    debug!(id, %action, "inserted audit_log entry");
    Ok(id)
}

impl Database {
    /// List recent audit-log entries for one tenant, newest first.
    pub fn list_audit_log(
        &self,
        tenant: TenantId,
        limit: u32,
    ) -> Result<Vec<AuditLogEntry>, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, tenant_id, action, content_id, version_id, actor_id, details, created_at
             FROM audit_log WHERE tenant_id = ?1 ORDER BY id DESC LIMIT ?2",
        )?;
        let entries = stmt
            .query_map(params![tenant.0, limit], |row| {
                Ok(AuditLogEntry {
                    id: row.get(0)?,
                    tenant_id: row.get(1)?,
                    action: row.get(2)?,
                    content_id: row.get(3)?,
                    version_id: row.get(4)?,
                    actor_id: row.get(5)?,
                    details: row.get(6)?,
                    created_at: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

fn parse_datetime(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
