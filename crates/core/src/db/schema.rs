//! Database schema definitions and migration runner.
//!
//! Migrations are simple SQL strings applied in order. The `schema_version`
//! user-version pragma tracks which migrations have already been applied.

use rusqlite::Connection;
use tracing::{debug, info};

use crate::errors::DatabaseError;

/// All migrations, in order. Each entry is `(version, description, sql)`.
/// Versions start at 1. The current schema version is stored in the SQLite
/// `user_version` pragma.
static MIGRATIONS: &[(u32, &str, &str)] = &[
    (
        1,
        "initial schema",
        r#"
        CREATE TABLE IF NOT EXISTS content_versions (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id       INTEGER NOT NULL,
            content_id      INTEGER NOT NULL,
            version_number  INTEGER NOT NULL CHECK (version_number >= 1),
            body            TEXT    NOT NULL,
            body_hash       TEXT    NOT NULL,
            author_id       INTEGER NOT NULL,
            is_current      INTEGER NOT NULL DEFAULT 0 CHECK (is_current IN (0, 1)),
            tags            TEXT    NOT NULL DEFAULT '[]',
            created_at      TEXT    NOT NULL,
            UNIQUE (content_id, version_number)
        );

        CREATE INDEX IF NOT EXISTS idx_content_versions_tenant_content
            ON content_versions (tenant_id, content_id);

        -- At most one head per content item.
        CREATE UNIQUE INDEX IF NOT EXISTS idx_content_versions_current
            ON content_versions (content_id) WHERE is_current = 1;

        CREATE TRIGGER IF NOT EXISTS content_versions_immutable
            BEFORE UPDATE OF tenant_id, content_id, version_number, body, body_hash, author_id, created_at
            ON content_versions
        BEGIN
            SELECT RAISE(ABORT, 'content versions are immutable');
        END;

        CREATE TRIGGER IF NOT EXISTS content_versions_append_only
            BEFORE DELETE ON content_versions
        BEGIN
            SELECT RAISE(ABORT, 'content versions are append-only');
        END;

        CREATE TABLE IF NOT EXISTS audit_log (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id   INTEGER NOT NULL,
            action      TEXT    NOT NULL,
            content_id  INTEGER,
            version_id  INTEGER,
            actor_id    INTEGER,
            details     TEXT,
            created_at  TEXT    NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_audit_log_tenant ON audit_log (tenant_id, id);
        CREATE INDEX IF NOT EXISTS idx_audit_log_action ON audit_log (action);
        "#,
    ),
    (
        2,
        "restore provenance",
        r#"
        ALTER TABLE content_versions
            ADD COLUMN restored_from INTEGER REFERENCES content_versions (id);

        CREATE TABLE IF NOT EXISTS restore_records (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id       INTEGER NOT NULL,
            content_id      INTEGER NOT NULL,
            version_id      INTEGER NOT NULL REFERENCES content_versions (id),
            new_version_id  INTEGER NOT NULL UNIQUE REFERENCES content_versions (id),
            restored_by     INTEGER NOT NULL,
            restored_at     TEXT    NOT NULL,
            notes           TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_restore_records_content
            ON restore_records (tenant_id, content_id);
        "#,
    ),
];

/// Run all pending migrations against `conn`.
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current_version = get_schema_version(conn)?;
    info!(
        current_version,
        target_version = MIGRATIONS.last().map(|m| m.0).unwrap_or(0),
        "checking database migrations"
    );

    for &(version, description, sql) in MIGRATIONS {
        if version > current_version {
            info!(version, description, "applying migration");
            conn.execute_batch(sql)
                .map_err(|e| DatabaseError::MigrationFailed {
                    version,
                    detail: e.to_string(),
                })?;
            set_schema_version(conn, version)?;
            debug!(version, "migration applied successfully");
        }
    }

    Ok(())
}

/// Read the current schema version from the SQLite `user_version` pragma.
fn get_schema_version(conn: &Connection) -> Result<u32, DatabaseError> {
    let version: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

/// Set the schema version via the SQLite `user_version` pragma.
fn set_schema_version(conn: &Connection, version: u32) -> Result<(), DatabaseError> {
    conn.pragma_update(None, "user_version", version)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert_row(conn: &Connection, content_id: i64, number: i64, current: i64) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO content_versions
             (tenant_id, content_id, version_number, body, body_hash, author_id, is_current, created_at)
             VALUES (1, ?1, ?2, 'b', 'h', 1, ?3, '2025-01-01T00:00:00Z')",
            rusqlite::params![content_id, number, current],
        )
    }

    #[test]
    fn test_migrations_run_idempotently() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), 2);
    }

    #[test]
    fn test_tables_created() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let tables: Vec<String> = {
            let mut stmt = conn
                .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
                .unwrap();
            stmt.query_map([], |row| row.get(0))
                .unwrap()
                .filter_map(|r| r.ok())
                .collect()
        };

        assert!(tables.contains(&"content_versions".to_string()));
        assert!(tables.contains(&"restore_records".to_string()));
        assert!(tables.contains(&"audit_log".to_string()));
    }

    #[test]
    fn test_version_number_unique_per_content() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        insert_row(&conn, 42, 1, 0).unwrap();
        assert!(insert_row(&conn, 42, 1, 0).is_err());
        insert_row(&conn, 43, 1, 0).unwrap();
    }

    #[test]
    fn test_single_current_row_per_content() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        insert_row(&conn, 42, 1, 1).unwrap();
        assert!(insert_row(&conn, 42, 2, 1).is_err());
        insert_row(&conn, 42, 2, 0).unwrap();
    }

    #[test]
    fn test_versions_are_immutable_and_append_only() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        insert_row(&conn, 42, 1, 1).unwrap();

        assert!(conn
            .execute("UPDATE content_versions SET body = 'edited'", [])
            .is_err());
        assert!(conn.execute("DELETE FROM content_versions", []).is_err());
        // Head bookkeeping is the only permitted update.
        conn.execute("UPDATE content_versions SET is_current = 0", [])
            .unwrap();
    }
}
