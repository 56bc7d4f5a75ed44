//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use grantgate_core::now_millis;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
        tracing::debug!(version = CURRENT_VERSION, "migrated grant store schema");
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: grants and download events.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- AUTOINCREMENT keeps ids from being reused after deletes
        CREATE TABLE grants (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            path TEXT NOT NULL,
            tag TEXT NOT NULL,
            grant_type TEXT NOT NULL,          -- CREATOR | PURCHASE
            expire_time INTEGER NOT NULL,      -- Unix ms, immutable
            access_count INTEGER NOT NULL DEFAULT 0,
            last_access_time INTEGER,          -- Unix ms, NULL until first use
            created_at INTEGER NOT NULL
        );

        -- Append-only; no foreign key to grants
        CREATE TABLE download_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            access_type TEXT NOT NULL,         -- CREATOR | USER | GRANT | PURCHASE
            tag TEXT NOT NULL,
            file_name TEXT NOT NULL,
            file_hash TEXT NOT NULL,           -- hex digest of transmitted bytes
            download_time INTEGER NOT NULL,    -- Unix ms, request start
            client_ip TEXT NOT NULL
        );

        CREATE INDEX idx_grants_expire ON grants(expire_time);
        CREATE INDEX idx_download_events_file ON download_events(file_name);
        CREATE INDEX idx_download_events_time ON download_events(download_time);
        "#,
    )?;

    Ok(())
}
