//! SQLite implementation of the store traits.
//!
//! This is the primary storage backend. It uses rusqlite with bundled SQLite,
//! wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use grantgate_core::{
    now_millis, AccessType, DownloadEvent, Grant, GrantCheck, GrantId, GrantType, NewGrant,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{AuditLog, GrantAccess, GrantStore, RecordedDownloadEvent};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|e| {
                StoreError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {}", e)))?
    }
}

// Helper to convert a row to Grant
fn row_to_grant(row: &rusqlite::Row<'_>) -> rusqlite::Result<Grant> {
    let grant_type: String = row.get("grant_type")?;
    let grant_type = grant_type.parse::<GrantType>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Grant {
        id: GrantId::new(row.get("id")?),
        path: row.get("path")?,
        tag: row.get("tag")?,
        grant_type,
        expire_time: row.get("expire_time")?,
        access_count: row.get::<_, i64>("access_count")?.max(0) as u64,
        last_access_time: row.get("last_access_time")?,
    })
}

// Helper to convert a row to RecordedDownloadEvent
fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecordedDownloadEvent> {
    let access_type: String = row.get("access_type")?;
    let access_type = access_type.parse::<AccessType>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(RecordedDownloadEvent {
        id: row.get("id")?,
        event: DownloadEvent {
            access_type,
            tag: row.get("tag")?,
            file_name: row.get("file_name")?,
            file_hash: row.get("file_hash")?,
            download_time: row.get("download_time")?,
            client_ip: row.get("client_ip")?,
        },
    })
}

const SELECT_GRANT: &str = "SELECT id, path, tag, grant_type, expire_time, access_count,
        last_access_time
     FROM grants WHERE id = ?1";

#[async_trait]
impl GrantStore for SqliteStore {
    async fn create_grant(&self, grant: NewGrant) -> Result<Grant> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO grants (path, tag, grant_type, expire_time, access_count, created_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                params![
                    &grant.path,
                    &grant.tag,
                    grant.grant_type.as_str(),
                    grant.expire_time,
                    now_millis(),
                ],
            )?;

            let id = GrantId::new(conn.last_insert_rowid());
            Ok(Grant::from_new(id, grant))
        })
        .await
    }

    async fn find_grant(&self, id: GrantId) -> Result<Option<Grant>> {
        self.with_conn(move |conn| {
            conn.query_row(SELECT_GRANT, params![id.get()], row_to_grant)
                .optional()
                .map_err(StoreError::from)
        })
        .await
    }

    async fn update_grant(&self, grant: &Grant) -> Result<()> {
        let grant = grant.clone();

        self.with_conn(move |conn| {
            let updated = conn.execute(
                "UPDATE grants SET access_count = ?2, last_access_time = ?3 WHERE id = ?1",
                params![
                    grant.id.get(),
                    grant.access_count as i64,
                    grant.last_access_time,
                ],
            )?;

            if updated == 0 {
                return Err(StoreError::NotFound(format!("grant {}", grant.id)));
            }
            Ok(())
        })
        .await
    }

    async fn record_grant_access(
        &self,
        id: GrantId,
        path: &str,
        now: i64,
    ) -> Result<GrantAccess> {
        let path = path.to_string();

        self.with_conn(move |conn| {
            // IMMEDIATE takes the write lock up front so the read below cannot
            // go stale before the update lands.
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let grant = tx
                .query_row(SELECT_GRANT, params![id.get()], row_to_grant)
                .optional()?;

            let Some(mut grant) = grant else {
                return Ok(GrantAccess::NotFound);
            };

            match grant.check(&path, now) {
                GrantCheck::PathMismatch => return Ok(GrantAccess::PathMismatch),
                GrantCheck::Expired => return Ok(GrantAccess::Expired),
                GrantCheck::Usable => {}
            }

            tx.execute(
                "UPDATE grants SET access_count = access_count + 1, last_access_time = ?2
                 WHERE id = ?1",
                params![id.get(), now],
            )?;
            tx.commit()?;

            grant.record_access(now);
            Ok(GrantAccess::Granted(grant))
        })
        .await
    }
}

#[async_trait]
impl AuditLog for SqliteStore {
    async fn append_download_event(&self, event: &DownloadEvent) -> Result<i64> {
        let event = event.clone();

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO download_events (
                    access_type, tag, file_name, file_hash, download_time, client_ip
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    event.access_type.as_str(),
                    &event.tag,
                    &event.file_name,
                    &event.file_hash,
                    event.download_time,
                    &event.client_ip,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    async fn list_download_events(
        &self,
        file_name: Option<&str>,
    ) -> Result<Vec<RecordedDownloadEvent>> {
        let file_name = file_name.map(String::from);

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, access_type, tag, file_name, file_hash, download_time, client_ip
                 FROM download_events
                 WHERE ?1 IS NULL OR file_name = ?1
                 ORDER BY id",
            )?;

            let events = stmt
                .query_map(params![file_name], row_to_event)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(events)
        })
        .await
    }
}
