//! In-memory implementation of the store traits.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use grantgate_core::{DownloadEvent, Grant, GrantCheck, GrantId, NewGrant};

use crate::error::{Result, StoreError};
use crate::traits::{AuditLog, GrantAccess, GrantStore, RecordedDownloadEvent};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Last id handed out; ids start at 1 and only grow.
    last_grant_id: i64,

    grants: BTreeMap<GrantId, Grant>,

    /// Download events in insertion order.
    events: Vec<RecordedDownloadEvent>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GrantStore for MemoryStore {
    async fn create_grant(&self, grant: NewGrant) -> Result<Grant> {
        let mut inner = self.write()?;

        inner.last_grant_id += 1;
        let id = GrantId::new(inner.last_grant_id);
        let grant = Grant::from_new(id, grant);
        inner.grants.insert(id, grant.clone());

        Ok(grant)
    }

    async fn find_grant(&self, id: GrantId) -> Result<Option<Grant>> {
        let inner = self.read()?;
        Ok(inner.grants.get(&id).cloned())
    }

    async fn update_grant(&self, grant: &Grant) -> Result<()> {
        let mut inner = self.write()?;

        let stored = inner
            .grants
            .get_mut(&grant.id)
            .ok_or_else(|| StoreError::NotFound(format!("grant {}", grant.id)))?;
        stored.access_count = grant.access_count;
        stored.last_access_time = grant.last_access_time;

        Ok(())
    }

    async fn record_grant_access(
        &self,
        id: GrantId,
        path: &str,
        now: i64,
    ) -> Result<GrantAccess> {
        // One write lock covers lookup, check and increment.
        let mut inner = self.write()?;

        let Some(grant) = inner.grants.get_mut(&id) else {
            return Ok(GrantAccess::NotFound);
        };

        match grant.check(path, now) {
            GrantCheck::PathMismatch => Ok(GrantAccess::PathMismatch),
            GrantCheck::Expired => Ok(GrantAccess::Expired),
            GrantCheck::Usable => {
                grant.record_access(now);
                Ok(GrantAccess::Granted(grant.clone()))
            }
        }
    }
}

#[async_trait]
impl AuditLog for MemoryStore {
    async fn append_download_event(&self, event: &DownloadEvent) -> Result<i64> {
        let mut inner = self.write()?;

        let id = inner.events.len() as i64 + 1;
        inner.events.push(RecordedDownloadEvent {
            id,
            event: event.clone(),
        });

        Ok(id)
    }

    async fn list_download_events(
        &self,
        file_name: Option<&str>,
    ) -> Result<Vec<RecordedDownloadEvent>> {
        let inner = self.read()?;

        Ok(inner
            .events
            .iter()
            .filter(|r| file_name.map_or(true, |f| r.event.file_name == f))
            .cloned()
            .collect())
    }
}
