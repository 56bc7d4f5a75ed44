//! Store traits: the abstract interface for grant and audit persistence.
//!
//! Both traits are usually implemented by the same backend, since grants and
//! download events share one durable store.

use async_trait::async_trait;
use grantgate_core::{DownloadEvent, Grant, GrantId, NewGrant};

use crate::error::Result;

/// Result of an atomic grant validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantAccess {
    /// The grant matched and its counters were bumped. Holds the updated grant.
    Granted(Grant),
    /// No grant with that id.
    NotFound,
    /// The grant is bound to a different path.
    PathMismatch,
    /// The grant's expiry has passed.
    Expired,
}

impl GrantAccess {
    /// The granted record, if access was allowed.
    pub fn into_grant(self) -> Option<Grant> {
        match self {
            GrantAccess::Granted(grant) => Some(grant),
            _ => None,
        }
    }

    /// Short label for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantAccess::Granted(_) => "granted",
            GrantAccess::NotFound => "not_found",
            GrantAccess::PathMismatch => "path_mismatch",
            GrantAccess::Expired => "expired",
        }
    }
}

/// A download event as stored, with its autoincrement id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedDownloadEvent {
    pub id: i64,
    pub event: DownloadEvent,
}

/// Persistence for grant records.
///
/// All methods are async. The SQLite backend runs each call on the blocking
/// pool via `spawn_blocking`.
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Persist a new grant and return it with its assigned id.
    ///
    /// Ids are never reused, even after rows are removed by outside tooling.
    async fn create_grant(&self, grant: NewGrant) -> Result<Grant>;

    /// Look up a grant by id.
    async fn find_grant(&self, id: GrantId) -> Result<Option<Grant>>;

    /// Write back a grant's access counters.
    ///
    /// Only `access_count` and `last_access_time` are written; the path, tag,
    /// type and expiry of a grant are immutable.
    async fn update_grant(&self, grant: &Grant) -> Result<()>;

    /// Validate a grant against `path` at `now` and, if usable, bump its
    /// counters.
    ///
    /// The lookup, the path/expiry check and the update happen as one atomic
    /// operation, so concurrent validations of the same grant never lose an
    /// increment.
    async fn record_grant_access(&self, id: GrantId, path: &str, now: i64)
        -> Result<GrantAccess>;
}

/// Append-only persistence for download events.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Append an event and return its id.
    async fn append_download_event(&self, event: &DownloadEvent) -> Result<i64>;

    /// List events in insertion order, optionally only those for one file.
    async fn list_download_events(
        &self,
        file_name: Option<&str>,
    ) -> Result<Vec<RecordedDownloadEvent>>;
}
