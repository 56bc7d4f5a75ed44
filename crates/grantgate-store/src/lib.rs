//! # Grantgate Store
//!
//! Persistence for grants and download audit events, behind the
//! [`GrantStore`] and [`AuditLog`] traits.
//!
//! ## Key Types
//!
//! - [`GrantStore`] - Create, look up and atomically validate grants
//! - [`AuditLog`] - Append-only download event log
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use grantgate_core::{GrantType, NewGrant};
//! use grantgate_store::{GrantStore, SqliteStore};
//!
//! async fn example() {
//!     let store = SqliteStore::open("grants.db").unwrap();
//!
//!     let grant = store
//!         .create_grant(NewGrant::new("/exclusive/book.pdf", "promo1", GrantType::Creator, 0))
//!         .await
//!         .unwrap();
//!     println!("created grant {}", grant.id);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Atomic validation**: `record_grant_access` checks path and expiry and
//!   bumps the counters in one transaction
//! - **Append-only audit**: download events are never updated or deleted here

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{AuditLog, GrantAccess, GrantStore, RecordedDownloadEvent};
