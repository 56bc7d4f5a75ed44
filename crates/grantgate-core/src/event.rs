//! Download audit events.

use serde::{Deserialize, Serialize};

use crate::access::{AccessDecision, AccessType};

/// Immutable record of one download attempt, successful or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadEvent {
    pub access_type: AccessType,
    pub tag: String,

    /// Requested file, relative to the exclusive-content root.
    pub file_name: String,

    /// Hex digest of the bytes actually sent to the client.
    ///
    /// For an interrupted download this covers only the emitted prefix.
    pub file_hash: String,

    /// Unix milliseconds, captured before any I/O.
    pub download_time: i64,

    pub client_ip: String,
}

impl DownloadEvent {
    /// Digest used for `file_hash`.
    pub const HASH_ALGORITHM: &'static str = "blake3";

    pub fn new(
        decision: &AccessDecision,
        file_name: impl Into<String>,
        file_hash: impl Into<String>,
        download_time: i64,
        client_ip: impl Into<String>,
    ) -> Self {
        Self {
            access_type: decision.access_type,
            tag: decision.tag.clone(),
            file_name: file_name.into(),
            file_hash: file_hash.into(),
            download_time,
            client_ip: client_ip.into(),
        }
    }
}
