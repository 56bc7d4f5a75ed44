//! Grant records.
//!
//! A grant is a path-scoped, time-limited capability. It is created once,
//! never deleted here, and only its access counters change after creation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::types::GrantId;

/// Origin of a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GrantType {
    /// Issued by the creator through the grant-link side channel.
    Creator,
    /// Issued by purchase fulfillment.
    Purchase,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantType::Creator => "CREATOR",
            GrantType::Purchase => "PURCHASE",
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GrantType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATOR" => Ok(GrantType::Creator),
            "PURCHASE" => Ok(GrantType::Purchase),
            _ => Err(CoreError::UnknownVariant {
                kind: "grant type",
                value: s.to_string(),
            }),
        }
    }
}

/// Fields supplied when creating a grant. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGrant {
    pub path: String,
    pub tag: String,
    pub grant_type: GrantType,
    /// Unix milliseconds. Immutable once the grant exists.
    pub expire_time: i64,
}

impl NewGrant {
    pub fn new(
        path: impl Into<String>,
        tag: impl Into<String>,
        grant_type: GrantType,
        expire_time: i64,
    ) -> Self {
        Self {
            path: path.into(),
            tag: tag.into(),
            grant_type,
            expire_time,
        }
    }
}

/// A persisted grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub id: GrantId,

    /// Exact request path this grant unlocks.
    pub path: String,

    /// Beneficiary or purpose label, e.g. a purchase reference.
    pub tag: String,

    pub grant_type: GrantType,

    /// Unix milliseconds. The grant is usable strictly before this instant.
    pub expire_time: i64,

    /// Incremented on every successful validation.
    pub access_count: u64,

    /// Unix milliseconds of the most recent successful validation.
    pub last_access_time: Option<i64>,
}

/// Outcome of checking a grant against a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantCheck {
    Usable,
    PathMismatch,
    Expired,
}

impl Grant {
    /// Build the persisted form of a new grant.
    pub fn from_new(id: GrantId, new: NewGrant) -> Self {
        Self {
            id,
            path: new.path,
            tag: new.tag,
            grant_type: new.grant_type,
            expire_time: new.expire_time,
            access_count: 0,
            last_access_time: None,
        }
    }

    /// Whether the grant has expired at `now`.
    ///
    /// The expiry instant itself counts as expired.
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expire_time
    }

    /// Check whether this grant unlocks `path` at `now`.
    pub fn check(&self, path: &str, now: i64) -> GrantCheck {
        if self.path != path {
            GrantCheck::PathMismatch
        } else if self.is_expired(now) {
            GrantCheck::Expired
        } else {
            GrantCheck::Usable
        }
    }

    /// Record a successful validation.
    pub fn record_access(&mut self, now: i64) {
        self.access_count += 1;
        self.last_access_time = Some(now);
    }
}
