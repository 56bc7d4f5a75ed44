//! Access classification for downloads.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::grant::GrantType;

/// How a download was authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessType {
    /// Creator session impersonating an arbitrary tag.
    Creator,
    /// Ordinary patron session.
    User,
    /// Grant link issued by the creator.
    Grant,
    /// Grant link issued by purchase fulfillment.
    Purchase,
}

impl AccessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessType::Creator => "CREATOR",
            AccessType::User => "USER",
            AccessType::Grant => "GRANT",
            AccessType::Purchase => "PURCHASE",
        }
    }
}

impl From<GrantType> for AccessType {
    fn from(grant_type: GrantType) -> Self {
        match grant_type {
            GrantType::Creator => AccessType::Grant,
            GrantType::Purchase => AccessType::Purchase,
        }
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATOR" => Ok(AccessType::Creator),
            "USER" => Ok(AccessType::User),
            "GRANT" => Ok(AccessType::Grant),
            "PURCHASE" => Ok(AccessType::Purchase),
            _ => Err(CoreError::UnknownVariant {
                kind: "access type",
                value: s.to_string(),
            }),
        }
    }
}

/// The identity responsible for one request. Never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    pub access_type: AccessType,
    pub tag: String,
}

impl AccessDecision {
    pub fn new(access_type: AccessType, tag: impl Into<String>) -> Self {
        Self {
            access_type,
            tag: tag.into(),
        }
    }
}
