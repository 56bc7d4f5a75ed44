//! Gate configuration.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Deserializer};
use url::Url;

use grantgate_core::GrantKey;

use crate::error::{GateError, Result};

/// Configuration for an [`ExclusiveGate`](crate::ExclusiveGate).
///
/// Loaded once at startup. The grant key is read-only afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct GateConfig {
    /// 32-byte key as 64 hex digits.
    #[serde(deserialize_with = "deserialize_grant_key")]
    pub grant_key: GrantKey,

    /// Patron user id of the creator.
    pub creator_id: String,

    /// Directory holding exclusive content.
    pub exclusive_root: PathBuf,

    /// Request path prefix under which exclusive files are served.
    #[serde(default = "default_route_prefix")]
    pub route_prefix: String,

    /// Origin used to build canonical grant links.
    pub public_base_url: Url,

    /// Grant validity when `expires` is not given.
    #[serde(default = "default_grant_hours")]
    pub default_grant_hours: f32,

    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

fn default_route_prefix() -> String {
    "/exclusive/".to_string()
}

fn default_grant_hours() -> f32 {
    48.0
}

fn default_database_path() -> PathBuf {
    PathBuf::from("grantgate.db")
}

fn deserialize_grant_key<'de, D>(deserializer: D) -> std::result::Result<GrantKey, D::Error>
where
    D: Deserializer<'de>,
{
    let hex_key = String::deserialize(deserializer)?;
    GrantKey::from_hex(&hex_key).map_err(serde::de::Error::custom)
}

impl GateConfig {
    /// Build a configuration in code, with defaults for everything optional.
    pub fn new(
        grant_key: GrantKey,
        creator_id: impl Into<String>,
        exclusive_root: impl Into<PathBuf>,
        public_base_url: Url,
    ) -> Self {
        Self {
            grant_key,
            creator_id: creator_id.into(),
            exclusive_root: exclusive_root.into(),
            route_prefix: default_route_prefix(),
            public_base_url,
            default_grant_hours: default_grant_hours(),
            database_path: default_database_path(),
        }
    }

    /// Parse from TOML text.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| GateError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::from_toml_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.route_prefix.starts_with('/') || !self.route_prefix.ends_with('/') {
            return Err(GateError::Config(format!(
                "route_prefix must start and end with '/': {:?}",
                self.route_prefix
            )));
        }
        if self.creator_id.is_empty() {
            return Err(GateError::Config("creator_id must not be empty".to_string()));
        }
        Ok(())
    }
}
