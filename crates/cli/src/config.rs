//! Configuration loading from ctiledger.toml.

use policy::{AccessPolicy, StaticIdentity};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Access enforcement (`mode = "rbac"` or `"open_access"`).
    #[serde(default)]
    pub ledger: AccessPolicy,

    /// World-state database.
    #[serde(default)]
    pub store: StoreConfig,

    /// Identity presented by this client.
    #[serde(default)]
    pub identity: IdentityConfig,
}

/// World-state database configuration.
#[derive(Debug, Default, Deserialize)]
pub struct StoreConfig {
    /// SQLite file. Defaults to `ledger.db` in the data directory.
    pub path: Option<PathBuf>,
}

/// Caller identity configuration.
#[derive(Debug, Default, Deserialize)]
pub struct IdentityConfig {
    /// Organizational role claim.
    pub role: Option<String>,

    /// Additional attribute claims.
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Build the caller identity, letting `role` override the configured one.
    pub fn identity(&self, role: Option<&str>) -> StaticIdentity {
        let mut identity = self
            .identity
            .attributes
            .iter()
            .fold(StaticIdentity::anonymous(), |id, (name, value)| {
                id.attribute_value(name, value)
            });
        if let Some(role) = role.or(self.identity.role.as_deref()) {
            identity = identity.attribute_value(policy::ROLE_ATTRIBUTE, role);
        }
        identity
    }

    /// The database path, falling back to `data_dir/ledger.db`.
    pub fn db_path(&self, data_dir: &Path) -> PathBuf {
        self.store
            .path
            .clone()
            .unwrap_or_else(|| data_dir.join("ledger.db"))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),
}
