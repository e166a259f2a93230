//! Service configuration.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::storage::{Credentials, TxType};
use crate::transaction::{KindTable, TxConfig};

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while reading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown error kind in configuration: {0}")]
    UnknownKind(String),
}

/// Connection settings plus the default transaction config.
#[derive(Debug, Clone)]
pub struct PersistConfig {
    /// Database uri and login, passed to every pool on start.
    pub credentials: Credentials,
    /// Config for units of work that do not bring their own.
    pub tx: TxConfig,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    uri: String,
    user: String,
    password: String,
    #[serde(default)]
    tx: RawTxConfig,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawTxConfig {
    #[serde(default)]
    tx_type: TxType,
    #[serde(default)]
    rollback_on: Vec<String>,
    #[serde(default)]
    ignore: Vec<String>,
}

impl PersistConfig {
    pub fn new(
        uri: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            credentials: Credentials::new(uri, user, password),
            tx: TxConfig::default(),
        }
    }

    /// Set the default transaction config.
    pub fn default_tx(mut self, tx: TxConfig) -> Self {
        self.tx = tx;
        self
    }

    /// Set only the default transaction type.
    pub fn tx_type(mut self, tx_type: TxType) -> Self {
        self.tx = self.tx.with_tx_type(tx_type);
        self
    }

    /// Parse a JSON configuration. Kind names are resolved through `kinds`.
    ///
    /// ```json
    /// {
    ///   "uri": "memory:shop",
    ///   "user": "admin",
    ///   "password": "admin",
    ///   "tx": { "tx_type": "PESSIMISTIC", "rollback_on": ["storage"], "ignore": [] }
    /// }
    /// ```
    pub fn from_json(json: &str, kinds: &KindTable) -> ConfigResult<Self> {
        let raw: RawConfig = serde_json::from_str(json)?;

        let mut tx = TxConfig::new(raw.tx.tx_type);
        for name in &raw.tx.rollback_on {
            tx = tx.rollback_on(resolve(kinds, name)?);
        }
        for name in &raw.tx.ignore {
            tx = tx.ignore(resolve(kinds, name)?);
        }

        Ok(Self {
            credentials: Credentials::new(raw.uri, raw.user, raw.password),
            tx,
        })
    }

    pub fn from_json_file(path: impl AsRef<Path>, kinds: &KindTable) -> ConfigResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json, kinds)
    }
}

fn resolve(kinds: &KindTable, name: &str) -> ConfigResult<&'static crate::transaction::ErrorKind> {
    kinds
        .lookup(name)
        .ok_or_else(|| ConfigError::UnknownKind(name.to_string()))
}
