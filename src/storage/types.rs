//! Value types shared between the database client and the pools.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::storage::error::{StorageError, StorageResult};

/// Database view a connection operates through.
///
/// All views read and write the same underlying records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    Document,
    Object,
    Graph,
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbType::Document => write!(f, "document"),
            DbType::Object => write!(f, "object"),
            DbType::Graph => write!(f, "graph"),
        }
    }
}

/// Transaction type a connection is opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TxType {
    /// Changes are buffered and checked at commit time.
    #[default]
    Optimistic,

    /// Changes are buffered; records are treated as locked for the unit.
    Pessimistic,

    /// No transaction: every write goes straight to storage.
    NoTx,
}

impl TxType {
    /// Check if connections of this type buffer writes until commit.
    pub fn is_transactional(&self) -> bool {
        !matches!(self, TxType::NoTx)
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxType::Optimistic => write!(f, "OPTIMISTIC"),
            TxType::Pessimistic => write!(f, "PESSIMISTIC"),
            TxType::NoTx => write!(f, "NOTX"),
        }
    }
}

/// Parse transaction type from string.
impl std::str::FromStr for TxType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "OPTIMISTIC" => Ok(TxType::Optimistic),
            "PESSIMISTIC" => Ok(TxType::Pessimistic),
            "NOTX" | "NO_TX" | "NONE" => Ok(TxType::NoTx),
            _ => Err(format!("unknown transaction type: {}", s)),
        }
    }
}

/// Database location and login, passed through to connection factories untouched.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub uri: String,
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(
        uri: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            user: user.into(),
            password: password.into(),
        }
    }

    /// Split the uri into `(scheme, database)`.
    pub fn split_uri(&self) -> StorageResult<(&str, &str)> {
        match self.uri.split_once(':') {
            Some((scheme, name)) if !scheme.is_empty() && !name.is_empty() => Ok((scheme, name)),
            _ => Err(StorageError::InvalidUri(self.uri.clone())),
        }
    }
}

// Never print the password.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("uri", &self.uri)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tx_type() {
        assert_eq!(TxType::default(), TxType::Optimistic);
        assert!(TxType::Pessimistic.is_transactional());
        assert!(!TxType::NoTx.is_transactional());
    }

    #[test]
    fn test_parse_tx_type() {
        assert_eq!("optimistic".parse::<TxType>().unwrap(), TxType::Optimistic);
        assert_eq!("PESSIMISTIC".parse::<TxType>().unwrap(), TxType::Pessimistic);
        assert_eq!("notx".parse::<TxType>().unwrap(), TxType::NoTx);
        assert!("serializable".parse::<TxType>().is_err());
    }

    #[test]
    fn test_split_uri() {
        let creds = Credentials::new("memory:shop", "admin", "admin");
        assert_eq!(creds.split_uri().unwrap(), ("memory", "shop"));

        let bad = Credentials::new("shop", "admin", "admin");
        assert!(matches!(bad.split_uri(), Err(StorageError::InvalidUri(_))));
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new("memory:shop", "admin", "s3cret");
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("s3cret"));
    }
}
