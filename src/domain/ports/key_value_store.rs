use crate::domain::ports::errors::StoreError;
use async_trait::async_trait;
use std::fmt;

/// A value together with the store version it was read at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedValue {
    /// Raw stored value
    pub value: String,
    /// Index of the last modification (the compare-and-swap token)
    pub version: u64,
    /// Index the key was created at
    pub created_index: u64,
}

/// One child entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreNode {
    /// Full key path
    pub key: String,
    /// Value of a key; absent on directories
    pub value: Option<String>,
    /// Whether the entry is a directory
    pub dir: bool,
    /// Index of the last modification
    pub version: u64,
    /// Index the entry was created at
    pub created_index: u64,
}

impl StoreNode {
    /// Last path segment of the key
    pub fn name(&self) -> &str {
        self.key.trim_end_matches('/').rsplit('/').next().unwrap_or_default()
    }
}

/// Precondition attached to a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Unconditional write
    Any,
    /// Only create; fail if the key exists
    Absent,
    /// Only replace the value last modified at this version
    Exactly(u64),
}

impl fmt::Display for ExpectedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Absent => f.write_str("absent"),
            Self::Exactly(v) => write!(f, "version {v}"),
        }
    }
}

/// Versioned key-value store port.
///
/// Implementations surface the raw outcome of each call and never retry.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a key; `Ok(None)` when it does not exist
    async fn get(&self, key: &str) -> Result<Option<VersionedValue>, StoreError>;

    /// Write a key subject to `expected`, returning the new version
    async fn put(
        &self,
        key: &str,
        value: &str,
        expected: ExpectedVersion,
    ) -> Result<u64, StoreError>;

    /// List the direct children of a directory; a missing directory is empty
    async fn list(&self, dir: &str) -> Result<Vec<StoreNode>, StoreError>;
}
