//! In-process [`CacheBackend`] implementations.
//!
//! [`MemoryBackend`] keeps entries in a `HashMap` behind a `RwLock`; it is
//! what tests and embedders without a filesystem use. [`DisabledBackend`]
//! fails every call, standing in for a host that forbids persistent storage.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use anyhow::{bail, Result};
use async_trait::async_trait;

use super::CacheBackend;

/// In-memory key-value backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn put_many(&self, batch: &[(String, String)]) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in batch {
            entries.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// Backend for environments where persistence is unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledBackend;

#[async_trait]
impl CacheBackend for DisabledBackend {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn get(&self, _key: &str) -> Result<Option<String>> {
        bail!("persistent storage is disabled")
    }

    async fn put(&self, _key: &str, _value: &str) -> Result<()> {
        bail!("persistent storage is disabled")
    }

    async fn remove(&self, _key: &str) -> Result<()> {
        bail!("persistent storage is disabled")
    }
}
