//! Persistent cache for draw datasets and acquisition flags.
//!
//! Storage is split in two layers:
//!
//! - [`CacheBackend`] is a plain string key-value store. Backends may fail
//!   (disk full, locked database, storage disabled by the host).
//! - [`CacheStore`] is the typed API used by the pipeline. It never surfaces
//!   backend errors: a failed read is a cache miss, a failed write is a
//!   logged no-op.
//!
//! # Keys
//!
//! | Key | Value |
//! |-----|-------|
//! | `fc3d_data`, `ssq_data` | JSON array of canonical draws |
//! | `fc3d_timestamp`, `ssq_timestamp` | RFC 3339 time of the last save |
//! | `network_enabled` | `true` / `false` |
//! | `last_data_update` | RFC 3339 time of the last network attempt |

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::clock::Clock;
use crate::models::{Draw, Game};
use crate::normalize::normalize_batch;

pub const NETWORK_ENABLED_KEY: &str = "network_enabled";
pub const LAST_UPDATE_KEY: &str = "last_data_update";

pub fn data_key(game: Game) -> String {
    format!("{}_data", game.slug())
}

pub fn timestamp_key(game: Game) -> String {
    format!("{}_timestamp", game.slug())
}

/// Raw string key-value storage.
///
/// All operations are async (via `async-trait`) so that database-backed
/// implementations fit; in-memory implementations return immediately.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short identifier shown in status output (e.g. `"sqlite"`).
    fn name(&self) -> &str;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Write several keys. Backends that support transactions should make
    /// this all-or-nothing.
    async fn put_many(&self, entries: &[(String, String)]) -> Result<()> {
        for (key, value) in entries {
            self.put(key, value).await?;
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()>;
}

/// A dataset loaded from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<D> {
    pub records: Vec<D>,
    /// When the dataset was saved, if the timestamp survived.
    pub saved_at: Option<DateTime<Utc>>,
}

/// Typed, failure-absorbing cache API.
#[derive(Clone)]
pub struct CacheStore {
    backend: Arc<dyn CacheBackend>,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    pub fn new(backend: Arc<dyn CacheBackend>, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Replace the cached dataset of `D::GAME` with `records`, stamped with
    /// the current time. Returns the timestamp written, or `None` if the
    /// backend refused the write.
    pub async fn save<D: Draw>(&self, records: &[D]) -> Option<DateTime<Utc>> {
        let game = D::GAME;
        let blob = match serde_json::to_string(records) {
            Ok(blob) => blob,
            Err(e) => {
                tracing::warn!(%game, error = %e, "could not serialize dataset for cache");
                return None;
            }
        };
        let now = self.clock.now();
        let entries = vec![
            (data_key(game), blob),
            (timestamp_key(game), now.to_rfc3339()),
        ];
        match self.backend.put_many(&entries).await {
            Ok(()) => {
                tracing::debug!(%game, records = records.len(), "dataset cached");
                Some(now)
            }
            Err(e) => {
                tracing::warn!(%game, backend = self.backend.name(), error = %e, "cache write failed");
                None
            }
        }
    }

    /// Load the cached dataset of `D::GAME`.
    ///
    /// Cached records are re-normalized, so blobs written by older versions
    /// (or edited by hand) can never inject an invalid draw. Returns `None`
    /// when nothing usable is cached.
    pub async fn load<D: Draw>(&self) -> Option<CacheEntry<D>> {
        let game = D::GAME;
        let blob = self.read(&data_key(game)).await?;
        let raw: Vec<serde_json::Value> = match serde_json::from_str(&blob) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(%game, error = %e, "cached dataset is unreadable, ignoring");
                return None;
            }
        };
        let saved_at = self
            .read(&timestamp_key(game))
            .await
            .and_then(|s| parse_timestamp(&s));
        let records = normalize_batch::<D>(&raw).records;
        Some(CacheEntry { records, saved_at })
    }

    /// Remove the cached dataset of `game`.
    pub async fn clear(&self, game: Game) {
        self.remove(&data_key(game)).await;
        self.remove(&timestamp_key(game)).await;
    }

    pub async fn network_enabled(&self) -> Option<bool> {
        self.read(NETWORK_ENABLED_KEY)
            .await
            .and_then(|s| s.trim().parse::<bool>().ok())
    }

    pub async fn set_network_enabled(&self, enabled: bool) {
        self.write(NETWORK_ENABLED_KEY, if enabled { "true" } else { "false" })
            .await;
    }

    pub async fn last_update(&self) -> Option<DateTime<Utc>> {
        self.read(LAST_UPDATE_KEY)
            .await
            .and_then(|s| parse_timestamp(&s))
    }

    pub async fn set_last_update(&self, at: DateTime<Utc>) {
        self.write(LAST_UPDATE_KEY, &at.to_rfc3339()).await;
    }

    /// Remove the process-wide flags.
    pub async fn clear_flags(&self) {
        self.remove(NETWORK_ENABLED_KEY).await;
        self.remove(LAST_UPDATE_KEY).await;
    }

    async fn read(&self, key: &str) -> Option<String> {
        match self.backend.get(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, backend = self.backend.name(), error = %e, "cache read failed");
                None
            }
        }
    }

    async fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.backend.put(key, value).await {
            tracing::warn!(key, backend = self.backend.name(), error = %e, "cache write failed");
        }
    }

    async fn remove(&self, key: &str) {
        if let Err(e) = self.backend.remove(key).await {
            tracing::warn!(key, backend = self.backend.name(), error = %e, "cache remove failed");
        }
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
