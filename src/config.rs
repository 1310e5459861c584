//! TOML configuration.
//!
//! ```toml
//! [cache]
//! backend = "sqlite"            # sqlite | memory | disabled
//! path = "./data/draws.sqlite"
//!
//! [source]
//! kind = "http"                 # http | synthetic
//! local_base_url = "http://localhost:5060"
//! port = 5060
//! limit = 300
//! timeout_secs = 10
//! probe_health = true
//!
//! [environment]
//! host = "localhost:8080"
//! user_agent = "Mozilla/5.0 (X11; Linux x86_64)"
//!
//! [refresh]
//! threshold_hours = 6
//!
//! [server]
//! bind = "127.0.0.1:5060"
//! # upstream = "https://draws.example.com"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use draw_harness_core::endpoint::EndpointConfig;
use draw_harness_core::freshness::DEFAULT_THRESHOLD_HOURS;

use crate::source_http::DEFAULT_TIMEOUT_SECS;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub environment: EnvironmentConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_backend")]
    pub backend: String,
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            path: default_cache_path(),
        }
    }
}

fn default_cache_backend() -> String {
    "sqlite".to_string()
}
fn default_cache_path() -> PathBuf {
    PathBuf::from("./data/draws.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_source_kind")]
    pub kind: String,
    #[serde(flatten)]
    pub endpoint: EndpointConfig,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_probe_health")]
    pub probe_health: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: default_source_kind(),
            endpoint: EndpointConfig::default(),
            limit: default_limit(),
            timeout_secs: default_timeout_secs(),
            probe_health: default_probe_health(),
        }
    }
}

fn default_source_kind() -> String {
    "http".to_string()
}
fn default_limit() -> usize {
    300
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_probe_health() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct EnvironmentConfig {
    /// `host[:port]` the front end is served from. Leave unset to run
    /// without a resolvable endpoint (cache-only).
    #[serde(default = "default_host")]
    pub host: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            user_agent: None,
        }
    }
}

fn default_host() -> Option<String> {
    Some("localhost".to_string())
}

#[derive(Debug, Deserialize, Clone)]
pub struct RefreshConfig {
    #[serde(default = "default_threshold_hours")]
    pub threshold_hours: i64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            threshold_hours: default_threshold_hours(),
        }
    }
}

impl RefreshConfig {
    /// The freshness threshold, or `None` when `threshold_hours` is negative
    /// or too large to represent.
    pub fn threshold(&self) -> Option<chrono::Duration> {
        if self.threshold_hours < 0 {
            return None;
        }
        chrono::Duration::try_hours(self.threshold_hours)
    }
}

fn default_threshold_hours() -> i64 {
    DEFAULT_THRESHOLD_HOURS
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Base URL of a draw API to proxy. Synthetic draws are served when
    /// unset or when the upstream has nothing.
    #[serde(default)]
    pub upstream: Option<String>,
    #[serde(default = "default_cache_secs")]
    pub cache_secs: u64,
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            upstream: None,
            cache_secs: default_cache_secs(),
            default_limit: default_limit(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5060".to_string()
}
fn default_cache_secs() -> u64 {
    300
}

impl Config {
    /// Defaults for every section, used when no config file exists.
    pub fn minimal() -> Self {
        Self {
            cache: CacheConfig::default(),
            source: SourceConfig::default(),
            environment: EnvironmentConfig::default(),
            refresh: RefreshConfig::default(),
            server: ServerConfig::default(),
        }
    }

    fn validate(&self) -> Result<()> {
        match self.cache.backend.as_str() {
            "sqlite" | "memory" | "disabled" => {}
            other => anyhow::bail!(
                "Unknown cache backend: '{}'. Must be sqlite, memory, or disabled.",
                other
            ),
        }

        match self.source.kind.as_str() {
            "http" | "synthetic" => {}
            other => anyhow::bail!(
                "Unknown source kind: '{}'. Must be http or synthetic.",
                other
            ),
        }

        if self.source.limit == 0 {
            anyhow::bail!("source.limit must be > 0");
        }
        if self.source.timeout_secs == 0 {
            anyhow::bail!("source.timeout_secs must be > 0");
        }
        if self.refresh.threshold().is_none() {
            anyhow::bail!(
                "refresh.threshold_hours must be between 0 and {}",
                i64::MAX / 3600 / 1000
            );
        }
        if self.server.default_limit == 0 {
            anyhow::bail!("server.default_limit must be > 0");
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}
