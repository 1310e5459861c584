//! # Draw Harness
//!
//! A local-first acquisition, caching, and normalization pipeline for
//! lottery draw history.
//!
//! Draw Harness fetches the 3-digit (`fc3d`) and 6+1 ball (`ssq`) draw
//! histories from a draw API, reconciles the inconsistent record shapes
//! sources produce, keeps a persistent cache with a freshness policy, and
//! publishes immutable datasets for display and analysis. A companion HTTP
//! service serves proxied or synthetic draws in the same shape.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌────────────┐
//! │ DrawSource  │──▶│  Normalize   │──▶│ CacheStore │
//! │ HTTP/Synth  │   │ fc3d / ssq   │   │ SQLite/Mem │
//! └─────────────┘   └──────┬───────┘   └────────────┘
//!                          ▼
//!                   ┌──────────────┐
//!                   │ Acquisition  │──▶ Datasets (Arc snapshots)
//!                   └──────┬───────┘
//!                ┌─────────┴─────────┐
//!                ▼                   ▼
//!           ┌──────────┐       ┌──────────┐
//!           │   CLI    │       │   HTTP   │
//!           │ (draws)  │       │ service  │
//!           └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! draws init                    # create the cache database
//! draws refresh                 # automatic refresh (freshness-aware)
//! draws refresh --force         # manual refresh
//! draws show ssq --page 2
//! draws serve                   # start the companion draw service
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`pipeline`] | Refresh decisions, single-flight refresh, publishing |
//! | [`traits`] | The [`DrawSource`](traits::DrawSource) extension point |
//! | [`source_http`] | Draw API client |
//! | [`source_synthetic`] | Offline draw source |
//! | [`generator`] | Synthetic draw history |
//! | [`sqlite_cache`] | SQLite cache backend |
//! | [`server`] | Companion draw service |
//! | [`status`], [`refresh`], [`show`] | CLI command implementations |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//!
//! Draw types, normalization, the cache store, the freshness policy and the
//! endpoint selector live in the `draw-harness-core` crate.

pub mod config;
pub mod db;
pub mod generator;
pub mod migrate;
pub mod pipeline;
pub mod refresh;
pub mod server;
pub mod show;
pub mod source_http;
pub mod source_synthetic;
pub mod sqlite_cache;
pub mod status;
pub mod traits;
