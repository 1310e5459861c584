//! Extension point for draw data sources.
//!
//! The acquisition pipeline talks to the outside world only through
//! [`DrawSource`]. Two implementations ship with the crate:
//!
//! | Source | Module | Used for |
//! |--------|--------|----------|
//! | [`HttpDrawSource`](crate::source_http::HttpDrawSource) | `source_http` | the draw API over HTTP |
//! | [`SyntheticSource`](crate::source_synthetic::SyntheticSource) | `source_synthetic` | offline demos and tests |
//!
//! Custom sources (a file drop, another API) implement the trait and are
//! handed to [`Acquisition::new`](crate::pipeline::Acquisition::new).
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use draw_harness::traits::{DrawSource, FetchError, FetchOutcome};
//! use draw_harness_core::models::Game;
//! use serde_json::{json, Value};
//!
//! struct Fixed;
//!
//! #[async_trait]
//! impl DrawSource for Fixed {
//!     fn name(&self) -> &str {
//!         "fixed"
//!     }
//!
//!     async fn health(&self, _base_url: &str) -> Result<(), FetchError> {
//!         Ok(())
//!     }
//!
//!     async fn fetch(&self, _base_url: &str, game: Game, _limit: usize) -> FetchOutcome<Vec<Value>> {
//!         match game {
//!             Game::Fc3d => FetchOutcome::Data(vec![json!({"period": "1", "number": "123"})]),
//!             Game::Ssq => FetchOutcome::Empty,
//!         }
//!     }
//! }
//! ```

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use draw_harness_core::models::Game;

/// Why a fetch produced no data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("no draw API endpoint for this environment")]
    EndpointUnresolved,
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Parse(String),
    #[error("source reported failure: {0}")]
    Unsuccessful(String),
}

/// Result of fetching one game.
///
/// `Empty` is a well-formed, successful response that carried no records.
/// It is kept apart from `Failed` so logs can tell the two apart, but the
/// pipeline treats both as "no data for this game".
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    Data(T),
    Empty,
    Failed(FetchError),
}

impl<T> FetchOutcome<T> {
    pub fn into_data(self) -> Option<T> {
        match self {
            FetchOutcome::Data(data) => Some(data),
            _ => None,
        }
    }
}

/// A provider of raw draw records.
///
/// Implementations never panic on bad input and never retry; every problem
/// becomes a [`FetchError`].
#[async_trait]
pub trait DrawSource: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Cheap reachability check run before a refresh.
    async fn health(&self, base_url: &str) -> Result<(), FetchError>;

    /// Fetch up to `limit` raw records of `game`, newest first.
    async fn fetch(&self, base_url: &str, game: Game, limit: usize) -> FetchOutcome<Vec<Value>>;
}
