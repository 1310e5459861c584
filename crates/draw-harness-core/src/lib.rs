//! # Draw Harness Core
//!
//! Shared, runtime-agnostic logic for Draw Harness: draw models, record
//! normalization, freshness policy, endpoint selection, pagination, and the
//! cache store abstraction.
//!
//! This crate contains no tokio, sqlx, HTTP client, or filesystem I/O. Native
//! backends (SQLite cache, HTTP draw source) live in the `draw-harness` crate.

pub mod clock;
pub mod endpoint;
pub mod freshness;
pub mod models;
pub mod normalize;
pub mod page;
pub mod store;
