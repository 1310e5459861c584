//! Companion draw service.
//!
//! A small HTTP API serving draw history in the shape the acquisition
//! pipeline consumes. Draws come from an upstream draw API when one is
//! configured and answers, otherwise from the synthetic generator. Either
//! way records are normalized and carry their derived figures.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/api/fc3d?limit=N` | 3-digit draws, newest first |
//! | `GET`  | `/api/ssq?limit=N` | 6+1 draws, newest first |
//! | `GET`  | `/api/health` | liveness, with the response cache size |
//! | `POST` | `/api/clear_cache` | drop all cached responses |
//!
//! # Response contract
//!
//! ```json
//! { "success": true, "data": [...], "count": 300, "source": "synthetic" }
//! ```
//!
//! Failures are HTTP 500 (404 for an unknown game) with
//! `{ "success": false, "message": "...", "data": [] }`.
//!
//! Responses are cached per `(game, limit)` for `[server] cache_secs`.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the browser front end
//! can call the service from any host.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};

use draw_harness_core::models::{DrawView, Fc3dDraw, Fc3dStats, Game, SsqDraw, SsqStats};
use draw_harness_core::normalize::normalize_batch;

use crate::config::Config;
use crate::generator::{DrawGenerator, MAX_SYNTHETIC};
use crate::source_http::HttpDrawSource;
use crate::traits::{DrawSource, FetchOutcome};

/// Where a served batch came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Upstream,
    Synthetic,
}

#[derive(Clone)]
struct CachedBatch {
    stored: Instant,
    data: Arc<Vec<Value>>,
    origin: Origin,
}

/// Produces and caches draw batches for the HTTP handlers.
pub struct DrawProvider {
    upstream: Option<(String, HttpDrawSource)>,
    generator: Mutex<DrawGenerator>,
    cache: RwLock<HashMap<(Game, usize), CachedBatch>>,
    ttl: Duration,
    default_limit: usize,
}

impl DrawProvider {
    pub fn new(
        upstream: Option<(String, HttpDrawSource)>,
        seed: Option<u64>,
        ttl: Duration,
        default_limit: usize,
    ) -> Self {
        Self {
            upstream: upstream.map(|(base, source)| (base.trim_end_matches('/').to_string(), source)),
            generator: Mutex::new(DrawGenerator::new(seed)),
            cache: RwLock::new(HashMap::new()),
            ttl,
            default_limit,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let upstream = match &config.server.upstream {
            Some(base) => Some((
                base.clone(),
                HttpDrawSource::new(Duration::from_secs(config.source.timeout_secs))?,
            )),
            None => None,
        };
        Ok(Self::new(
            upstream,
            None,
            Duration::from_secs(config.server.cache_secs),
            config.server.default_limit,
        ))
    }

    /// Draws for `game`, at most `limit` of them (default and cap apply).
    pub async fn draws(&self, game: Game, limit: Option<usize>) -> (Arc<Vec<Value>>, Origin) {
        let limit = limit.unwrap_or(self.default_limit).min(MAX_SYNTHETIC);
        if let Some(hit) = self.cached(game, limit) {
            tracing::debug!(%game, limit, "serving cached response");
            return (hit.data, hit.origin);
        }

        let (data, origin) = match self.from_upstream(game, limit).await {
            Some(data) => (data, Origin::Upstream),
            None => (self.synthetic(game, limit), Origin::Synthetic),
        };
        let data = Arc::new(data);
        if !data.is_empty() {
            self.cache.write().unwrap_or_else(PoisonError::into_inner).insert(
                (game, limit),
                CachedBatch {
                    stored: Instant::now(),
                    data: data.clone(),
                    origin,
                },
            );
        }
        (data, origin)
    }

    pub fn cache_size(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn clear_cache(&self) {
        self.cache.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn cached(&self, game: Game, limit: usize) -> Option<CachedBatch> {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        cache
            .get(&(game, limit))
            .filter(|hit| hit.stored.elapsed() < self.ttl)
            .cloned()
    }

    async fn from_upstream(&self, game: Game, limit: usize) -> Option<Vec<Value>> {
        let (base, source) = self.upstream.as_ref()?;
        match source.fetch(base, game, limit).await {
            FetchOutcome::Data(raw) => {
                let data = match game {
                    Game::Fc3d => views(&normalize_batch::<Fc3dDraw>(&raw).records),
                    Game::Ssq => views(&normalize_batch::<SsqDraw>(&raw).records),
                };
                if data.is_empty() {
                    tracing::warn!(%game, "upstream records all rejected, generating draws");
                    return None;
                }
                Some(data)
            }
            FetchOutcome::Empty => {
                tracing::info!(%game, "upstream has no draws, generating draws");
                None
            }
            FetchOutcome::Failed(e) => {
                tracing::warn!(%game, upstream = %base, error = %e, "upstream failed, generating draws");
                None
            }
        }
    }

    fn synthetic(&self, game: Game, limit: usize) -> Vec<Value> {
        let today = chrono::Local::now().date_naive();
        let mut generator = self.generator.lock().unwrap_or_else(PoisonError::into_inner);
        match game {
            Game::Fc3d => views(&generator.fc3d(limit, today)),
            Game::Ssq => views(&generator.ssq(limit, today)),
        }
    }
}

/// A draw serialized with its derived figures flattened in.
trait ToView {
    fn to_view(&self) -> Option<Value>;
}

impl ToView for Fc3dDraw {
    fn to_view(&self) -> Option<Value> {
        serde_json::to_value(DrawView::<Fc3dDraw, Fc3dStats>::from(self)).ok()
    }
}

impl ToView for SsqDraw {
    fn to_view(&self) -> Option<Value> {
        serde_json::to_value(DrawView::<SsqDraw, SsqStats>::from(self)).ok()
    }
}

fn views<D: ToView>(draws: &[D]) -> Vec<Value> {
    draws.iter().filter_map(ToView::to_view).collect()
}

/// Build the service router. Exposed so tests and embedders can mount it.
pub fn router(provider: Arc<DrawProvider>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(handle_health))
        .route("/api/clear_cache", post(handle_clear_cache))
        .route("/api/{game}", get(handle_draws))
        .layer(cors)
        .with_state(provider)
}

/// Starts the draw service on `[server] bind` and runs until the process
/// is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let provider = Arc::new(DrawProvider::from_config(config)?);
    let app = router(provider);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, upstream = ?config.server.upstream, "draw service starting");
    println!("Draw service listening on http://{}", config.server.bind);
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct FailureBody {
    success: bool,
    message: String,
    data: [Value; 0],
}

struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = FailureBody {
            success: false,
            message: self.message,
            data: [],
        };
        (self.status, Json(body)).into_response()
    }
}

// ============ GET /api/{game} ============

#[derive(Debug, Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

#[derive(Serialize)]
struct DrawsResponse {
    success: bool,
    data: Arc<Vec<Value>>,
    count: usize,
    source: Origin,
}

async fn handle_draws(
    State(provider): State<Arc<DrawProvider>>,
    Path(game): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<DrawsResponse>, AppError> {
    let game: Game = game.parse().map_err(|message| AppError {
        status: StatusCode::NOT_FOUND,
        message,
    })?;

    let (data, source) = provider.draws(game, query.limit).await;
    if data.is_empty() {
        return Err(AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("no {} draws available", game),
        });
    }

    Ok(Json(DrawsResponse {
        success: true,
        count: data.len(),
        data,
        source,
    }))
}

// ============ GET /api/health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    message: &'static str,
    cache_size: usize,
    version: &'static str,
}

async fn handle_health(State(provider): State<Arc<DrawProvider>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Local::now().to_rfc3339(),
        message: "draw service running",
        cache_size: provider.cache_size(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============ POST /api/clear_cache ============

async fn handle_clear_cache(State(provider): State<Arc<DrawProvider>>) -> Json<Value> {
    provider.clear_cache();
    Json(serde_json::json!({ "success": true, "message": "cache cleared" }))
}
