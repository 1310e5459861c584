//! Acquisition pipeline: fetch → normalize → cache → publish.
//!
//! [`Acquisition`] owns the two published datasets and the
//! [`AcquisitionState`]. It is the only writer of either; consumers read
//! immutable snapshots through [`Acquisition::snapshot`].
//!
//! # Refresh decision
//!
//! | Condition | Action | Provenance |
//! |-----------|--------|------------|
//! | automatic, network disabled | publish cache, no network | `cache-safe-mode` |
//! | automatic, data still fresh | publish cache, no network | `local-cache` |
//! | health probe fails | keep last known data | `fetch-failed` |
//! | at least one game fetched | replace and persist that game | `live-api` |
//! | no game fetched | keep last known data | `fetch-failed` |
//!
//! A fresh-but-empty cache falls through to a fetch. Managed hosting never
//! reads the cache and always fetches. A manual refresh
//! ([`Acquisition::force_refresh`]) skips both the freshness check and the
//! network flag without touching the persisted flag.
//!
//! # Concurrency
//!
//! Both games are fetched concurrently with `tokio::join!`. Whole refreshes
//! are serialized by a single-flight lock. An automatic refresh that had to
//! wait for another one returns that refresh's result (marked `coalesced`)
//! instead of hitting the network again; a manual refresh waits its turn and
//! then runs. Refreshes never interleave, so the last one to complete owns
//! the published state.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use draw_harness_core::clock::{Clock, SystemClock};
use draw_harness_core::endpoint::{EndpointConfig, Environment};
use draw_harness_core::freshness::FreshnessPolicy;
use draw_harness_core::models::{Draw, Fc3dDraw, Game, SsqDraw};
use draw_harness_core::normalize::{normalize_batch, Normalized};
use draw_harness_core::store::CacheStore;

use crate::config::Config;
use crate::source_http::HttpDrawSource;
use crate::source_synthetic::SyntheticSource;
use crate::sqlite_cache::open_backend;
use crate::traits::{DrawSource, FetchError, FetchOutcome};

/// Everything the pipeline needs to know about where and how it runs.
pub struct AcquisitionContext {
    pub environment: Environment,
    pub endpoint: EndpointConfig,
    pub freshness: FreshnessPolicy,
    /// Records requested per game.
    pub limit: usize,
    /// Probe `/api/health` before fetching.
    pub probe_health: bool,
    pub clock: Arc<dyn Clock>,
}

impl AcquisitionContext {
    pub fn from_config(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let Some(threshold) = config.refresh.threshold() else {
            anyhow::bail!(
                "refresh.threshold_hours out of range: {}",
                config.refresh.threshold_hours
            );
        };
        let endpoint = config.source.endpoint.clone();
        let environment = Environment::detect(
            config.environment.host.as_deref(),
            config.environment.user_agent.as_deref(),
            &endpoint.hosted_suffix,
        );
        Ok(Self {
            environment,
            endpoint,
            freshness: FreshnessPolicy::new(threshold),
            limit: config.source.limit,
            probe_health: config.source.probe_health,
            clock,
        })
    }

    /// The draw API base URL for this environment, if one can be derived.
    pub fn base_url(&self) -> Option<String> {
        self.endpoint.resolve(self.environment.host.as_ref())
    }
}

/// Where the published datasets came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Provenance {
    #[default]
    Awaiting,
    LiveApi,
    LocalCache,
    CacheSafeMode,
    FetchFailed(String),
}

impl Provenance {
    pub fn label(&self) -> &'static str {
        match self {
            Provenance::Awaiting => "awaiting",
            Provenance::LiveApi => "live-api",
            Provenance::LocalCache => "local-cache",
            Provenance::CacheSafeMode => "cache-safe-mode",
            Provenance::FetchFailed(_) => "fetch-failed",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::FetchFailed(reason) => write!(f, "fetch-failed ({})", reason),
            other => f.write_str(other.label()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Fetching,
    Normalizing,
    Publishing,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionState {
    pub network_enabled: bool,
    /// Time of the last network attempt.
    pub last_fetch: Option<DateTime<Utc>>,
    pub provenance: Provenance,
    pub phase: Phase,
}

/// The published datasets, newest draw first.
#[derive(Debug, Clone, Default)]
pub struct Datasets {
    pub fc3d: Arc<Vec<Fc3dDraw>>,
    pub ssq: Arc<Vec<SsqDraw>>,
}

impl Datasets {
    pub fn len(&self, game: Game) -> usize {
        match game {
            Game::Fc3d => self.fc3d.len(),
            Game::Ssq => self.ssq.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fc3d.is_empty() && self.ssq.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    Automatic,
    Manual,
}

/// What happened to one game during a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameOutcome {
    /// Fetched, normalized and published.
    Live { records: usize, rejected: usize },
    /// Published from the cache.
    Cached { records: usize },
    /// Nothing new; the previously published dataset stays.
    Kept { records: usize, reason: String },
    /// Nothing new and nothing to fall back on.
    NoData { reason: String },
}

impl GameOutcome {
    pub fn is_live(&self) -> bool {
        matches!(self, GameOutcome::Live { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    pub mode: RefreshMode,
    pub provenance: Provenance,
    pub fc3d: GameOutcome,
    pub ssq: GameOutcome,
    /// Set when this automatic refresh reused the result of one already in
    /// flight.
    pub coalesced: bool,
    pub at: DateTime<Utc>,
}

/// Refresh outcomes that leave both datasets empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquisitionError {
    #[error("no draw data: network unavailable and cache empty")]
    Exhausted,
    #[error("no draw API endpoint for this environment and no cached data")]
    Unavailable,
}

/// Per-game access to the published datasets.
trait Slot: Draw {
    fn slot(sets: &Datasets) -> &Arc<Vec<Self>>;
    fn slot_mut(sets: &mut Datasets) -> &mut Arc<Vec<Self>>;
}

impl Slot for Fc3dDraw {
    fn slot(sets: &Datasets) -> &Arc<Vec<Self>> {
        &sets.fc3d
    }
    fn slot_mut(sets: &mut Datasets) -> &mut Arc<Vec<Self>> {
        &mut sets.fc3d
    }
}

impl Slot for SsqDraw {
    fn slot(sets: &Datasets) -> &Arc<Vec<Self>> {
        &sets.ssq
    }
    fn slot_mut(sets: &mut Datasets) -> &mut Arc<Vec<Self>> {
        &mut sets.ssq
    }
}

pub struct Acquisition {
    ctx: AcquisitionContext,
    source: Arc<dyn DrawSource>,
    store: CacheStore,
    state: RwLock<AcquisitionState>,
    datasets: RwLock<Datasets>,
    flight: tokio::sync::Mutex<()>,
    generation: AtomicU64,
    last: Mutex<Option<Result<RefreshReport, AcquisitionError>>>,
}

impl Acquisition {
    /// Build the pipeline and load the persisted flags.
    ///
    /// Without a persisted network flag the platform default applies. Managed
    /// hosting forces the flag on and persists that.
    pub async fn new(ctx: AcquisitionContext, source: Arc<dyn DrawSource>, store: CacheStore) -> Self {
        let network_enabled = startup_network_flag(&ctx.environment, &store).await;
        let last_fetch = store.last_update().await;
        tracing::debug!(
            network_enabled,
            last_fetch = ?last_fetch,
            managed_hosting = ctx.environment.managed_hosting,
            source = source.name(),
            cache = store.backend_name(),
            "acquisition pipeline ready"
        );
        Self {
            ctx,
            source,
            store,
            state: RwLock::new(AcquisitionState {
                network_enabled,
                last_fetch,
                provenance: Provenance::Awaiting,
                phase: Phase::Idle,
            }),
            datasets: RwLock::new(Datasets::default()),
            flight: tokio::sync::Mutex::new(()),
            generation: AtomicU64::new(0),
            last: Mutex::new(None),
        }
    }

    /// Wire up the configured source and cache backend on the system clock.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let source: Arc<dyn DrawSource> = match config.source.kind.as_str() {
            "synthetic" => Arc::new(SyntheticSource::new(None, clock.clone())),
            _ => Arc::new(HttpDrawSource::new(std::time::Duration::from_secs(
                config.source.timeout_secs,
            ))?),
        };
        let ctx = AcquisitionContext::from_config(config, clock.clone())?;
        let store = CacheStore::new(open_backend(config).await, clock);
        Ok(Self::new(ctx, source, store).await)
    }

    pub fn context(&self) -> &AcquisitionContext {
        &self.ctx
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn state(&self) -> AcquisitionState {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// The currently published datasets. Cheap: both are shared `Arc`s.
    pub fn snapshot(&self) -> Datasets {
        self.datasets.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Automatic refresh, subject to the network flag and freshness policy.
    pub async fn refresh_all(&self) -> Result<RefreshReport, AcquisitionError> {
        let seen = self.generation.load(Ordering::Acquire);
        let _flight = self.flight.lock().await;
        if self.generation.load(Ordering::Acquire) != seen {
            let last = self.last.lock().unwrap_or_else(PoisonError::into_inner).clone();
            if let Some(result) = last {
                tracing::debug!("refresh coalesced into the one that just completed");
                return result.map(|report| RefreshReport {
                    mode: RefreshMode::Automatic,
                    coalesced: true,
                    ..report
                });
            }
        }
        let result = self.run(RefreshMode::Automatic).await;
        self.complete(&result);
        result
    }

    /// Manual refresh: always attempts a live fetch, whatever the freshness
    /// or the network flag. The flag itself is left as it was.
    pub async fn force_refresh(&self) -> Result<RefreshReport, AcquisitionError> {
        let _flight = self.flight.lock().await;
        let result = self.run(RefreshMode::Manual).await;
        self.complete(&result);
        result
    }

    /// The user's network toggle. Persisted.
    pub async fn set_network_enabled(&self, enabled: bool) {
        self.update_state(|s| s.network_enabled = enabled);
        self.store.set_network_enabled(enabled).await;
        if !enabled && self.ctx.environment.managed_hosting {
            tracing::info!("managed hosting always refreshes; the network flag has no effect here");
        }
    }

    /// Remove both cached datasets and the flags, and reset the state to its
    /// startup defaults. The published datasets stay until the next refresh.
    pub async fn clear_cache(&self) {
        let _flight = self.flight.lock().await;
        for game in Game::ALL {
            self.store.clear(game).await;
        }
        self.store.clear_flags().await;
        let network_enabled = startup_network_flag(&self.ctx.environment, &self.store).await;
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = AcquisitionState {
            network_enabled,
            last_fetch: None,
            provenance: Provenance::Awaiting,
            phase: Phase::Idle,
        };
        tracing::info!("draw cache cleared");
    }

    fn complete(&self, result: &Result<RefreshReport, AcquisitionError>) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(result.clone());
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    async fn run(&self, mode: RefreshMode) -> Result<RefreshReport, AcquisitionError> {
        let env = &self.ctx.environment;
        let now = self.ctx.clock.now();
        let (network_enabled, last_fetch) = {
            let state = self.state();
            (state.network_enabled || env.managed_hosting, state.last_fetch)
        };

        if mode == RefreshMode::Automatic {
            if !network_enabled {
                tracing::info!("network refresh disabled, serving cached draws");
                let report = self.publish_cached(mode, Provenance::CacheSafeMode, now).await;
                return self.require_data(report, AcquisitionError::Exhausted);
            }
            if !self.ctx.freshness.needs_refresh(last_fetch, env, now) {
                let report = self.publish_cached(mode, Provenance::LocalCache, now).await;
                if !self.snapshot().is_empty() {
                    return Ok(report);
                }
                tracing::info!("cache is fresh but holds no draws, fetching");
            }
        }

        self.fetch_all(mode, now).await
    }

    async fn publish_cached(
        &self,
        mode: RefreshMode,
        provenance: Provenance,
        now: DateTime<Utc>,
    ) -> RefreshReport {
        self.update_state(|s| s.phase = Phase::Publishing);
        let fc3d = self.restore::<Fc3dDraw>().await;
        let ssq = self.restore::<SsqDraw>().await;
        self.update_state(|s| {
            s.provenance = provenance.clone();
            s.phase = Phase::Idle;
        });
        RefreshReport {
            mode,
            provenance,
            fc3d,
            ssq,
            coalesced: false,
            at: now,
        }
    }

    async fn fetch_all(&self, mode: RefreshMode, now: DateTime<Utc>) -> Result<RefreshReport, AcquisitionError> {
        self.update_state(|s| s.phase = Phase::Fetching);
        let base = self.ctx.base_url();

        if let (Some(base), true) = (base.as_deref(), self.ctx.probe_health) {
            if let Err(e) = self.source.health(base).await {
                tracing::warn!(source = self.source.name(), base, error = %e, "health probe failed");
                let reason = e.to_string();
                let fc3d = self.keep_previous::<Fc3dDraw>(reason.clone()).await;
                let ssq = self.keep_previous::<SsqDraw>(reason.clone()).await;
                let provenance = Provenance::FetchFailed(reason);
                self.update_state(|s| {
                    s.provenance = provenance.clone();
                    s.phase = Phase::Failed;
                });
                let report = RefreshReport {
                    mode,
                    provenance,
                    fc3d,
                    ssq,
                    coalesced: false,
                    at: now,
                };
                return self.require_data(report, AcquisitionError::Exhausted);
            }
        }

        let (fc3d_raw, ssq_raw) = tokio::join!(
            self.fetch_game(base.as_deref(), Game::Fc3d),
            self.fetch_game(base.as_deref(), Game::Ssq),
        );

        self.update_state(|s| s.phase = Phase::Normalizing);
        let fc3d = normalize_outcome::<Fc3dDraw>(fc3d_raw);
        let ssq = normalize_outcome::<SsqDraw>(ssq_raw);

        self.update_state(|s| s.phase = Phase::Publishing);
        let fc3d = self.apply(fc3d).await;
        let ssq = self.apply(ssq).await;

        let provenance = if fc3d.is_live() || ssq.is_live() {
            if !(fc3d.is_live() && ssq.is_live()) {
                tracing::info!(fc3d = ?fc3d, ssq = ?ssq, "partial refresh");
            }
            Provenance::LiveApi
        } else if base.is_none() {
            Provenance::FetchFailed(FetchError::EndpointUnresolved.to_string())
        } else {
            Provenance::FetchFailed("no draw data received".to_string())
        };
        let phase = if provenance == Provenance::LiveApi {
            Phase::Idle
        } else {
            Phase::Failed
        };

        self.update_state(|s| {
            s.last_fetch = Some(now);
            s.provenance = provenance.clone();
            s.phase = phase;
        });
        self.store.set_last_update(now).await;

        let sets = self.snapshot();
        tracing::info!(%provenance, fc3d = sets.len(Game::Fc3d), ssq = sets.len(Game::Ssq), "refresh complete");

        let report = RefreshReport {
            mode,
            provenance,
            fc3d,
            ssq,
            coalesced: false,
            at: now,
        };
        let empty = if base.is_none() {
            AcquisitionError::Unavailable
        } else {
            AcquisitionError::Exhausted
        };
        self.require_data(report, empty)
    }

    async fn fetch_game(&self, base: Option<&str>, game: Game) -> FetchOutcome<Vec<Value>> {
        let Some(base) = base else {
            return FetchOutcome::Failed(FetchError::EndpointUnresolved);
        };
        let outcome = self.source.fetch(base, game, self.ctx.limit).await;
        match &outcome {
            FetchOutcome::Data(raw) => tracing::debug!(%game, records = raw.len(), "draws received"),
            FetchOutcome::Empty => tracing::info!(%game, "source returned no draws"),
            FetchOutcome::Failed(e) => tracing::warn!(%game, source = self.source.name(), error = %e, "fetch failed"),
        }
        outcome
    }

    /// Publish a fetched batch, or fall back when it holds nothing.
    async fn apply<D: Slot>(&self, fetched: Result<Normalized<D>, String>) -> GameOutcome {
        match fetched {
            Ok(batch) if !batch.records.is_empty() => {
                let records = batch.records.len();
                let rejected = batch.rejected.len();
                self.store.save(&batch.records).await;
                self.replace(batch.records);
                GameOutcome::Live { records, rejected }
            }
            Ok(batch) => {
                let reason = format!("all {} records rejected", batch.rejected.len());
                self.keep_previous::<D>(reason).await
            }
            Err(reason) => self.keep_previous::<D>(reason).await,
        }
    }

    /// Keep the published dataset. If there is none, try the cache.
    async fn keep_previous<D: Slot>(&self, reason: String) -> GameOutcome {
        let current = D::slot(&self.snapshot()).len();
        if current > 0 {
            return GameOutcome::Kept {
                records: current,
                reason,
            };
        }
        match self.restore::<D>().await {
            GameOutcome::Cached { records } => {
                tracing::info!(game = %D::GAME, records, "serving cached draws after failed fetch");
                GameOutcome::Kept { records, reason }
            }
            _ => GameOutcome::NoData { reason },
        }
    }

    /// Publish the cached dataset of `D`, if the cache may be read and holds
    /// any draws.
    async fn restore<D: Slot>(&self) -> GameOutcome {
        let game = D::GAME;
        if self.ctx.freshness.bypasses_cache(&self.ctx.environment) {
            return GameOutcome::NoData {
                reason: "cache bypassed in managed hosting".to_string(),
            };
        }
        match self.store.load::<D>().await {
            Some(entry) if !entry.records.is_empty() => {
                let records = entry.records.len();
                self.replace(entry.records);
                GameOutcome::Cached { records }
            }
            _ => {
                tracing::debug!(%game, "nothing cached");
                let current = D::slot(&self.snapshot()).len();
                let reason = "nothing cached".to_string();
                if current > 0 {
                    GameOutcome::Kept {
                        records: current,
                        reason,
                    }
                } else {
                    GameOutcome::NoData { reason }
                }
            }
        }
    }

    fn replace<D: Slot>(&self, records: Vec<D>) {
        let mut sets = self.datasets.write().unwrap_or_else(PoisonError::into_inner);
        *D::slot_mut(&mut sets) = Arc::new(records);
    }

    fn update_state(&self, f: impl FnOnce(&mut AcquisitionState)) {
        f(&mut self.state.write().unwrap_or_else(PoisonError::into_inner));
    }

    fn require_data(
        &self,
        report: RefreshReport,
        otherwise: AcquisitionError,
    ) -> Result<RefreshReport, AcquisitionError> {
        if self.snapshot().is_empty() {
            Err(otherwise)
        } else {
            Ok(report)
        }
    }
}

async fn startup_network_flag(env: &Environment, store: &CacheStore) -> bool {
    if env.managed_hosting {
        store.set_network_enabled(true).await;
        return true;
    }
    store
        .network_enabled()
        .await
        .unwrap_or_else(|| env.default_network_enabled())
}

fn normalize_outcome<D: Draw>(outcome: FetchOutcome<Vec<Value>>) -> Result<Normalized<D>, String> {
    match outcome {
        FetchOutcome::Data(raw) => Ok(normalize_batch::<D>(&raw)),
        FetchOutcome::Empty => Err("empty response".to_string()),
        FetchOutcome::Failed(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use draw_harness_core::clock::ManualClock;
    use draw_harness_core::endpoint::{HostContext, Platform};
    use draw_harness_core::store::memory::MemoryBackend;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    struct MockSource {
        fc3d: FetchOutcome<Vec<Value>>,
        ssq: FetchOutcome<Vec<Value>>,
        healthy: bool,
        delay: Option<std::time::Duration>,
        fetches: AtomicUsize,
        probes: AtomicUsize,
    }

    impl MockSource {
        fn new(fc3d: FetchOutcome<Vec<Value>>, ssq: FetchOutcome<Vec<Value>>) -> Self {
            Self {
                fc3d,
                ssq,
                healthy: true,
                delay: None,
                fetches: AtomicUsize::new(0),
                probes: AtomicUsize::new(0),
            }
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DrawSource for MockSource {
        fn name(&self) -> &str {
            "mock"
        }

        async fn health(&self, _base_url: &str) -> Result<(), FetchError> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            if self.healthy {
                Ok(())
            } else {
                Err(FetchError::Status(503))
            }
        }

        async fn fetch(&self, _base_url: &str, game: Game, _limit: usize) -> FetchOutcome<Vec<Value>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match game {
                Game::Fc3d => self.fc3d.clone(),
                Game::Ssq => self.ssq.clone(),
            }
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn fc3d_raw(n: usize) -> Vec<Value> {
        (0..n)
            .map(|i| {
                json!({
                    "period": format!("2024{:03}", 150 - i),
                    "date": "2024-06-01",
                    "number": format!("{}{}{}", i % 10, (i + 1) % 10, (i + 4) % 10),
                })
            })
            .collect()
    }

    fn ssq_raw(n: usize) -> Vec<Value> {
        (0..n)
            .map(|i| {
                json!({
                    "code": format!("2024{:03}", 80 - i),
                    "date": "2024-06-02",
                    "red": "01,05,12,19,27,33",
                    "blue": format!("{:02}", i % 16 + 1),
                })
            })
            .collect()
    }

    fn fc3d_draws(n: usize) -> Vec<Fc3dDraw> {
        normalize_batch::<Fc3dDraw>(&fc3d_raw(n)).records
    }

    struct Harness {
        clock: Arc<ManualClock>,
        backend: Arc<MemoryBackend>,
        store: CacheStore,
    }

    impl Harness {
        fn new() -> Self {
            let clock = Arc::new(ManualClock::new(start()));
            let backend = Arc::new(MemoryBackend::new());
            let store = CacheStore::new(backend.clone(), clock.clone());
            Self {
                clock,
                backend,
                store,
            }
        }

        fn context(&self, host: Option<&str>, platform: Platform) -> AcquisitionContext {
            let host = host.and_then(HostContext::parse);
            let managed_hosting = host
                .as_ref()
                .is_some_and(|h| h.host.ends_with("onrender.com"));
            AcquisitionContext {
                environment: Environment {
                    host,
                    platform,
                    managed_hosting,
                },
                endpoint: EndpointConfig::default(),
                freshness: FreshnessPolicy::default(),
                limit: 300,
                probe_health: true,
                clock: self.clock.clone(),
            }
        }

        async fn pipeline(&self, source: Arc<MockSource>) -> Acquisition {
            self.pipeline_in(source, Some("localhost:8080"), Platform::Other)
                .await
        }

        async fn pipeline_in(
            &self,
            source: Arc<MockSource>,
            host: Option<&str>,
            platform: Platform,
        ) -> Acquisition {
            Acquisition::new(self.context(host, platform), source, self.store.clone()).await
        }
    }

    #[tokio::test]
    async fn test_partial_success_updates_only_the_live_game() {
        let h = Harness::new();
        let source = Arc::new(MockSource::new(
            FetchOutcome::Data(fc3d_raw(5)),
            FetchOutcome::Failed(FetchError::Network("connection reset".into())),
        ));
        let acq = h.pipeline(source.clone()).await;

        let report = acq.refresh_all().await.unwrap();
        assert_eq!(report.provenance, Provenance::LiveApi);
        assert_eq!(report.fc3d, GameOutcome::Live { records: 5, rejected: 0 });
        assert!(matches!(report.ssq, GameOutcome::NoData { .. }));

        let sets = acq.snapshot();
        assert_eq!(*sets.fc3d, fc3d_draws(5));
        assert_eq!(sets.len(Game::Fc3d), 5);
        assert_eq!(sets.len(Game::Ssq), 0);
        assert!(sets.ssq.is_empty());
        assert_eq!(h.store.load::<Fc3dDraw>().await.unwrap().records.len(), 5);
        assert!(h.store.load::<SsqDraw>().await.is_none());
        assert_eq!(acq.state().phase, Phase::Idle);
        assert_eq!(acq.state().last_fetch, Some(start()));
        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test]
    async fn test_failed_game_keeps_previous_dataset() {
        let h = Harness::new();
        let source = Arc::new(MockSource::new(
            FetchOutcome::Data(fc3d_raw(5)),
            FetchOutcome::Data(ssq_raw(4)),
        ));
        let acq = h.pipeline(source).await;
        acq.refresh_all().await.unwrap();
        let before = acq.snapshot().ssq.clone();
        assert_eq!(before.len(), 4);

        let failing = Arc::new(MockSource::new(
            FetchOutcome::Data(fc3d_raw(7)),
            FetchOutcome::Failed(FetchError::Status(500)),
        ));
        let acq2 = Acquisition::new(h.context(Some("localhost"), Platform::Other), failing, h.store.clone()).await;
        acq2.replace::<SsqDraw>(before.to_vec());
        let report = acq2.force_refresh().await.unwrap();
        assert_eq!(report.fc3d, GameOutcome::Live { records: 7, rejected: 0 });
        assert!(matches!(report.ssq, GameOutcome::Kept { records: 4, .. }));
        assert_eq!(acq2.snapshot().ssq, before);
        assert_eq!(h.store.load::<SsqDraw>().await.unwrap().records.len(), 4);
    }

    #[tokio::test]
    async fn test_network_disabled_with_empty_cache_makes_no_calls() {
        let h = Harness::new();
        h.store.set_network_enabled(false).await;
        let source = Arc::new(MockSource::new(
            FetchOutcome::Data(fc3d_raw(5)),
            FetchOutcome::Data(ssq_raw(5)),
        ));
        let acq = h.pipeline(source.clone()).await;

        assert_eq!(acq.refresh_all().await, Err(AcquisitionError::Exhausted));
        assert!(acq.snapshot().is_empty());
        assert_eq!(acq.state().provenance, Provenance::CacheSafeMode);
        assert_eq!(source.fetches(), 0);
        assert_eq!(source.probes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ios_defaults_to_cache_safe_mode() {
        let h = Harness::new();
        h.store.save(&fc3d_draws(3)).await;
        let source = Arc::new(MockSource::new(FetchOutcome::Empty, FetchOutcome::Empty));
        let acq = h
            .pipeline_in(source.clone(), Some("192.168.1.20:8080"), Platform::Ios)
            .await;
        assert!(!acq.state().network_enabled);

        let report = acq.refresh_all().await.unwrap();
        assert_eq!(report.provenance, Provenance::CacheSafeMode);
        assert_eq!(report.fc3d, GameOutcome::Cached { records: 3 });
        assert_eq!(source.fetches(), 0);
    }

    #[tokio::test]
    async fn test_fresh_cache_is_published_without_network() {
        let h = Harness::new();
        let cached = fc3d_draws(10);
        h.store.save(&cached).await;
        h.store.set_last_update(start()).await;
        h.clock.advance(Duration::hours(1));

        let source = Arc::new(MockSource::new(
            FetchOutcome::Data(fc3d_raw(2)),
            FetchOutcome::Data(ssq_raw(2)),
        ));
        let acq = h.pipeline(source.clone()).await;

        let report = acq.refresh_all().await.unwrap();
        assert_eq!(report.provenance, Provenance::LocalCache);
        assert_eq!(*acq.snapshot().fc3d, cached);
        assert_eq!(source.fetches(), 0);
        assert_eq!(acq.state().last_fetch, Some(start()));
    }

    #[tokio::test]
    async fn test_stale_cache_triggers_fetch() {
        let h = Harness::new();
        h.store.save(&fc3d_draws(10)).await;
        h.store.set_last_update(start()).await;
        h.clock.advance(Duration::hours(6));

        let source = Arc::new(MockSource::new(
            FetchOutcome::Data(fc3d_raw(3)),
            FetchOutcome::Data(ssq_raw(3)),
        ));
        let acq = h.pipeline(source.clone()).await;

        let report = acq.refresh_all().await.unwrap();
        assert_eq!(report.provenance, Provenance::LiveApi);
        assert_eq!(acq.snapshot().fc3d.len(), 3);
        assert_eq!(source.fetches(), 2);
        let now = start() + Duration::hours(6);
        assert_eq!(acq.state().last_fetch, Some(now));
        assert_eq!(h.store.last_update().await, Some(now));
    }

    #[tokio::test]
    async fn test_fresh_but_empty_cache_falls_through_to_fetch() {
        let h = Harness::new();
        h.store.set_last_update(start()).await;
        let source = Arc::new(MockSource::new(
            FetchOutcome::Data(fc3d_raw(2)),
            FetchOutcome::Empty,
        ));
        let acq = h.pipeline(source.clone()).await;

        let report = acq.refresh_all().await.unwrap();
        assert_eq!(report.provenance, Provenance::LiveApi);
        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test]
    async fn test_managed_hosting_bypasses_cache() {
        let h = Harness::new();
        h.store.save(&fc3d_draws(10)).await;
        h.store.set_last_update(start()).await;
        h.store.set_network_enabled(false).await;
        h.clock.advance(Duration::minutes(1));

        let source = Arc::new(MockSource::new(
            FetchOutcome::Failed(FetchError::Status(502)),
            FetchOutcome::Failed(FetchError::Status(502)),
        ));
        let acq = h
            .pipeline_in(source.clone(), Some("picker.onrender.com"), Platform::Ios)
            .await;
        assert!(acq.state().network_enabled);
        assert_eq!(h.store.network_enabled().await, Some(true));

        assert_eq!(acq.refresh_all().await, Err(AcquisitionError::Exhausted));
        assert_eq!(source.fetches(), 2);
        assert!(acq.snapshot().is_empty());
        assert!(matches!(acq.state().provenance, Provenance::FetchFailed(_)));
    }

    #[tokio::test]
    async fn test_manual_refresh_ignores_flag_and_leaves_it_alone() {
        let h = Harness::new();
        h.store.set_network_enabled(false).await;
        h.store.set_last_update(start()).await;

        let source = Arc::new(MockSource::new(
            FetchOutcome::Data(fc3d_raw(4)),
            FetchOutcome::Data(ssq_raw(4)),
        ));
        let acq = h.pipeline(source.clone()).await;
        let report = acq.force_refresh().await.unwrap();
        assert_eq!(report.mode, RefreshMode::Manual);
        assert_eq!(report.provenance, Provenance::LiveApi);
        assert_eq!(source.fetches(), 2);
        assert!(!acq.state().network_enabled);
        assert_eq!(h.store.network_enabled().await, Some(false));

        let failing = Arc::new(MockSource::new(
            FetchOutcome::Failed(FetchError::Network("timeout".into())),
            FetchOutcome::Failed(FetchError::Network("timeout".into())),
        ));
        let acq = h.pipeline(failing.clone()).await;
        let report = acq.force_refresh().await.unwrap();
        assert!(matches!(report.provenance, Provenance::FetchFailed(_)));
        assert!(matches!(report.fc3d, GameOutcome::Kept { records: 4, .. }));
        assert_eq!(failing.fetches(), 2);
        assert!(!acq.state().network_enabled);
        assert_eq!(h.store.network_enabled().await, Some(false));
    }

    #[tokio::test]
    async fn test_failed_probe_skips_fetch_and_keeps_timestamp() {
        let h = Harness::new();
        h.store.save(&fc3d_draws(2)).await;
        let mut mock = MockSource::new(FetchOutcome::Data(fc3d_raw(9)), FetchOutcome::Empty);
        mock.healthy = false;
        let source = Arc::new(mock);
        let acq = h.pipeline(source.clone()).await;

        let report = acq.refresh_all().await.unwrap();
        assert_eq!(
            report.provenance,
            Provenance::FetchFailed("HTTP status 503".to_string())
        );
        assert!(matches!(report.fc3d, GameOutcome::Kept { records: 2, .. }));
        assert_eq!(source.fetches(), 0);
        assert_eq!(acq.state().phase, Phase::Failed);
        assert_eq!(acq.state().last_fetch, None);
        assert_eq!(h.store.last_update().await, None);
    }

    #[tokio::test]
    async fn test_unresolved_endpoint_without_cache_is_unavailable() {
        let h = Harness::new();
        let source = Arc::new(MockSource::new(
            FetchOutcome::Data(fc3d_raw(1)),
            FetchOutcome::Data(ssq_raw(1)),
        ));
        let acq = h.pipeline_in(source.clone(), None, Platform::Other).await;

        assert_eq!(acq.refresh_all().await, Err(AcquisitionError::Unavailable));
        assert_eq!(source.fetches(), 0);
        assert_eq!(
            acq.state().provenance,
            Provenance::FetchFailed(FetchError::EndpointUnresolved.to_string())
        );
    }

    #[tokio::test]
    async fn test_unresolved_endpoint_falls_back_to_cache() {
        let h = Harness::new();
        h.store.save(&fc3d_draws(6)).await;
        let source = Arc::new(MockSource::new(FetchOutcome::Empty, FetchOutcome::Empty));
        let acq = h.pipeline_in(source, None, Platform::Other).await;

        let report = acq.refresh_all().await.unwrap();
        assert!(matches!(report.fc3d, GameOutcome::Kept { records: 6, .. }));
        assert!(matches!(report.ssq, GameOutcome::NoData { .. }));
        assert_eq!(acq.snapshot().fc3d.len(), 6);
    }

    #[tokio::test]
    async fn test_rejected_records_do_not_replace_dataset() {
        let h = Harness::new();
        let source = Arc::new(MockSource::new(
            FetchOutcome::Data(vec![
                json!({"period": "1", "number": "12"}),
                json!({"period": "2", "number": "1234"}),
            ]),
            FetchOutcome::Data(ssq_raw(2)),
        ));
        let acq = h.pipeline(source).await;
        let report = acq.refresh_all().await.unwrap();
        assert_eq!(
            report.fc3d,
            GameOutcome::NoData {
                reason: "all 2 records rejected".to_string()
            }
        );
        assert!(acq.snapshot().fc3d.is_empty());
        assert!(h.store.load::<Fc3dDraw>().await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_automatic_refreshes_coalesce() {
        let h = Harness::new();
        let mut mock = MockSource::new(FetchOutcome::Data(fc3d_raw(3)), FetchOutcome::Data(ssq_raw(3)));
        mock.delay = Some(std::time::Duration::from_millis(50));
        let source = Arc::new(mock);
        let acq = h.pipeline(source.clone()).await;

        let (a, b) = tokio::join!(acq.refresh_all(), acq.refresh_all());
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(!a.coalesced);
        assert!(b.coalesced);
        assert_eq!(a.fc3d, b.fc3d);
        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test]
    async fn test_manual_refresh_queues_behind_automatic() {
        let h = Harness::new();
        let mut mock = MockSource::new(FetchOutcome::Data(fc3d_raw(3)), FetchOutcome::Data(ssq_raw(3)));
        mock.delay = Some(std::time::Duration::from_millis(20));
        let source = Arc::new(mock);
        let acq = h.pipeline(source.clone()).await;

        let (a, b) = tokio::join!(acq.refresh_all(), acq.force_refresh());
        assert!(!a.unwrap().coalesced);
        assert!(!b.unwrap().coalesced);
        assert_eq!(source.fetches(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_games_are_fetched_concurrently() {
        let h = Harness::new();
        let mut mock = MockSource::new(FetchOutcome::Data(fc3d_raw(3)), FetchOutcome::Data(ssq_raw(3)));
        mock.delay = Some(std::time::Duration::from_millis(100));
        let source = Arc::new(mock);
        let acq = h.pipeline(source.clone()).await;

        let started = tokio::time::Instant::now();
        let report = acq.refresh_all().await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(report.provenance, Provenance::LiveApi);
        assert_eq!(source.fetches(), 2);
        assert!(elapsed >= std::time::Duration::from_millis(100));
        assert!(elapsed < std::time::Duration::from_millis(200), "took {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_automatic_refresh_coalesced_into_manual_keeps_its_mode() {
        let h = Harness::new();
        let mut mock = MockSource::new(FetchOutcome::Data(fc3d_raw(3)), FetchOutcome::Data(ssq_raw(3)));
        mock.delay = Some(std::time::Duration::from_millis(20));
        let source = Arc::new(mock);
        let acq = h.pipeline(source.clone()).await;

        let (manual, automatic) = tokio::join!(acq.force_refresh(), acq.refresh_all());
        let (manual, automatic) = (manual.unwrap(), automatic.unwrap());
        assert_eq!(manual.mode, RefreshMode::Manual);
        assert!(!manual.coalesced);
        assert_eq!(automatic.mode, RefreshMode::Automatic);
        assert!(automatic.coalesced);
        assert_eq!(automatic.fc3d, manual.fc3d);
        assert_eq!(source.fetches(), 2);
    }

    #[test]
    fn test_context_rejects_unrepresentable_threshold() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(start()));
        let mut cfg = Config::minimal();
        assert_eq!(
            AcquisitionContext::from_config(&cfg, clock.clone())
                .unwrap()
                .freshness
                .threshold(),
            Duration::hours(6)
        );

        cfg.refresh.threshold_hours = 3_000_000_000_000;
        assert!(AcquisitionContext::from_config(&cfg, clock.clone()).is_err());
        cfg.refresh.threshold_hours = -2;
        assert!(AcquisitionContext::from_config(&cfg, clock).is_err());
    }

    #[tokio::test]
    async fn test_set_network_enabled_persists() {
        let h = Harness::new();
        let source = Arc::new(MockSource::new(FetchOutcome::Empty, FetchOutcome::Empty));
        let acq = h.pipeline(source.clone()).await;
        assert!(acq.state().network_enabled);

        acq.set_network_enabled(false).await;
        assert!(!acq.state().network_enabled);
        assert_eq!(h.store.network_enabled().await, Some(false));

        let reopened = h.pipeline(source).await;
        assert!(!reopened.state().network_enabled);
    }

    #[tokio::test]
    async fn test_clear_cache_resets_state_but_keeps_published_data() {
        let h = Harness::new();
        let source = Arc::new(MockSource::new(
            FetchOutcome::Data(fc3d_raw(3)),
            FetchOutcome::Data(ssq_raw(3)),
        ));
        let acq = h.pipeline(source).await;
        acq.refresh_all().await.unwrap();
        acq.set_network_enabled(false).await;
        assert!(!h.backend.is_empty());

        acq.clear_cache().await;
        assert!(h.backend.is_empty());
        let state = acq.state();
        assert!(state.network_enabled);
        assert_eq!(state.last_fetch, None);
        assert_eq!(state.provenance, Provenance::Awaiting);
        assert_eq!(acq.snapshot().fc3d.len(), 3);
    }

    #[test]
    fn test_provenance_labels() {
        assert_eq!(Provenance::Awaiting.to_string(), "awaiting");
        assert_eq!(Provenance::LiveApi.to_string(), "live-api");
        assert_eq!(Provenance::LocalCache.to_string(), "local-cache");
        assert_eq!(Provenance::CacheSafeMode.to_string(), "cache-safe-mode");
        assert_eq!(
            Provenance::FetchFailed("HTTP status 500".into()).to_string(),
            "fetch-failed (HTTP status 500)"
        );
        assert_eq!(Provenance::FetchFailed("x".into()).label(), "fetch-failed");
    }
}
