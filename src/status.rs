//! Pipeline status overview.
//!
//! Used by `draws status` to show where data would come from and what is
//! cached, without touching the network.

use anyhow::Result;
use chrono::{DateTime, Utc};

use draw_harness_core::clock::Clock;
use draw_harness_core::models::{Draw, Fc3dDraw, Game, SsqDraw};
use draw_harness_core::store::CacheStore;

use crate::config::Config;
use crate::pipeline::Acquisition;

/// Cache summary for one game.
struct GameStatus {
    game: Game,
    records: usize,
    saved_at: Option<DateTime<Utc>>,
    newest: Option<String>,
}

async fn game_status<D: Draw>(store: &CacheStore) -> GameStatus {
    match store.load::<D>().await {
        Some(entry) => GameStatus {
            game: D::GAME,
            records: entry.records.len(),
            saved_at: entry.saved_at,
            newest: entry
                .records
                .first()
                .map(|d| format!("{} ({})", d.period(), d.date())),
        },
        None => GameStatus {
            game: D::GAME,
            records: 0,
            saved_at: None,
            newest: None,
        },
    }
}

pub async fn run_status(config: &Config) -> Result<()> {
    let acq = Acquisition::from_config(config).await?;
    let ctx = acq.context();
    let env = &ctx.environment;
    let state = acq.state();
    let now = ctx.clock.now();

    let context = match &env.host {
        _ if env.managed_hosting => "managed hosting",
        Some(host) if host.is_loopback() => "loopback",
        Some(_) => "lan",
        None => "unknown",
    };

    println!("Draw Harness Status");
    println!("===================");
    println!();
    println!(
        "  Cache:        {} ({})",
        acq.store().backend_name(),
        config.cache.path.display()
    );
    println!("  Source:       {}", config.source.kind);
    println!(
        "  Endpoint:     {}",
        ctx.base_url().unwrap_or_else(|| "none (cache only)".to_string())
    );
    println!("  Context:      {} ({:?})", context, env.platform);
    println!(
        "  Network:      {}",
        if state.network_enabled { "enabled" } else { "disabled" }
    );
    println!("  Last update:  {}", format_time(state.last_fetch));
    println!("  Threshold:    {}h", ctx.freshness.threshold().num_hours());
    println!(
        "  Refresh due:  {}",
        if ctx.freshness.needs_refresh(state.last_fetch, env, now) {
            "yes"
        } else {
            "no"
        }
    );
    println!();

    let games = [
        game_status::<Fc3dDraw>(acq.store()).await,
        game_status::<SsqDraw>(acq.store()).await,
    ];

    println!("{:<6} {:>8}  {:<20}  NEWEST", "GAME", "RECORDS", "SAVED");
    for g in &games {
        println!(
            "{:<6} {:>8}  {:<20}  {}",
            g.game.slug(),
            g.records,
            format_time(g.saved_at),
            g.newest.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}

pub(crate) fn format_time(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| "never".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use draw_harness_core::clock::SystemClock;
    use draw_harness_core::normalize::normalize_batch;
    use draw_harness_core::store::memory::MemoryBackend;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_game_status_reports_newest_draw() {
        let store = CacheStore::new(Arc::new(MemoryBackend::new()), Arc::new(SystemClock));
        let empty = game_status::<Fc3dDraw>(&store).await;
        assert_eq!(empty.records, 0);
        assert_eq!(empty.newest, None);

        let draws = normalize_batch::<Fc3dDraw>(&[
            json!({"period": "2024150", "date": "2024-06-01", "number": "123"}),
            json!({"period": "2024149", "date": "2024-05-31", "number": "456"}),
        ])
        .records;
        store.save(&draws).await;

        let status = game_status::<Fc3dDraw>(&store).await;
        assert_eq!(status.game, Game::Fc3d);
        assert_eq!(status.records, 2);
        assert!(status.saved_at.is_some());
        assert_eq!(status.newest.as_deref(), Some("2024150 (2024-06-01)"));
    }

    #[test]
    fn test_format_time_never() {
        assert_eq!(format_time(None), "never");
    }
}
