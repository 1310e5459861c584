//! # Draw Harness CLI (`draws`)
//!
//! ## Usage
//!
//! ```bash
//! draws --config ./config/draws.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `draws init` | Create the SQLite cache schema |
//! | `draws status` | Network flag, endpoint, and cached datasets |
//! | `draws refresh [--force]` | Automatic refresh, or a manual one with `--force` |
//! | `draws show <game>` | Paginated cached history with derived figures |
//! | `draws network <on\|off>` | Toggle network refresh |
//! | `draws cache clear` | Remove cached datasets and flags |
//! | `draws serve` | Start the companion draw service |
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use draw_harness::config::{self, Config};
use draw_harness::{migrate, refresh, server, show, status};
use draw_harness_core::models::Game;
use draw_harness_core::page::DEFAULT_PER_PAGE;

/// Draw Harness CLI: acquisition, caching and inspection of lottery draw
/// history.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Without one, built-in defaults apply.
#[derive(Parser)]
#[command(
    name = "draws",
    about = "Draw Harness: a local-first draw history pipeline",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/draws.toml`. When the default file does not
    /// exist, built-in defaults are used.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the cache database schema. Idempotent.
    Init,

    /// Show the network flag, resolved endpoint and cached datasets.
    Status,

    /// Refresh both draw histories.
    ///
    /// Without `--force` the network flag and the freshness threshold
    /// decide whether the network is used at all.
    Refresh {
        /// Always attempt a live fetch, ignoring freshness and the network
        /// flag. The flag itself is not changed.
        #[arg(long)]
        force: bool,
    },

    /// Print one page of a cached draw history.
    Show {
        /// `fc3d` or `ssq`.
        #[arg(value_parser = parse_game)]
        game: Game,

        /// 1-based page number. Out-of-range pages are clamped.
        #[arg(long, default_value_t = 1)]
        page: usize,

        #[arg(long, default_value_t = DEFAULT_PER_PAGE)]
        per_page: usize,
    },

    /// Enable or disable automatic network refresh.
    Network {
        #[arg(value_enum)]
        state: Toggle,
    },

    /// Cache maintenance.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Start the companion draw service on `[server].bind`.
    Serve,
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Remove both cached datasets and the persisted flags.
    Clear,
}

fn parse_game(s: &str) -> Result<Game, String> {
    s.parse()
}

fn load(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => config::load_config(path),
        None => {
            let default = PathBuf::from("./config/draws.toml");
            if default.exists() {
                config::load_config(&default)
            } else {
                Ok(Config::minimal())
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load(cli.config.as_ref())?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Cache database initialized at {}.", cfg.cache.path.display());
        }
        Commands::Status => {
            status::run_status(&cfg).await?;
        }
        Commands::Refresh { force } => {
            refresh::run_refresh(&cfg, force).await?;
        }
        Commands::Show {
            game,
            page,
            per_page,
        } => {
            show::run_show(&cfg, game, page, per_page).await?;
        }
        Commands::Network { state } => {
            refresh::run_network(&cfg, matches!(state, Toggle::On)).await?;
        }
        Commands::Cache { action } => match action {
            CacheAction::Clear => {
                refresh::run_cache_clear(&cfg).await?;
            }
        },
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
