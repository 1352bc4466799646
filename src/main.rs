//! # VPI Analyzer CLI (`vpi`)
//!
//! ## Usage
//!
//! ```bash
//! vpi --config ./config/vpi.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `vpi init` | Create the search history database |
//! | `vpi analyze "<query>"` | Search, enrich and score videos |
//! | `vpi history list` | List past searches, newest first |
//! | `vpi history show <id>` | Show the records stored for a search |
//! | `vpi history delete <id>` | Delete one search |
//! | `vpi history clear` | Delete all searches for the configured user |
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use vpi_analyzer::analyze::{self, SortKey};
use vpi_analyzer::{config, history, migrate};

/// VPI Analyzer: score YouTube search results against predicted views.
#[derive(Parser)]
#[command(
    name = "vpi",
    about = "VPI Analyzer: score YouTube search results against predicted views",
    version,
    long_about = "Searches YouTube with a rotating set of API keys, enriches every hit with \
    video and channel statistics, and computes a View Prediction Index (actual / predicted \
    views) using an external prediction service."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/vpi.toml`. API keys may also be supplied
    /// through `VPI_YOUTUBE_API_KEYS`.
    #[arg(long, global = true, default_value = "./config/vpi.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the search history database.
    ///
    /// Idempotent: running it more than once is safe.
    Init,

    /// Analyze a search query.
    ///
    /// Runs the search, video and channel calls, then scores every video.
    /// A failure in any of the three API calls aborts the query; a failure
    /// to score one video is shown on that video only.
    Analyze {
        /// The search query string.
        query: String,

        /// Result order: `vpi`, `subscribers`, `views` or `date`, suffixed
        /// with `_asc` or `_desc` (e.g. `vpi_desc`). Default: API order.
        #[arg(long)]
        sort: Option<SortKey>,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,

        /// Do not record this search in history.
        #[arg(long)]
        no_save: bool,
    },

    /// Manage search history.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List past searches, newest first.
    List,
    /// Show the records stored for one search.
    Show {
        id: String,
        /// Print the entry as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Delete one search.
    Delete { id: String },
    /// Delete every search for the configured user.
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Analyze {
            query,
            sort,
            json,
            no_save,
        } => {
            analyze::run_analyze(&cfg, &query, sort, json, !no_save).await?;
        }
        Commands::History { action } => match action {
            HistoryAction::List => history::run_history_list(&cfg).await?,
            HistoryAction::Show { id, json } => history::run_history_show(&cfg, &id, json).await?,
            HistoryAction::Delete { id } => history::run_history_delete(&cfg, &id).await?,
            HistoryAction::Clear => history::run_history_clear(&cfg).await?,
        },
    }

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
