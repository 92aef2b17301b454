//! rAttendance library root.
//! Exposes CLI parser, high-level run() function, and internal modules.

pub mod cli;
pub mod config;
pub mod core;
pub mod db;
pub mod errors;
pub mod export;
pub mod models;
pub mod ui;
pub mod utils;

use clap::Parser;
use cli::parser::{Cli, Commands};
use config::Config;
use errors::AppResult;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Central command dispatcher
pub async fn dispatch(cli: &Cli, cfg: &Config) -> AppResult<()> {
    match &cli.command {
        Commands::Init => cli::commands::init::handle(cli),
        Commands::Config { .. } => cli::commands::config::handle(&cli.command, cfg),
        Commands::Db { .. } => cli::commands::db::handle(&cli.command, cfg),
        Commands::Log { .. } => cli::commands::log::handle(&cli.command, cfg),
        Commands::ClockIn { .. }
        | Commands::ClockOut { .. }
        | Commands::Session { .. }
        | Commands::Visit { .. } => cli::commands::attendance::handle(&cli.command, cfg).await,
        Commands::Status { .. } | Commands::Locate { .. } => {
            cli::commands::status::handle(&cli.command, cfg).await
        }
        Commands::History { .. } | Commands::Summary { .. } => {
            cli::commands::history::handle(&cli.command, cfg).await
        }
        Commands::Flagged { .. } | Commands::Flag { .. } => {
            cli::commands::flagged::handle(&cli.command, cfg).await
        }
        Commands::Export { .. } => cli::commands::export::handle(&cli.command, cfg).await,
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
/// Logs go to stderr so command output stays clean.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // a second call (tests) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

/// Entry point used by main.rs
pub async fn run() -> AppResult<()> {
    let cli = Cli::parse();

    // load config once, then apply command-line overrides
    let cfg = Config::load()?.with_overrides(cli.db.as_deref(), cli.directory.as_deref());

    init_tracing(&cfg.log_level);
    tracing::debug!(database = %cfg.database, directory = %cfg.directory_file, "configuration loaded");

    dispatch(&cli, &cfg).await
}
