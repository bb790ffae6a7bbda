//! CLI interface for ticker-feed
//!
//! Provides subcommands for:
//! - `watch`: Stream tickers for a set of products
//! - `config`: Show the effective configuration

mod watch;

pub use watch::WatchArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "ticker-feed")]
#[command(about = "Real-time ticker client for a single exchange WebSocket feed")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream tickers until interrupted
    Watch(WatchArgs),
    /// Show configuration
    Config,
}
