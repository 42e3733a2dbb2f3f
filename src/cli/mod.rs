//! CLI interface for crypto-feed
//!
//! Provides subcommands for:
//! - `watch`: Subscribe to the configured watchlist and log snapshots
//! - `registry`: Show the instrument → symbol mapping
//! - `config`: Show the effective configuration

mod watch;

pub use watch::WatchArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "crypto-feed")]
#[command(about = "Real-time crypto prices with streaming, polling and simulation fallback")]
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
    /// Watch live prices for the configured watchlist
    Watch(WatchArgs),
    /// Show the instrument registry
    Registry,
    /// Show configuration
    Config,
}
