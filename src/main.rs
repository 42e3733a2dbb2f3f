use anyhow::Context;
use clap::Parser;
use crypto_feed::cli::{Cli, Commands};
use crypto_feed::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
            eprintln!("Using default configuration");
            toml::from_str(include_str!("../config.toml.example"))
                .context("Invalid default config")?
        }
    };

    // Initialize telemetry
    crypto_feed::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Watch(args) => {
            tracing::info!("Starting price watch");
            args.execute(&config).await?;
        }
        Commands::Registry => {
            let registry = config.instrument_registry();
            println!("Instrument registry ({} entries):", registry.len());
            for (id, symbol) in registry.entries() {
                println!("  {:>6} -> {}", id, symbol);
            }
        }
        Commands::Config => {
            let feed = &config.feed;
            println!("Current configuration:");
            println!("  Stream: {}", feed.stream_url);
            println!("  Tickers: {}", feed.ticker_url);
            println!(
                "  Reconnect: {} attempts, base {}ms",
                feed.max_reconnect_attempts, feed.reconnect_base_delay_ms
            );
            println!(
                "  Poll: every {}s, stream retry after {}s",
                feed.poll_interval_secs, feed.poll_retry_delay_secs
            );
            println!(
                "  Simulation tick: {}ms, throttle: {}ms",
                feed.simulation_tick_ms, feed.throttle_ms
            );
            println!("  Watchlist: {} instruments", config.watchlist.len());
        }
    }

    Ok(())
}
