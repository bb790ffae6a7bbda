use clap::Parser;
use ticker_feed::cli::{Cli, Commands};
use ticker_feed::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        Config::parse(include_str!("../config.toml.example")).unwrap_or_default()
    });

    // Initialize telemetry
    let _telemetry = ticker_feed::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Watch(args) => {
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!("  Feed: {}", config.feed.url);
            println!("  Products: {}", config.feed.product_ids.join(", "));
            println!(
                "  Reconnect: {} attempts, {}ms base delay",
                config.reconnect.max_attempts, config.reconnect.base_delay_ms
            );
            println!("  Heartbeat: every {}ms", config.heartbeat.interval_ms);
            println!(
                "  Telemetry: level={}, format={:?}, metrics_port={:?}",
                config.telemetry.log_level,
                config.telemetry.log_format,
                config.telemetry.metrics_port
            );
        }
    }

    Ok(())
}
