use clap::Parser;
use opt_engine::cli::{Cli, Commands};
use opt_engine::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        toml::from_str(include_str!("../config.toml.example")).expect("Invalid default config")
    });

    // Initialize telemetry
    let _guard = opt_engine::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!("Starting paper trading session");
            args.execute(config).await?;
        }
        Commands::Replay(args) => {
            args.execute().await?;
        }
        Commands::Status => {
            println!("opt-engine status");
            println!("  Mode: Paper Trading");
            println!("  Status: Not running");
        }
        Commands::Config => {
            println!("Current configuration:");
            println!(
                "  Session: {} - {} (force exit {})",
                config.session.open_time, config.session.close_time, config.session.force_exit_time
            );
            println!(
                "  Risk: {} per trade, {} max daily loss, {} trades/day",
                config.risk.risk_per_trade, config.risk.max_daily_loss, config.risk.max_trades_per_day
            );
            println!("  Execution: {:?}", config.execution.mode);
        }
    }

    Ok(())
}
