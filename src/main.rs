use clap::Parser;
use lob_replay::cli::{Cli, Commands};
use lob_replay::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load_or_default(&cli.config)?;

    lob_replay::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Backtest(args) => {
            args.execute(&config).await?;
        }
        Commands::Sweep(args) => {
            args.execute(&config).await?;
        }
        Commands::Config => {
            config.validate()?;
            println!("Current configuration:");
            println!(
                "  Instrument: tick_size={} lot_size={}",
                config.instrument.tick_size, config.instrument.lot_size
            );
            println!(
                "  Simulation: tick_interval={}ms capital={} fee_rate={}",
                config.simulation.tick_interval_ns / 1_000_000,
                config.simulation.initial_capital,
                config.simulation.fee_rate
            );
            println!(
                "  Latency: {:?} ack={}ms obs={}ms jitter={}ms seed={}",
                config.latency.model,
                config.latency.ack_ns / 1_000_000,
                config.latency.obs_ns / 1_000_000,
                config.latency.jitter_ns / 1_000_000,
                config.latency.seed
            );
            println!(
                "  Quoting: gamma={} k={} qty={} max_position={}",
                config.quoting.gamma,
                config.quoting.k,
                config.quoting.order_qty,
                config.quoting.max_position
            );
        }
    }

    Ok(())
}
