//! Seisloader CLI
//!
//! Command-line entry point for the seisloader ingestion pipeline.

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{error, info};

use seisloader::cli::{commands, Cli, Commands};
use seisloader::SeismicError;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .init();

    info!("Seisloader v{}", env!("CARGO_PKG_VERSION"));
    info!("Args: {:?}", cli);

    let config = cli
        .pipeline_config()
        .context("failed to resolve configuration")?;

    let result = match cli.command.clone().unwrap_or(Commands::Run) {
        Commands::Run => commands::run(config),
        Commands::Ingest => commands::ingest(config),
        Commands::Query {
            station,
            start,
            end,
            limit,
        } => commands::query(&config, &station, start, end, limit),
        Commands::Stations => commands::stations(&config),
        Commands::Synthesize {
            dir,
            station,
            samples,
            rate,
        } => {
            let dir = dir.unwrap_or_else(|| config.input_dir.clone());
            commands::synthesize(&dir, &station, samples, rate).map(|_| ())
        }
    };

    if let Err(err) = &result {
        report_failure(err);
    }
    result.context("seisloader run failed")
}

fn report_failure(err: &SeismicError) {
    error!("{} [{}]", err, err.error_code());
    for suggestion in err.recovery_suggestions() {
        error!("  hint: {}", suggestion);
    }
}
