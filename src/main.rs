use anyhow::Context;
use clap::Parser;
use std::process;
use tour_processor::cli::Args;
use tour_processor::config::RaceConfig;
use tour_processor::models::ProcessingStats;
use tour_processor::processor::{self, RaceProcessor, client::HttpRaceApi};
use tracing::debug;

fn main() {
    // Parse command line arguments
    let args = Args::parse();
    setup_logging(&args);

    // Create async runtime and run the processor with signal handling
    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.block_on(async {
        tokio::select! {
            result = run(args) => result,
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\nReceived CTRL+C, shutting down...");
                Err(processor::interrupted().into())
            }
        }
    });

    match result {
        Ok(stats) => {
            if stats.halted_at.is_some() {
                debug!("Race incomplete, output covers completed stages only");
            }
            process::exit(0);
        }
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}

async fn run(args: Args) -> anyhow::Result<ProcessingStats> {
    let base = match &args.config_file {
        Some(path) => RaceConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None => RaceConfig::default(),
    };

    let show_progress = args.show_progress();
    let config = args.into_config(base);
    debug!("Effective configuration: {:?}", config);

    let api = HttpRaceApi::new(&config).context("Failed to create API client")?;
    let processor = RaceProcessor::new(api, config)?.with_progress(show_progress);

    Ok(processor.process().await?)
}

/// Set up structured logging on stderr
fn setup_logging(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tour_processor={}", log_level)));

    if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    debug!("Logging initialized at level: {}", log_level);
}
