use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vortexia::cli::{already_reported, run_command, Cli};
use vortexia::client::Client;
use vortexia::notify::{ConsoleNavigator, ConsoleNotifier};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(&cli).await {
        if !already_reported(&e) {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> Result<()> {
    // Load configuration
    let config = cli.load_config()?;

    // Initialize logging
    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Starting vortexia v{}", env!("CARGO_PKG_VERSION"));

    let client = Client::from_config(
        &config,
        Arc::new(ConsoleNotifier),
        Arc::new(ConsoleNavigator::default()),
    )?;

    let result = run_command(cli, &config, &client).await;
    client.shutdown();
    result
}
