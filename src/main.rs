//! Babelcast Server
//!
//! Run with: cargo run --bin babelcast
//!
//! # Configuration
//!
//! Settings come from a TOML file (`--config`, or the default locations)
//! overridden by environment variables:
//! - `HOST`, `PORT`: Listen address (default: 0.0.0.0:8080)
//! - `TRANSLATE_ACCESS_KEY_ID`, `TRANSLATE_SECRET_ACCESS_KEY`,
//!   `TRANSLATE_REGION`: AWS Translate credentials (required)
//! - `RELAY_LANGUAGE_MATCH`: `exact` or `primary_subtag`
//! - `RELAY_FANOUT`: `sequential` or `concurrent`
//! - `RUST_LOG`: Log filter, overrides the configured level

use anyhow::Context;
use babelcast::api::{serve, AppState};
use babelcast::config::{generate_default_config, Config, LoggingConfig};
use babelcast::translation::AwsTranslator;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "babelcast")]
#[command(about = "Live translation relay for one speaker and many listeners", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to the standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on, overrides config and PORT
    #[arg(short, long)]
    port: Option<u16>,

    /// Print a default config file and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", generate_default_config());
        return Ok(());
    }

    // Config loading logs too; route it somewhere until the real subscriber exists
    let config = tracing::subscriber::with_default(bootstrap_subscriber(std::io::stderr), || {
        load_config(&cli)
    })?;

    init_tracing(&config.logging);

    tracing::info!("Starting Babelcast v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        language_match = ?config.hub.language_match,
        fanout = ?config.hub.fanout,
        "Hub configuration"
    );

    // No credentials, no server
    let translator = AwsTranslator::from_config(&config.translation)
        .context("failed to initialize translator")?;

    let server = config.server.clone();
    let state = AppState::new(config, Arc::new(translator));

    serve(state, &server)
        .await
        .with_context(|| format!("serving on {}", server.addr()))?;

    tracing::info!("Babelcast stopped");
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::load_default().context("loading config from the default locations")?,
    };
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    Ok(config)
}

/// Subscriber used while the configuration is being read
fn bootstrap_subscriber<W>(writer: W) -> impl tracing::Subscriber + Send + Sync
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "babelcast=info".into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(writer))
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("babelcast={},tower_http=info", logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
