//! bugsim - duplicate bug detection service.
//!
//! Keeps per-application embedding indices of reported bugs (and of closed
//! bugs, for priority precedents) and answers similarity queries over HTTP.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod config;
mod server;

use bugsim_dedup::Detector;
use config::{CONFIG_ENV, load_config};

/// Duplicate bug detection service.
#[derive(Parser)]
#[command(name = "bugsim")]
#[command(about = "Semantic duplicate detection for bug reports")]
#[command(version)]
struct Cli {
    /// Config file (YAML). Falls back to $BUGSIM_CONFIG, then built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, overrides the config file (e.g. :8000)
    #[arg(short = 'l', long)]
    listen: Option<String>,

    /// Verbose output
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let path = cli
        .config
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
    let mut cfg = load_config(path.as_deref())?;
    cfg.apply_env(|key| std::env::var(key).ok());
    if let Some(listen) = cli.listen {
        cfg.listen = listen;
    }

    let detector = Arc::new(Detector::new(cfg.detector_config()?)?);
    tracing::info!(
        provider = ?cfg.embedder.provider,
        index = ?cfg.index.kind,
        source = %cfg.source.base_url,
        "detector ready"
    );

    if cfg.bootstrap.on_startup {
        let detector = Arc::clone(&detector);
        tokio::spawn(async move {
            detector.bootstrap().await;
        });
    }

    server::serve(&cfg.listen, detector).await
}
