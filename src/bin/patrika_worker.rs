//! Worker process binary: claims queued jobs and resolves them with a VLM.
//!
//! Runs until SIGINT/SIGTERM; an in-flight job is finished before exit so
//! no result is lost to a routine restart.

use anyhow::{Context, Result};
use clap::Parser;
use patrika::worker::analyze::VisionAnalysis;
use patrika::{AppConfig, SharedStore, Worker};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "patrika-worker",
    version,
    about = "Analyse queued newspaper pages with a Vision Language Model",
    long_about = "Background half of the patrika service. Watches the shared data \
directory for jobs enqueued by patrika-web, rasterises each page, sends it to a \
vision model and publishes the article breakdown as the job's result. \
The provider is auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / \
ANTHROPIC_API_KEY unless --provider is given."
)]
struct Cli {
    /// Directory shared with the web process
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// Provider name (gemini, openai, anthropic, ...); auto-detected if omitted
    #[arg(short, long)]
    provider: Option<String>,

    /// Model identifier, e.g. gemini-2.0-flash
    #[arg(short, long)]
    model: Option<String>,

    /// Seconds between queue scans when idle
    #[arg(long, default_value_t = 1.0)]
    poll_interval: f64,

    /// Attempts per job before giving up on the model
    #[arg(long, default_value_t = 3)]
    max_retries: u32,

    /// Hard deadline per model call, in seconds
    #[arg(long, default_value_t = 120)]
    analysis_timeout: u64,

    /// Hours a job's files are kept before the retention sweep removes them
    #[arg(long, default_value_t = 24)]
    retention_hours: u64,

    /// Verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    let mut builder = AppConfig::builder()
        .data_root(&cli.data_dir)
        .poll_interval(Duration::from_secs_f64(cli.poll_interval))
        .max_retries(cli.max_retries)
        .analysis_timeout_secs(cli.analysis_timeout)
        .retention_max_age(Duration::from_secs(cli.retention_hours * 3600));
    if let Some(provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(model) = cli.model {
        builder = builder.model(model);
    }
    let config = builder.build()?;

    let store = SharedStore::open(&config.data_root)
        .with_context(|| format!("opening data directory {}", cli.data_dir.display()))?;
    let analysis = Arc::new(VisionAnalysis::from_config(&config)?);
    let worker = Worker::new(config, store, analysis);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        let mut sigint = signal(SignalKind::interrupt()).context("installing SIGINT handler")?;
        let mut sigterm = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
        tokio::spawn(async move {
            tokio::select! {
                _ = sigint.recv() => info!("SIGINT received, finishing current job"),
                _ = sigterm.recv() => info!("SIGTERM received, finishing current job"),
            }
            cancel.cancel();
        });
    }

    info!(data_dir = %cli.data_dir.display(), "patrika-worker started");
    worker.run(cancel).await;
    Ok(())
}
