//! Web process binary: accepts uploads, enqueues jobs, serves poll results.
//!
//! A thin shim over the library crate that maps CLI flags to `AppConfig`
//! and serves the axum router. Pairs with `patrika-worker`, which must
//! point at the same `--data-dir`.

use anyhow::{Context, Result};
use clap::Parser;
use patrika::{http, AppConfig, Poller, SharedStore, Submitter};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "patrika-web",
    version,
    about = "Upload newspaper pages and poll for their article breakdown",
    long_about = "HTTP front of the patrika service. Accepts newspaper page uploads \
(PDF/PNG/JPEG), enqueues them as jobs in a shared data directory, and serves \
results once the patrika-worker process has analysed them."
)]
struct Cli {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:5000")]
    bind: SocketAddr,

    /// Directory shared with the worker process
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// Maximum accepted upload size in bytes
    #[arg(long, default_value_t = patrika::config::DEFAULT_MAX_UPLOAD_BYTES)]
    max_upload_bytes: usize,

    /// Delete a job's files as soon as its result is fetched
    #[arg(long)]
    cleanup_on_read: bool,

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

    let config = AppConfig::builder()
        .data_root(&cli.data_dir)
        .max_upload_bytes(cli.max_upload_bytes)
        .cleanup_on_read(cli.cleanup_on_read)
        .build()?;
    let store = SharedStore::open(&config.data_root)
        .with_context(|| format!("opening data directory {}", cli.data_dir.display()))?;

    let submitter = Arc::new(Submitter::new(config.clone(), store.clone()));
    let poller = Arc::new(Poller::new(config.clone(), store));
    let app = http::router(submitter, poller, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .with_context(|| format!("binding {}", cli.bind))?;
    info!(addr = %cli.bind, data_dir = %cli.data_dir.display(), "patrika-web listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
