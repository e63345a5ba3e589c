//! # patrika
//!
//! Decompose scanned newspaper pages into individual articles with a Vision
//! Language Model, behind an asynchronous submit/poll web API.
//!
//! ## Why this crate?
//!
//! A newspaper page is a dense, multi-column collage: headlines, jumps,
//! captions and adverts interleave in ways column-extraction heuristics
//! cannot untangle. Instead this crate rasterises the page and lets a VLM
//! read it as a human would, returning each article as structured JSON —
//! headline, category, summary and full Hindi text in reading order.
//!
//! Analysis takes tens of seconds per page, far beyond what an HTTP request
//! should hold open, so the service is split into two processes that share
//! nothing but a directory tree:
//!
//! ```text
//! client ──POST /process-newspaper──▶ web process
//!                                      │  uploads/<id>_<name>   (artifact)
//!                                      │  jobs/<id>.json        (descriptor)
//!                                      ▼
//!                                 shared store ◀── claim/publish ── worker process
//!                                      │  results/<id>.json          │
//! client ◀──GET /get-result/<id>───────┘         render ▶ encode ▶ analyze ▶ parse
//! ```
//!
//! File naming *is* the protocol: the worker discovers work by scanning
//! `jobs/`, claims a descriptor by renaming it, and the presence of
//! `results/<id>.json` is the only completion signal the poller trusts.
//! Results are published by atomic rename, so a poller never observes a
//! partial file.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use patrika::{AppConfig, Poller, SharedStore, Submitter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::builder().data_root("./data").build()?;
//!     let store = SharedStore::open(&config.data_root)?;
//!
//!     let submitter = Submitter::new(config.clone(), store.clone());
//!     let job_id = submitter
//!         .submit("front-page.pdf", &std::fs::read("front-page.pdf")?)
//!         .await?;
//!
//!     // A separate `patrika-worker` process resolves the job; poll for it.
//!     let poller = Poller::new(config, store);
//!     println!("{:?}", poller.poll(job_id).await?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `patrika-web` and `patrika-worker` binaries (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when embedding the library:
//! ```toml
//! patrika = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod article;
pub mod config;
pub mod error;
pub mod http;
pub mod job;
pub mod poll;
pub mod prompts;
pub mod store;
pub mod submit;
pub mod worker;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use article::{Article, Category, ErrorEnvelope, ResultDescriptor};
pub use config::{AppConfig, AppConfigBuilder};
pub use error::PatrikaError;
pub use job::{JobDescriptor, JobId};
pub use poll::{PollOutcome, Poller};
pub use store::{ClaimedJob, SharedStore};
pub use submit::Submitter;
pub use worker::analyze::{AnalysisService, VisionAnalysis};
pub use worker::Worker;
