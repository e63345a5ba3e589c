//! The worker process: claim jobs, run the analysis pipeline, publish
//! exactly one terminal result per job.
//!
//! ## Data flow
//!
//! ```text
//! claim ──▶ render ──▶ encode ──▶ analyze ──▶ parse ──▶ publish
//! (rename)  (pdfium /  (base64)   (vision     (strip    (atomic
//!            image)               model,      fences,    rename)
//!                                 retry+      serde)
//!                                 timeout)
//! ```
//!
//! The pipeline's contract with the poller is absolute: a claimed job
//! terminates in exactly one published [`ResultDescriptor`], success or
//! failure. Every pipeline error is caught at [`Worker::process_job`] and
//! converted into an error envelope; nothing short of a storage outage can
//! leave a claimed job unresolved, and the retention sweep reconciles even
//! that.

pub mod analyze;
pub mod encode;
pub mod parse;
pub mod render;

use crate::article::{Article, ResultDescriptor};
use crate::config::AppConfig;
use crate::error::PatrikaError;
use crate::job::{extension_of, JobDescriptor, JobId};
use crate::prompts::DEFAULT_INSTRUCTION_TEMPLATE;
use crate::store::{ClaimedJob, SharedStore};
use analyze::AnalysisService;
use edgequake_llm::ImageData;
use std::path::Path;
use std::sync::Arc;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

/// Polls shared storage for jobs and resolves each to a terminal result.
pub struct Worker {
    config: AppConfig,
    store: SharedStore,
    analysis: Arc<dyn AnalysisService>,
}

impl Worker {
    pub fn new(config: AppConfig, store: SharedStore, analysis: Arc<dyn AnalysisService>) -> Self {
        Worker {
            config,
            store,
            analysis,
        }
    }

    /// Run until cancelled: claim and process jobs, sleeping
    /// `poll_interval` between empty scans and sweeping stale files on the
    /// configured cadence. An in-flight job finishes before shutdown.
    ///
    /// The sweep deadline is checked at the top of every iteration, not only
    /// in the idle branch, so a continuously busy queue still gets swept.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut next_sweep = Instant::now() + self.config.sweep_interval;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            if Instant::now() >= next_sweep {
                match self.store.sweep(self.config.retention_max_age).await {
                    Ok(0) => {}
                    Ok(n) => info!(removed = n, "retention sweep reclaimed stale files"),
                    Err(e) => warn!(error = %e, "retention sweep failed"),
                }
                next_sweep = Instant::now() + self.config.sweep_interval;
            }

            match self.claim_one().await {
                Ok(Some(claimed)) => {
                    self.process_job(claimed).await;
                    // Drain the queue before sleeping again.
                    continue;
                }
                Ok(None) => {}
                Err(e) => error!(error = %e, "job scan failed"),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(self.config.poll_interval) => {}
            }
        }
        info!("Worker stopped.");
    }

    /// Process everything currently queued, once. Returns the number of
    /// jobs resolved. This is the inline (zero-latency queue) form of the
    /// pipeline and the entry point the integration tests drive.
    pub async fn run_pending(&self) -> Result<usize, PatrikaError> {
        let mut processed = 0;
        while let Some(claimed) = self.claim_one().await? {
            self.process_job(claimed).await;
            processed += 1;
        }
        Ok(processed)
    }

    /// Claim the next job, turning a corrupt descriptor into a terminal
    /// failure result instead of wedging the queue.
    async fn claim_one(&self) -> Result<Option<ClaimedJob>, PatrikaError> {
        match self.store.claim_next_job().await {
            Ok(claimed) => Ok(claimed),
            Err(PatrikaError::CorruptDescriptor { path, detail }) => {
                warn!(path = %path.display(), detail = %detail, "corrupt job descriptor");
                if let Some(job_id) = job_id_from_descriptor_path(&path) {
                    self.store
                        .publish_result(
                            job_id,
                            &ResultDescriptor::failure(format!("corrupt job descriptor: {detail}")),
                        )
                        .await?;
                    let _ = tokio::fs::remove_file(&path).await;
                }
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Resolve one claimed job. Infallible by design: pipeline errors
    /// become the job's error envelope, and only a storage outage (logged,
    /// reconciled by the sweep) can prevent publication.
    #[instrument(skip(self, claimed), fields(job_id = %claimed.descriptor.job_id))]
    pub async fn process_job(&self, claimed: ClaimedJob) {
        let job_id = claimed.descriptor.job_id;
        let result = match self.pipeline(&claimed.descriptor).await {
            Ok(articles) => {
                info!(articles = articles.len(), "job analysed");
                ResultDescriptor::Articles(articles)
            }
            Err(e) => {
                warn!(error = %e, "job failed, publishing error envelope");
                ResultDescriptor::failure(e)
            }
        };

        if let Err(e) = self.store.publish_result(job_id, &result).await {
            error!(error = %e, "could not publish result; job stays claimed for the sweep");
            return;
        }
        if let Err(e) = self.store.finish_job(&claimed).await {
            warn!(error = %e, "could not remove consumed descriptor");
        }
    }

    /// The analysis pipeline proper: artifact to ordered article list.
    async fn pipeline(&self, descriptor: &JobDescriptor) -> Result<Vec<Article>, PatrikaError> {
        let images = self.load_page_images(descriptor).await?;
        let encoded: Vec<ImageData> = images
            .iter()
            .map(encode::encode_image)
            .collect::<Result<_, _>>()
            .map_err(|e| PatrikaError::ImageFailed {
                detail: e.to_string(),
            })?;

        let instruction = self
            .config
            .instruction_template
            .as_deref()
            .unwrap_or(DEFAULT_INSTRUCTION_TEMPLATE);

        let reply =
            analyze::analyze_with_retry(self.analysis.as_ref(), &encoded, instruction, &self.config)
                .await?;
        parse::parse_articles(&reply)
    }

    /// One input unit per page: a PDF rasterises to all its pages in order,
    /// a raster image passes through (re-encoded) as a single unit.
    async fn load_page_images(
        &self,
        descriptor: &JobDescriptor,
    ) -> Result<Vec<image::DynamicImage>, PatrikaError> {
        let path = &descriptor.filepath;
        let is_pdf = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(extension_of)
            .is_some_and(|e| e == "pdf");

        if is_pdf {
            render::render_document(path, self.config.max_rendered_pixels).await
        } else {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|source| PatrikaError::Storage {
                    path: path.clone(),
                    source,
                })?;
            Ok(vec![render::decode_image(bytes).await?])
        }
    }
}

/// Recover the job id from `jobs/<id>.json` or `jobs/<id>.json.claimed`.
fn job_id_from_descriptor_path(path: &Path) -> Option<JobId> {
    let name = path.file_name()?.to_str()?;
    let stem = name
        .strip_suffix(".json.claimed")
        .or_else(|| name.strip_suffix(".json"))?;
    stem.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn job_id_recovered_from_claimed_path() {
        let id = JobId::new();
        let path = PathBuf::from(format!("/data/jobs/{id}.json.claimed"));
        assert_eq!(job_id_from_descriptor_path(&path), Some(id));
    }

    #[test]
    fn job_id_recovered_from_unclaimed_path() {
        let id = JobId::new();
        let path = PathBuf::from(format!("/data/jobs/{id}.json"));
        assert_eq!(job_id_from_descriptor_path(&path), Some(id));
    }

    #[test]
    fn non_descriptor_paths_yield_nothing() {
        assert_eq!(
            job_id_from_descriptor_path(Path::new("/data/jobs/notes.txt")),
            None
        );
        assert_eq!(
            job_id_from_descriptor_path(Path::new("/data/jobs/not-a-uuid.json")),
            None
        );
    }
}
