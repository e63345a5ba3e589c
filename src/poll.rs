//! Result polling: presence of the result file is the completion signal.
//!
//! There is deliberately no separate status record distinguishing "queued"
//! from "in-progress" — and, by the same token, an id that was never
//! submitted is indistinguishable from one still queued. That ambiguity is
//! part of the inherited protocol (see DESIGN.md); pollers of unknown ids
//! see "processing" forever. Polling is idempotent and side-effect-free
//! unless the cleanup-on-read policy is enabled.

use crate::article::ResultDescriptor;
use crate::config::AppConfig;
use crate::error::PatrikaError;
use crate::job::JobId;
use crate::store::SharedStore;
use tracing::{debug, instrument};

/// What a poll observed.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    /// No result yet (job queued, in-flight, or unknown).
    Processing,
    /// Terminal result, returned verbatim from storage.
    Ready(ResultDescriptor),
}

/// Serves result lookups on behalf of the web process.
#[derive(Debug, Clone)]
pub struct Poller {
    config: AppConfig,
    store: SharedStore,
}

impl Poller {
    pub fn new(config: AppConfig, store: SharedStore) -> Self {
        Poller { config, store }
    }

    /// Check storage for the job's result.
    ///
    /// With `cleanup_on_read` enabled, a terminal read also deletes the
    /// job's files; the next poll for the same id reports `Processing`
    /// again, which callers should treat as "unknown job".
    #[instrument(skip(self))]
    pub async fn poll(&self, job_id: JobId) -> Result<PollOutcome, PatrikaError> {
        match self.store.read_result(job_id).await? {
            None => Ok(PollOutcome::Processing),
            Some(result) => {
                if self.config.cleanup_on_read {
                    debug!(job_id = %job_id, "terminal read, reclaiming job data");
                    self.store.remove_job_data(job_id).await?;
                }
                Ok(PollOutcome::Ready(result))
            }
        }
    }
}
