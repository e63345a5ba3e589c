//! Job submission: validate the upload, persist it, enqueue it, return.
//!
//! The submitter is the only component that creates jobs. Its contract is
//! strict about ordering: the artifact must be durable *before* the job
//! descriptor appears, because the descriptor is what makes the job visible
//! to workers. The reverse order could let a worker claim a job whose
//! artifact does not exist yet.
//!
//! Submission never touches the analysis provider — the returned [`JobId`]
//! is an "accepted" acknowledgement, not a result.

use crate::config::AppConfig;
use crate::error::PatrikaError;
use crate::job::{extension_of, sanitize_filename, JobDescriptor, JobId};
use crate::store::SharedStore;
use tracing::{info, instrument};

/// Accepts uploads on behalf of the web process.
#[derive(Debug, Clone)]
pub struct Submitter {
    config: AppConfig,
    store: SharedStore,
}

impl Submitter {
    pub fn new(config: AppConfig, store: SharedStore) -> Self {
        Submitter { config, store }
    }

    /// Validate and enqueue one upload, returning its fresh [`JobId`].
    ///
    /// Client-input failures (empty filename, disallowed extension,
    /// oversized payload) reject before anything is persisted. A storage
    /// failure after the artifact write may strand an unreferenced artifact;
    /// the retention sweep reconciles those.
    #[instrument(skip(self, bytes), fields(filename = %filename, bytes = bytes.len()))]
    pub async fn submit(&self, filename: &str, bytes: &[u8]) -> Result<JobId, PatrikaError> {
        if filename.is_empty() {
            return Err(PatrikaError::EmptyFilename);
        }

        let ext = extension_of(filename).unwrap_or_default();
        if !self.config.allowed_extensions.iter().any(|a| *a == ext) {
            return Err(PatrikaError::DisallowedExtension {
                ext,
                allowed: self.config.allowed_extensions_display(),
            });
        }

        if bytes.len() > self.config.max_upload_bytes {
            return Err(PatrikaError::PayloadTooLarge {
                size: bytes.len(),
                limit: self.config.max_upload_bytes,
            });
        }

        let sanitized = sanitize_filename(filename)?;
        let job_id = JobId::new();

        let filepath = self.store.write_artifact(job_id, &sanitized, bytes).await?;
        self.store
            .write_job_descriptor(&JobDescriptor {
                job_id,
                original_filename: filename.to_string(),
                filepath,
            })
            .await?;

        info!(job_id = %job_id, "job accepted");
        Ok(job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{JOBS_DIR, UPLOADS_DIR};

    fn submitter() -> (tempfile::TempDir, Submitter) {
        let dir = tempfile::tempdir().unwrap();
        let store = SharedStore::open(dir.path()).unwrap();
        let config = AppConfig::builder()
            .data_root(dir.path())
            .max_upload_bytes(1024)
            .build()
            .unwrap();
        (dir, Submitter::new(config, store))
    }

    fn dir_count(root: &std::path::Path, dir: &str) -> usize {
        std::fs::read_dir(root.join(dir)).unwrap().count()
    }

    #[tokio::test]
    async fn valid_submission_persists_artifact_then_descriptor() {
        let (dir, submitter) = submitter();
        let id = submitter.submit("front.jpg", b"jpegbytes").await.unwrap();

        assert_eq!(dir_count(dir.path(), UPLOADS_DIR), 1);
        assert_eq!(dir_count(dir.path(), JOBS_DIR), 1);
        assert!(dir
            .path()
            .join(JOBS_DIR)
            .join(format!("{id}.json"))
            .exists());
    }

    #[tokio::test]
    async fn empty_filename_rejected_without_side_effects() {
        let (dir, submitter) = submitter();
        let err = submitter.submit("", b"x").await.unwrap_err();
        assert!(matches!(err, PatrikaError::EmptyFilename));
        assert_eq!(dir_count(dir.path(), UPLOADS_DIR), 0);
        assert_eq!(dir_count(dir.path(), JOBS_DIR), 0);
    }

    #[tokio::test]
    async fn disallowed_extension_rejected() {
        let (dir, submitter) = submitter();
        let err = submitter.submit("page.exe", b"x").await.unwrap_err();
        assert!(matches!(err, PatrikaError::DisallowedExtension { .. }));
        assert!(err.is_client_error());
        assert_eq!(dir_count(dir.path(), JOBS_DIR), 0);
    }

    #[tokio::test]
    async fn extension_check_is_case_insensitive() {
        let (_dir, submitter) = submitter();
        assert!(submitter.submit("PAGE.PDF", b"%PDF-").await.is_ok());
    }

    #[tokio::test]
    async fn oversized_payload_rejected() {
        let (dir, submitter) = submitter();
        let big = vec![0u8; 2048];
        let err = submitter.submit("page.jpg", &big).await.unwrap_err();
        assert!(matches!(err, PatrikaError::PayloadTooLarge { .. }));
        assert_eq!(dir_count(dir.path(), UPLOADS_DIR), 0);
    }

    #[tokio::test]
    async fn concurrent_submissions_get_distinct_ids() {
        let (_dir, submitter) = submitter();
        let (a, b) = tokio::join!(
            submitter.submit("a.jpg", b"a"),
            submitter.submit("b.jpg", b"b"),
        );
        assert_ne!(a.unwrap(), b.unwrap());
    }
}
