//! Shared filesystem storage: the coordination protocol between processes.
//!
//! Three directories under one root are the entire contract between the
//! web process and the worker:
//!
//! ```text
//! <root>/uploads/<job_id>_<sanitized_filename>   raw artifact, written once
//! <root>/jobs/<job_id>.json                      job descriptor, consumed once
//! <root>/results/<job_id>.json                   result descriptor, read many times
//! ```
//!
//! The naming convention must be preserved exactly — independently deployed
//! submitters, pollers and workers interoperate through nothing else.
//!
//! ## Why no locks?
//!
//! Each file is owned by exactly one `JobId` and written by exactly one
//! process exactly once. Two mechanisms make that safe without locking:
//!
//! * **Atomic publish** — descriptors and results are written to a `.tmp`
//!   sibling and renamed into place, so a reader can never observe a
//!   truncated JSON document.
//! * **Claim by rename** — the worker renames `<id>.json` to
//!   `<id>.json.claimed` before touching the job. Rename is atomic on a
//!   POSIX filesystem; if two workers race, exactly one rename succeeds and
//!   the loser simply moves on.

use crate::article::ResultDescriptor;
use crate::error::PatrikaError;
use crate::job::{JobDescriptor, JobId};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// Directory names under the storage root. Part of the protocol.
pub const UPLOADS_DIR: &str = "uploads";
pub const JOBS_DIR: &str = "jobs";
pub const RESULTS_DIR: &str = "results";

/// Suffix appended to a job descriptor's filename when a worker claims it.
const CLAIM_SUFFIX: &str = ".claimed";

/// Handle to the shared storage root. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SharedStore {
    root: PathBuf,
}

/// A job descriptor this worker has exclusively claimed.
#[derive(Debug)]
pub struct ClaimedJob {
    pub descriptor: JobDescriptor,
    /// Path of the renamed (`.claimed`) descriptor file.
    pub claim_path: PathBuf,
}

impl SharedStore {
    /// Open (creating if needed) the three protocol directories under `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, PatrikaError> {
        let root = root.into();
        for dir in [UPLOADS_DIR, JOBS_DIR, RESULTS_DIR] {
            let path = root.join(dir);
            std::fs::create_dir_all(&path)
                .map_err(|source| PatrikaError::Storage { path, source })?;
        }
        Ok(SharedStore { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // ── Path derivation (the protocol's naming scheme) ───────────────────

    pub fn artifact_path(&self, job_id: JobId, sanitized_filename: &str) -> PathBuf {
        self.root
            .join(UPLOADS_DIR)
            .join(format!("{job_id}_{sanitized_filename}"))
    }

    pub fn job_path(&self, job_id: JobId) -> PathBuf {
        self.root.join(JOBS_DIR).join(format!("{job_id}.json"))
    }

    pub fn result_path(&self, job_id: JobId) -> PathBuf {
        self.root.join(RESULTS_DIR).join(format!("{job_id}.json"))
    }

    // ── Submitter side ───────────────────────────────────────────────────

    /// Persist the raw upload bytes. Returns the artifact path.
    pub async fn write_artifact(
        &self,
        job_id: JobId,
        sanitized_filename: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, PatrikaError> {
        let path = self.artifact_path(job_id, sanitized_filename);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| PatrikaError::Storage {
                path: path.clone(),
                source,
            })?;
        debug!(job_id = %job_id, path = %path.display(), bytes = bytes.len(), "artifact persisted");
        Ok(path)
    }

    /// Atomically persist a job descriptor, making the job visible to workers.
    pub async fn write_job_descriptor(
        &self,
        descriptor: &JobDescriptor,
    ) -> Result<(), PatrikaError> {
        let path = self.job_path(descriptor.job_id);
        let json = serde_json::to_vec_pretty(descriptor)
            .map_err(|e| PatrikaError::Internal(format!("descriptor serialisation: {e}")))?;
        atomic_write(&path, &json).await
    }

    // ── Worker side ──────────────────────────────────────────────────────

    /// Claim the oldest unclaimed job descriptor, if any.
    ///
    /// Returns `Ok(None)` when the queue is empty. Losing a claim race to
    /// another worker is not an error; the scan continues with the next
    /// candidate.
    pub async fn claim_next_job(&self) -> Result<Option<ClaimedJob>, PatrikaError> {
        let jobs_dir = self.root.join(JOBS_DIR);
        let mut candidates: Vec<(SystemTime, PathBuf)> = Vec::new();

        let mut entries = tokio::fs::read_dir(&jobs_dir)
            .await
            .map_err(|source| PatrikaError::Storage {
                path: jobs_dir.clone(),
                source,
            })?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| PatrikaError::Storage {
                path: jobs_dir.clone(),
                source,
            })?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let modified = entry
                .metadata()
                .await
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            candidates.push((modified, path));
        }

        // Oldest first, approximating FIFO pickup.
        candidates.sort_by_key(|(t, _)| *t);

        for (_, path) in candidates {
            let claim_path = claim_path_for(&path);
            match tokio::fs::rename(&path, &claim_path).await {
                Ok(()) => {}
                // Another worker won the rename race.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(source) => return Err(PatrikaError::Storage { path, source }),
            }

            let bytes = tokio::fs::read(&claim_path).await.map_err(|source| {
                PatrikaError::Storage {
                    path: claim_path.clone(),
                    source,
                }
            })?;
            let descriptor: JobDescriptor =
                serde_json::from_slice(&bytes).map_err(|e| PatrikaError::CorruptDescriptor {
                    path: claim_path.clone(),
                    detail: e.to_string(),
                })?;

            debug!(job_id = %descriptor.job_id, "job claimed");
            return Ok(Some(ClaimedJob {
                descriptor,
                claim_path,
            }));
        }

        Ok(None)
    }

    /// Remove a claimed descriptor once its result has been published.
    pub async fn finish_job(&self, claimed: &ClaimedJob) -> Result<(), PatrikaError> {
        tokio::fs::remove_file(&claimed.claim_path)
            .await
            .map_err(|source| PatrikaError::Storage {
                path: claimed.claim_path.clone(),
                source,
            })
    }

    /// Atomically publish the terminal result for a job.
    ///
    /// This write is the job's completion signal; after the rename the
    /// poller observes the full document or nothing.
    pub async fn publish_result(
        &self,
        job_id: JobId,
        result: &ResultDescriptor,
    ) -> Result<(), PatrikaError> {
        let path = self.result_path(job_id);
        let json = serde_json::to_vec_pretty(result)
            .map_err(|e| PatrikaError::Internal(format!("result serialisation: {e}")))?;
        atomic_write(&path, &json).await?;
        debug!(job_id = %job_id, failure = result.is_failure(), "result published");
        Ok(())
    }

    // ── Poller side ──────────────────────────────────────────────────────

    /// Read the result descriptor, or `None` while the job is outstanding.
    pub async fn read_result(
        &self,
        job_id: JobId,
    ) -> Result<Option<ResultDescriptor>, PatrikaError> {
        let path = self.result_path(job_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(PatrikaError::Storage { path, source }),
        };
        let result =
            serde_json::from_slice(&bytes).map_err(|e| PatrikaError::CorruptDescriptor {
                path,
                detail: e.to_string(),
            })?;
        Ok(Some(result))
    }

    /// Delete everything a job left behind: result, artifact(s), descriptor.
    ///
    /// Used by the cleanup-on-read policy. Missing files are fine — cleanup
    /// is idempotent.
    pub async fn remove_job_data(&self, job_id: JobId) -> Result<(), PatrikaError> {
        remove_if_exists(&self.result_path(job_id)).await?;
        remove_if_exists(&self.job_path(job_id)).await?;
        remove_if_exists(&claim_path_for(&self.job_path(job_id))).await?;

        let uploads = self.root.join(UPLOADS_DIR);
        let prefix = format!("{job_id}_");
        for path in list_dir(&uploads).await? {
            if path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&prefix))
            {
                remove_if_exists(&path).await?;
            }
        }
        Ok(())
    }

    // ── Retention ────────────────────────────────────────────────────────

    /// Delete files older than `max_age` across all three directories.
    ///
    /// Reconciles dangling artifacts from half-failed submissions and jobs
    /// stranded in the claimed state by a crashed worker. Returns the number
    /// of files removed.
    pub async fn sweep(&self, max_age: Duration) -> Result<usize, PatrikaError> {
        let cutoff = SystemTime::now()
            .checked_sub(max_age)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let mut removed = 0usize;

        for dir in [UPLOADS_DIR, JOBS_DIR, RESULTS_DIR] {
            let dir_path = self.root.join(dir);
            for path in list_dir(&dir_path).await? {
                let modified = match tokio::fs::metadata(&path).await.and_then(|m| m.modified()) {
                    Ok(t) => t,
                    // File vanished mid-sweep; nothing to reclaim.
                    Err(_) => continue,
                };
                if modified < cutoff {
                    match tokio::fs::remove_file(&path).await {
                        Ok(()) => {
                            removed += 1;
                            debug!(path = %path.display(), "swept stale file");
                        }
                        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                        Err(e) => {
                            warn!(path = %path.display(), error = %e, "sweep could not remove file");
                        }
                    }
                }
            }
        }
        Ok(removed)
    }
}

/// `jobs/<id>.json` → `jobs/<id>.json.claimed`.
fn claim_path_for(job_path: &Path) -> PathBuf {
    let mut name = job_path.as_os_str().to_os_string();
    name.push(CLAIM_SUFFIX);
    PathBuf::from(name)
}

/// Write-to-temp-then-rename within the target directory.
///
/// The temp sibling carries a `.tmp` extension so directory scans (which
/// filter on `.json`) never pick up an in-progress write.
async fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), PatrikaError> {
    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, bytes)
        .await
        .map_err(|source| PatrikaError::Storage {
            path: tmp_path.clone(),
            source,
        })?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|source| PatrikaError::Storage {
            path: path.to_path_buf(),
            source,
        })
}

async fn remove_if_exists(path: &Path) -> Result<(), PatrikaError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(PatrikaError::Storage {
            path: path.to_path_buf(),
            source,
        }),
    }
}

async fn list_dir(dir: &Path) -> Result<Vec<PathBuf>, PatrikaError> {
    let mut paths = Vec::new();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|source| PatrikaError::Storage {
            path: dir.to_path_buf(),
            source,
        })?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|source| PatrikaError::Storage {
            path: dir.to_path_buf(),
            source,
        })?
    {
        paths.push(entry.path());
    }
    Ok(paths)
}
