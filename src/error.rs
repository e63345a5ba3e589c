//! Error types for the patrika library.
//!
//! Two failure modes exist and they must never be conflated:
//!
//! * [`PatrikaError`] — surfaced to the caller at the point of occurrence.
//!   Submission-time input errors map to HTTP 400, storage errors to 500.
//!
//! * Job-terminal failures — anything that goes wrong *after* a job has been
//!   accepted (rasterisation, model call, reply parsing). These are never
//!   propagated as process errors; the worker converts them into an error
//!   envelope inside the published [`crate::article::ResultDescriptor`] so a
//!   polling client always reaches a terminal state. `PatrikaError`'s
//!   `Display` output is exactly what lands in that envelope.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the patrika library.
#[derive(Debug, Error)]
pub enum PatrikaError {
    // ── Submission input errors ───────────────────────────────────────────
    /// The upload carried no filename.
    #[error("No selected file")]
    EmptyFilename,

    /// The filename extension is not on the allow-list.
    #[error("File type '.{ext}' is not allowed (accepted: {allowed})")]
    DisallowedExtension { ext: String, allowed: String },

    /// The upload exceeds the configured byte ceiling.
    #[error("Upload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    /// The filename sanitised down to nothing usable.
    #[error("Filename '{original}' contains no usable characters")]
    UnusableFilename { original: String },

    // ── Storage errors ────────────────────────────────────────────────────
    /// A read or write against the shared storage root failed.
    #[error("Storage operation failed at '{path}': {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A persisted descriptor could not be decoded.
    #[error("Corrupt descriptor at '{path}': {detail}")]
    CorruptDescriptor { path: PathBuf, detail: String },

    // ── Worker pipeline errors (job-terminal) ─────────────────────────────
    /// The uploaded document could not be opened as a PDF.
    #[error("Document '{path}' could not be opened: {detail}")]
    CorruptDocument { path: PathBuf, detail: String },

    /// pdfium returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The uploaded raster image could not be decoded or re-encoded.
    #[error("Image processing failed: {detail}")]
    ImageFailed { detail: String },

    /// The analysis provider returned a non-retryable error, or every retry
    /// was exhausted.
    #[error("Analysis failed after {attempts} attempt(s): {detail}")]
    AnalysisFailed { attempts: u32, detail: String },

    /// A single analysis attempt exceeded the configured deadline.
    #[error("Analysis call timed out after {secs}s")]
    AnalysisTimeout { secs: u64 },

    /// The model reply was not a parseable JSON article array.
    #[error("Model reply was not valid article JSON: {detail}")]
    MalformedReply { detail: String },

    /// The configured provider is not initialised (missing API key etc.).
    #[error("Analysis provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PatrikaError {
    /// True for errors a submitting client caused (HTTP 400 class).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PatrikaError::EmptyFilename
                | PatrikaError::DisallowedExtension { .. }
                | PatrikaError::PayloadTooLarge { .. }
                | PatrikaError::UnusableFilename { .. }
        )
    }
}
