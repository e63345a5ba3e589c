//! Job identity and the persisted job descriptor.
//!
//! A [`JobId`] identifies one upload through its entire lifecycle: artifact,
//! job descriptor and result descriptor are all keyed by it. Ids are random
//! v4 UUIDs generated at submission time and never reused, so two concurrent
//! submissions can never collide on a storage path.

use crate::error::PatrikaError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque unique token identifying one submitted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        JobId(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Hyphenated lowercase; this rendering is part of the on-disk
        // naming protocol and must stay stable.
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(JobId)
    }
}

/// Persisted record linking a job to its uploaded artifact.
///
/// Written once, atomically, to `jobs/<job_id>.json` immediately after the
/// artifact lands in `uploads/`. Consumed (claimed, then deleted) by the
/// worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub job_id: JobId,
    /// Filename exactly as the client sent it, for display and logging.
    pub original_filename: String,
    /// Absolute or root-relative path of the persisted artifact.
    pub filepath: PathBuf,
}

// ── Filename sanitisation ────────────────────────────────────────────────

static RE_UNSAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.\-]+").unwrap());
static RE_COLLAPSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"_{2,}").unwrap());

/// Reduce a client-supplied filename to a safe storage component.
///
/// Keeps ASCII alphanumerics, `_`, `.` and `-`; everything else (path
/// separators, spaces, Devanagari titles, control characters) collapses to a
/// single underscore. Leading dots are stripped so a crafted name can never
/// become a hidden file or a `..` traversal component.
pub fn sanitize_filename(original: &str) -> Result<String, PatrikaError> {
    // Drop any directory components the client smuggled in.
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original);

    let replaced = RE_UNSAFE.replace_all(base, "_");
    let collapsed = RE_COLLAPSE.replace_all(&replaced, "_");
    let cleaned = collapsed.trim_matches(['_', '.']).to_string();

    if cleaned.is_empty() {
        return Err(PatrikaError::UnusableFilename {
            original: original.to_string(),
        });
    }
    Ok(cleaned)
}

/// Lowercased extension of a filename, if any.
pub fn extension_of(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_round_trips_through_display() {
        let id = JobId::new();
        let parsed: JobId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn job_ids_are_unique() {
        assert_ne!(JobId::new(), JobId::new());
    }

    #[test]
    fn sanitize_keeps_simple_names() {
        assert_eq!(sanitize_filename("page1.jpg").unwrap(), "page1.jpg");
        assert_eq!(sanitize_filename("edition-2024_03.pdf").unwrap(), "edition-2024_03.pdf");
    }

    #[test]
    fn sanitize_strips_path_components() {
        assert_eq!(sanitize_filename("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_filename(r"C:\news\page.pdf").unwrap(), "page.pdf");
    }

    #[test]
    fn sanitize_collapses_unsafe_runs() {
        assert_eq!(sanitize_filename("दैनिक समाचार.pdf").unwrap(), "pdf");
        assert_eq!(sanitize_filename("front  page (1).png").unwrap(), "front_page_1_.png");
    }

    #[test]
    fn sanitize_rejects_unusable() {
        assert!(sanitize_filename("....").is_err());
        assert!(sanitize_filename("///").is_err());
    }

    #[test]
    fn extension_lowercased() {
        assert_eq!(extension_of("Page.PDF").as_deref(), Some("pdf"));
        assert_eq!(extension_of("noext"), None);
        assert_eq!(extension_of("trailing."), None);
    }

    #[test]
    fn descriptor_serde_round_trip() {
        let d = JobDescriptor {
            job_id: JobId::new(),
            original_filename: "अख़बार.pdf".into(),
            filepath: PathBuf::from("uploads/x_pdf"),
        };
        let json = serde_json::to_string(&d).unwrap();
        let back: JobDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back.job_id, d.job_id);
        assert_eq!(back.original_filename, d.original_filename);
    }
}
