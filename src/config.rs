//! Process-wide configuration.
//!
//! Everything both processes need — the shared storage root, upload limits,
//! worker cadence and analysis knobs — lives in one [`AppConfig`] built via
//! its [`AppConfigBuilder`] at startup and passed by reference to each
//! component. No ambient global state; every component takes its knobs
//! explicitly, so tests can run fully isolated stores and providers.

use crate::error::PatrikaError;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default upload ceiling: 16 MiB, a full broadsheet scan fits comfortably.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Configuration shared by the web and worker processes.
#[derive(Clone)]
pub struct AppConfig {
    /// Root of the shared storage; `uploads/`, `jobs/` and `results/` are
    /// created beneath it. Both processes must see the same filesystem here.
    pub data_root: PathBuf,

    /// Lowercased filename extensions accepted at submission.
    /// Default: pdf, png, jpg, jpeg.
    pub allowed_extensions: Vec<String>,

    /// Hard byte ceiling for one upload. Default: 16 MiB.
    pub max_upload_bytes: usize,

    /// Delete the result, artifact and any stale descriptor after a client
    /// reads a terminal result. Default: false.
    ///
    /// Off by default because polling is expected to be repeated: the first
    /// fetch that races a page refresh would otherwise make the job vanish.
    pub cleanup_on_read: bool,

    /// Worker sleep between empty scans of `jobs/`. Default: 1s.
    pub poll_interval: Duration,

    /// Age beyond which artifacts, descriptors and results are reclaimed by
    /// the retention sweep. Default: 24h.
    pub retention_max_age: Duration,

    /// How often the worker loop runs the retention sweep. Default: 1h.
    pub sweep_interval: Duration,

    /// Maximum rendered page dimension (width or height) in pixels.
    /// Default: 2000.
    ///
    /// A newspaper broadsheet rendered unbounded could exceed the vision
    /// API's upload limit; capping the longest edge keeps memory and request
    /// size predictable.
    pub max_rendered_pixels: u32,

    /// Model identifier, e.g. "gpt-4.1-nano". If None, uses provider default.
    pub model: Option<String>,

    /// Provider name (e.g. "openai", "gemini"). If None along with
    /// `provider`, the factory auto-detects from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1 — transcription wants determinism.
    pub temperature: f32,

    /// Maximum tokens per analysis reply. Default: 8192; a dense page with
    /// many articles produces far more output than a typical OCR task.
    pub max_tokens: usize,

    /// Retry attempts after a failed analysis call. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubling per attempt.
    /// Default: 500.
    pub retry_backoff_ms: u64,

    /// Hard deadline per analysis attempt in seconds. Default: 120.
    ///
    /// A timed-out attempt counts against `max_retries`; exhaustion
    /// converts into a failure result, never a stalled worker.
    pub analysis_timeout_secs: u64,

    /// Custom instruction template. If None, uses the built-in default.
    pub instruction_template: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            allowed_extensions: ["pdf", "png", "jpg", "jpeg"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            cleanup_on_read: false,
            poll_interval: Duration::from_secs(1),
            retention_max_age: Duration::from_secs(24 * 60 * 60),
            sweep_interval: Duration::from_secs(60 * 60),
            max_rendered_pixels: 2000,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 8192,
            max_retries: 3,
            retry_backoff_ms: 500,
            analysis_timeout_secs: 120,
            instruction_template: None,
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("data_root", &self.data_root)
            .field("allowed_extensions", &self.allowed_extensions)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("cleanup_on_read", &self.cleanup_on_read)
            .field("poll_interval", &self.poll_interval)
            .field("retention_max_age", &self.retention_max_age)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("analysis_timeout_secs", &self.analysis_timeout_secs)
            .finish()
    }
}

impl AppConfig {
    /// Create a new builder for `AppConfig`.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder {
            config: Self::default(),
        }
    }

    /// The allow-list rendered for error messages: "pdf, png, jpg, jpeg".
    pub fn allowed_extensions_display(&self) -> String {
        self.allowed_extensions.join(", ")
    }
}

/// Builder for [`AppConfig`].
#[derive(Debug)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    pub fn data_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.data_root = root.into();
        self
    }

    pub fn allowed_extensions<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.allowed_extensions = exts
            .into_iter()
            .map(|e| e.into().to_ascii_lowercase())
            .collect();
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn cleanup_on_read(mut self, v: bool) -> Self {
        self.config.cleanup_on_read = v;
        self
    }

    pub fn poll_interval(mut self, d: Duration) -> Self {
        self.config.poll_interval = d;
        self
    }

    pub fn retention_max_age(mut self, d: Duration) -> Self {
        self.config.retention_max_age = d;
        self
    }

    pub fn sweep_interval(mut self, d: Duration) -> Self {
        self.config.sweep_interval = d;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn analysis_timeout_secs(mut self, secs: u64) -> Self {
        self.config.analysis_timeout_secs = secs;
        self
    }

    pub fn instruction_template(mut self, template: impl Into<String>) -> Self {
        self.config.instruction_template = Some(template.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AppConfig, PatrikaError> {
        let c = &self.config;
        if c.allowed_extensions.is_empty() {
            return Err(PatrikaError::InvalidConfig(
                "extension allow-list must not be empty".into(),
            ));
        }
        if c.max_upload_bytes == 0 {
            return Err(PatrikaError::InvalidConfig(
                "max_upload_bytes must be ≥ 1".into(),
            ));
        }
        if c.poll_interval < Duration::from_millis(10) {
            return Err(PatrikaError::InvalidConfig(
                "poll_interval below 10ms would busy-spin the jobs directory".into(),
            ));
        }
        if c.analysis_timeout_secs == 0 {
            return Err(PatrikaError::InvalidConfig(
                "analysis_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let c = AppConfig::builder().build().unwrap();
        assert_eq!(c.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert!(!c.cleanup_on_read);
        assert_eq!(c.allowed_extensions, vec!["pdf", "png", "jpg", "jpeg"]);
    }

    #[test]
    fn extensions_lowercased() {
        let c = AppConfig::builder()
            .allowed_extensions(["PDF", "Png"])
            .build()
            .unwrap();
        assert_eq!(c.allowed_extensions, vec!["pdf", "png"]);
    }

    #[test]
    fn empty_allow_list_rejected() {
        let err = AppConfig::builder()
            .allowed_extensions(Vec::<String>::new())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("allow-list"));
    }

    #[test]
    fn zero_upload_ceiling_rejected() {
        assert!(AppConfig::builder().max_upload_bytes(0).build().is_err());
    }

    #[test]
    fn busy_spin_poll_interval_rejected() {
        assert!(AppConfig::builder()
            .poll_interval(Duration::from_millis(1))
            .build()
            .is_err());
    }

    #[test]
    fn temperature_clamped() {
        let c = AppConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }
}
