//! The analysis seam: an opaque "images in, text out" service.
//!
//! [`AnalysisService`] is the only trait boundary in the worker. The real
//! implementation wraps an `edgequake-llm` provider; tests substitute a
//! canned one. Retry and timeout discipline live *outside* the trait in
//! [`analyze_with_retry`], so failure containment is exercised the same way
//! against mocks and live providers.
//!
//! ## Retry strategy
//!
//! Vision APIs fail transiently (429, 5xx, network blips) often enough that
//! a single attempt is unacceptable for an unattended worker. Exponential
//! backoff (`retry_backoff_ms * 2^attempt`) avoids hammering a recovering
//! endpoint. Every attempt runs under a hard deadline so a wedged call can
//! never stall the queue.

use crate::config::AppConfig;
use crate::error::PatrikaError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Model used when a provider is resolved without an explicit model choice.
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Opaque analysis capability: ordered page images plus an instruction
/// template in, the model's raw textual reply out.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze(
        &self,
        images: &[ImageData],
        instruction: &str,
    ) -> Result<String, PatrikaError>;
}

/// Production implementation backed by an `edgequake-llm` vision provider.
pub struct VisionAnalysis {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
}

impl VisionAnalysis {
    /// Resolve a provider from the configuration, most-specific first:
    /// a pre-built provider, then a named provider + model, then full
    /// auto-detection from environment API keys.
    pub fn from_config(config: &AppConfig) -> Result<Self, PatrikaError> {
        let provider = resolve_provider(config)?;
        Ok(VisionAnalysis {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl AnalysisService for VisionAnalysis {
    async fn analyze(
        &self,
        images: &[ImageData],
        instruction: &str,
    ) -> Result<String, PatrikaError> {
        // The empty user text is intentional: the API requires a user turn,
        // but the images carry all the content.
        let messages = vec![
            ChatMessage::system(instruction),
            ChatMessage::user_with_images("", images.to_vec()),
        ];
        let options = CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| PatrikaError::AnalysisFailed {
                attempts: 1,
                detail: e.to_string(),
            })?;

        debug!(
            "analysis reply: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

fn resolve_provider(config: &AppConfig) -> Result<Arc<dyn LLMProvider>, PatrikaError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return ProviderFactory::create_llm_provider(name, model).map_err(|e| {
            PatrikaError::ProviderNotConfigured {
                provider: name.clone(),
                hint: e.to_string(),
            }
        });
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| PatrikaError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No vision provider could be auto-detected from the environment.\n\
                 Set GEMINI_API_KEY, OPENAI_API_KEY or ANTHROPIC_API_KEY, or pass --provider.\n\
                 Error: {e}"
            ),
        })?;
    Ok(llm_provider)
}

/// Drive the analysis call with per-attempt timeout and bounded retries.
///
/// Returns the raw reply on the first success; otherwise the last error,
/// wrapped with the attempt count. Never blocks longer than
/// `(max_retries + 1) * analysis_timeout_secs` plus backoff.
pub async fn analyze_with_retry(
    service: &dyn AnalysisService,
    images: &[ImageData],
    instruction: &str,
    config: &AppConfig,
) -> Result<String, PatrikaError> {
    let deadline = Duration::from_secs(config.analysis_timeout_secs);
    let mut last_err = String::new();

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "analysis retry {}/{} after {}ms: {}",
                attempt, config.max_retries, backoff, last_err
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match timeout(deadline, service.analyze(images, instruction)).await {
            Ok(Ok(reply)) => return Ok(reply),
            Ok(Err(e)) => last_err = e.to_string(),
            Err(_) => {
                last_err = PatrikaError::AnalysisTimeout {
                    secs: config.analysis_timeout_secs,
                }
                .to_string();
            }
        }
    }

    Err(PatrikaError::AnalysisFailed {
        attempts: config.max_retries + 1,
        detail: last_err,
    })
}
