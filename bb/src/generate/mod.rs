//! Content generators for the game
//!
//! Two capabilities drive every round: a [`TextDescriber`] that writes sentences
//! and an [`ImageRenderer`] that draws them. Both are injected into the game
//! session as trait objects so the round logic never talks to a network client
//! directly.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

mod anthropic;
mod error;
mod gemini;
mod placeholder;

#[cfg(test)]
pub mod mock;

pub use anthropic::AnthropicDescriber;
pub use error::GeneratorError;
pub use gemini::GeminiRenderer;
pub use placeholder::{PLACEHOLDER_SIZE, PlaceholderFallback, PlaceholderRenderer, render_placeholder};

use crate::config::{ImageConfig, TextConfig};

/// Prompt used when a session has no describe-prompt override
pub const DEFAULT_DESCRIBE_PROMPT: &str = "Describe what you see in this image in a single sentence. \
     Be concrete and specific. Just output the sentence, nothing else.";

/// Prompt used to open a game when no starting sentence is given
pub const INITIAL_SENTENCE_PROMPT: &str = "Generate a single creative, visual sentence that would be fun to illustrate. \
     It should be concrete and imaginative. Just output the sentence, nothing else.";

/// Writes sentences: describes images and opens new games
///
/// No fallback is expected from implementations: a failed description is
/// surfaced to the caller.
#[async_trait]
pub trait TextDescriber: Send + Sync {
    /// Describe the image at `image` in a single sentence
    async fn describe(&self, image: &Path, prompt: Option<&str>) -> Result<String, GeneratorError>;

    /// Produce an opening sentence for a new game
    async fn initial_sentence(&self) -> Result<String, GeneratorError>;
}

/// Draws sentences into image files
///
/// Implementations write the artifact at `target` and return the path of a file
/// that exists. Wrap backends in [`PlaceholderFallback`] to get the guarantee
/// that an artifact is produced even when the backend is down.
#[async_trait]
pub trait ImageRenderer: Send + Sync {
    async fn render(&self, prompt: &str, style: Option<&str>, target: &Path) -> Result<PathBuf, GeneratorError>;
}

/// The pair of generators a game session plays with
#[derive(Clone)]
pub struct Players {
    pub describer: Arc<dyn TextDescriber>,
    pub renderer: Arc<dyn ImageRenderer>,
}

impl Players {
    pub fn new(describer: Arc<dyn TextDescriber>, renderer: Arc<dyn ImageRenderer>) -> Self {
        Self { describer, renderer }
    }

    /// Build both generators from configuration
    ///
    /// The text backend is mandatory. The image backend degrades to placeholders
    /// when it cannot be constructed (usually a missing API key).
    pub fn from_config(text: &TextConfig, image: &ImageConfig) -> Result<Self, GeneratorError> {
        debug!(text_provider = %text.provider, image_provider = %image.provider, "Players::from_config: called");
        let describer = create_describer(text)?;
        let renderer: Arc<dyn ImageRenderer> = match create_renderer(image) {
            Ok(backend) => Arc::new(PlaceholderFallback::new(backend)),
            Err(e) => {
                warn!(error = %e, "Image backend unavailable, rendering placeholder images");
                Arc::new(PlaceholderRenderer)
            }
        };
        Ok(Self::new(describer, renderer))
    }
}

/// Create a text describer for the configured provider
///
/// Supports the "anthropic" provider.
pub fn create_describer(config: &TextConfig) -> Result<Arc<dyn TextDescriber>, GeneratorError> {
    debug!(provider = %config.provider, model = %config.model, "create_describer: called");
    match config.provider.as_str() {
        "anthropic" => Ok(Arc::new(AnthropicDescriber::from_config(config)?)),
        other => Err(GeneratorError::InvalidResponse(format!(
            "Unknown text provider: '{}'. Supported: anthropic",
            other
        ))),
    }
}

/// Create an image renderer backend for the configured provider
///
/// Supports the "gemini" provider.
pub fn create_renderer(config: &ImageConfig) -> Result<Arc<dyn ImageRenderer>, GeneratorError> {
    debug!(provider = %config.provider, model = %config.model, "create_renderer: called");
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiRenderer::from_config(config)?)),
        other => Err(GeneratorError::InvalidResponse(format!(
            "Unknown image provider: '{}'. Supported: gemini",
            other
        ))),
    }
}

/// Maximum number of retries for transient errors
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 500 | 502 | 503 | 504 | 529)
}

/// Send a request, retrying transient failures with exponential backoff
///
/// `build` is called once per attempt. A 429 is returned as
/// [`GeneratorError::RateLimited`] straight away; any other non-success status
/// that is not transient becomes [`GeneratorError::ApiError`].
pub(crate) async fn send_with_retry<F>(label: &str, build: F) -> Result<reqwest::Response, GeneratorError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    debug!(%label, "send_with_retry: called");
    let mut last_error = None;
    for attempt in 0..=MAX_RETRIES {
        if attempt > 0 {
            let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
            warn!(%label, attempt, backoff_ms = backoff, "Retrying after transient error");
            tokio::time::sleep(Duration::from_millis(backoff)).await;
        }

        let response = match build().send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(%label, attempt, error = %e, "send_with_retry: network error");
                last_error = Some(GeneratorError::Network(e));
                continue;
            }
        };

        let status = response.status().as_u16();

        if status == 429 {
            debug!(%label, "send_with_retry: rate limited (429)");
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(GeneratorError::RateLimited {
                retry_after: Duration::from_secs(retry_after),
            });
        }

        if is_retryable_status(status) && attempt < MAX_RETRIES {
            let text = response.text().await.unwrap_or_default();
            debug!(%label, attempt, status, "send_with_retry: retryable error");
            last_error = Some(GeneratorError::ApiError { status, message: text });
            continue;
        }

        if !response.status().is_success() {
            debug!(%label, %status, "send_with_retry: API error");
            let text = response.text().await.unwrap_or_default();
            return Err(GeneratorError::ApiError { status, message: text });
        }

        debug!(%label, "send_with_retry: success");
        return Ok(response);
    }

    Err(last_error.unwrap_or_else(|| GeneratorError::InvalidResponse("Max retries exceeded".to_string())))
}

/// Trim a model reply down to the sentence, rejecting empty replies
pub(crate) fn clean_sentence(raw: Option<String>) -> Result<String, GeneratorError> {
    let sentence = raw.map(|s| s.trim().to_string()).unwrap_or_default();
    if sentence.is_empty() {
        return Err(GeneratorError::InvalidResponse("Model returned an empty sentence".to_string()));
    }
    Ok(sentence)
}
