//! Anthropic Messages API describer
//!
//! Implements [`TextDescriber`] on top of the Messages API: images are sent
//! inline as base64 blocks next to the describe prompt.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{
    DEFAULT_DESCRIBE_PROMPT, GeneratorError, INITIAL_SENTENCE_PROMPT, TextDescriber, clean_sentence, send_with_retry,
};
use crate::config::TextConfig;

/// Media type for an image file, by extension
pub(crate) fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

/// Anthropic Claude describer
pub struct AnthropicDescriber {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
}

impl AnthropicDescriber {
    /// Create a new describer from configuration
    ///
    /// Reads the API key from the environment variable named in config.
    pub fn from_config(config: &TextConfig) -> Result<Self, GeneratorError> {
        debug!(model = %config.model, "AnthropicDescriber::from_config: called");
        let api_key = config.get_api_key()?;

        let timeout = Duration::from_millis(config.timeout_ms);
        let http = Client::builder().timeout(timeout).build().map_err(GeneratorError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.clone(),
            http,
            max_tokens: config.max_tokens,
        })
    }

    /// Build the request body for a single user turn
    fn build_request_body(&self, content: serde_json::Value) -> serde_json::Value {
        debug!(%self.model, %self.max_tokens, "build_request_body: called");
        serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [{
                "role": "user",
                "content": content,
            }],
        })
    }

    /// Build the content blocks for describing an image
    fn describe_content(image_bytes: &[u8], media_type: &str, prompt: &str) -> serde_json::Value {
        serde_json::json!([
            {
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": media_type,
                    "data": BASE64_STANDARD.encode(image_bytes),
                },
            },
            {
                "type": "text",
                "text": prompt,
            },
        ])
    }

    /// Send a single-turn request and return the reply text, if any
    async fn complete(&self, body: serde_json::Value) -> Result<Option<String>, GeneratorError> {
        debug!(%self.model, "complete: called");
        let url = format!("{}/v1/messages", self.base_url);

        let response = send_with_retry("anthropic", || {
            self.http
                .post(&url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01")
                .header("content-type", "application/json")
                .json(&body)
        })
        .await?;

        let api_response: AnthropicResponse = response.json().await?;
        Ok(parse_response(api_response))
    }
}

/// Concatenate the text blocks of a reply
fn parse_response(api_response: AnthropicResponse) -> Option<String> {
    debug!(?api_response.stop_reason, "parse_response: called");
    let text: String = api_response
        .content
        .into_iter()
        .filter_map(|block| match block {
            AnthropicContentBlock::Text { text } => Some(text),
            AnthropicContentBlock::Other => None,
        })
        .collect();
    if text.is_empty() { None } else { Some(text) }
}

#[async_trait]
impl TextDescriber for AnthropicDescriber {
    async fn describe(&self, image: &Path, prompt: Option<&str>) -> Result<String, GeneratorError> {
        debug!(image = %image.display(), has_prompt = prompt.is_some(), "describe: called");
        let image_bytes = tokio::fs::read(image).await?;
        let content = Self::describe_content(
            &image_bytes,
            media_type_for(image),
            prompt.unwrap_or(DEFAULT_DESCRIBE_PROMPT),
        );
        clean_sentence(self.complete(self.build_request_body(content)).await?)
    }

    async fn initial_sentence(&self) -> Result<String, GeneratorError> {
        debug!("initial_sentence: called");
        let content = serde_json::json!(INITIAL_SENTENCE_PROMPT);
        clean_sentence(self.complete(self.build_request_body(content)).await?)
    }
}

// Anthropic API response types

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum AnthropicContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}
