//! Gemini image renderer
//!
//! Calls the `generateContent` endpoint of an image-capable Gemini model and
//! writes the first inline image of the reply to disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use image::ImageFormat;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use super::{GeneratorError, ImageRenderer, send_with_retry};
use crate::config::ImageConfig;

/// Wrap the sentence (and style, if any) in the tags the image prompt expects
pub(crate) fn format_prompt(prompt: &str, style: Option<&str>) -> String {
    match style {
        Some(style) => format!("<style>{}</style><prompt>{}</prompt>", style, prompt),
        None => format!("<prompt>{}</prompt>", prompt),
    }
}

/// Gemini image generation client
pub struct GeminiRenderer {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
}

impl GeminiRenderer {
    /// Create a new renderer from configuration
    pub fn from_config(config: &ImageConfig) -> Result<Self, GeneratorError> {
        debug!(model = %config.model, "GeminiRenderer::from_config: called");
        let api_key = config.get_api_key()?;

        let timeout = Duration::from_millis(config.timeout_ms);
        let http = Client::builder().timeout(timeout).build().map_err(GeneratorError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.clone(),
            http,
        })
    }

    fn build_request_body(&self, prompt: &str, style: Option<&str>) -> serde_json::Value {
        debug!(%self.model, "build_request_body: called");
        serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": format_prompt(prompt, style) }],
            }],
        })
    }

    async fn generate(&self, body: &serde_json::Value) -> Result<GenerateContentResponse, GeneratorError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);

        let response = send_with_retry("gemini", || {
            self.http
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .header("content-type", "application/json")
                .json(body)
        })
        .await?;

        Ok(response.json().await?)
    }
}

/// Decode the first inline image in a reply
fn extract_image(response: GenerateContentResponse) -> Result<Vec<u8>, GeneratorError> {
    let inline = response
        .candidates
        .into_iter()
        .flat_map(|c| c.content.map(|content| content.parts).unwrap_or_default())
        .find_map(|part| part.inline_data)
        .ok_or_else(|| GeneratorError::InvalidResponse("No image in API response".to_string()))?;

    debug!(mime_type = %inline.mime_type, "extract_image: found inline image");
    BASE64_STANDARD
        .decode(inline.data.as_bytes())
        .map_err(|e| GeneratorError::InvalidResponse(format!("Invalid base64 image data: {}", e)))
}

/// Re-encode the returned image as PNG at `target`, whatever format it came in
fn save_as_png(bytes: &[u8], target: &Path) -> Result<(), GeneratorError> {
    let img = image::load_from_memory(bytes)?;
    img.save_with_format(target, ImageFormat::Png)?;
    Ok(())
}

#[async_trait]
impl ImageRenderer for GeminiRenderer {
    async fn render(&self, prompt: &str, style: Option<&str>, target: &Path) -> Result<PathBuf, GeneratorError> {
        debug!(target = %target.display(), has_style = style.is_some(), "render: called");
        let body = self.build_request_body(prompt, style);
        let bytes = extract_image(self.generate(&body).await?)?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        save_as_png(&bytes, target)?;
        info!(target = %target.display(), bytes = bytes.len(), "render: image saved");
        Ok(target.to_path_buf())
    }
}

// Gemini API response types

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(rename = "inlineData")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}
