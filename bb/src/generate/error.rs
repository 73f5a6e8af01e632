//! Content generator error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while generating text or images
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("API key not found. Set the {0} environment variable.")]
    MissingApiKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Font error: {0}")]
    Font(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GeneratorError {
    /// Check if this is a rate limit error
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, GeneratorError::RateLimited { .. })
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            GeneratorError::RateLimited { .. } => true,
            GeneratorError::ApiError { status, .. } => *status >= 500,
            GeneratorError::Network(_) => true,
            GeneratorError::InvalidResponse(_) => false,
            GeneratorError::MissingApiKey(_) => false,
            GeneratorError::Io(_) => false,
            GeneratorError::Image(_) => false,
            GeneratorError::Font(_) => false,
            GeneratorError::Json(_) => false,
        }
    }
}
