//! beepboop configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::generate::GeneratorError;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Text model (sentence writer and image describer)
    pub text: TextConfig,

    /// Image model
    pub image: ImageConfig,

    /// Game defaults
    pub game: GameConfig,
}

impl Config {
    /// Validate configuration before playing
    ///
    /// The text model is required; the image model may be missing since
    /// rendering degrades to placeholder images.
    pub fn validate(&self) -> Result<()> {
        if std::env::var(&self.text.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "Text model API key not found. Set the {} environment variable.",
                self.text.api_key_env
            ));
        }
        if std::env::var(&self.image.api_key_env).is_err() {
            tracing::warn!(
                "{} is not set, image generation will use placeholder images",
                self.image.api_key_env
            );
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .beepboop.yml
        let local_config = PathBuf::from(".beepboop.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/beepboop/beepboop.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("beepboop").join("beepboop.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

fn read_api_key(env_var: &str) -> Result<String, GeneratorError> {
    std::env::var(env_var)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| GeneratorError::MissingApiKey(env_var.to_string()))
}

/// Text model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// Provider name (currently only "anthropic" supported)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per reply
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl TextConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String, GeneratorError> {
        read_api_key(&self.api_key_env)
    }
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-opus-4-5-20251101".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 150,
            timeout_ms: 120_000,
        }
    }
}

/// Image model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Provider name (currently only "gemini" supported)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl ImageConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String, GeneratorError> {
        read_api_key(&self.api_key_env)
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.5-flash-image".to_string(),
            api_key_env: "GOOGLE_API_KEY".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            timeout_ms: 120_000,
        }
    }
}

/// Game defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Directory new games are written to
    #[serde(rename = "output-dir")]
    pub output_dir: PathBuf,

    /// Rounds to play per invocation when --rounds is not given
    pub rounds: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            rounds: 1,
        }
    }
}
