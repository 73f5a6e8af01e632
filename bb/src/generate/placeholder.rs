//! Placeholder images for when the image backend is unavailable
//!
//! A placeholder is a light-gray square with the prompt written on it, so the
//! describer can still read the sentence back and the game carries on. Output
//! depends only on the prompt: the same sentence always yields the same bytes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ab_glyph::{FontRef, PxScale};
use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use tracing::{debug, warn};

use super::{GeneratorError, ImageRenderer};

/// Width and height of placeholder images in pixels
pub const PLACEHOLDER_SIZE: u32 = 512;

const BACKGROUND: Rgb<u8> = Rgb([240, 240, 240]);
const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const FONT_BYTES: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
const FONT_SCALE: f32 = 20.0;
const WRAP_WIDTH: usize = 40;
const MAX_LINES: usize = 5;
const TEXT_TOP: i32 = 200;
const LINE_HEIGHT: i32 = 30;

/// Greedy word wrap at `width` characters; words longer than a line are split
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();
        for chunk in chars.chunks(width) {
            let piece: String = chunk.iter().collect();
            let current_len = current.chars().count();
            if current_len == 0 {
                current = piece;
            } else if current_len + 1 + chunk.len() <= width {
                current.push(' ');
                current.push_str(&piece);
            } else {
                lines.push(std::mem::replace(&mut current, piece));
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Draw the placeholder for `prompt` in memory
fn draw_placeholder(prompt: &str) -> Result<RgbImage, GeneratorError> {
    let font = FontRef::try_from_slice(FONT_BYTES).map_err(|e| GeneratorError::Font(e.to_string()))?;
    let scale = PxScale::from(FONT_SCALE);
    let mut img = RgbImage::from_pixel(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, BACKGROUND);

    let mut y = TEXT_TOP;
    for line in wrap_text(prompt, WRAP_WIDTH).iter().take(MAX_LINES) {
        let (width, _) = text_size(scale, &font, line);
        let x = ((PLACEHOLDER_SIZE as i32 - width as i32) / 2).max(0);
        draw_text_mut(&mut img, TEXT_COLOR, x, y, scale, &font, line);
        y += LINE_HEIGHT;
    }

    Ok(img)
}

/// Write the placeholder image for `prompt` as a PNG at `target`
pub fn render_placeholder(prompt: &str, target: &Path) -> Result<PathBuf, GeneratorError> {
    debug!(target = %target.display(), "render_placeholder: called");
    if let Some(parent) = target.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    draw_placeholder(prompt)?.save_with_format(target, ImageFormat::Png)?;
    Ok(target.to_path_buf())
}

/// Renderer that only ever produces placeholders
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderRenderer;

#[async_trait]
impl ImageRenderer for PlaceholderRenderer {
    async fn render(&self, prompt: &str, _style: Option<&str>, target: &Path) -> Result<PathBuf, GeneratorError> {
        render_placeholder(prompt, target)
    }
}

/// Wraps an image backend and substitutes a placeholder whenever it fails
///
/// An error from this renderer means the placeholder itself could not be written.
pub struct PlaceholderFallback {
    inner: Arc<dyn ImageRenderer>,
}

impl PlaceholderFallback {
    pub fn new(inner: Arc<dyn ImageRenderer>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ImageRenderer for PlaceholderFallback {
    async fn render(&self, prompt: &str, style: Option<&str>, target: &Path) -> Result<PathBuf, GeneratorError> {
        match self.inner.render(prompt, style, target).await {
            Ok(path) if path.exists() => Ok(path),
            Ok(path) => {
                warn!(path = %path.display(), "Image backend returned a missing file, creating placeholder image");
                render_placeholder(prompt, target)
            }
            Err(e) => {
                warn!(error = %e, "Image backend failed, creating placeholder image");
                render_placeholder(prompt, target)
            }
        }
    }
}
