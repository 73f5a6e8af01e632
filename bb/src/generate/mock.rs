//! Scripted generators for unit tests

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::debug;

use super::{GeneratorError, ImageRenderer, TextDescriber, render_placeholder};

/// Describer that replays canned sentences and records what it was asked
pub struct MockDescriber {
    sentences: Mutex<VecDeque<Result<String, GeneratorError>>>,
    calls: Mutex<Vec<(PathBuf, Option<String>)>>,
}

impl MockDescriber {
    pub fn new(sentences: Vec<Result<String, GeneratorError>>) -> Self {
        debug!(sentence_count = %sentences.len(), "MockDescriber::new: called");
        Self {
            sentences: Mutex::new(sentences.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(sentences: &[&str]) -> Self {
        Self::new(sentences.iter().map(|s| Ok(s.to_string())).collect())
    }

    /// (image, prompt) pairs passed to `describe`, in call order
    pub fn calls(&self) -> Vec<(PathBuf, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }

    fn next(&self) -> Result<String, GeneratorError> {
        self.sentences
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GeneratorError::InvalidResponse("No more mock sentences".to_string())))
    }
}

#[async_trait]
impl TextDescriber for MockDescriber {
    async fn describe(&self, image: &Path, prompt: Option<&str>) -> Result<String, GeneratorError> {
        self.calls
            .lock()
            .unwrap()
            .push((image.to_path_buf(), prompt.map(str::to_string)));
        self.next()
    }

    async fn initial_sentence(&self) -> Result<String, GeneratorError> {
        self.next()
    }
}

/// Renderer that writes placeholder files and records its inputs
#[derive(Default)]
pub struct MockRenderer {
    calls: Mutex<Vec<(String, Option<String>)>>,
    count: AtomicUsize,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// (prompt, style) pairs passed to `render`, in call order
    pub fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageRenderer for MockRenderer {
    async fn render(&self, prompt: &str, style: Option<&str>, target: &Path) -> Result<PathBuf, GeneratorError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), style.map(str::to_string)));
        render_placeholder(prompt, target)
    }
}

/// Renderer whose backend is always down
pub struct FailingRenderer;

#[async_trait]
impl ImageRenderer for FailingRenderer {
    async fn render(&self, _prompt: &str, _style: Option<&str>, _target: &Path) -> Result<PathBuf, GeneratorError> {
        Err(GeneratorError::ApiError {
            status: 503,
            message: "backend unavailable".to_string(),
        })
    }
}
