//! Game session: the round state machine
//!
//! A session alternates between two steps. When the last round is a sentence
//! the renderer draws it; when the last round is an image the describer writes
//! a sentence about it. Every step appends exactly one round and is persisted
//! before the next step may run.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::{RoundEntry, RoundKind, RoundLedger, SessionId};
use crate::error::GameError;
use crate::generate::{GeneratorError, Players};
use crate::snapshot::{self, Snapshot};

/// Where a session stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No rounds yet; only `start` is allowed
    Uninitialized,
    /// Last round is a sentence; the next step renders an image
    AwaitingImageStep,
    /// Last round is an image; the next step describes it
    AwaitingTextStep,
}

/// Settings fixed when a session is created
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSettings {
    /// Art style applied to every image step
    pub style: Option<String>,
    /// Prompt override applied to every describe step
    pub describe_prompt: Option<String>,
}

/// One game of picture-sentence-picture
pub struct GameSession {
    id: SessionId,
    style: Option<String>,
    describe_prompt: Option<String>,
    ledger: RoundLedger,
    output_dir: PathBuf,
    players: Players,
    persisted: bool,
}

impl GameSession {
    /// Create an unstarted session writing into `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>, settings: SessionSettings, players: Players) -> Self {
        let id = SessionId::new();
        debug!(%id, ?settings, "GameSession::new: called");
        Self {
            id,
            style: settings.style,
            describe_prompt: settings.describe_prompt,
            ledger: RoundLedger::new(),
            output_dir: output_dir.into(),
            players,
            persisted: false,
        }
    }

    /// Load the snapshot at `path` and continue the game it holds
    ///
    /// Style and describe prompt come from the snapshot only. The session keeps
    /// writing into the directory the snapshot was loaded from.
    pub fn resume(path: &Path, players: Players) -> Result<Self, GameError> {
        debug!(path = %path.display(), "GameSession::resume: called");
        let snapshot = snapshot::load(path)?;
        Ok(Self::from_snapshot(snapshot, snapshot::snapshot_dir(path), players))
    }

    /// Rebuild a session from an already loaded snapshot
    pub fn from_snapshot(snapshot: Snapshot, output_dir: impl Into<PathBuf>, players: Players) -> Self {
        Self {
            id: snapshot.session_id,
            style: snapshot.style,
            describe_prompt: snapshot.describe_prompt,
            ledger: snapshot.entries,
            output_dir: output_dir.into(),
            players,
            persisted: true,
        }
    }

    /// Durable view of this session
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            session_id: self.id.clone(),
            style: self.style.clone(),
            describe_prompt: self.describe_prompt.clone(),
            entries: self.ledger.clone(),
        }
    }

    pub fn state(&self) -> SessionState {
        match self.ledger.last() {
            Err(_) => SessionState::Uninitialized,
            Ok(last) => match last.kind {
                RoundKind::Text => SessionState::AwaitingImageStep,
                RoundKind::Image => SessionState::AwaitingTextStep,
            },
        }
    }

    /// Open the game with `initial_sentence` as round 1
    pub fn start(&mut self, initial_sentence: impl Into<String>) -> Result<&RoundEntry, GameError> {
        if !self.ledger.is_empty() {
            return Err(GameError::AlreadyStarted);
        }

        let entry = RoundEntry::text(1, initial_sentence);
        info!(session_id = %self.id, sentence = %entry.content, "Game started");
        self.ledger.append(entry)?;
        self.persisted = false;
        self.persist()?;
        self.ledger.last()
    }

    /// Play exactly one round and persist it
    ///
    /// A failed persist from an earlier call is retried before anything is
    /// generated. If persisting the new round fails the round stays in memory
    /// and the session remains unpersisted.
    pub async fn advance(&mut self) -> Result<&RoundEntry, GameError> {
        let last = self.ledger.last()?.clone();

        if !self.persisted {
            warn!(session_id = %self.id, "Previous round was not persisted, retrying save");
            self.persist()?;
        }

        let round = self.ledger.next_round_number();
        let entry = match last.kind {
            RoundKind::Text => self.illustrate(round, &last.content).await?,
            RoundKind::Image => self.describe(round, &last.content).await?,
        };

        self.ledger.append(entry)?;
        self.persisted = false;
        self.persist()?;
        self.ledger.last()
    }

    /// Render the sentence of the previous round
    async fn illustrate(&self, round: u32, sentence: &str) -> Result<RoundEntry, GameError> {
        let target = self.image_path(round);
        info!(round, style = ?self.style, "Rendering image");

        let path = self
            .players
            .renderer
            .render(sentence, self.style.as_deref(), &target)
            .await
            .map_err(|source| GameError::RenderUnavailable { round, source })?;

        if !path.exists() {
            return Err(GameError::RenderUnavailable {
                round,
                source: GeneratorError::InvalidResponse(format!("Rendered file is missing: {}", path.display())),
            });
        }

        // Recorded relative to the game directory
        let artifact = path.strip_prefix(&self.output_dir).unwrap_or(&path);
        Ok(RoundEntry::image(round, artifact.to_string_lossy()))
    }

    /// Describe the image of the previous round
    async fn describe(&self, round: u32, image: &str) -> Result<RoundEntry, GameError> {
        let image = self.artifact_path(image);
        info!(round, image = %image.display(), "Describing image");

        let sentence = self
            .players
            .describer
            .describe(&image, self.describe_prompt.as_deref())
            .await
            .map_err(|source| GameError::DescribeFailed { round, source })?;

        let sentence = sentence.trim();
        if sentence.is_empty() {
            return Err(GameError::DescribeFailed {
                round,
                source: GeneratorError::InvalidResponse("Describer returned an empty sentence".to_string()),
            });
        }

        Ok(RoundEntry::text(round, sentence))
    }

    /// Write the current state to the session's snapshot
    pub fn persist(&mut self) -> Result<PathBuf, GameError> {
        let path = snapshot::save(&self.output_dir, &self.to_snapshot())?;
        self.persisted = true;
        Ok(path)
    }

    /// Where the artifact recorded for an image round lives on disk
    pub fn artifact_path(&self, artifact: &str) -> PathBuf {
        snapshot::resolve_artifact(&self.output_dir, artifact)
    }

    fn image_path(&self, round: u32) -> PathBuf {
        self.output_dir.join(format!("round_{}_{}.png", round, self.id))
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn style(&self) -> Option<&str> {
        self.style.as_deref()
    }

    pub fn describe_prompt(&self) -> Option<&str> {
        self.describe_prompt.as_deref()
    }

    pub fn ledger(&self) -> &RoundLedger {
        &self.ledger
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn snapshot_path(&self) -> PathBuf {
        snapshot::snapshot_path(&self.output_dir, &self.id)
    }

    /// Rounds present in the snapshot on disk
    ///
    /// One less than the ledger length while the newest round is unsaved.
    pub fn saved_rounds(&self) -> usize {
        if self.persisted {
            self.ledger.len()
        } else {
            self.ledger.len().saturating_sub(1)
        }
    }

    /// False after a failed persist, until the next successful one
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::PlaceholderFallback;
    use crate::generate::mock::{FailingRenderer, MockDescriber, MockRenderer};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn players(describer: Arc<MockDescriber>, renderer: Arc<MockRenderer>) -> Players {
        Players::new(describer, renderer)
    }

    fn settings(style: Option<&str>, describe_prompt: Option<&str>) -> SessionSettings {
        SessionSettings {
            style: style.map(str::to_string),
            describe_prompt: describe_prompt.map(str::to_string),
        }
    }

    #[test]
    fn test_start_appends_round_one_and_persists() {
        let temp = TempDir::new().unwrap();
        let mut session = GameSession::new(
            temp.path(),
            SessionSettings::default(),
            players(Arc::new(MockDescriber::replying(&[])), Arc::new(MockRenderer::new())),
        );
        assert_eq!(session.state(), SessionState::Uninitialized);

        let entry = session.start("A cat sleeps.").unwrap().clone();
        assert_eq!(entry.round_number, 1);
        assert_eq!(entry.kind, RoundKind::Text);
        assert_eq!(entry.content, "A cat sleeps.");
        assert_eq!(session.state(), SessionState::AwaitingImageStep);
        assert!(session.is_persisted());
        assert_eq!(session.saved_rounds(), 1);
        assert!(session.snapshot_path().exists());
    }

    #[test]
    fn test_start_twice_fails() {
        let temp = TempDir::new().unwrap();
        let mut session = GameSession::new(
            temp.path(),
            SessionSettings::default(),
            players(Arc::new(MockDescriber::replying(&[])), Arc::new(MockRenderer::new())),
        );
        session.start("First.").unwrap();
        assert!(matches!(session.start("Second."), Err(GameError::AlreadyStarted)));
        assert_eq!(session.ledger().len(), 1);
    }

    #[tokio::test]
    async fn test_advance_before_start_fails() {
        let temp = TempDir::new().unwrap();
        let renderer = Arc::new(MockRenderer::new());
        let mut session = GameSession::new(
            temp.path(),
            SessionSettings::default(),
            players(Arc::new(MockDescriber::replying(&[])), renderer.clone()),
        );

        assert!(matches!(session.advance().await, Err(GameError::EmptyLedger)));
        assert_eq!(renderer.call_count(), 0);
        assert!(!session.snapshot_path().exists());
    }

    #[tokio::test]
    async fn test_rounds_alternate_and_use_settings() {
        let temp = TempDir::new().unwrap();
        let describer = Arc::new(MockDescriber::replying(&["A gray cat naps.", "A cloud shaped like a cat."]));
        let renderer = Arc::new(MockRenderer::new());
        let mut session = GameSession::new(
            temp.path(),
            settings(Some("watercolor"), Some("One short sentence.")),
            players(describer.clone(), renderer.clone()),
        );

        session.start("A cat sleeps.").unwrap();
        let round2 = session.advance().await.unwrap().clone();
        let round3 = session.advance().await.unwrap().clone();
        let round4 = session.advance().await.unwrap().clone();
        let round5 = session.advance().await.unwrap().clone();

        assert_eq!(round2.kind, RoundKind::Image);
        assert!(session.artifact_path(&round2.content).exists());
        assert_eq!(round3.kind, RoundKind::Text);
        assert_eq!(round3.content, "A gray cat naps.");
        assert_eq!(round4.round_number, 4);
        assert_eq!(round5.content, "A cloud shaped like a cat.");

        assert_eq!(
            renderer.calls(),
            vec![
                ("A cat sleeps.".to_string(), Some("watercolor".to_string())),
                ("A gray cat naps.".to_string(), Some("watercolor".to_string())),
            ]
        );
        let described = describer.calls();
        assert_eq!(described.len(), 2);
        assert_eq!(described[0].0, temp.path().join(&round2.content));
        assert_eq!(described[0].1.as_deref(), Some("One short sentence."));
        assert_eq!(described[1].0, temp.path().join(&round4.content));

        let saved = snapshot::load(&session.snapshot_path()).unwrap();
        assert_eq!(saved.entries.len(), 5);
    }

    #[tokio::test]
    async fn test_image_paths_are_named_by_round_and_session() {
        let temp = TempDir::new().unwrap();
        let mut session = GameSession::new(
            temp.path(),
            SessionSettings::default(),
            players(Arc::new(MockDescriber::replying(&[])), Arc::new(MockRenderer::new())),
        );
        session.start("A cat sleeps.").unwrap();
        let entry = session.advance().await.unwrap().clone();

        assert_eq!(entry.content, format!("round_2_{}.png", session.id()));
        assert!(temp.path().join(&entry.content).exists());
    }

    #[tokio::test]
    async fn test_failing_backend_yields_placeholder() {
        let temp = TempDir::new().unwrap();
        let mut session = GameSession::new(
            temp.path(),
            SessionSettings::default(),
            Players::new(
                Arc::new(MockDescriber::replying(&[])),
                Arc::new(PlaceholderFallback::new(Arc::new(FailingRenderer))),
            ),
        );
        session.start("A cat sleeps.").unwrap();

        let entry = session.advance().await.unwrap().clone();
        assert_eq!(entry.round_number, 2);
        assert_eq!(entry.kind, RoundKind::Image);
        assert!(session.artifact_path(&entry.content).exists());
    }

    #[tokio::test]
    async fn test_unwrapped_failing_renderer_is_render_unavailable() {
        let temp = TempDir::new().unwrap();
        let mut session = GameSession::new(
            temp.path(),
            SessionSettings::default(),
            Players::new(Arc::new(MockDescriber::replying(&[])), Arc::new(FailingRenderer)),
        );
        session.start("A cat sleeps.").unwrap();

        let err = session.advance().await.unwrap_err();
        assert!(matches!(err, GameError::RenderUnavailable { round: 2, .. }));
        assert_eq!(session.ledger().len(), 1);
    }

    #[tokio::test]
    async fn test_describe_failure_is_fatal() {
        let temp = TempDir::new().unwrap();
        let describer = Arc::new(MockDescriber::new(vec![Err(GeneratorError::ApiError {
            status: 500,
            message: "boom".to_string(),
        })]));
        let mut session = GameSession::new(
            temp.path(),
            SessionSettings::default(),
            players(describer, Arc::new(MockRenderer::new())),
        );
        session.start("A cat sleeps.").unwrap();
        session.advance().await.unwrap();

        let err = session.advance().await.unwrap_err();
        assert!(matches!(err, GameError::DescribeFailed { round: 3, .. }));
        assert_eq!(session.ledger().len(), 2);
        assert_eq!(snapshot::load(&session.snapshot_path()).unwrap().entries.len(), 2);
    }

    #[tokio::test]
    async fn test_blank_description_is_fatal() {
        let temp = TempDir::new().unwrap();
        let mut session = GameSession::new(
            temp.path(),
            SessionSettings::default(),
            players(Arc::new(MockDescriber::replying(&["   "])), Arc::new(MockRenderer::new())),
        );
        session.start("A cat sleeps.").unwrap();
        session.advance().await.unwrap();

        assert!(matches!(
            session.advance().await,
            Err(GameError::DescribeFailed { round: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_persist_failure_blocks_next_round() {
        let temp = TempDir::new().unwrap();
        let output_dir = temp.path().join("games");
        let renderer = Arc::new(MockRenderer::new());
        let mut session = GameSession::new(
            &output_dir,
            SessionSettings::default(),
            players(Arc::new(MockDescriber::replying(&["A gray cat naps."])), renderer.clone()),
        );
        session.start("A cat sleeps.").unwrap();

        // Put a directory where the snapshot file goes so the rename fails
        let snapshot_path = session.snapshot_path();
        std::fs::remove_file(&snapshot_path).unwrap();
        std::fs::create_dir(&snapshot_path).unwrap();

        let err = session.advance().await.unwrap_err();
        assert!(matches!(err, GameError::PersistFailed { .. }));
        assert_eq!(session.ledger().len(), 2, "round stays in memory");
        assert!(!session.is_persisted());
        assert_eq!(session.saved_rounds(), 1);
        assert_eq!(renderer.call_count(), 1);

        // Still blocked: the retry fails before any generator runs
        let err = session.advance().await.unwrap_err();
        assert!(matches!(err, GameError::PersistFailed { .. }));
        assert_eq!(renderer.call_count(), 1);

        // Once storage is back, the pending round is saved and play continues
        std::fs::remove_dir(&snapshot_path).unwrap();
        let entry = session.advance().await.unwrap().clone();
        assert_eq!(entry.round_number, 3);
        assert!(session.is_persisted());
        assert_eq!(session.saved_rounds(), 3);
        assert_eq!(snapshot::load(&snapshot_path).unwrap().entries.len(), 3);
    }

    #[tokio::test]
    async fn test_resume_continues_with_snapshot_settings() {
        let temp = TempDir::new().unwrap();
        let describer = Arc::new(MockDescriber::replying(&["A gray cat naps."]));
        let mut original = GameSession::new(
            temp.path(),
            settings(Some("watercolor"), Some("Be brief.")),
            players(describer.clone(), Arc::new(MockRenderer::new())),
        );
        original.start("A cat sleeps.").unwrap();
        original.advance().await.unwrap();
        original.advance().await.unwrap();
        let path = original.snapshot_path();

        let renderer = Arc::new(MockRenderer::new());
        let mut resumed = GameSession::resume(
            &path,
            players(Arc::new(MockDescriber::replying(&[])), renderer.clone()),
        )
        .unwrap();

        assert_eq!(resumed.id(), original.id());
        assert_eq!(resumed.style(), Some("watercolor"));
        assert_eq!(resumed.describe_prompt(), Some("Be brief."));
        assert_eq!(resumed.ledger(), original.ledger());
        assert_eq!(resumed.state(), SessionState::AwaitingImageStep);
        assert_eq!(resumed.output_dir(), temp.path());

        let entry = resumed.advance().await.unwrap().clone();
        assert_eq!(entry.round_number, 4);
        assert_eq!(entry.kind, RoundKind::Image);
        assert_eq!(renderer.calls()[0].1.as_deref(), Some("watercolor"));
    }

    #[tokio::test]
    async fn test_resume_after_moving_game_directory() {
        let temp = TempDir::new().unwrap();
        let original_dir = temp.path().join("original");
        let mut original = GameSession::new(
            &original_dir,
            SessionSettings::default(),
            players(Arc::new(MockDescriber::replying(&[])), Arc::new(MockRenderer::new())),
        );
        original.start("A cat sleeps.").unwrap();
        original.advance().await.unwrap();
        let file_name = original.snapshot_path().file_name().unwrap().to_owned();

        let moved_dir = temp.path().join("moved");
        std::fs::rename(&original_dir, &moved_dir).unwrap();

        let describer = Arc::new(MockDescriber::replying(&["A gray cat naps."]));
        let mut resumed = GameSession::resume(
            &moved_dir.join(file_name),
            players(describer.clone(), Arc::new(MockRenderer::new())),
        )
        .unwrap();
        let entry = resumed.advance().await.unwrap().clone();

        assert_eq!(entry.round_number, 3);
        let described = &describer.calls()[0].0;
        assert!(described.starts_with(&moved_dir));
        assert!(described.exists());
    }

    #[test]
    fn test_resume_missing_snapshot() {
        let temp = TempDir::new().unwrap();
        let result = GameSession::resume(
            &temp.path().join("game_missing.json"),
            players(Arc::new(MockDescriber::replying(&[])), Arc::new(MockRenderer::new())),
        );
        assert!(matches!(result, Err(GameError::SnapshotNotFound { .. })));
    }
}
