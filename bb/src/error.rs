//! Game error types

use std::path::PathBuf;

use thiserror::Error;

use crate::generate::GeneratorError;

/// Errors raised by the round ledger, the game session and the snapshot codec
#[derive(Debug, Error)]
pub enum GameError {
    #[error("Ledger invariant violated at round {round}: {reason}")]
    InvariantViolation { round: u32, reason: String },

    #[error("Game has not been started: the ledger is empty")]
    EmptyLedger,

    #[error("Game has already been started")]
    AlreadyStarted,

    #[error("Round {round}: image rendering unavailable: {source}")]
    RenderUnavailable {
        round: u32,
        #[source]
        source: GeneratorError,
    },

    #[error("Round {round}: image description failed: {source}")]
    DescribeFailed {
        round: u32,
        #[source]
        source: GeneratorError,
    },

    #[error("Snapshot not found: {}", path.display())]
    SnapshotNotFound { path: PathBuf },

    #[error("Corrupt snapshot {}: {reason}", path.display())]
    CorruptSnapshot { path: PathBuf, reason: String },

    #[error("Failed to persist snapshot {}: {source}", path.display())]
    PersistFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GameError {
    /// True for errors raised while loading a snapshot
    pub fn is_resume_error(&self) -> bool {
        matches!(self, GameError::SnapshotNotFound { .. } | GameError::CorruptSnapshot { .. })
    }
}
