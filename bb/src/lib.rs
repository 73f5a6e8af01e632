//! beepboop - a game of telephone between a text model and an image model
//!
//! A game starts from a sentence. The image model draws it, the text model
//! describes the drawing, the image model draws the description, and so on.
//! Every round is appended to a ledger that strictly alternates sentence and
//! image, and the whole game is snapshotted to disk after every round so it
//! can be continued later.
//!
//! # Modules
//!
//! - [`game`] - Session ids, the round ledger and the session state machine
//! - [`generate`] - Text describer and image renderer traits and backends
//! - [`snapshot`] - JSON snapshot persistence
//! - [`export`] - HTML export of a snapshot
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod game;
pub mod generate;
pub mod snapshot;

// Re-export commonly used types
pub use config::{Config, GameConfig, ImageConfig, TextConfig};
pub use error::GameError;
pub use game::{GameSession, RoundEntry, RoundKind, RoundLedger, SessionId, SessionSettings, SessionState};
pub use generate::{GeneratorError, ImageRenderer, PlaceholderFallback, Players, TextDescriber};
pub use snapshot::Snapshot;
