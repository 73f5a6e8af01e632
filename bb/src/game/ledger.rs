//! Round ledger: the append-only, strictly alternating history of a game

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GameError;

/// What a round produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundKind {
    /// A sentence
    Text,
    /// A reference to a rendered image
    Image,
}

impl RoundKind {
    /// The kind the following round must have
    pub fn next(self) -> Self {
        match self {
            Self::Text => Self::Image,
            Self::Image => Self::Text,
        }
    }
}

impl std::fmt::Display for RoundKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "Text"),
            Self::Image => write!(f, "Image"),
        }
    }
}

/// Kind required at a given round number: odd rounds are text, even rounds are images
pub fn expected_kind_for(round_number: u32) -> RoundKind {
    if round_number % 2 == 1 {
        RoundKind::Text
    } else {
        RoundKind::Image
    }
}

/// One round of the game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundEntry {
    /// 1-based, authoritative for ordering
    pub round_number: u32,
    pub kind: RoundKind,
    /// Sentence for text rounds, artifact path for image rounds
    pub content: String,
    /// Informational only
    pub created_at: DateTime<Utc>,
}

impl RoundEntry {
    /// Create a text entry stamped with the current time
    pub fn text(round_number: u32, sentence: impl Into<String>) -> Self {
        Self {
            round_number,
            kind: RoundKind::Text,
            content: sentence.into(),
            created_at: Utc::now(),
        }
    }

    /// Create an image entry stamped with the current time
    pub fn image(round_number: u32, artifact: impl Into<String>) -> Self {
        Self {
            round_number,
            kind: RoundKind::Image,
            content: artifact.into(),
            created_at: Utc::now(),
        }
    }
}

/// Ordered rounds of one game session
///
/// Deserializing goes through [`RoundLedger::from_entries`], so a stored
/// history that breaks numbering or alternation never becomes a ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<RoundEntry>", into = "Vec<RoundEntry>")]
pub struct RoundLedger {
    entries: Vec<RoundEntry>,
}

impl RoundLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from stored entries, validating every one of them
    pub fn from_entries(entries: Vec<RoundEntry>) -> Result<Self, GameError> {
        debug!(entry_count = entries.len(), "RoundLedger::from_entries: called");
        let mut ledger = Self::new();
        for entry in entries {
            ledger.append(entry)?;
        }
        Ok(ledger)
    }

    /// Append the next round, enforcing numbering and alternation
    pub fn append(&mut self, entry: RoundEntry) -> Result<(), GameError> {
        let expected_round = self.next_round_number();
        if entry.round_number != expected_round {
            debug!(
                expected_round,
                got = entry.round_number,
                "RoundLedger::append: round number out of sequence"
            );
            return Err(GameError::InvariantViolation {
                round: entry.round_number,
                reason: format!("expected round {}, got round {}", expected_round, entry.round_number),
            });
        }

        let expected_kind = expected_kind_for(entry.round_number);
        if entry.kind != expected_kind {
            debug!(round = entry.round_number, kind = %entry.kind, "RoundLedger::append: wrong kind");
            return Err(GameError::InvariantViolation {
                round: entry.round_number,
                reason: format!("round must be {}, got {}", expected_kind, entry.kind),
            });
        }

        self.entries.push(entry);
        Ok(())
    }

    /// Most recent round
    pub fn last(&self) -> Result<&RoundEntry, GameError> {
        self.entries.last().ok_or(GameError::EmptyLedger)
    }

    pub fn first(&self) -> Option<&RoundEntry> {
        self.entries.first()
    }

    pub fn next_round_number(&self) -> u32 {
        self.entries.len() as u32 + 1
    }

    pub fn entries(&self) -> &[RoundEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TryFrom<Vec<RoundEntry>> for RoundLedger {
    type Error = GameError;

    fn try_from(entries: Vec<RoundEntry>) -> Result<Self, Self::Error> {
        Self::from_entries(entries)
    }
}

impl From<RoundLedger> for Vec<RoundEntry> {
    fn from(ledger: RoundLedger) -> Self {
        ledger.entries
    }
}
