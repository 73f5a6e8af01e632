//! Session ID generation and validation
//!
//! IDs use the format: `{local-timestamp}_{6-char-hex}`
//! Example: `20261019_143012_0193ab`
//!
//! The ID doubles as the persistence key, so it must stay a safe file-name component.

use chrono::Local;
use serde::{Deserialize, Serialize};

/// Generate a fresh session ID
pub fn generate_id() -> String {
    let uuid = uuid::Uuid::now_v7().simple().to_string();
    // The leading hex of a v7 UUID is the millisecond clock; take the random tail instead
    let suffix = &uuid[uuid.len() - 6..];
    format!("{}_{}", Local::now().format("%Y%m%d_%H%M%S"), suffix)
}

/// Check that an ID is usable as a file-name component
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Session ID wrapper for type-safe ID handling
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Create a new session ID
    pub fn new() -> Self {
        Self(generate_id())
    }

    /// Parse an existing ID, rejecting anything that is not a safe file-name component
    pub fn parse(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if is_valid_id(&id) { Some(Self(id)) } else { None }
    }

    /// Get the full ID string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for SessionId {
    type Error = String;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        Self::parse(id.clone()).ok_or_else(|| format!("invalid session id: {:?}", id))
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
