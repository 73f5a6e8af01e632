//! Snapshot persistence for game sessions
//!
//! One JSON document per session, stored as `game_{session_id}.json` in the
//! session's output directory:
//!
//! ```text
//! output/
//! ├── game_20261019_143012_0193ab.json   # snapshot
//! ├── round_2_20261019_143012_0193ab.png
//! └── round_4_20261019_143012_0193ab.png
//! ```
//!
//! Saves always write the full state through a temporary file in the same
//! directory followed by an atomic rename, so readers see either the previous
//! snapshot or the new one.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::GameError;
use crate::game::{RoundLedger, SessionId};

/// Durable state of one game session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub session_id: SessionId,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub describe_prompt: Option<String>,
    /// Validated on load: numbering and alternation must hold
    pub entries: RoundLedger,
}

/// Location of the snapshot for `session_id` under `dir`
pub fn snapshot_path(dir: &Path, session_id: &SessionId) -> PathBuf {
    dir.join(format!("game_{}.json", session_id))
}

/// Directory a snapshot lives in, usable as a session output directory
pub fn snapshot_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Location of an image round's artifact for a game stored under `dir`
///
/// Artifacts are recorded relative to the game directory. Absolute references
/// are returned unchanged, and so are older references relative to the
/// working directory when nothing exists under `dir`.
pub fn resolve_artifact(dir: &Path, artifact: &str) -> PathBuf {
    let reference = Path::new(artifact);
    if reference.is_absolute() {
        return reference.to_path_buf();
    }
    let under_dir = dir.join(reference);
    if !under_dir.exists() && reference.exists() {
        return reference.to_path_buf();
    }
    under_dir
}

/// Write the snapshot under `dir`, replacing any previous one
pub fn save(dir: &Path, snapshot: &Snapshot) -> Result<PathBuf, GameError> {
    let path = snapshot_path(dir, &snapshot.session_id);
    debug!(path = %path.display(), rounds = snapshot.entries.len(), "save: called");

    write_atomic(dir, &path, snapshot).map_err(|source| GameError::PersistFailed {
        path: path.clone(),
        source,
    })?;

    info!(path = %path.display(), rounds = snapshot.entries.len(), "Snapshot saved");
    Ok(path)
}

fn write_atomic(dir: &Path, path: &Path, snapshot: &Snapshot) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;

    let mut contents = serde_json::to_string_pretty(snapshot).map_err(std::io::Error::other)?;
    contents.push('\n');

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Read and validate the snapshot at `path`
pub fn load(path: &Path) -> Result<Snapshot, GameError> {
    debug!(path = %path.display(), "load: called");
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(GameError::SnapshotNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(GameError::CorruptSnapshot {
                path: path.to_path_buf(),
                reason: format!("unreadable: {}", e),
            });
        }
    };

    let snapshot: Snapshot = serde_json::from_slice(&bytes).map_err(|e| GameError::CorruptSnapshot {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    info!(
        session_id = %snapshot.session_id,
        rounds = snapshot.entries.len(),
        "Snapshot loaded"
    );
    Ok(snapshot)
}
