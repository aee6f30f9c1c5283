//! Locally persisted session snapshot.
//!
//! Paints the authenticated shell instantly on boot, before the
//! authoritative check resolves. Not authoritative: the verification
//! result always supersedes it when they disagree.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::stash::types::Identity;

/// The last known authenticated identity plus its bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedSession {
  pub identity: Identity,
  pub token: String,
}

/// Stores the session snapshot as JSON in the data directory.
/// All operations are synchronous and best-effort.
#[derive(Debug, Clone)]
pub struct SessionStore {
  path: PathBuf,
}

impl SessionStore {
  pub fn new(data_dir: &Path) -> Self {
    Self {
      path: data_dir.join("session.json"),
    }
  }

  /// Read the cached session. Any failure (missing, unreadable,
  /// unparseable) reads as "no session".
  pub fn load(&self) -> Option<CachedSession> {
    let contents = std::fs::read_to_string(&self.path).ok()?;
    serde_json::from_str(&contents).ok()
  }

  pub fn save(&self, session: &CachedSession) {
    if let Some(parent) = self.path.parent() {
      if let Err(e) = std::fs::create_dir_all(parent) {
        warn!("failed to create session directory: {}", e);
        return;
      }
    }

    match serde_json::to_string(session) {
      Ok(json) => {
        if let Err(e) = std::fs::write(&self.path, json) {
          warn!("failed to persist session: {}", e);
        }
      }
      Err(e) => warn!("failed to serialize session: {}", e),
    }
  }

  pub fn clear(&self) {
    let _ = std::fs::remove_file(&self.path);
  }
}
