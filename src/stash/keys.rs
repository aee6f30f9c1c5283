//! AI key store.
//!
//! The key lives in a local file for instant synchronous access and is
//! mirrored to the remote profile prefs best-effort, so other devices can
//! pick it up. Mirror failures are swallowed.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

use super::auth::AuthClient;

const KEY_FILE: &str = "ai_key";

struct KeyInner {
  path: PathBuf,
  key: RwLock<Option<String>>,
}

#[derive(Clone)]
pub struct KeyStore {
  inner: Arc<KeyInner>,
}

impl KeyStore {
  /// Load the key store, reading any locally persisted key.
  pub fn load(data_dir: &Path) -> Self {
    let path = data_dir.join(KEY_FILE);
    let key = std::fs::read_to_string(&path)
      .ok()
      .map(|k| k.trim().to_string())
      .filter(|k| !k.is_empty());

    Self {
      inner: Arc::new(KeyInner {
        path,
        key: RwLock::new(key),
      }),
    }
  }

  /// The current key, synchronously.
  pub fn get(&self) -> Option<String> {
    self.inner.key.read().unwrap_or_else(|e| e.into_inner()).clone()
  }

  pub fn has_key(&self) -> bool {
    self.get().is_some()
  }

  pub(crate) fn set_local(&self, key: &str) {
    let key = key.trim();
    *self.inner.key.write().unwrap_or_else(|e| e.into_inner()) = if key.is_empty() {
      None
    } else {
      Some(key.to_string())
    };

    if key.is_empty() {
      let _ = std::fs::remove_file(&self.inner.path);
      return;
    }

    if let Some(parent) = self.inner.path.parent() {
      if let Err(e) = std::fs::create_dir_all(parent) {
        warn!("failed to create key directory: {}", e);
        return;
      }
    }
    if let Err(e) = std::fs::write(&self.inner.path, key) {
      warn!("failed to persist AI key: {}", e);
    }
  }

  /// Save the key locally and mirror it to the remote profile.
  /// An empty key clears both.
  pub async fn save(&self, key: &str, auth: &AuthClient) {
    self.set_local(key);

    if let Err(e) = auth.update_prefs(key.trim()).await {
      debug!("AI key mirror failed: {}", e);
    }
  }

  /// Pull the key from remote prefs when no local copy exists.
  pub async fn hydrate(&self, auth: &AuthClient) {
    if self.has_key() {
      return;
    }

    match auth.prefs().await {
      Ok(prefs) => {
        if let Some(key) = prefs.ai_key.filter(|k| !k.trim().is_empty()) {
          self.set_local(&key);
        }
      }
      Err(e) => debug!("AI key hydrate failed: {}", e),
    }
  }

  /// Forget the key, locally only. Used on logout.
  pub fn clear(&self) {
    self.set_local("");
  }
}
