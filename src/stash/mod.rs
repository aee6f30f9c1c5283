//! Clients for the SnipStash collaborators: document store, auth, AI
//! completion endpoint and the AI key store. All network traffic goes
//! through the offline gateway.

pub mod ai;
pub mod auth;
pub mod client;
pub mod error;
pub mod keys;
pub mod types;

use std::sync::{Arc, RwLock};

/// Shared bearer token for the store and auth clients. Seeded from the
/// cached session on boot, replaced on login, cleared on logout.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
  token: Arc<RwLock<Option<String>>>,
}

impl Credentials {
  pub fn new(token: Option<String>) -> Self {
    Self {
      token: Arc::new(RwLock::new(token)),
    }
  }

  pub fn get(&self) -> Option<String> {
    self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
  }

  pub fn set(&self, token: String) {
    *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(token);
  }

  pub fn clear(&self) {
    *self.token.write().unwrap_or_else(|e| e.into_inner()) = None;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_credentials_shared_across_clones() {
    let credentials = Credentials::default();
    let clone = credentials.clone();

    credentials.set("tok".into());
    assert_eq!(clone.get().as_deref(), Some("tok"));

    clone.clear();
    assert!(credentials.get().is_none());
  }
}
