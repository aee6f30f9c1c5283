//! Authentication collaborator.
//!
//! Owns the locally cached session snapshot: a successful login or
//! verification refreshes it, a failed verification clears it. The cache
//! is never authoritative — `current_identity` always wins.

use reqwest::Method;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::gateway::{Gateway, GatewayRequest};
use crate::session::{CachedSession, SessionStore};

use super::client::{decode_envelope, parse_base};
use super::error::{AuthError, StoreError};
use super::types::Identity;
use super::Credentials;

/// Session payload returned by the store on session create.
#[derive(Debug, Deserialize)]
struct SessionPayload {
  token: String,
  identity: Identity,
}

/// Remote account preferences (used to mirror the AI key).
#[derive(Debug, Default, Deserialize)]
pub struct AccountPrefs {
  #[serde(default)]
  pub ai_key: Option<String>,
}

#[derive(Clone)]
pub struct AuthClient {
  gateway: Gateway,
  base: Url,
  credentials: Credentials,
  sessions: SessionStore,
}

impl AuthClient {
  pub fn new(
    gateway: Gateway,
    endpoint: &str,
    credentials: Credentials,
    sessions: SessionStore,
  ) -> Result<Self, StoreError> {
    let base = parse_base(endpoint)?;
    Ok(Self {
      gateway,
      base,
      credentials,
      sessions,
    })
  }

  /// The locally cached identity, read synchronously. Used only to paint
  /// the UI before verification resolves.
  pub fn cached_identity(&self) -> Option<Identity> {
    self.sessions.load().map(|s| s.identity)
  }

  pub async fn login(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
    let url = self.url("account/sessions").map_err(|_| AuthError::Network)?;
    let body = serde_json::json!({ "email": email, "password": password });

    let response = self.gateway.fetch(GatewayRequest::json(Method::POST, url, body)).await;
    if response.status == 401 {
      return Err(AuthError::InvalidCredentials);
    }

    let payload: SessionPayload = decode_envelope(&response).map_err(|e| {
      debug!("login failed: {}", e);
      AuthError::Network
    })?;

    self.credentials.set(payload.token.clone());
    self.sessions.save(&CachedSession {
      identity: payload.identity.clone(),
      token: payload.token,
    });

    Ok(payload.identity)
  }

  /// Create the account, then log straight in.
  pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<Identity, AuthError> {
    let url = self.url("account").map_err(|_| AuthError::Network)?;
    let body = serde_json::json!({ "name": name, "email": email, "password": password });

    let response = self.gateway.fetch(GatewayRequest::json(Method::POST, url, body)).await;
    if response.status == 409 {
      return Err(AuthError::AlreadyRegistered);
    }

    decode_envelope::<serde_json::Value>(&response).map_err(|e| {
      debug!("register failed: {}", e);
      AuthError::Network
    })?;

    self.login(email, password).await
  }

  /// End the session. The server-side delete is best-effort; local state
  /// is cleared regardless.
  pub async fn logout(&self) {
    if let Ok(url) = self.url("account/sessions/current") {
      let request = self.authorize(GatewayRequest::json(Method::DELETE, url, serde_json::json!({})));
      let response = self.gateway.fetch(request).await;
      if !response.is_success() {
        debug!("session delete answered {}", response.status);
      }
    }

    self.credentials.clear();
    self.sessions.clear();
  }

  /// Authoritative session verification. Refreshes the session cache on
  /// success; clears it on any failure so the next boot is cold.
  pub async fn current_identity(&self) -> Option<Identity> {
    let token = match self.credentials.get() {
      Some(token) => token,
      None => {
        self.sessions.clear();
        return None;
      }
    };

    let url = self.url("account").ok()?;
    let response = self.gateway.fetch(GatewayRequest::get(url).bearer(&token)).await;

    match decode_envelope::<Identity>(&response) {
      Ok(identity) => {
        self.sessions.save(&CachedSession {
          identity: identity.clone(),
          token,
        });
        Some(identity)
      }
      Err(e) => {
        debug!("session verification failed: {}", e);
        self.credentials.clear();
        self.sessions.clear();
        None
      }
    }
  }

  /// Fetch remote account preferences.
  pub async fn prefs(&self) -> Result<AccountPrefs, StoreError> {
    let url = self.url("account/prefs")?;
    let response = self.gateway.fetch(self.authorize(GatewayRequest::get(url))).await;
    decode_envelope(&response)
  }

  /// Mirror the AI key to the remote profile.
  pub async fn update_prefs(&self, ai_key: &str) -> Result<(), StoreError> {
    let url = self.url("account/prefs")?;
    let body = serde_json::json!({ "ai_key": ai_key });
    let response = self
      .gateway
      .fetch(self.authorize(GatewayRequest::json(Method::PATCH, url, body)))
      .await;

    decode_envelope::<serde_json::Value>(&response).map(|_| ())
  }

  fn url(&self, path: &str) -> Result<Url, StoreError> {
    self
      .base
      .join(path)
      .map_err(|e| StoreError::Malformed(format!("bad auth URL {}: {}", path, e)))
  }

  fn authorize(&self, request: GatewayRequest) -> GatewayRequest {
    match self.credentials.get() {
      Some(token) => request.bearer(&token),
      None => request,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Config;
  use crate::gateway::{CacheStore, GatewayConfig};

  /// Auth client whose endpoint is unroutable: every call sees the
  /// gateway's offline envelope.
  fn offline_auth(dir: &std::path::Path) -> AuthClient {
    let mut config = Config::default();
    config.store.endpoint = "http://127.0.0.1:1/v1".to_string();

    let gateway = Gateway::new(
      GatewayConfig::from_config(&config).unwrap(),
      CacheStore::in_memory().unwrap(),
    )
    .unwrap();

    AuthClient::new(
      gateway,
      &config.store.endpoint,
      Credentials::default(),
      SessionStore::new(dir),
    )
    .unwrap()
  }

  #[tokio::test]
  async fn test_login_offline_is_network_error() {
    let dir = tempfile::tempdir().unwrap();
    let auth = offline_auth(dir.path());

    let result = auth.login("ada@example.com", "hunter22").await;
    assert_eq!(result.unwrap_err(), AuthError::Network);
    assert!(auth.cached_identity().is_none());
  }

  #[tokio::test]
  async fn test_verification_without_token_clears_cache() {
    let dir = tempfile::tempdir().unwrap();
    let auth = offline_auth(dir.path());

    // A stale session file with no live credentials
    SessionStore::new(dir.path()).save(&CachedSession {
      identity: Identity {
        id: "u1".into(),
        name: "Ada".into(),
        email: "ada@example.com".into(),
      },
      token: "stale".into(),
    });

    assert!(auth.current_identity().await.is_none());
  }

  #[tokio::test]
  async fn test_verification_failure_clears_cached_session() {
    let dir = tempfile::tempdir().unwrap();
    let auth = offline_auth(dir.path());

    auth.credentials.set("tok".into());
    SessionStore::new(dir.path()).save(&CachedSession {
      identity: Identity {
        id: "u1".into(),
        name: "Ada".into(),
        email: "ada@example.com".into(),
      },
      token: "tok".into(),
    });
    assert!(auth.cached_identity().is_some());

    // Verification cannot reach the store: forced unauthenticated
    assert!(auth.current_identity().await.is_none());
    assert!(auth.cached_identity().is_none());
    assert!(auth.credentials.get().is_none());
  }

  #[tokio::test]
  async fn test_logout_clears_local_state() {
    let dir = tempfile::tempdir().unwrap();
    let auth = offline_auth(dir.path());
    auth.credentials.set("tok".into());

    auth.logout().await;
    assert!(auth.credentials.get().is_none());
    assert!(auth.cached_identity().is_none());
  }
}
