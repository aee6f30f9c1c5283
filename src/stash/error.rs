use thiserror::Error;

/// Client-side validation failures. These block the save before any
/// network call is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
  #[error("Title is required")]
  MissingTitle,
  #[error("Code cannot be empty")]
  EmptyCode,
}

/// Failures from the snippet document store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
  /// The offline gateway synthesized a failure envelope; no network.
  #[error("offline")]
  Offline,
  /// The store answered with a non-success HTTP status.
  #[error("store returned HTTP {0}")]
  Http(u16),
  /// The store rejected the request with an error envelope.
  #[error("{0}")]
  Rejected(String),
  /// The response body could not be decoded.
  #[error("malformed store response: {0}")]
  Malformed(String),
}

/// Failures from the authentication collaborator. Surfaced inline on the
/// auth form; they never touch draft state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
  #[error("Wrong email or password")]
  InvalidCredentials,
  #[error("Email already registered — try signing in")]
  AlreadyRegistered,
  #[error("Network error — check your connection")]
  Network,
}

/// Failures from the AI completion endpoint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AiError {
  /// No API key configured. Checked before any network request.
  #[error("no AI key configured")]
  NoKey,
  /// The endpoint rejected the key (HTTP 401).
  #[error("invalid AI key")]
  InvalidKey,
  #[error("AI request failed: {0}")]
  RequestFailed(String),
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_validation_messages() {
    assert_eq!(ValidationError::MissingTitle.to_string(), "Title is required");
    assert_eq!(ValidationError::EmptyCode.to_string(), "Code cannot be empty");
  }

  #[test]
  fn test_store_error_display() {
    assert_eq!(StoreError::Http(503).to_string(), "store returned HTTP 503");
    assert_eq!(StoreError::Rejected("nope".into()).to_string(), "nope");
  }
}
