//! AI assist: auto-describe and explain snippets.
//!
//! Talks to an OpenAI-compatible chat-completions endpoint with the
//! user's own key. The key check happens before any network request.

use reqwest::Method;
use serde::Deserialize;
use url::Url;

use crate::gateway::{Gateway, GatewayRequest};

use super::error::{AiError, StoreError};
use super::keys::KeyStore;
use super::types::AiAnalysis;

/// Analysis prompt. The model must answer with bare JSON.
const ANALYZE_SYSTEM: &str = "You are a senior developer assistant.\n\
Respond ONLY with valid JSON, no markdown:\n\
{\"language\":\"<lang>\",\"title\":\"<max 6 words>\",\"description\":\"<one sentence>\",\"tags\":[\"tag1\",\"tag2\",\"tag3\"]}";

const EXPLAIN_SYSTEM: &str = "You are a helpful coding tutor. Explain code for an intermediate developer.\n\
Plain English, under 120 words, no bullet points, no markdown headers.";

/// Longest code sample sent to the model.
const MAX_CODE_CHARS: usize = 2000;

#[derive(Debug, Deserialize)]
struct ChatResponse {
  choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
  message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
  content: String,
}

/// Failure envelope shape, including the gateway's synthesized one.
#[derive(Debug, Deserialize)]
struct FailureEnvelope {
  success: bool,
  #[serde(default)]
  error: Option<String>,
}

#[derive(Clone)]
pub struct AiClient {
  gateway: Gateway,
  base: Url,
  model: String,
  keys: KeyStore,
}

impl AiClient {
  pub fn new(
    gateway: Gateway,
    endpoint: &str,
    model: &str,
    keys: KeyStore,
  ) -> Result<Self, StoreError> {
    let base = super::client::parse_base(endpoint)?;
    Ok(Self {
      gateway,
      base,
      model: model.to_string(),
      keys,
    })
  }

  /// Analyze a code sample into form fields.
  pub async fn analyze(&self, code: &str) -> Result<AiAnalysis, AiError> {
    let user = format!("Analyze:\n\n{}", clip(code));
    let raw = self.complete(ANALYZE_SYSTEM, &user).await?;
    let clean = strip_fences(&raw);

    serde_json::from_str(&clean)
      .map_err(|e| AiError::RequestFailed(format!("unparseable analysis: {}", e)))
  }

  /// Explain a snippet in plain English.
  pub async fn explain(&self, code: &str, language: &str) -> Result<String, AiError> {
    let user = format!("Explain this {} snippet:\n\n{}", language, clip(code));
    self.complete(EXPLAIN_SYSTEM, &user).await
  }

  async fn complete(&self, system: &str, user: &str) -> Result<String, AiError> {
    // Key-gated: no key, no network
    let key = self.keys.get().ok_or(AiError::NoKey)?;

    let url = self
      .base
      .join("chat/completions")
      .map_err(|e| AiError::RequestFailed(e.to_string()))?;

    let body = serde_json::json!({
      "model": self.model,
      "temperature": 0.3,
      "max_tokens": 400,
      "messages": [
        { "role": "system", "content": system },
        { "role": "user", "content": user }
      ]
    });

    let response = self
      .gateway
      .fetch(GatewayRequest::json(Method::POST, url, body).bearer(&key))
      .await;

    if response.status == 401 {
      return Err(AiError::InvalidKey);
    }
    if !response.is_success() {
      return Err(AiError::RequestFailed(format!("HTTP {}", response.status)));
    }

    // The offline gateway answers 200 with a failure envelope
    if let Ok(envelope) = response.json::<FailureEnvelope>() {
      if !envelope.success {
        return Err(AiError::RequestFailed(
          envelope.error.unwrap_or_else(|| "Offline".to_string()),
        ));
      }
    }

    let chat: ChatResponse = response
      .json()
      .map_err(|e| AiError::RequestFailed(format!("unparseable completion: {}", e)))?;

    let content = chat
      .choices
      .into_iter()
      .next()
      .map(|c| c.message.content)
      .unwrap_or_default();

    Ok(content.trim().to_string())
  }
}

fn clip(code: &str) -> String {
  code.chars().take(MAX_CODE_CHARS).collect()
}

/// Strip markdown code fences the model sometimes wraps JSON in.
fn strip_fences(raw: &str) -> String {
  let mut out = String::with_capacity(raw.len());
  let mut rest = raw;

  while let Some(start) = rest.find("```") {
    out.push_str(&rest[..start]);
    rest = &rest[start + 3..];
    // Drop a "json" language tag right after the fence
    let lower = rest.to_lowercase();
    if lower.starts_with("json") {
      rest = &rest[4..];
    }
  }
  out.push_str(rest);
  out.trim().to_string()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::gateway::{CacheStore, GatewayConfig};

  fn offline_ai(with_key: bool) -> AiClient {
    let dir = tempfile::tempdir().unwrap();
    let keys = KeyStore::load(dir.path());
    if with_key {
      keys.set_local("gsk_test");
    }

    let config = GatewayConfig {
      shell_origin: Url::parse("http://127.0.0.1:1").unwrap(),
      shell_version: "shell-test".to_string(),
      cdn_hosts: Vec::new(),
      live_hosts: vec!["127.0.0.1".to_string()],
      precache: Vec::new(),
    };
    let gateway = Gateway::new(config, CacheStore::in_memory().unwrap()).unwrap();

    AiClient::new(gateway, "http://127.0.0.1:1/openai/v1", "test-model", keys).unwrap()
  }

  #[tokio::test]
  async fn test_no_key_fails_before_network() {
    let ai = offline_ai(false);
    let result = ai.analyze("fn main() {}").await;
    assert_eq!(result.unwrap_err(), AiError::NoKey);
  }

  #[tokio::test]
  async fn test_offline_with_key_is_request_failed() {
    let ai = offline_ai(true);
    let result = ai.explain("fn main() {}", "rust").await;
    assert_eq!(result.unwrap_err(), AiError::RequestFailed("Offline".to_string()));
  }

  #[test]
  fn test_strip_fences_plain_json_untouched() {
    assert_eq!(strip_fences(r#"{"title":"x"}"#), r#"{"title":"x"}"#);
  }

  #[test]
  fn test_strip_fences_removes_json_fence() {
    let raw = "```json\n{\"title\":\"x\"}\n```";
    assert_eq!(strip_fences(raw), "{\"title\":\"x\"}");
  }

  #[test]
  fn test_strip_fences_removes_bare_fence() {
    let raw = "```\n{\"title\":\"x\"}\n```";
    assert_eq!(strip_fences(raw), "{\"title\":\"x\"}");
  }

  #[test]
  fn test_clip_respects_char_boundaries() {
    let code = "é".repeat(3000);
    assert_eq!(clip(&code).chars().count(), MAX_CODE_CHARS);
  }
}
