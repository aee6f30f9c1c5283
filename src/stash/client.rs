//! Snippet document store client.
//!
//! Speaks the SnipStash REST API through the offline gateway. Response
//! bodies are `{success, data, error}` envelopes; the gateway's
//! synthesized offline envelope surfaces here as `StoreError::Offline`.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::gateway::{Gateway, GatewayRequest, GatewayResponse};

use super::error::StoreError;
use super::types::{Snippet, SnippetFields};
use super::Credentials;

/// Maximum number of snippets returned by a list call.
const LIST_LIMIT: u32 = 100;

/// Search and language filter for list calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
  pub search: String,
  pub language: String,
}

/// The `{success, data, error}` result envelope every store endpoint
/// answers with, modeled so both branches are handled.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiEnvelope<T> {
  pub success: bool,
  pub data: Option<T>,
  pub error: Option<String>,
}

impl<T> ApiEnvelope<T> {
  fn into_result(self) -> Result<T, StoreError> {
    if self.success {
      self
        .data
        .ok_or_else(|| StoreError::Malformed("success envelope without data".to_string()))
    } else {
      Err(envelope_failure(self.error))
    }
  }
}

fn envelope_failure(error: Option<String>) -> StoreError {
  match error {
    Some(error) if error == "Offline" => StoreError::Offline,
    Some(error) => StoreError::Rejected(error),
    None => StoreError::Rejected("unspecified store error".to_string()),
  }
}

/// Decode a gateway response into the envelope's success value.
pub(crate) fn decode_envelope<T: DeserializeOwned>(
  response: &GatewayResponse,
) -> Result<T, StoreError> {
  match response.json::<ApiEnvelope<T>>() {
    Ok(envelope) => envelope.into_result(),
    Err(_) if !response.is_success() => Err(StoreError::Http(response.status)),
    Err(e) => Err(StoreError::Malformed(e.to_string())),
  }
}

/// Client for the snippet collection.
#[derive(Clone)]
pub struct StoreClient {
  gateway: Gateway,
  base: Url,
  credentials: Credentials,
}

impl StoreClient {
  pub fn new(gateway: Gateway, endpoint: &str, credentials: Credentials) -> Result<Self, StoreError> {
    let base = parse_base(endpoint)?;
    Ok(Self {
      gateway,
      base,
      credentials,
    })
  }

  /// List the owner's snippets, newest first, capped at 100.
  pub async fn list(&self, owner_id: &str, filter: &ListFilter) -> Result<Vec<Snippet>, StoreError> {
    let mut url = self.url("snippets")?;
    {
      let mut pairs = url.query_pairs_mut();
      pairs.append_pair("author", owner_id);
      pairs.append_pair("order", "created_desc");
      pairs.append_pair("limit", &LIST_LIMIT.to_string());
      if !filter.language.is_empty() {
        pairs.append_pair("language", &filter.language);
      }
      if !filter.search.trim().is_empty() {
        pairs.append_pair("search", filter.search.trim());
      }
    }

    self.send(GatewayRequest::get(url)).await
  }

  /// List public snippets (anonymous read grant), newest first.
  pub async fn list_public(&self, language: Option<&str>) -> Result<Vec<Snippet>, StoreError> {
    let mut url = self.url("snippets")?;
    {
      let mut pairs = url.query_pairs_mut();
      pairs.append_pair("public", "true");
      pairs.append_pair("order", "created_desc");
      pairs.append_pair("limit", &LIST_LIMIT.to_string());
      if let Some(language) = language {
        pairs.append_pair("language", language);
      }
    }

    self.send(GatewayRequest::get(url)).await
  }

  /// Create a snippet. The `is_public` field controls whether the store
  /// attaches an anonymous read grant.
  pub async fn create(&self, owner_id: &str, fields: &SnippetFields) -> Result<Snippet, StoreError> {
    let url = self.url("snippets")?;
    let body = Self::payload(owner_id, fields)?;
    self.send(GatewayRequest::json(Method::POST, url, body)).await
  }

  /// Update a snippet; permissions are recomputed from `is_public`.
  pub async fn update(
    &self,
    id: &str,
    owner_id: &str,
    fields: &SnippetFields,
  ) -> Result<Snippet, StoreError> {
    let url = self.url(&format!("snippets/{}", id))?;
    let body = Self::payload(owner_id, fields)?;
    self.send(GatewayRequest::json(Method::PATCH, url, body)).await
  }

  pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
    let url = self.url(&format!("snippets/{}", id))?;
    let request = self.authorize(GatewayRequest::json(Method::DELETE, url, serde_json::json!({})));
    let response = self.gateway.fetch(request).await;

    // Delete answers an envelope with no data payload
    match response.json::<ApiEnvelope<serde_json::Value>>() {
      Ok(envelope) if envelope.success => Ok(()),
      Ok(envelope) => Err(envelope_failure(envelope.error)),
      Err(_) if !response.is_success() => Err(StoreError::Http(response.status)),
      Err(e) => Err(StoreError::Malformed(e.to_string())),
    }
  }

  fn payload(owner_id: &str, fields: &SnippetFields) -> Result<serde_json::Value, StoreError> {
    let mut body =
      serde_json::to_value(fields).map_err(|e| StoreError::Malformed(e.to_string()))?;
    body["author_id"] = serde_json::Value::String(owner_id.to_string());
    Ok(body)
  }

  fn url(&self, path: &str) -> Result<Url, StoreError> {
    self
      .base
      .join(path)
      .map_err(|e| StoreError::Malformed(format!("bad store URL {}: {}", path, e)))
  }

  fn authorize(&self, request: GatewayRequest) -> GatewayRequest {
    match self.credentials.get() {
      Some(token) => request.bearer(&token),
      None => request,
    }
  }

  async fn send<T: DeserializeOwned>(&self, request: GatewayRequest) -> Result<T, StoreError> {
    let response = self.gateway.fetch(self.authorize(request)).await;
    decode_envelope(&response)
  }
}

/// Parse an endpoint, normalizing to a trailing slash so joins append.
pub(crate) fn parse_base(endpoint: &str) -> Result<Url, StoreError> {
  let normalized = if endpoint.ends_with('/') {
    endpoint.to_string()
  } else {
    format!("{}/", endpoint)
  };
  Url::parse(&normalized).map_err(|e| StoreError::Malformed(format!("bad endpoint {}: {}", endpoint, e)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::gateway::ServedBy;

  fn response(status: u16, body: &str) -> GatewayResponse {
    GatewayResponse {
      status,
      content_type: Some("application/json".to_string()),
      body: body.as_bytes().to_vec(),
      served: ServedBy::Network,
    }
  }

  #[test]
  fn test_decode_success_envelope() {
    let response = response(200, r#"{"success":true,"data":[1,2,3]}"#);
    let data: Vec<u32> = decode_envelope(&response).unwrap();
    assert_eq!(data, vec![1, 2, 3]);
  }

  #[test]
  fn test_decode_offline_envelope() {
    let response = response(200, r#"{"success":false,"error":"Offline"}"#);
    let result: Result<Vec<u32>, _> = decode_envelope(&response);
    assert_eq!(result.unwrap_err(), StoreError::Offline);
  }

  #[test]
  fn test_decode_rejected_envelope() {
    let response = response(400, r#"{"success":false,"error":"title too long"}"#);
    let result: Result<Vec<u32>, _> = decode_envelope(&response);
    assert_eq!(result.unwrap_err(), StoreError::Rejected("title too long".to_string()));
  }

  #[test]
  fn test_decode_http_error_without_envelope() {
    let response = response(503, "Offline");
    let result: Result<Vec<u32>, _> = decode_envelope(&response);
    assert_eq!(result.unwrap_err(), StoreError::Http(503));
  }

  #[test]
  fn test_decode_malformed_success_body() {
    let response = response(200, "not json at all");
    let result: Result<Vec<u32>, _> = decode_envelope(&response);
    assert!(matches!(result.unwrap_err(), StoreError::Malformed(_)));
  }

  #[test]
  fn test_parse_base_normalizes_trailing_slash() {
    let base = parse_base("https://api.snipstash.dev/v1").unwrap();
    assert_eq!(base.join("snippets").unwrap().as_str(), "https://api.snipstash.dev/v1/snippets");
  }
}
