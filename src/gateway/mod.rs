//! Offline gateway: the transport layer every outbound request flows
//! through.
//!
//! Mirrors a deploy-versioned caching scheme: CDN assets are cache-first
//! and immutable per URL, live data (document store, AI endpoint) is
//! network-only with a synthesized failure envelope when offline, and the
//! first-party shell is network-first with cache fallback. The gateway owns
//! the cache store exclusively; nothing else in the app touches it.

pub mod partition;
mod store;

pub use partition::{classify, Partition};
pub use store::{CacheStore, ResponseSnapshot};

use color_eyre::Result;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;

/// Tag for the CDN partition. Fixed: CDN entries are keyed by immutable
/// URLs and survive shell version bumps.
pub const CDN_VERSION: &str = "cdn-v1";

/// Body of the synthesized live-data failure envelope.
const OFFLINE_ENVELOPE: &str = r#"{"success":false,"error":"Offline"}"#;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Runtime configuration for the gateway, derived from [`Config`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
  pub shell_origin: Url,
  pub shell_version: String,
  pub cdn_hosts: Vec<String>,
  pub live_hosts: Vec<String>,
  pub precache: Vec<String>,
}

impl GatewayConfig {
  pub fn from_config(config: &Config) -> Result<Self> {
    let shell_origin = Url::parse(&config.shell.origin)
      .map_err(|e| color_eyre::eyre::eyre!("Invalid shell origin {}: {}", config.shell.origin, e))?;

    let mut live_hosts = Vec::new();
    for endpoint in [&config.store.endpoint, &config.ai.endpoint] {
      if let Some(host) = Url::parse(endpoint).ok().and_then(|u| u.host_str().map(String::from)) {
        live_hosts.push(host);
      }
    }

    Ok(Self {
      shell_origin,
      shell_version: config.shell.version_tag(),
      cdn_hosts: config.shell.cdn_hosts.clone(),
      live_hosts,
      precache: config.shell.precache.clone(),
    })
  }
}

/// An outbound request as seen by the gateway.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
  pub method: reqwest::Method,
  pub url: Url,
  pub headers: Vec<(String, String)>,
  pub body: Option<serde_json::Value>,
  /// Page-navigation requests fall back to the cached entry point when
  /// the shell is unreachable and the exact entry is missing.
  pub navigate: bool,
}

impl GatewayRequest {
  pub fn get(url: Url) -> Self {
    Self {
      method: reqwest::Method::GET,
      url,
      headers: Vec::new(),
      body: None,
      navigate: false,
    }
  }

  pub fn json(method: reqwest::Method, url: Url, body: serde_json::Value) -> Self {
    Self {
      method,
      url,
      headers: Vec::new(),
      body: Some(body),
      navigate: false,
    }
  }

  pub fn navigation(url: Url) -> Self {
    Self {
      navigate: true,
      ..Self::get(url)
    }
  }

  pub fn header(mut self, name: &str, value: &str) -> Self {
    self.headers.push((name.to_string(), value.to_string()));
    self
  }

  pub fn bearer(self, token: &str) -> Self {
    let value = format!("Bearer {}", token);
    self.header("Authorization", &value)
  }
}

/// Where a gateway response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedBy {
  /// Fresh network response
  Network,
  /// Matching cache entry
  Cache,
  /// Cached shell entry point, substituted for a failed navigation
  EntryPoint,
  /// Synthesized by the gateway (offline envelope or 503)
  Synthesized,
}

/// A response as the gateway hands it to callers. Always well-formed;
/// network failures have already been converted to fallbacks.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
  pub status: u16,
  pub content_type: Option<String>,
  pub body: Vec<u8>,
  pub served: ServedBy,
}

impl GatewayResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  pub fn json<T: DeserializeOwned>(&self) -> std::result::Result<T, serde_json::Error> {
    serde_json::from_slice(&self.body)
  }

  fn from_snapshot(snapshot: ResponseSnapshot, served: ServedBy) -> Self {
    Self {
      status: snapshot.status,
      content_type: snapshot.content_type,
      body: snapshot.body,
      served,
    }
  }

  /// Well-formed failure envelope for live-data calls made offline.
  fn offline_envelope() -> Self {
    Self {
      status: 200,
      content_type: Some("application/json".to_string()),
      body: OFFLINE_ENVELOPE.as_bytes().to_vec(),
      served: ServedBy::Synthesized,
    }
  }

  /// Generic 503 for asset fetches with no cached fallback.
  fn unavailable() -> Self {
    Self {
      status: 503,
      content_type: Some("text/plain".to_string()),
      body: b"Offline".to_vec(),
      served: ServedBy::Synthesized,
    }
  }
}

/// Control messages accepted by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayMessage {
  /// Force immediate activation, even before install naturally completes.
  SkipWaiting,
}

/// Gateway lifecycle. Fetches are served from the configured generation
/// regardless; activation controls when stale generations are purged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
  Installing,
  Waiting,
  Active,
}

/// Events the gateway reacts to, dispatched by kind.
#[derive(Debug)]
pub enum GatewayEvent {
  Install,
  Activate,
  Fetch(GatewayRequest),
  Message(GatewayMessage),
}

struct GatewayInner {
  http: reqwest::Client,
  cache: CacheStore,
  config: GatewayConfig,
  lifecycle: Mutex<Lifecycle>,
}

/// The offline gateway. Cheap to clone; all clones share the cache and
/// lifecycle.
#[derive(Clone)]
pub struct Gateway {
  inner: Arc<GatewayInner>,
}

impl Gateway {
  pub fn new(config: GatewayConfig, cache: CacheStore) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(REQUEST_TIMEOUT)
      .build()
      .map_err(|e| color_eyre::eyre::eyre!("Failed to build HTTP client: {}", e))?;

    Ok(Self {
      inner: Arc::new(GatewayInner {
        http,
        cache,
        config,
        lifecycle: Mutex::new(Lifecycle::Installing),
      }),
    })
  }

  pub fn lifecycle(&self) -> Lifecycle {
    *self.inner.lifecycle.lock().unwrap_or_else(|e| e.into_inner())
  }

  fn set_lifecycle(&self, state: Lifecycle) {
    *self.inner.lifecycle.lock().unwrap_or_else(|e| e.into_inner()) = state;
  }

  /// React to a gateway event. Only `Fetch` produces a response.
  pub async fn dispatch(&self, event: GatewayEvent) -> Result<Option<GatewayResponse>> {
    match event {
      GatewayEvent::Install => {
        self.install().await;
        Ok(None)
      }
      GatewayEvent::Activate => {
        self.activate()?;
        Ok(None)
      }
      GatewayEvent::Fetch(request) => Ok(Some(self.fetch(request).await)),
      GatewayEvent::Message(message) => {
        self.handle_message(message)?;
        Ok(None)
      }
    }
  }

  /// Best-effort precache of the shell manifest. Each URL is fetched
  /// independently; one broken asset cannot block the rest.
  pub async fn install(&self) {
    let shell = self.inner.cache.partition(&self.inner.config.shell_version);

    let fetches = self.inner.config.precache.iter().map(|path| {
      let url = self.inner.config.shell_origin.join(path);
      let shell = shell.clone();
      async move {
        let url = match url {
          Ok(u) => u,
          Err(e) => {
            debug!("precache: skipping unjoinable path: {}", e);
            return;
          }
        };
        match self.network(reqwest::Method::GET, url.clone(), &[], None, "no-store").await {
          Ok(snapshot) if (200..300).contains(&snapshot.status) => {
            if let Err(e) = shell.put("GET", url.as_str(), &snapshot) {
              warn!("precache: failed to store {}: {}", url, e);
            }
          }
          Ok(snapshot) => debug!("precache: {} answered {}", url, snapshot.status),
          Err(e) => debug!("precache: {} unreachable: {}", url, e),
        }
      }
    });

    join_all(fetches).await;

    let mut lifecycle = self.inner.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
    if *lifecycle == Lifecycle::Installing {
      *lifecycle = Lifecycle::Waiting;
    }
  }

  /// Generation cutover: purge every partition other than the current
  /// shell generation and the CDN partition, then take control.
  pub fn activate(&self) -> Result<()> {
    let purged = self
      .inner
      .cache
      .activate_version(&[self.inner.config.shell_version.as_str(), CDN_VERSION])?;

    if !purged.is_empty() {
      info!("activated {}; purged {:?}", self.inner.config.shell_version, purged);
    }

    self.set_lifecycle(Lifecycle::Active);
    Ok(())
  }

  /// Message-driven override: skip waiting and activate immediately.
  pub fn handle_message(&self, message: GatewayMessage) -> Result<()> {
    match message {
      GatewayMessage::SkipWaiting => {
        if self.lifecycle() != Lifecycle::Active {
          self.activate()?;
        }
        Ok(())
      }
    }
  }

  /// The configured shell origin (share pages, precache manifest).
  pub fn shell_origin(&self) -> &Url {
    &self.inner.config.shell_origin
  }

  /// Handle an outbound request. Never fails: network and storage errors
  /// are converted to cached fallbacks or synthesized responses.
  pub async fn fetch(&self, request: GatewayRequest) -> GatewayResponse {
    let method = request.method.clone();
    let url = request.url.clone();

    let response = match classify(&request.url, &self.inner.config) {
      Partition::Cdn => self.fetch_cdn(request).await,
      Partition::Live => self.fetch_live(request).await,
      Partition::Shell => self.fetch_shell(request).await,
    };

    debug!("{} {} -> {} ({:?})", method, url, response.status, response.served);
    response
  }

  /// CDN assets: cache-first, stored on first successful fetch.
  async fn fetch_cdn(&self, request: GatewayRequest) -> GatewayResponse {
    let cdn = self.inner.cache.partition(CDN_VERSION);
    let method = request.method.as_str().to_string();

    match cdn.lookup(&method, request.url.as_str()) {
      Ok(Some(hit)) => return GatewayResponse::from_snapshot(hit.snapshot, ServedBy::Cache),
      Ok(None) => {}
      Err(e) => warn!("cdn cache read failed for {}: {}", request.url, e),
    }

    match self
      .network(request.method.clone(), request.url.clone(), &request.headers, None, "default")
      .await
    {
      Ok(snapshot) => {
        if (200..300).contains(&snapshot.status) {
          if let Err(e) = cdn.put(&method, request.url.as_str(), &snapshot) {
            warn!("cdn cache write failed for {}: {}", request.url, e);
          }
        }
        GatewayResponse::from_snapshot(snapshot, ServedBy::Network)
      }
      Err(e) => {
        debug!("cdn fetch failed for {}: {}", request.url, e);
        GatewayResponse::unavailable()
      }
    }
  }

  /// Live data: network-only. On transport failure, callers still get a
  /// well-formed result envelope.
  async fn fetch_live(&self, request: GatewayRequest) -> GatewayResponse {
    match self
      .network(
        request.method.clone(),
        request.url.clone(),
        &request.headers,
        request.body.as_ref(),
        "no-store",
      )
      .await
    {
      Ok(snapshot) => GatewayResponse::from_snapshot(snapshot, ServedBy::Network),
      Err(e) => {
        debug!("live fetch failed for {}: {}", request.url, e);
        GatewayResponse::offline_envelope()
      }
    }
  }

  /// Shell assets: network-first so deploys appear instantly, cache
  /// fallback when unreachable, entry point for failed navigations.
  async fn fetch_shell(&self, request: GatewayRequest) -> GatewayResponse {
    let shell = self.inner.cache.partition(&self.inner.config.shell_version);
    let method = request.method.as_str().to_string();

    match self
      .network(request.method.clone(), request.url.clone(), &request.headers, None, "no-cache")
      .await
    {
      Ok(snapshot) => {
        if (200..300).contains(&snapshot.status) {
          if let Err(e) = shell.put(&method, request.url.as_str(), &snapshot) {
            warn!("shell cache write failed for {}: {}", request.url, e);
          }
        }
        GatewayResponse::from_snapshot(snapshot, ServedBy::Network)
      }
      Err(e) => {
        debug!("shell fetch failed for {}: {}", request.url, e);

        match shell.lookup(&method, request.url.as_str()) {
          Ok(Some(hit)) => {
            debug!("serving {} from shell cache (cached {})", request.url, hit.cached_at);
            GatewayResponse::from_snapshot(hit.snapshot, ServedBy::Cache)
          }
          Ok(None) if request.navigate => self.entry_point_fallback(&shell),
          Ok(None) => GatewayResponse::unavailable(),
          Err(e) => {
            warn!("shell cache read failed for {}: {}", request.url, e);
            GatewayResponse::unavailable()
          }
        }
      }
    }
  }

  fn entry_point_fallback(&self, shell: &store::PartitionCache) -> GatewayResponse {
    let entry = self.inner.config.shell_origin.join("/index.html");
    if let Ok(entry) = entry {
      if let Ok(Some(hit)) = shell.lookup("GET", entry.as_str()) {
        return GatewayResponse::from_snapshot(hit.snapshot, ServedBy::EntryPoint);
      }
    }
    GatewayResponse::unavailable()
  }

  async fn network(
    &self,
    method: reqwest::Method,
    url: Url,
    headers: &[(String, String)],
    body: Option<&serde_json::Value>,
    cache_control: &str,
  ) -> std::result::Result<ResponseSnapshot, reqwest::Error> {
    let mut builder = self.inner.http.request(method, url);

    if cache_control != "default" {
      builder = builder.header("Cache-Control", cache_control);
    }
    for (name, value) in headers {
      builder = builder.header(name, value);
    }
    if let Some(body) = body {
      builder = builder.json(body);
    }

    let response = builder.send().await?;
    let status = response.status().as_u16();
    let content_type = response
      .headers()
      .get(reqwest::header::CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .map(String::from);
    let body = response.bytes().await?.to_vec();

    Ok(ResponseSnapshot {
      status,
      content_type,
      body,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  /// Gateway whose origins all point at an unroutable port, so every
  /// network attempt fails fast.
  fn offline_gateway() -> Gateway {
    let config = GatewayConfig {
      shell_origin: Url::parse("http://127.0.0.1:1").unwrap(),
      shell_version: "shell-test".to_string(),
      cdn_hosts: vec!["cdn.invalid".to_string()],
      live_hosts: vec!["127.0.0.1".to_string()],
      precache: vec!["/".to_string(), "/index.html".to_string()],
    };
    Gateway::new(config, CacheStore::in_memory().unwrap()).unwrap()
  }

  fn cache(gateway: &Gateway) -> &CacheStore {
    &gateway.inner.cache
  }

  fn snap(body: &str) -> ResponseSnapshot {
    ResponseSnapshot {
      status: 200,
      content_type: Some("text/html".to_string()),
      body: body.as_bytes().to_vec(),
    }
  }

  #[tokio::test]
  async fn test_live_offline_synthesizes_envelope() {
    let gateway = offline_gateway();
    let url = Url::parse("http://127.0.0.1:1/v1/snippets").unwrap();

    let response = gateway.fetch(GatewayRequest::get(url)).await;

    assert_eq!(response.served, ServedBy::Synthesized);
    assert_eq!(response.status, 200);
    assert_eq!(response.content_type.as_deref(), Some("application/json"));

    let envelope: serde_json::Value = response.json().unwrap();
    assert_eq!(envelope["success"], serde_json::json!(false));
    assert_eq!(envelope["error"], serde_json::json!("Offline"));
  }

  #[tokio::test]
  async fn test_live_never_reads_cache() {
    let gateway = offline_gateway();
    let url = Url::parse("http://127.0.0.1:1/v1/snippets").unwrap();

    // Even with a matching entry planted in every partition, live data
    // does not come from the cache.
    for tag in ["shell-test", CDN_VERSION] {
      cache(&gateway)
        .partition(tag)
        .put("GET", url.as_str(), &snap("stale"))
        .unwrap();
    }

    let response = gateway.fetch(GatewayRequest::get(url)).await;
    assert_eq!(response.served, ServedBy::Synthesized);
  }

  #[tokio::test]
  async fn test_shell_falls_back_to_cache() {
    let gateway = offline_gateway();
    let url = Url::parse("http://127.0.0.2:1/style.css").unwrap();

    cache(&gateway)
      .partition("shell-test")
      .put("GET", url.as_str(), &snap("body{}"))
      .unwrap();

    let response = gateway.fetch(GatewayRequest::get(url)).await;
    assert_eq!(response.served, ServedBy::Cache);
    assert_eq!(response.body, b"body{}");
  }

  #[tokio::test]
  async fn test_navigation_falls_back_to_entry_point() {
    let gateway = offline_gateway();
    let entry = Url::parse("http://127.0.0.1:1/index.html").unwrap();

    cache(&gateway)
      .partition("shell-test")
      .put("GET", entry.as_str(), &snap("<html>app</html>"))
      .unwrap();

    // A navigation to a page that was never cached
    let url = Url::parse("http://127.0.0.2:1/snippets/abc").unwrap();
    let response = gateway.fetch(GatewayRequest::navigation(url)).await;

    assert_eq!(response.served, ServedBy::EntryPoint);
    assert_eq!(response.body, b"<html>app</html>");
  }

  #[tokio::test]
  async fn test_shell_miss_synthesizes_503() {
    let gateway = offline_gateway();
    let url = Url::parse("http://127.0.0.2:1/missing.js").unwrap();

    let response = gateway.fetch(GatewayRequest::get(url)).await;
    assert_eq!(response.served, ServedBy::Synthesized);
    assert_eq!(response.status, 503);
  }

  #[tokio::test]
  async fn test_cdn_is_cache_first() {
    let gateway = offline_gateway();
    let url = Url::parse("https://cdn.invalid/lib/editor.js").unwrap();

    cache(&gateway)
      .partition(CDN_VERSION)
      .put("GET", url.as_str(), &snap("editor"))
      .unwrap();

    let response = gateway.fetch(GatewayRequest::get(url)).await;
    assert_eq!(response.served, ServedBy::Cache);
    assert_eq!(response.body, b"editor");
  }

  #[tokio::test]
  async fn test_cdn_miss_offline_synthesizes_503() {
    let gateway = offline_gateway();
    let url = Url::parse("https://cdn.invalid/lib/missing.js").unwrap();

    let response = gateway.fetch(GatewayRequest::get(url)).await;
    assert_eq!(response.served, ServedBy::Synthesized);
    assert_eq!(response.status, 503);
  }

  #[tokio::test]
  async fn test_activate_purges_stale_generations() {
    let gateway = offline_gateway();
    let url = "http://127.0.0.1:1/app.js";

    cache(&gateway).partition("shell-old").put("GET", url, &snap("old")).unwrap();
    cache(&gateway).partition(CDN_VERSION).put("GET", url, &snap("lib")).unwrap();

    gateway.activate().unwrap();

    assert_eq!(gateway.lifecycle(), Lifecycle::Active);
    assert!(cache(&gateway).partition("shell-old").lookup("GET", url).unwrap().is_none());
    assert!(cache(&gateway).partition(CDN_VERSION).lookup("GET", url).unwrap().is_some());
  }

  #[tokio::test]
  async fn test_skip_waiting_activates_early() {
    let gateway = offline_gateway();
    assert_eq!(gateway.lifecycle(), Lifecycle::Installing);

    gateway.handle_message(GatewayMessage::SkipWaiting).unwrap();
    assert_eq!(gateway.lifecycle(), Lifecycle::Active);
  }

  #[tokio::test]
  async fn test_install_failures_are_isolated() {
    // Origin unreachable: install still completes and moves to Waiting.
    let gateway = offline_gateway();
    gateway.install().await;
    assert_eq!(gateway.lifecycle(), Lifecycle::Waiting);
  }

  #[tokio::test]
  async fn test_dispatch_fetch_returns_response() {
    let gateway = offline_gateway();
    let url = Url::parse("http://127.0.0.1:1/v1/snippets").unwrap();

    let response = gateway
      .dispatch(GatewayEvent::Fetch(GatewayRequest::get(url)))
      .await
      .unwrap();
    assert!(response.is_some());

    let none = gateway.dispatch(GatewayEvent::Activate).await.unwrap();
    assert!(none.is_none());
  }
}
