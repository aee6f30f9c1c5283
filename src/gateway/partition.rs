//! Request classification for the offline gateway.

use url::Url;

use super::GatewayConfig;

/// Handling class for an outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
  /// Third-party static assets, immutable per URL: cache-first.
  Cdn,
  /// Document store / AI endpoint: network-only, never cached.
  Live,
  /// First-party application shell: network-first with cache fallback.
  Shell,
}

/// Classify a request by host. Pure: the same URL always routes to the
/// same partition.
///
/// CDN hosts match exactly; live hosts match by substring so that
/// regional API subdomains share the partition.
pub fn classify(url: &Url, config: &GatewayConfig) -> Partition {
  let host = url.host_str().unwrap_or("");

  if config.cdn_hosts.iter().any(|h| h == host) {
    return Partition::Cdn;
  }

  if config.live_hosts.iter().any(|h| host.contains(h.as_str())) {
    return Partition::Live;
  }

  Partition::Shell
}

#[cfg(test)]
mod tests {
  use super::*;

  fn config() -> GatewayConfig {
    GatewayConfig {
      shell_origin: Url::parse("https://app.snipstash.dev").unwrap(),
      shell_version: "shell-v1".to_string(),
      cdn_hosts: vec!["cdnjs.cloudflare.com".to_string(), "fonts.gstatic.com".to_string()],
      live_hosts: vec!["api.snipstash.dev".to_string(), "groq.com".to_string()],
      precache: Vec::new(),
    }
  }

  fn classify_str(url: &str) -> Partition {
    classify(&Url::parse(url).unwrap(), &config())
  }

  #[test]
  fn test_cdn_host_exact_match() {
    assert_eq!(
      classify_str("https://cdnjs.cloudflare.com/ajax/libs/editor/0.44.0/loader.js"),
      Partition::Cdn
    );
    assert_eq!(classify_str("https://fonts.gstatic.com/s/firacode.woff2"), Partition::Cdn);
  }

  #[test]
  fn test_cdn_requires_exact_host() {
    // A lookalike subdomain is not the CDN
    assert_ne!(classify_str("https://evil.cdnjs.cloudflare.com.example/x"), Partition::Cdn);
  }

  #[test]
  fn test_live_host_substring_match() {
    assert_eq!(classify_str("https://api.snipstash.dev/v1/snippets"), Partition::Live);
    assert_eq!(
      classify_str("https://api.groq.com/openai/v1/chat/completions"),
      Partition::Live
    );
  }

  #[test]
  fn test_everything_else_is_shell() {
    assert_eq!(classify_str("https://app.snipstash.dev/index.html"), Partition::Shell);
    assert_eq!(classify_str("https://app.snipstash.dev/style.css"), Partition::Shell);
    assert_eq!(classify_str("https://somewhere.else/page"), Partition::Shell);
  }

  #[test]
  fn test_routing_is_stable() {
    // Same URL, same partition, across calls
    for _ in 0..3 {
      assert_eq!(classify_str("https://api.snipstash.dev/v1/snippets"), Partition::Live);
      assert_eq!(classify_str("https://app.snipstash.dev/app.js"), Partition::Shell);
    }
  }

  #[test]
  fn test_path_does_not_affect_routing() {
    assert_eq!(classify_str("https://api.snipstash.dev/"), Partition::Live);
    assert_eq!(classify_str("https://api.snipstash.dev/v1/account/sessions"), Partition::Live);
  }
}
