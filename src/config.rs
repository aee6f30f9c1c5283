use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub store: StoreConfig,
  #[serde(default)]
  pub ai: AiConfig,
  #[serde(default)]
  pub shell: ShellConfig,
}

/// Remote document store (snippets + accounts).
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
  #[serde(default = "default_store_endpoint")]
  pub endpoint: String,
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      endpoint: default_store_endpoint(),
    }
  }
}

/// OpenAI-compatible completion endpoint used for analyze/explain.
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
  #[serde(default = "default_ai_endpoint")]
  pub endpoint: String,
  #[serde(default = "default_ai_model")]
  pub model: String,
}

impl Default for AiConfig {
  fn default() -> Self {
    Self {
      endpoint: default_ai_endpoint(),
      model: default_ai_model(),
    }
  }
}

/// First-party web shell served alongside the API, plus the CDN hosts its
/// assets come from. The offline gateway partitions traffic with these.
#[derive(Debug, Clone, Deserialize)]
pub struct ShellConfig {
  #[serde(default = "default_shell_origin")]
  pub origin: String,
  /// Version tag for the shell cache generation. Bumped per deploy;
  /// defaults to a tag derived from the crate version.
  #[serde(default)]
  pub version: Option<String>,
  #[serde(default = "default_cdn_hosts")]
  pub cdn_hosts: Vec<String>,
  #[serde(default = "default_precache")]
  pub precache: Vec<String>,
}

impl Default for ShellConfig {
  fn default() -> Self {
    Self {
      origin: default_shell_origin(),
      version: None,
      cdn_hosts: default_cdn_hosts(),
      precache: default_precache(),
    }
  }
}

impl ShellConfig {
  /// The active shell cache generation tag.
  pub fn version_tag(&self) -> String {
    self
      .version
      .clone()
      .unwrap_or_else(|| format!("shell-v{}", env!("CARGO_PKG_VERSION")))
  }
}

fn default_store_endpoint() -> String {
  "https://api.snipstash.dev/v1".to_string()
}

fn default_ai_endpoint() -> String {
  "https://api.groq.com/openai/v1".to_string()
}

fn default_ai_model() -> String {
  "llama-3.3-70b-versatile".to_string()
}

fn default_shell_origin() -> String {
  "https://app.snipstash.dev".to_string()
}

fn default_cdn_hosts() -> Vec<String> {
  [
    "cdnjs.cloudflare.com",
    "cdn.jsdelivr.net",
    "fonts.googleapis.com",
    "fonts.gstatic.com",
  ]
  .iter()
  .map(|s| s.to_string())
  .collect()
}

fn default_precache() -> Vec<String> {
  [
    "/",
    "/index.html",
    "/style.css",
    "/auth.css",
    "/app.js",
    "/auth.js",
    "/manifest.json",
  ]
  .iter()
  .map(|s| s.to_string())
  .collect()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./snipstash.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/snipstash/config.yaml
  ///
  /// Every field has a default, so a missing config file yields a usable
  /// configuration; an explicit path that does not exist is an error.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("snipstash.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("snipstash").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }
}

/// Per-user data directory for the cache database, session, key and logs.
pub fn data_dir() -> Result<PathBuf> {
  let base = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;

  Ok(base.join("snipstash"))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults_without_file() {
    let config = Config::default();
    assert_eq!(config.store.endpoint, "https://api.snipstash.dev/v1");
    assert_eq!(config.ai.model, "llama-3.3-70b-versatile");
    assert!(config
      .shell
      .cdn_hosts
      .contains(&"cdn.jsdelivr.net".to_string()));
    assert!(config.shell.precache.contains(&"/index.html".to_string()));
  }

  #[test]
  fn test_partial_yaml_fills_defaults() {
    let config: Config =
      serde_yaml::from_str("store:\n  endpoint: http://localhost:9090/v1\n").unwrap();
    assert_eq!(config.store.endpoint, "http://localhost:9090/v1");
    assert_eq!(config.ai.endpoint, "https://api.groq.com/openai/v1");
  }

  #[test]
  fn test_version_tag_default() {
    let shell = ShellConfig::default();
    assert!(shell.version_tag().starts_with("shell-v"));
  }

  #[test]
  fn test_version_tag_explicit() {
    let shell = ShellConfig {
      version: Some("shell-20260807".to_string()),
      ..Default::default()
    };
    assert_eq!(shell.version_tag(), "shell-20260807");
  }
}
