//! Versioned response cache on SQLite.
//!
//! Stores (request → response) snapshots partitioned by a generation tag.
//! Shell partitions are superseded wholesale on version activation; the CDN
//! partition is keyed by immutable URLs and survives shell bumps.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// A stored response: status line, content type and body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSnapshot {
  pub status: u16,
  pub content_type: Option<String>,
  pub body: Vec<u8>,
}

/// A snapshot plus the time it was written.
#[derive(Debug, Clone)]
pub struct CachedResponse {
  pub snapshot: ResponseSnapshot,
  pub cached_at: DateTime<Utc>,
}

/// Durable key-value cache of response snapshots, partitioned by tag.
#[derive(Clone)]
pub struct CacheStore {
  conn: Arc<Mutex<Connection>>,
}

/// Schema for the response cache.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS response_cache (
    partition TEXT NOT NULL,
    request_key TEXT NOT NULL,
    method TEXT NOT NULL,
    url TEXT NOT NULL,
    status INTEGER NOT NULL,
    content_type TEXT,
    body BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (partition, request_key)
);

CREATE INDEX IF NOT EXISTS idx_response_cache_partition
    ON response_cache(partition);
"#;

impl CacheStore {
  /// Open or create the cache database at the given path.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    let store = Self {
      conn: Arc::new(Mutex::new(conn)),
    };
    store.run_migrations()?;

    Ok(store)
  }

  /// In-memory cache, used in tests.
  pub fn in_memory() -> Result<Self> {
    let conn =
      Connection::open_in_memory().map_err(|e| eyre!("Failed to open in-memory cache: {}", e))?;

    let store = Self {
      conn: Arc::new(Mutex::new(conn)),
    };
    store.run_migrations()?;

    Ok(store)
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self.lock()?;
    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;
    Ok(())
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
    self.conn.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  /// Scoped handle onto one partition. Idempotent: the same tag always
  /// addresses the same underlying rows.
  pub fn partition(&self, tag: &str) -> PartitionCache {
    PartitionCache {
      store: self.clone(),
      tag: tag.to_string(),
    }
  }

  /// All partition tags currently present.
  pub fn partitions(&self) -> Result<Vec<String>> {
    let conn = self.lock()?;
    let mut stmt = conn
      .prepare("SELECT DISTINCT partition FROM response_cache ORDER BY partition")
      .map_err(|e| eyre!("Failed to prepare partition query: {}", e))?;

    let tags = stmt
      .query_map([], |row| row.get::<_, String>(0))
      .map_err(|e| eyre!("Failed to list partitions: {}", e))?
      .filter_map(|r| r.ok())
      .collect();

    Ok(tags)
  }

  /// Generation cutover: delete every partition whose tag is not kept.
  /// Returns the purged tags.
  pub fn activate_version(&self, keep: &[&str]) -> Result<Vec<String>> {
    let purged: Vec<String> = self
      .partitions()?
      .into_iter()
      .filter(|tag| !keep.contains(&tag.as_str()))
      .collect();

    let conn = self.lock()?;
    for tag in &purged {
      conn
        .execute("DELETE FROM response_cache WHERE partition = ?", params![tag])
        .map_err(|e| eyre!("Failed to purge partition {}: {}", tag, e))?;
    }

    Ok(purged)
  }
}

/// Handle onto a single cache partition.
#[derive(Clone)]
pub struct PartitionCache {
  store: CacheStore,
  tag: String,
}

impl PartitionCache {
  /// Store a snapshot, overwriting any existing entry for the same
  /// method + URL within this partition.
  pub fn put(&self, method: &str, url: &str, snapshot: &ResponseSnapshot) -> Result<()> {
    let key = request_key(method, url);
    let conn = self.store.lock()?;

    conn
      .execute(
        "INSERT OR REPLACE INTO response_cache
           (partition, request_key, method, url, status, content_type, body, cached_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, datetime('now'))",
        params![
          self.tag,
          key,
          method,
          url,
          snapshot.status,
          snapshot.content_type,
          snapshot.body
        ],
      )
      .map_err(|e| eyre!("Failed to store response for {}: {}", url, e))?;

    Ok(())
  }

  /// Exact-match lookup; no partial matches.
  pub fn lookup(&self, method: &str, url: &str) -> Result<Option<CachedResponse>> {
    let key = request_key(method, url);
    let conn = self.store.lock()?;

    let row: Option<(u16, Option<String>, Vec<u8>, String)> = conn
      .query_row(
        "SELECT status, content_type, body, cached_at FROM response_cache
         WHERE partition = ? AND request_key = ?",
        params![self.tag, key],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to query cache for {}: {}", url, e))?;

    match row {
      Some((status, content_type, body, cached_at_str)) => {
        let cached_at = parse_datetime(&cached_at_str)?;
        Ok(Some(CachedResponse {
          snapshot: ResponseSnapshot {
            status,
            content_type,
            body,
          },
          cached_at,
        }))
      }
      None => Ok(None),
    }
  }
}

/// Stable fixed-length key for a request: SHA-256 of "METHOD URL".
fn request_key(method: &str, url: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(method.as_bytes());
  hasher.update(b" ");
  hasher.update(url.as_bytes());
  hex::encode(hasher.finalize())
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn snap(status: u16, body: &str) -> ResponseSnapshot {
    ResponseSnapshot {
      status,
      content_type: Some("text/html".to_string()),
      body: body.as_bytes().to_vec(),
    }
  }

  #[test]
  fn test_put_and_lookup() {
    let store = CacheStore::in_memory().unwrap();
    let shell = store.partition("shell-v1");

    shell
      .put("GET", "https://app.example/index.html", &snap(200, "<html>"))
      .unwrap();

    let hit = shell
      .lookup("GET", "https://app.example/index.html")
      .unwrap()
      .unwrap();
    assert_eq!(hit.snapshot.status, 200);
    assert_eq!(hit.snapshot.body, b"<html>");
  }

  #[test]
  fn test_lookup_miss() {
    let store = CacheStore::in_memory().unwrap();
    let shell = store.partition("shell-v1");
    assert!(shell.lookup("GET", "https://app.example/none").unwrap().is_none());
  }

  #[test]
  fn test_put_overwrites() {
    let store = CacheStore::in_memory().unwrap();
    let shell = store.partition("shell-v1");
    shell.put("GET", "https://app.example/", &snap(200, "old")).unwrap();
    shell.put("GET", "https://app.example/", &snap(200, "new")).unwrap();

    let hit = shell.lookup("GET", "https://app.example/").unwrap().unwrap();
    assert_eq!(hit.snapshot.body, b"new");
  }

  #[test]
  fn test_method_distinguishes_entries() {
    let store = CacheStore::in_memory().unwrap();
    let p = store.partition("shell-v1");
    p.put("GET", "https://app.example/x", &snap(200, "get")).unwrap();
    assert!(p.lookup("POST", "https://app.example/x").unwrap().is_none());
  }

  #[test]
  fn test_partition_isolation() {
    let store = CacheStore::in_memory().unwrap();
    store
      .partition("shell-v1")
      .put("GET", "https://app.example/", &snap(200, "v1"))
      .unwrap();

    assert!(store
      .partition("shell-v2")
      .lookup("GET", "https://app.example/")
      .unwrap()
      .is_none());
  }

  #[test]
  fn test_version_cutover_purges_stale_shell_keeps_cdn() {
    let store = CacheStore::in_memory().unwrap();
    store
      .partition("shell-v1")
      .put("GET", "https://app.example/app.js", &snap(200, "v1"))
      .unwrap();
    store
      .partition("cdn-v1")
      .put("GET", "https://cdn.example/lib.js", &snap(200, "lib"))
      .unwrap();
    store
      .partition("shell-v2")
      .put("GET", "https://app.example/app.js", &snap(200, "v2"))
      .unwrap();

    let purged = store.activate_version(&["shell-v2", "cdn-v1"]).unwrap();
    assert_eq!(purged, vec!["shell-v1".to_string()]);

    // v1 entries are gone; v2 and CDN survive
    assert!(store
      .partition("shell-v1")
      .lookup("GET", "https://app.example/app.js")
      .unwrap()
      .is_none());
    assert!(store
      .partition("shell-v2")
      .lookup("GET", "https://app.example/app.js")
      .unwrap()
      .is_some());
    assert!(store
      .partition("cdn-v1")
      .lookup("GET", "https://cdn.example/lib.js")
      .unwrap()
      .is_some());
  }

  #[test]
  fn test_cutover_twice() {
    let store = CacheStore::in_memory().unwrap();
    for (tag, body) in [("shell-t1", "t1"), ("cdn-v1", "lib")] {
      store
        .partition(tag)
        .put("GET", "https://app.example/", &snap(200, body))
        .unwrap();
    }
    store.activate_version(&["shell-t1", "cdn-v1"]).unwrap();

    store
      .partition("shell-t2")
      .put("GET", "https://app.example/", &snap(200, "t2"))
      .unwrap();
    store.activate_version(&["shell-t2", "cdn-v1"]).unwrap();

    assert!(store
      .partition("shell-t1")
      .lookup("GET", "https://app.example/")
      .unwrap()
      .is_none());
    assert!(store
      .partition("cdn-v1")
      .lookup("GET", "https://app.example/")
      .unwrap()
      .is_some());
  }

  #[test]
  fn test_open_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");
    let store = CacheStore::open(&path).unwrap();
    store
      .partition("shell-v1")
      .put("GET", "https://app.example/", &snap(200, "x"))
      .unwrap();

    // Reopen and read back
    drop(store);
    let store = CacheStore::open(&path).unwrap();
    assert!(store
      .partition("shell-v1")
      .lookup("GET", "https://app.example/")
      .unwrap()
      .is_some());
  }
}
