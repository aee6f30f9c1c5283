use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated account identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub id: String,
  pub name: String,
  pub email: String,
}

impl Identity {
  /// Short initials for the user bar (up to two characters).
  pub fn initials(&self) -> String {
    if self.name.is_empty() {
      return self.email.chars().take(1).collect::<String>().to_uppercase();
    }
    self
      .name
      .split_whitespace()
      .filter_map(|w| w.chars().next())
      .take(2)
      .collect::<String>()
      .to_uppercase()
  }

  /// Display name, falling back to the email address.
  pub fn display_name(&self) -> &str {
    if self.name.is_empty() {
      &self.email
    } else {
      &self.name
    }
  }
}

/// A persisted snippet as the store returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snippet {
  pub id: String,
  pub title: String,
  pub code: String,
  pub language: String,
  #[serde(default)]
  pub tags: Vec<String>,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub is_public: bool,
  pub author_id: String,
  pub created_at: DateTime<Utc>,
}

impl Snippet {
  /// Tags de-duplicated for display. Storage order is preserved; only
  /// later repeats are dropped.
  pub fn display_tags(&self) -> Vec<&str> {
    dedup_preserving_order(&self.tags)
  }
}

/// The writable fields of a snippet, as sent on create/update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnippetFields {
  pub title: String,
  pub code: String,
  pub language: String,
  pub tags: Vec<String>,
  pub description: String,
  pub is_public: bool,
}

/// Result of the AI analyze call: auto-filled form fields.
#[derive(Debug, Clone, Deserialize)]
pub struct AiAnalysis {
  #[serde(default)]
  pub language: Option<String>,
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub tags: Vec<String>,
}

pub(crate) fn dedup_preserving_order(tags: &[String]) -> Vec<&str> {
  let mut seen = std::collections::HashSet::new();
  tags
    .iter()
    .map(|t| t.as_str())
    .filter(|t| seen.insert(*t))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn snippet_with_tags(tags: &[&str]) -> Snippet {
    Snippet {
      id: "s1".into(),
      title: "Fib".into(),
      code: "fn fib() {}".into(),
      language: "rust".into(),
      tags: tags.iter().map(|t| t.to_string()).collect(),
      description: String::new(),
      is_public: false,
      author_id: "u1".into(),
      created_at: Utc::now(),
    }
  }

  #[test]
  fn test_display_tags_dedup_keeps_order() {
    let s = snippet_with_tags(&["rust", "algo", "rust", "math", "algo"]);
    assert_eq!(s.display_tags(), vec!["rust", "algo", "math"]);
  }

  #[test]
  fn test_display_tags_storage_untouched() {
    let s = snippet_with_tags(&["a", "a"]);
    assert_eq!(s.tags.len(), 2);
  }

  #[test]
  fn test_initials_from_name() {
    let id = Identity {
      id: "u1".into(),
      name: "Ada Lovelace".into(),
      email: "ada@example.com".into(),
    };
    assert_eq!(id.initials(), "AL");
  }

  #[test]
  fn test_initials_fallback_to_email() {
    let id = Identity {
      id: "u1".into(),
      name: String::new(),
      email: "ada@example.com".into(),
    };
    assert_eq!(id.initials(), "A");
    assert_eq!(id.display_name(), "ada@example.com");
  }
}
