//! The in-memory edit state of one snippet and its save state machine.

use crate::stash::error::ValidationError;
use crate::stash::types::{AiAnalysis, Snippet, SnippetFields};

/// Languages offered by the form and the list filter.
pub const LANGUAGES: &[&str] = &[
  "javascript",
  "typescript",
  "python",
  "html",
  "css",
  "json",
  "bash",
  "sql",
  "plaintext",
];

/// A snippet being edited. `id` is None until the first successful save
/// creates the backing record; the returned identity is then adopted so
/// later saves update instead of create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
  pub id: Option<String>,
  pub title: String,
  pub code: String,
  pub language: String,
  /// Raw comma-separated tag input, kept as typed. Parsed on save,
  /// de-duplicated only for display.
  pub tags: String,
  pub description: String,
  pub is_public: bool,
}

impl Default for Draft {
  fn default() -> Self {
    Self {
      id: None,
      title: String::new(),
      code: String::new(),
      language: "javascript".to_string(),
      tags: String::new(),
      description: String::new(),
      is_public: false,
    }
  }
}

impl Draft {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_snippet(snippet: &Snippet) -> Self {
    Self {
      id: Some(snippet.id.clone()),
      title: snippet.title.clone(),
      code: snippet.code.clone(),
      language: snippet.language.clone(),
      tags: snippet.tags.join(", "),
      description: snippet.description.clone(),
      is_public: snippet.is_public,
    }
  }

  /// Client-side validation, checked before any network call.
  pub fn validate(&self) -> Result<(), ValidationError> {
    if self.title.trim().is_empty() {
      return Err(ValidationError::MissingTitle);
    }
    if self.code.trim().is_empty() {
      return Err(ValidationError::EmptyCode);
    }
    Ok(())
  }

  /// The payload sent to the store: trimmed title/description, tags
  /// split on commas with empties dropped.
  pub fn fields(&self) -> SnippetFields {
    SnippetFields {
      title: self.title.trim().to_string(),
      code: self.code.clone(),
      language: self.language.clone(),
      tags: self
        .tags
        .split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect(),
      description: self.description.trim().to_string(),
      is_public: self.is_public,
    }
  }

  /// Apply an AI auto-fill result to the form fields. An unknown
  /// language suggestion leaves the current selection alone.
  pub fn apply_analysis(&mut self, analysis: &AiAnalysis) {
    self.title = analysis.title.clone();
    self.description = analysis.description.clone();
    self.tags = analysis.tags.join(", ");
    if let Some(language) = &analysis.language {
      if LANGUAGES.contains(&language.as_str()) {
        self.language = language.clone();
      }
    }
  }
}

/// Save phase of a draft. `Saved` is a transient display state: logically
/// the draft is clean again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SavePhase {
  #[default]
  Clean,
  Dirty,
  Saving,
  Saved,
  Error,
}

/// Tracks whether the draft differs from the last persisted version and
/// whether a persist is pending, in flight or failed.
///
/// Transitions: clean/error → dirty on any edit; dirty → saving when a
/// save fires; saving → saved on success (or back to dirty if edits
/// arrived mid-flight); saving → error on failure, leaving the draft
/// dirty so content is never silently lost.
#[derive(Debug, Default)]
pub struct DraftState {
  phase: SavePhase,
  /// An edit arrived while a save was in flight; the draft is not clean
  /// even if that save succeeds.
  reedited: bool,
  message: Option<String>,
}

impl DraftState {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn phase(&self) -> SavePhase {
    self.phase
  }

  /// Validation or save error text, cleared by the next edit.
  pub fn message(&self) -> Option<&str> {
    self.message.as_deref()
  }

  pub fn is_saving(&self) -> bool {
    self.phase == SavePhase::Saving
  }

  /// Whether the draft differs from the last persisted version.
  pub fn is_dirty(&self) -> bool {
    match self.phase {
      SavePhase::Dirty | SavePhase::Error => true,
      SavePhase::Saving => self.reedited,
      SavePhase::Clean | SavePhase::Saved => false,
    }
  }

  /// Any field edit, AI auto-fill application or visibility toggle.
  pub fn mark_dirty(&mut self) {
    self.message = None;
    if self.phase == SavePhase::Saving {
      self.reedited = true;
    } else {
      self.phase = SavePhase::Dirty;
    }
  }

  /// Begin a persist. Returns false if one is already in flight: only
  /// one persist call per draft.
  pub fn begin_save(&mut self) -> bool {
    if self.phase == SavePhase::Saving {
      return false;
    }
    self.phase = SavePhase::Saving;
    self.reedited = false;
    self.message = None;
    true
  }

  pub fn save_succeeded(&mut self) {
    self.phase = if self.reedited {
      SavePhase::Dirty
    } else {
      SavePhase::Saved
    };
    self.reedited = false;
  }

  pub fn save_failed(&mut self, message: String) {
    self.phase = SavePhase::Error;
    self.reedited = false;
    self.message = Some(message);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_initial_state_is_clean() {
    let state = DraftState::new();
    assert_eq!(state.phase(), SavePhase::Clean);
    assert!(!state.is_dirty());
  }

  #[test]
  fn test_edit_marks_dirty_until_save_completes() {
    let mut state = DraftState::new();
    state.mark_dirty();
    assert_eq!(state.phase(), SavePhase::Dirty);
    assert!(state.is_dirty());

    assert!(state.begin_save());
    assert!(state.is_saving());

    state.save_succeeded();
    assert_eq!(state.phase(), SavePhase::Saved);
    assert!(!state.is_dirty());
  }

  #[test]
  fn test_only_one_save_in_flight() {
    let mut state = DraftState::new();
    state.mark_dirty();
    assert!(state.begin_save());
    assert!(!state.begin_save());
  }

  #[test]
  fn test_edit_during_save_keeps_draft_dirty() {
    let mut state = DraftState::new();
    state.mark_dirty();
    state.begin_save();

    // A keystroke lands while the persist is in flight
    state.mark_dirty();
    assert!(state.is_saving());
    assert!(state.is_dirty());

    state.save_succeeded();
    // Not Saved: the in-flight save carried stale content
    assert_eq!(state.phase(), SavePhase::Dirty);
    assert!(state.is_dirty());
  }

  #[test]
  fn test_failed_save_leaves_draft_dirty() {
    let mut state = DraftState::new();
    state.mark_dirty();
    state.begin_save();
    state.save_failed("store returned HTTP 500".to_string());

    assert_eq!(state.phase(), SavePhase::Error);
    assert!(state.is_dirty());
    assert_eq!(state.message(), Some("store returned HTTP 500"));

    // The next edit returns to dirty and clears the message
    state.mark_dirty();
    assert_eq!(state.phase(), SavePhase::Dirty);
    assert!(state.message().is_none());
  }

  #[test]
  fn test_validate_blocks_empty_title_and_code() {
    let mut draft = Draft::new();
    assert_eq!(draft.validate(), Err(ValidationError::MissingTitle));

    draft.title = "Fib".to_string();
    assert_eq!(draft.validate(), Err(ValidationError::EmptyCode));

    draft.code = "fn fib() {}".to_string();
    assert!(draft.validate().is_ok());
  }

  #[test]
  fn test_whitespace_only_fields_fail_validation() {
    let draft = Draft {
      title: "   ".to_string(),
      code: "x".to_string(),
      ..Draft::new()
    };
    assert_eq!(draft.validate(), Err(ValidationError::MissingTitle));
  }

  #[test]
  fn test_fields_parses_tags() {
    let draft = Draft {
      title: " Fib ".to_string(),
      code: "fn fib() {}".to_string(),
      tags: "rust, algo,, math ,".to_string(),
      ..Draft::new()
    };
    let fields = draft.fields();
    assert_eq!(fields.title, "Fib");
    assert_eq!(fields.tags, vec!["rust", "algo", "math"]);
  }

  #[test]
  fn test_from_snippet_round_trip() {
    let snippet = Snippet {
      id: "s1".into(),
      title: "Fib".into(),
      code: "fn fib() {}".into(),
      language: "rust".into(),
      tags: vec!["rust".into(), "algo".into()],
      description: "desc".into(),
      is_public: true,
      author_id: "u1".into(),
      created_at: chrono::Utc::now(),
    };
    let draft = Draft::from_snippet(&snippet);
    assert_eq!(draft.id.as_deref(), Some("s1"));
    assert_eq!(draft.tags, "rust, algo");
    assert!(draft.is_public);
  }

  #[test]
  fn test_apply_analysis_fills_fields() {
    let mut draft = Draft {
      code: "def f(): pass".to_string(),
      ..Draft::new()
    };
    draft.apply_analysis(&AiAnalysis {
      language: Some("python".to_string()),
      title: "No-op function".to_string(),
      description: "Does nothing".to_string(),
      tags: vec!["python".to_string(), "stub".to_string()],
    });

    assert_eq!(draft.title, "No-op function");
    assert_eq!(draft.language, "python");
    assert_eq!(draft.tags, "python, stub");
  }

  #[test]
  fn test_apply_analysis_ignores_unknown_language() {
    let mut draft = Draft::new();
    draft.apply_analysis(&AiAnalysis {
      language: Some("brainfuck".to_string()),
      title: "x".to_string(),
      description: String::new(),
      tags: Vec::new(),
    });
    assert_eq!(draft.language, "javascript");
  }
}
