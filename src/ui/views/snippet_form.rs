use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::app::AppContext;
use crate::editor::{DebounceTimer, Draft, DraftState, SavePhase, AUTOSAVE_DELAY, LANGUAGES};
use crate::event::{Event, Toast};
use crate::query::Mutation;
use crate::stash::error::{AiError, StoreError};
use crate::stash::types::{AiAnalysis, Snippet};
use crate::ui::components::{CodeArea, InputResult, TextInput};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::SettingsView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormField {
  Title,
  Language,
  Tags,
  Description,
  Visibility,
  Code,
}

const FIELD_ORDER: &[FormField] = &[
  FormField::Title,
  FormField::Language,
  FormField::Tags,
  FormField::Description,
  FormField::Visibility,
  FormField::Code,
];

/// The snippet editor: draft fields, autosave, AI auto-fill.
pub struct SnippetFormView {
  ctx: AppContext,
  owner_id: String,
  draft: Draft,
  state: DraftState,
  autosave: DebounceTimer,
  save: Mutation<Result<Snippet, StoreError>>,
  /// Whether the in-flight save was a background autosave
  save_silent: bool,
  analyze: Mutation<Result<AiAnalysis, AiError>>,
  focus: FormField,
  title: TextInput,
  tags: TextInput,
  description: TextInput,
  code: CodeArea,
  language_idx: usize,
  editing: bool,
}

impl SnippetFormView {
  pub fn create(ctx: AppContext, owner: crate::stash::types::Identity) -> Self {
    Self::with_draft(ctx, owner.id, Draft::new(), false)
  }

  pub fn edit(ctx: AppContext, snippet: &Snippet) -> Self {
    Self::with_draft(
      ctx,
      snippet.author_id.clone(),
      Draft::from_snippet(snippet),
      true,
    )
  }

  fn with_draft(ctx: AppContext, owner_id: String, draft: Draft, editing: bool) -> Self {
    let language_idx = LANGUAGES
      .iter()
      .position(|l| *l == draft.language)
      .unwrap_or(0);

    let mut view = Self {
      ctx,
      owner_id,
      title: TextInput::with_value(&draft.title),
      tags: TextInput::with_value(&draft.tags),
      description: TextInput::with_value(&draft.description),
      code: CodeArea::new(),
      draft,
      state: DraftState::new(),
      autosave: DebounceTimer::new(AUTOSAVE_DELAY),
      save: Mutation::idle(),
      save_silent: false,
      analyze: Mutation::idle(),
      focus: FormField::Title,
      language_idx,
      editing,
    };
    view.code.set_value(&view.draft.code);
    view
  }

  fn cycle_focus(&mut self, backwards: bool) {
    let current = FIELD_ORDER.iter().position(|f| *f == self.focus).unwrap_or(0);
    let next = if backwards {
      (current + FIELD_ORDER.len() - 1) % FIELD_ORDER.len()
    } else {
      (current + 1) % FIELD_ORDER.len()
    };
    self.focus = FIELD_ORDER[next];
  }

  fn sync_draft(&mut self) {
    self.draft.title = self.title.value();
    self.draft.tags = self.tags.value();
    self.draft.description = self.description.value();
    self.draft.code = self.code.value();
  }

  /// Every edit path funnels here: dirty the draft and re-arm the
  /// autosave (the armed timer already shows as "saving…").
  fn edited(&mut self) {
    self.sync_draft();
    self.state.mark_dirty();
    self.autosave.arm();
  }

  fn cycle_language(&mut self, backwards: bool) {
    self.language_idx = if backwards {
      (self.language_idx + LANGUAGES.len() - 1) % LANGUAGES.len()
    } else {
      (self.language_idx + 1) % LANGUAGES.len()
    };
    self.draft.language = LANGUAGES[self.language_idx].to_string();
    self.edited();
  }

  fn toggle_visibility(&mut self) {
    self.draft.is_public = !self.draft.is_public;
    self.edited();
  }

  /// Fire a persist. Validation failures stop here: nothing goes over
  /// the network and the draft stays dirty.
  fn save(&mut self, silent: bool) {
    if !self.state.begin_save() {
      return;
    }

    self.sync_draft();
    if let Err(e) = self.draft.validate() {
      self.state.save_failed(e.to_string());
      if !silent {
        let _ = self.ctx.tx.send(Event::Notice(Toast::error(e.to_string())));
      }
      return;
    }

    self.save_silent = silent;
    let store = self.ctx.store.clone();
    let owner_id = self.owner_id.clone();
    let fields = self.draft.fields();
    let id = self.draft.id.clone();

    self.save.start(async move {
      match id {
        Some(id) => store.update(&id, &owner_id, &fields).await,
        None => store.create(&owner_id, &fields).await,
      }
    });
  }

  fn start_analyze(&mut self) -> ViewAction {
    if self.analyze.is_running() {
      return ViewAction::None;
    }

    self.sync_draft();
    let code = self.draft.code.trim().to_string();
    if code.is_empty() {
      let _ = self.ctx.tx.send(Event::Notice(Toast::error("Paste some code first")));
      return ViewAction::None;
    }
    if !self.ctx.keys.has_key() {
      let _ = self
        .ctx
        .tx
        .send(Event::Notice(Toast::error("Add your AI key in Settings")));
      return ViewAction::Push(Box::new(SettingsView::new(self.ctx.clone())));
    }

    // Don't race the AI's field writes with a pending autosave
    self.autosave.cancel();

    let ai = self.ctx.ai.clone();
    self.analyze.start(async move { ai.analyze(&code).await });
    ViewAction::None
  }

  fn apply_analysis(&mut self, analysis: &AiAnalysis) {
    self.draft.apply_analysis(analysis);
    self.title.set_value(&self.draft.title);
    self.tags.set_value(&self.draft.tags);
    self.description.set_value(&self.draft.description);
    self.language_idx = LANGUAGES
      .iter()
      .position(|l| *l == self.draft.language)
      .unwrap_or(self.language_idx);
  }

  fn status_label(&self) -> (&'static str, Color) {
    match self.state.phase() {
      SavePhase::Saving => ("saving…", Color::Yellow),
      SavePhase::Saved => ("saved", Color::Green),
      SavePhase::Error => ("error", Color::Red),
      SavePhase::Dirty | SavePhase::Clean => {
        if self.autosave.is_armed() {
          // Optimistic: the deferred persist is already on its way
          ("saving…", Color::Yellow)
        } else {
          ("", Color::DarkGray)
        }
      }
    }
  }

  fn render_text_field(&self, label: &str, input: &TextInput, field: FormField) -> Line<'static> {
    let focused = self.focus == field;
    let mut spans = vec![
      focus_marker(focused),
      Span::styled(format!("{:<12}", label), label_style(focused)),
    ];
    spans.extend(input.spans(focused, false));
    Line::from(spans)
  }
}

impl View for SnippetFormView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        // Explicit, vocal save: the pending timer must not fire a
        // second, stale persist afterwards
        self.autosave.cancel();
        self.save(false);
        return ViewAction::None;
      }
      KeyCode::Char('g') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        return self.start_analyze();
      }
      KeyCode::Tab => {
        self.cycle_focus(false);
        return ViewAction::None;
      }
      KeyCode::BackTab => {
        self.cycle_focus(true);
        return ViewAction::None;
      }
      KeyCode::Esc => {
        // Discard: a stale save must not fire against a gone draft
        self.autosave.cancel();
        return ViewAction::Pop;
      }
      _ => {}
    }

    match self.focus {
      FormField::Language => match key.code {
        KeyCode::Left | KeyCode::Char('k') => {
          self.cycle_language(true);
          ViewAction::None
        }
        KeyCode::Right | KeyCode::Char('j') | KeyCode::Char(' ') | KeyCode::Enter => {
          self.cycle_language(false);
          ViewAction::None
        }
        _ => ViewAction::None,
      },
      FormField::Visibility => match key.code {
        KeyCode::Char(' ') | KeyCode::Enter => {
          self.toggle_visibility();
          ViewAction::None
        }
        _ => ViewAction::None,
      },
      FormField::Code => match self.code.handle_key(key) {
        InputResult::Consumed => {
          self.edited();
          ViewAction::None
        }
        _ => ViewAction::None,
      },
      FormField::Title | FormField::Tags | FormField::Description => {
        let input = match self.focus {
          FormField::Title => &mut self.title,
          FormField::Tags => &mut self.tags,
          _ => &mut self.description,
        };
        match input.handle_key(key) {
          InputResult::Consumed => {
            self.edited();
            ViewAction::None
          }
          InputResult::Submitted(_) => {
            self.cycle_focus(false);
            ViewAction::None
          }
          _ => ViewAction::None,
        }
      }
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let title = if self.editing {
      " Edit Snippet "
    } else {
      " New Snippet "
    };

    let border_color = if self.state.is_saving() {
      Color::Yellow
    } else {
      Color::Blue
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(border_color));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(5), // Metadata fields
        Constraint::Length(1), // Code header
        Constraint::Min(1),    // Code area
        Constraint::Length(1), // Status line
      ])
      .split(inner);

    // Metadata fields
    let language_focused = self.focus == FormField::Language;
    let visibility_focused = self.focus == FormField::Visibility;
    let visibility_hint = if self.draft.is_public {
      "Anyone with the link can view this"
    } else {
      "Only you can see this snippet"
    };

    let fields = vec![
      self.render_text_field("Title", &self.title, FormField::Title),
      Line::from(vec![
        focus_marker(language_focused),
        Span::styled(format!("{:<12}", "Language"), label_style(language_focused)),
        Span::styled("◂ ", Style::default().fg(Color::DarkGray)),
        Span::styled(
          LANGUAGES[self.language_idx].to_string(),
          Style::default().fg(Color::Yellow),
        ),
        Span::styled(" ▸", Style::default().fg(Color::DarkGray)),
      ]),
      self.render_text_field("Tags", &self.tags, FormField::Tags),
      self.render_text_field("Description", &self.description, FormField::Description),
      Line::from(vec![
        focus_marker(visibility_focused),
        Span::styled(format!("{:<12}", "Public"), label_style(visibility_focused)),
        Span::raw(if self.draft.is_public { "[x] " } else { "[ ] " }),
        Span::styled(visibility_hint, Style::default().fg(Color::DarkGray)),
      ]),
    ];
    frame.render_widget(Paragraph::new(fields), chunks[0]);

    // Code header
    let code_focused = self.focus == FormField::Code;
    let (row, col) = self.code.cursor();
    frame.render_widget(
      Paragraph::new(Line::from(vec![
        focus_marker(code_focused),
        Span::styled("Code", label_style(code_focused)),
        Span::styled(
          format!("  {} lines  Ln {}, Col {}", self.code.line_count(), row + 1, col + 1),
          Style::default().fg(Color::DarkGray),
        ),
      ])),
      chunks[1],
    );

    self.code.render(frame, chunks[2], code_focused);

    // Status line: autosave indicator + message + AI state
    let (label, color) = self.status_label();
    let mut spans = vec![Span::styled(label.to_string(), Style::default().fg(color).bold())];
    if let Some(message) = self.state.message() {
      spans.push(Span::styled(
        format!("  {}", message),
        Style::default().fg(Color::Red),
      ));
    }
    if self.analyze.is_running() {
      spans.push(Span::styled(
        "  AI is analyzing your code...",
        Style::default().fg(Color::Magenta),
      ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), chunks[3]);
  }

  fn breadcrumb_label(&self) -> String {
    if self.editing {
      "Edit".to_string()
    } else {
      "New".to_string()
    }
  }

  fn tick(&mut self) -> ViewAction {
    // Deferred autosave: silent, coalesced trailing edge
    if self.autosave.fire_if_due() {
      self.save(true);
    }

    if let Some(result) = self.save.poll() {
      match result {
        Ok(snippet) => {
          // First save creates the record; adopt its identity so the
          // next save is an update
          if self.draft.id.is_none() {
            self.draft.id = Some(snippet.id.clone());
          }
          self.state.save_succeeded();
          let _ = self.ctx.tx.send(Event::StoreChanged);
          if !self.save_silent {
            let _ = self.ctx.tx.send(Event::Notice(Toast::success("Snippet saved")));
            return ViewAction::Pop;
          }
        }
        Err(e) => {
          tracing::warn!("save failed: {}", e);
          self.state.save_failed(e.to_string());
          if !self.save_silent {
            let _ = self.ctx.tx.send(Event::Notice(Toast::error("Save failed")));
          }
        }
      }
    }

    if let Some(result) = self.analyze.poll() {
      let mut action = ViewAction::None;
      match result {
        Ok(analysis) => {
          self.apply_analysis(&analysis);
          let _ = self.ctx.tx.send(Event::Notice(Toast::ai("AI filled the form")));
        }
        Err(AiError::NoKey) => {
          let _ = self
            .ctx
            .tx
            .send(Event::Notice(Toast::error("Add your AI key in Settings")));
          action = ViewAction::Push(Box::new(SettingsView::new(self.ctx.clone())));
        }
        Err(AiError::InvalidKey) => {
          let _ = self.ctx.tx.send(Event::Notice(Toast::error("Invalid AI key")));
        }
        Err(AiError::RequestFailed(_)) => {
          let _ = self.ctx.tx.send(Event::Notice(Toast::error("AI request failed")));
        }
      }
      // Persist whatever the AI wrote (or re-arm after the failed
      // attempt), without racing its field writes
      self.sync_draft();
      self.state.mark_dirty();
      self.autosave.arm();
      return action;
    }

    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new("Tab", "next field"),
      Shortcut::new("C-s", "save"),
      Shortcut::new("C-g", "AI fill"),
      Shortcut::new("Esc", "cancel"),
    ]
  }
}

fn focus_marker(focused: bool) -> Span<'static> {
  if focused {
    Span::styled("▸ ", Style::default().fg(Color::Cyan))
  } else {
    Span::raw("  ")
  }
}

fn label_style(focused: bool) -> Style {
  if focused {
    Style::default().fg(Color::Cyan).bold()
  } else {
    Style::default().fg(Color::DarkGray)
  }
}
