use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use crate::app::AppContext;
use crate::editor::{DebounceTimer, LANGUAGES, SEARCH_DEBOUNCE};
use crate::query::{Query, QueryState};
use crate::stash::client::ListFilter;
use crate::stash::types::{Identity, Snippet};
use crate::ui::components::{KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{lang_color, lang_label, truncate};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::{SnippetDetailView, SnippetFormView};

/// The owner's snippet list with search and language filter.
pub struct SnippetListView {
  ctx: AppContext,
  owner: Identity,
  query: Query<Vec<Snippet>>,
  list_state: ListState,
  search: SearchInput,
  filter: ListFilter,
  /// Debounces search keystrokes into one refetch
  debounce: DebounceTimer,
  /// Index into LANGUAGES + 1; 0 means no filter
  language_idx: usize,
}

impl SnippetListView {
  pub fn new(ctx: AppContext, owner: Identity) -> Self {
    let query = Self::build_query(&ctx, &owner, ListFilter::default());

    Self {
      ctx,
      owner,
      query,
      list_state: ListState::default(),
      search: SearchInput::new(),
      filter: ListFilter::default(),
      debounce: DebounceTimer::new(SEARCH_DEBOUNCE),
      language_idx: 0,
    }
  }

  fn build_query(ctx: &AppContext, owner: &Identity, filter: ListFilter) -> Query<Vec<Snippet>> {
    let store = ctx.store.clone();
    let owner_id = owner.id.clone();

    let mut query = Query::new(move || {
      let store = store.clone();
      let owner_id = owner_id.clone();
      let filter = filter.clone();
      async move { store.list(&owner_id, &filter).await.map_err(|e| e.to_string()) }
    });
    query.fetch();
    query
  }

  fn rebuild_query(&mut self) {
    self.query = Self::build_query(&self.ctx, &self.owner, self.filter.clone());
  }

  fn snippets(&self) -> &[Snippet] {
    self.query.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  fn cycle_language(&mut self) {
    self.language_idx = (self.language_idx + 1) % (LANGUAGES.len() + 1);
    self.filter.language = if self.language_idx == 0 {
      String::new()
    } else {
      LANGUAGES[self.language_idx - 1].to_string()
    };
    self.debounce.cancel();
    self.rebuild_query();
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.snippets().len();
    ensure_valid_selection(&mut self.list_state, len);

    let mut title = match self.query.state() {
      QueryState::Loading => " Snippets (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Snippets (error: {}) ", truncate(e, 40)),
      _ => format!(" Snippets ({}) ", len),
    };
    if !self.filter.language.is_empty() {
      title = format!("{}[{}] ", title, self.filter.language);
    }
    if !self.filter.search.is_empty() {
      title = format!("{}/{} ", title, self.filter.search);
    }

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if self.snippets().is_empty() && !self.query.is_loading() {
      let content = if self.query.is_error() {
        "Failed to load snippets. Press 'r' to retry."
      } else if self.filter.search.is_empty() && self.filter.language.is_empty() {
        "No snippets yet. Press 'n' to create one!"
      } else {
        "Nothing matches the current filter."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = self
      .snippets()
      .iter()
      .map(|snippet| {
        let mut spans = vec![
          Span::styled(
            format!("{:<5}", lang_label(&snippet.language)),
            Style::default().fg(lang_color(&snippet.language)),
          ),
          Span::raw(format!("{:<42}", truncate(&snippet.title, 40))),
        ];
        if snippet.is_public {
          spans.push(Span::styled("PUBLIC ", Style::default().fg(Color::Green)));
        }
        if !snippet.tags.is_empty() {
          spans.push(Span::styled(
            truncate(&snippet.display_tags().join(", "), 30),
            Style::default().fg(Color::DarkGray),
          ));
        }
        ListItem::new(Line::from(spans))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl View for SnippetListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    // Let the search overlay try first
    match self.search.handle_key(key) {
      KeyResult::Handled => return ViewAction::None,
      KeyResult::Event(SearchEvent::Changed(text)) => {
        self.filter.search = text;
        // Coalesce keystrokes into one refetch
        self.debounce.arm();
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted) => {
        self.filter.search = self.search.query();
        self.debounce.cancel();
        self.rebuild_query();
        return ViewAction::None;
      }
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
        ViewAction::None
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
        ViewAction::None
      }
      KeyCode::Char('r') => {
        self.rebuild_query();
        ViewAction::None
      }
      KeyCode::Char('l') => {
        self.cycle_language();
        ViewAction::None
      }
      KeyCode::Char('n') => ViewAction::Push(Box::new(SnippetFormView::create(
        self.ctx.clone(),
        self.owner.clone(),
      ))),
      KeyCode::Enter => {
        if let Some(idx) = self.list_state.selected() {
          if let Some(snippet) = self.snippets().get(idx) {
            return ViewAction::Push(Box::new(SnippetDetailView::new(
              self.ctx.clone(),
              snippet.clone(),
              false,
            )));
          }
        }
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::Unhandled,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    self.search.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Snippets".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    if self.debounce.fire_if_due() {
      self.rebuild_query();
    }
    self.query.poll();
    ViewAction::None
  }

  fn refresh(&mut self) {
    self.rebuild_query();
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new("n", "new"),
      Shortcut::new("/", "search"),
      Shortcut::new("l", "language"),
      Shortcut::new("r", "refresh"),
      Shortcut::new(":", "command"),
    ]
  }
}
