use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use crate::app::AppContext;
use crate::editor::LANGUAGES;
use crate::query::{Query, QueryState};
use crate::stash::types::Snippet;
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{lang_color, lang_label, truncate};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::SnippetDetailView;

/// The public snippet feed: anyone's snippets with the anonymous read
/// grant attached.
pub struct ExploreView {
  ctx: AppContext,
  query: Query<Vec<Snippet>>,
  list_state: ListState,
  /// Index into LANGUAGES + 1; 0 means no filter
  language_idx: usize,
}

impl ExploreView {
  pub fn new(ctx: AppContext) -> Self {
    let query = Self::build_query(&ctx, None);
    Self {
      ctx,
      query,
      list_state: ListState::default(),
      language_idx: 0,
    }
  }

  fn build_query(ctx: &AppContext, language: Option<String>) -> Query<Vec<Snippet>> {
    let store = ctx.store.clone();

    let mut query = Query::new(move || {
      let store = store.clone();
      let language = language.clone();
      async move {
        store
          .list_public(language.as_deref())
          .await
          .map_err(|e| e.to_string())
      }
    });
    query.fetch();
    query
  }

  fn language(&self) -> Option<String> {
    if self.language_idx == 0 {
      None
    } else {
      Some(LANGUAGES[self.language_idx - 1].to_string())
    }
  }

  fn rebuild_query(&mut self) {
    self.query = Self::build_query(&self.ctx, self.language());
  }

  fn snippets(&self) -> &[Snippet] {
    self.query.data().map(|v| v.as_slice()).unwrap_or(&[])
  }
}

impl View for ExploreView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
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
        self.language_idx = (self.language_idx + 1) % (LANGUAGES.len() + 1);
        self.rebuild_query();
        ViewAction::None
      }
      KeyCode::Enter => {
        if let Some(idx) = self.list_state.selected() {
          if let Some(snippet) = self.snippets().get(idx) {
            // Public snippets open read-only
            return ViewAction::Push(Box::new(SnippetDetailView::new(
              self.ctx.clone(),
              snippet.clone(),
              true,
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
    let len = self.snippets().len();
    ensure_valid_selection(&mut self.list_state, len);

    let mut title = match self.query.state() {
      QueryState::Loading => " Explore (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Explore (error: {}) ", truncate(e, 40)),
      _ => format!(" Explore ({}) ", len),
    };
    if let Some(language) = self.language() {
      title = format!("{}[{}] ", title, language);
    }

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Green));

    if self.snippets().is_empty() && !self.query.is_loading() {
      let content = if self.query.error().is_some() {
        "Failed to load the public feed. Press 'r' to retry."
      } else {
        "Nothing public yet."
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
        let line = Line::from(vec![
          Span::styled(
            format!("{:<5}", lang_label(&snippet.language)),
            Style::default().fg(lang_color(&snippet.language)),
          ),
          Span::raw(format!("{:<42}", truncate(&snippet.title, 40))),
          Span::styled(
            truncate(&snippet.description, 30),
            Style::default().fg(Color::DarkGray),
          ),
        ]);
        ListItem::new(line)
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  fn breadcrumb_label(&self) -> String {
    "Explore".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    self.query.poll();
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new("l", "language"),
      Shortcut::new("r", "refresh"),
      Shortcut::new("q", "back"),
    ]
  }
}
