use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::app::AppContext;
use crate::event::{Event, Toast};
use crate::gateway::{GatewayEvent, GatewayRequest, GatewayResponse, ServedBy};
use crate::query::Mutation;
use crate::stash::error::{AiError, StoreError};
use crate::stash::types::Snippet;
use crate::ui::renderfns::{lang_color, truncate};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::{SettingsView, SnippetFormView};

/// Read view of one snippet: metadata, code, AI explanation panel.
pub struct SnippetDetailView {
  ctx: AppContext,
  snippet: Snippet,
  read_only: bool,
  explain: Mutation<Result<String, AiError>>,
  explanation: Option<String>,
  delete: Mutation<Result<(), StoreError>>,
  confirm_delete: bool,
  /// Warms the share page through the gateway and reports the link
  share: Mutation<(String, Option<GatewayResponse>)>,
  scroll: u16,
}

impl SnippetDetailView {
  pub fn new(ctx: AppContext, snippet: Snippet, read_only: bool) -> Self {
    Self {
      ctx,
      snippet,
      read_only,
      explain: Mutation::idle(),
      explanation: None,
      delete: Mutation::idle(),
      confirm_delete: false,
      share: Mutation::idle(),
      scroll: 0,
    }
  }

  /// Fetch the public share page through the gateway, so it lands in the
  /// shell cache and the link can be handed out even offline.
  fn start_share_check(&mut self) {
    if self.share.is_running() {
      return;
    }

    let gateway = self.ctx.gateway.clone();
    let url = match gateway.shell_origin().join(&format!("s/{}", self.snippet.id)) {
      Ok(url) => url,
      Err(e) => {
        tracing::warn!("bad share URL: {}", e);
        return;
      }
    };

    self.share.start(async move {
      let link = url.to_string();
      let response = gateway
        .dispatch(GatewayEvent::Fetch(GatewayRequest::navigation(url)))
        .await
        .ok()
        .flatten();
      (link, response)
    });
  }

  fn start_explain(&mut self) -> ViewAction {
    if self.explain.is_running() {
      return ViewAction::None;
    }
    if !self.ctx.keys.has_key() {
      // Key-gated: send the user to key entry instead of calling out
      let _ = self
        .ctx
        .tx
        .send(Event::Notice(Toast::error("Add your AI key in Settings")));
      return ViewAction::Push(Box::new(SettingsView::new(self.ctx.clone())));
    }

    self.explanation = None;
    let ai = self.ctx.ai.clone();
    let code = self.snippet.code.clone();
    let language = self.snippet.language.clone();
    self
      .explain
      .start(async move { ai.explain(&code, &language).await });
    ViewAction::None
  }

  fn start_delete(&mut self) {
    if self.delete.is_running() {
      return;
    }
    let store = self.ctx.store.clone();
    let id = self.snippet.id.clone();
    self.delete.start(async move { store.delete(&id).await });
  }
}

impl View for SnippetDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    // A pending delete confirm is resolved by the next key
    if self.confirm_delete {
      self.confirm_delete = false;
      if key.code == KeyCode::Char('y') {
        self.start_delete();
      }
      return ViewAction::None;
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.scroll = self.scroll.saturating_add(1);
        ViewAction::None
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.scroll = self.scroll.saturating_sub(1);
        ViewAction::None
      }
      KeyCode::Char('e') if !self.read_only => ViewAction::Push(Box::new(SnippetFormView::edit(
        self.ctx.clone(),
        &self.snippet,
      ))),
      KeyCode::Char('x') => self.start_explain(),
      KeyCode::Char('o') if self.snippet.is_public => {
        self.start_share_check();
        ViewAction::None
      }
      KeyCode::Char('c') => {
        self.explanation = None;
        ViewAction::None
      }
      KeyCode::Char('d') if !self.read_only => {
        self.confirm_delete = true;
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::Unhandled,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(format!(" {} ", truncate(&self.snippet.title, 60)))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let has_explanation = self.explanation.is_some() || self.explain.is_running();
    let explain_height = if has_explanation { 7 } else { 0 };

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(3),              // Badges + description
        Constraint::Min(1),                 // Code
        Constraint::Length(explain_height), // Explanation panel
      ])
      .split(inner);

    // Header: language badge, visibility, tags, description
    let visibility = if self.snippet.is_public {
      Span::styled("Public", Style::default().fg(Color::Green))
    } else {
      Span::styled("Private", Style::default().fg(Color::DarkGray))
    };

    let mut header = vec![Line::from(vec![
      Span::styled(
        format!(" {} ", self.snippet.language),
        Style::default().fg(Color::Black).bg(lang_color(&self.snippet.language)),
      ),
      Span::raw("  "),
      visibility,
      Span::raw("  "),
      Span::styled(
        self.snippet.created_at.format("%Y-%m-%d").to_string(),
        Style::default().fg(Color::DarkGray),
      ),
      Span::raw("  "),
      Span::styled(
        self.snippet.display_tags().join(", "),
        Style::default().fg(Color::Magenta),
      ),
    ])];
    if self.snippet.description.is_empty() {
      header.push(Line::default());
    } else {
      header.push(Line::from(Span::styled(
        self.snippet.description.clone(),
        Style::default().fg(Color::Gray),
      )));
    }
    if self.confirm_delete {
      header.push(Line::from(Span::styled(
        "Delete this snippet? Press 'y' to confirm.",
        Style::default().fg(Color::Red).bold(),
      )));
    }
    frame.render_widget(Paragraph::new(header), chunks[0]);

    // Code with line numbers
    let gutter = format!("{}", self.snippet.code.lines().count().max(1)).len().max(2);
    let code_lines: Vec<Line> = self
      .snippet
      .code
      .lines()
      .enumerate()
      .map(|(i, line)| {
        Line::from(vec![
          Span::styled(
            format!("{:>width$} ", i + 1, width = gutter),
            Style::default().fg(Color::DarkGray),
          ),
          Span::raw(line.to_string()),
        ])
      })
      .collect();

    let code = Paragraph::new(code_lines).scroll((self.scroll, 0));
    frame.render_widget(code, chunks[1]);

    // Explanation panel
    if has_explanation && chunks[2].height > 0 {
      let panel = Block::default()
        .title(" Explanation ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));
      let panel_inner = panel.inner(chunks[2]);
      frame.render_widget(panel, chunks[2]);

      let text = if self.explain.is_running() {
        "Thinking...".to_string()
      } else {
        self.explanation.clone().unwrap_or_default()
      };
      frame.render_widget(
        Paragraph::new(text).wrap(Wrap { trim: true }).style(Style::default().fg(Color::Gray)),
        panel_inner,
      );
    }
  }

  fn breadcrumb_label(&self) -> String {
    truncate(&self.snippet.title, 24)
  }

  fn tick(&mut self) -> ViewAction {
    if let Some(result) = self.explain.poll() {
      match result {
        Ok(text) => self.explanation = Some(text),
        Err(AiError::NoKey) => {
          let _ = self
            .ctx
            .tx
            .send(Event::Notice(Toast::error("Add your AI key in Settings")));
          return ViewAction::Push(Box::new(SettingsView::new(self.ctx.clone())));
        }
        Err(AiError::InvalidKey) => {
          let _ = self.ctx.tx.send(Event::Notice(Toast::error("Invalid AI key")));
        }
        Err(AiError::RequestFailed(_)) => {
          let _ = self.ctx.tx.send(Event::Notice(Toast::error("AI request failed")));
        }
      }
    }

    if let Some((link, response)) = self.share.poll() {
      let toast = match response {
        Some(response) if response.is_success() => {
          Toast::success(format!("Share page ready: {}", link))
        }
        Some(response) if response.served == ServedBy::Synthesized => {
          Toast::error("Share page unavailable offline")
        }
        _ => Toast::error("Share page unavailable"),
      };
      let _ = self.ctx.tx.send(Event::Notice(toast));
    }

    if let Some(result) = self.delete.poll() {
      match result {
        Ok(()) => {
          let _ = self.ctx.tx.send(Event::Notice(Toast::success("Snippet deleted")));
          let _ = self.ctx.tx.send(Event::StoreChanged);
          return ViewAction::Pop;
        }
        Err(e) => {
          tracing::warn!("delete failed: {}", e);
          let _ = self.ctx.tx.send(Event::Notice(Toast::error("Delete failed")));
        }
      }
    }

    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    let mut shortcuts = Vec::new();
    if !self.read_only {
      shortcuts.push(Shortcut::new("e", "edit"));
      shortcuts.push(Shortcut::new("d", "delete"));
    }
    shortcuts.push(Shortcut::new("x", "explain"));
    if self.snippet.is_public {
      shortcuts.push(Shortcut::new("o", "share"));
    }
    if self.explanation.is_some() {
      shortcuts.push(Shortcut::new("c", "close panel"));
    }
    shortcuts.push(Shortcut::new("q", "back"));
    shortcuts
  }
}
