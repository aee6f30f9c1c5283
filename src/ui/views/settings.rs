use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::app::AppContext;
use crate::event::{Event, Toast};
use crate::query::Mutation;
use crate::ui::components::{InputResult, TextInput};
use crate::ui::view::{Shortcut, View, ViewAction};

/// Account settings: identity, AI key entry, logout.
pub struct SettingsView {
  ctx: AppContext,
  key_input: TextInput,
  save_key: Mutation<bool>,
  logout: Mutation<()>,
}

impl SettingsView {
  pub fn new(ctx: AppContext) -> Self {
    let key_input = TextInput::with_value(&ctx.keys.get().unwrap_or_default());
    Self {
      ctx,
      key_input,
      save_key: Mutation::idle(),
      logout: Mutation::idle(),
    }
  }

  fn start_save_key(&mut self) {
    if self.save_key.is_running() {
      return;
    }
    let keys = self.ctx.keys.clone();
    let auth = self.ctx.auth.clone();
    let key = self.key_input.value().trim().to_string();
    let cleared = key.is_empty();

    self.save_key.start(async move {
      // Local write plus best-effort remote mirror
      keys.save(&key, &auth).await;
      !cleared
    });
  }

  fn start_logout(&mut self) {
    if self.logout.is_running() {
      return;
    }
    let auth = self.ctx.auth.clone();
    self.logout.start(async move { auth.logout().await });
  }
}

impl View for SettingsView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.start_logout();
        return ViewAction::None;
      }
      _ => {}
    }

    match self.key_input.handle_key(key) {
      InputResult::Submitted(_) => {
        self.start_save_key();
        ViewAction::None
      }
      InputResult::Cancelled => ViewAction::Pop,
      InputResult::Consumed => ViewAction::None,
      InputResult::NotHandled => ViewAction::Unhandled,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(" Settings ")
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let identity = self.ctx.auth.cached_identity();
    let (ai_status, ai_color) = if self.ctx.keys.has_key() {
      ("AI features enabled", Color::Green)
    } else {
      ("No key - AI disabled", Color::Red)
    };

    let mut lines = vec![Line::default()];
    if let Some(identity) = identity {
      lines.push(Line::from(vec![
        Span::styled("  Account   ", Style::default().fg(Color::DarkGray)),
        Span::styled(identity.display_name().to_string(), Style::default().fg(Color::White)),
        Span::styled(format!("  {}", identity.email), Style::default().fg(Color::DarkGray)),
      ]));
    }
    lines.push(Line::default());
    lines.push(Line::from(vec![
      Span::styled("  AI key    ", Style::default().fg(Color::DarkGray)),
      Span::raw(mask_key(&self.key_input.value())),
      Span::styled("_", Style::default().fg(Color::Cyan)),
    ]));
    lines.push(Line::from(vec![
      Span::raw("            "),
      Span::styled(ai_status, Style::default().fg(ai_color)),
    ]));
    lines.push(Line::default());
    if self.save_key.is_running() {
      lines.push(Line::from(Span::styled(
        "  Saving key...",
        Style::default().fg(Color::Yellow),
      )));
    } else {
      lines.push(Line::from(Span::styled(
        "  Enter to save the key. The key stays on this machine and is mirrored to your profile.",
        Style::default().fg(Color::DarkGray),
      )));
    }

    frame.render_widget(Paragraph::new(lines), inner);
  }

  fn breadcrumb_label(&self) -> String {
    "Settings".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    if let Some(saved) = self.save_key.poll() {
      let message = if saved { "AI key saved" } else { "AI key cleared" };
      let _ = self.ctx.tx.send(Event::Notice(Toast::ai(message)));
    }

    if self.logout.poll().is_some() {
      let _ = self.ctx.tx.send(Event::LoggedOut);
    }

    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new("Enter", "save key"),
      Shortcut::new("C-l", "logout"),
      Shortcut::new("Esc", "back"),
    ]
  }
}

/// Show only the key's tail so shoulder-surfing yields little.
fn mask_key(key: &str) -> String {
  let chars: Vec<char> = key.chars().collect();
  if chars.len() <= 4 {
    return key.to_string();
  }
  let tail: String = chars[chars.len() - 4..].iter().collect();
  format!("{}{}", "•".repeat(chars.len() - 4), tail)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_mask_key() {
    assert_eq!(mask_key(""), "");
    assert_eq!(mask_key("abcd"), "abcd");
    assert_eq!(mask_key("gsk_12345678"), "••••••••5678");
  }
}
