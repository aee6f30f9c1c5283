use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use tokio::sync::mpsc::UnboundedSender;

use crate::event::Event;
use crate::query::Mutation;
use crate::stash::auth::AuthClient;
use crate::stash::error::AuthError;
use crate::stash::types::Identity;
use crate::ui::components::{InputResult, TextInput};
use crate::ui::view::{Shortcut, View, ViewAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthTab {
  Login,
  Register,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthField {
  Name,
  Email,
  Password,
  Confirm,
}

/// The unauthenticated view: login and register forms.
pub struct LoginView {
  auth: AuthClient,
  tx: UnboundedSender<Event>,
  tab: AuthTab,
  name: TextInput,
  email: TextInput,
  password: TextInput,
  confirm: TextInput,
  focus: AuthField,
  error: Option<String>,
  submit: Mutation<Result<Identity, AuthError>>,
}

impl LoginView {
  pub fn new(auth: AuthClient, tx: UnboundedSender<Event>) -> Self {
    Self {
      auth,
      tx,
      tab: AuthTab::Login,
      name: TextInput::new(),
      email: TextInput::new(),
      password: TextInput::new(),
      confirm: TextInput::new(),
      focus: AuthField::Email,
      error: None,
      submit: Mutation::idle(),
    }
  }

  fn fields(&self) -> Vec<AuthField> {
    match self.tab {
      AuthTab::Login => vec![AuthField::Email, AuthField::Password],
      AuthTab::Register => vec![
        AuthField::Name,
        AuthField::Email,
        AuthField::Password,
        AuthField::Confirm,
      ],
    }
  }

  fn cycle_focus(&mut self, backwards: bool) {
    let fields = self.fields();
    let current = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
    let next = if backwards {
      (current + fields.len() - 1) % fields.len()
    } else {
      (current + 1) % fields.len()
    };
    self.focus = fields[next];
  }

  fn toggle_tab(&mut self) {
    self.tab = match self.tab {
      AuthTab::Login => AuthTab::Register,
      AuthTab::Register => AuthTab::Login,
    };
    self.focus = match self.tab {
      AuthTab::Login => AuthField::Email,
      AuthTab::Register => AuthField::Name,
    };
    self.error = None;
  }

  fn focused_input(&mut self) -> &mut TextInput {
    match self.focus {
      AuthField::Name => &mut self.name,
      AuthField::Email => &mut self.email,
      AuthField::Password => &mut self.password,
      AuthField::Confirm => &mut self.confirm,
    }
  }

  fn submit(&mut self) {
    if self.submit.is_running() {
      return;
    }

    let email = self.email.value().trim().to_string();
    let password = self.password.value();

    // Client-side checks, surfaced inline
    let validation = match self.tab {
      AuthTab::Login => {
        if email.is_empty() {
          Some("Enter your email")
        } else if password.is_empty() {
          Some("Enter your password")
        } else if !email_looks_valid(&email) {
          Some("Enter a valid email")
        } else {
          None
        }
      }
      AuthTab::Register => {
        let name = self.name.value().trim().to_string();
        if name.is_empty() {
          Some("Enter your name")
        } else if email.is_empty() {
          Some("Enter your email")
        } else if !email_looks_valid(&email) {
          Some("Enter a valid email")
        } else if password.is_empty() {
          Some("Enter a password")
        } else if password.chars().count() < 8 {
          Some("Password must be at least 8 characters")
        } else if password != self.confirm.value() {
          Some("Passwords do not match")
        } else {
          None
        }
      }
    };

    if let Some(message) = validation {
      self.error = Some(message.to_string());
      return;
    }

    self.error = None;
    let auth = self.auth.clone();
    match self.tab {
      AuthTab::Login => {
        self.submit.start(async move { auth.login(&email, &password).await });
      }
      AuthTab::Register => {
        let name = self.name.value().trim().to_string();
        self
          .submit
          .start(async move { auth.register(&name, &email, &password).await });
      }
    }
  }

  fn render_field(&self, label: &str, field: AuthField, masked: bool) -> Line<'static> {
    let input = match field {
      AuthField::Name => &self.name,
      AuthField::Email => &self.email,
      AuthField::Password => &self.password,
      AuthField::Confirm => &self.confirm,
    };

    let focused = self.focus == field;
    let marker = if focused { "▸ " } else { "  " };
    let label_style = if focused {
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::DarkGray)
    };

    let mut spans = vec![
      Span::styled(marker.to_string(), Style::default().fg(Color::Cyan)),
      Span::styled(format!("{:<10}", label), label_style),
    ];
    spans.extend(input.spans(focused, masked));
    Line::from(spans)
  }
}

impl View for LoginView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.toggle_tab();
        return ViewAction::None;
      }
      KeyCode::Tab | KeyCode::Down => {
        self.cycle_focus(false);
        return ViewAction::None;
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.cycle_focus(true);
        return ViewAction::None;
      }
      _ => {}
    }

    match self.focused_input().handle_key(key) {
      InputResult::Submitted(_) => {
        self.submit();
        ViewAction::None
      }
      InputResult::Cancelled => {
        self.error = None;
        ViewAction::None
      }
      InputResult::Consumed => ViewAction::None,
      InputResult::NotHandled => ViewAction::Unhandled,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let width = 56.min(area.width);
    let height = 14.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let card = Rect::new(x, y, width, height);

    let title = match self.tab {
      AuthTab::Login => " Sign In ",
      AuthTab::Register => " Create Account ",
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(card);
    frame.render_widget(block, card);

    let mut lines = vec![
      Line::from(vec![
        Span::styled(
          " Login ",
          tab_style(self.tab == AuthTab::Login),
        ),
        Span::raw(" "),
        Span::styled(
          " Register ",
          tab_style(self.tab == AuthTab::Register),
        ),
        Span::styled("   (Ctrl-R to switch)", Style::default().fg(Color::DarkGray)),
      ]),
      Line::default(),
    ];

    if self.tab == AuthTab::Register {
      lines.push(self.render_field("Name", AuthField::Name, false));
    }
    lines.push(self.render_field("Email", AuthField::Email, false));
    lines.push(self.render_field("Password", AuthField::Password, true));
    if self.tab == AuthTab::Register {
      lines.push(self.render_field("Confirm", AuthField::Confirm, true));
    }

    lines.push(Line::default());

    if self.submit.is_running() {
      let label = match self.tab {
        AuthTab::Login => "Signing in...",
        AuthTab::Register => "Creating account...",
      };
      lines.push(Line::from(Span::styled(
        format!("  {}", label),
        Style::default().fg(Color::Yellow),
      )));
    } else if let Some(error) = &self.error {
      lines.push(Line::from(Span::styled(
        format!("  {}", error),
        Style::default().fg(Color::Red),
      )));
    } else {
      lines.push(Line::from(Span::styled(
        "  Enter to submit",
        Style::default().fg(Color::DarkGray),
      )));
    }

    frame.render_widget(Paragraph::new(lines), inner);
  }

  fn breadcrumb_label(&self) -> String {
    "Sign in".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    if let Some(result) = self.submit.poll() {
      match result {
        Ok(identity) => {
          let _ = self.tx.send(Event::LoggedIn(identity));
        }
        Err(error) => {
          self.error = Some(error.to_string());
        }
      }
    }
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new("Tab", "next field"),
      Shortcut::new("C-r", "login/register"),
      Shortcut::new("Enter", "submit"),
    ]
  }
}

fn tab_style(active: bool) -> Style {
  if active {
    Style::default().fg(Color::Black).bg(Color::Cyan).bold()
  } else {
    Style::default().fg(Color::DarkGray)
  }
}

fn email_looks_valid(email: &str) -> bool {
  if email.contains(char::is_whitespace) {
    return false;
  }
  match email.split_once('@') {
    Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
    None => false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_email_validation() {
    assert!(email_looks_valid("ada@example.com"));
    assert!(!email_looks_valid("ada"));
    assert!(!email_looks_valid("ada@nodot"));
    assert!(!email_looks_valid("ada@.com"));
    assert!(!email_looks_valid("a da@example.com"));
  }
}
