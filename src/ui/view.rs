use crossterm::event::KeyEvent;
use ratatui::prelude::*;

/// A keyboard shortcut hint for display in the footer
#[derive(Debug, Clone)]
pub struct Shortcut {
  pub key: &'static str,
  pub label: &'static str,
}

impl Shortcut {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self { key, label }
  }
}

/// Actions a view can request in response to input or tick progress
pub enum ViewAction {
  /// No action needed
  None,
  /// Key was not consumed; the app may apply global bindings
  Unhandled,
  /// Push a new view onto the stack
  Push(Box<dyn View>),
  /// Pop current view from stack (go back)
  Pop,
}

/// Trait for view behavior
///
/// Views handle their own input and return actions for the App to
/// execute: App → View → Components. Views that load data or save
/// asynchronously use Query/Mutation internally and poll them in tick().
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect);

  /// Get the breadcrumb label for this view
  fn breadcrumb_label(&self) -> String;

  /// Called on each tick to poll async queries and timers. May navigate.
  fn tick(&mut self) -> ViewAction {
    ViewAction::None
  }

  /// Remote store contents changed; refresh any queries
  fn refresh(&mut self) {}

  /// Keyboard shortcuts to display in the footer
  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![Shortcut::new(":", "command"), Shortcut::new("q", "back")]
  }
}
