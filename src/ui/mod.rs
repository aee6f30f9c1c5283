pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use ratatui::prelude::*;
use ratatui::widgets::ListState;

use crate::app::App;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  renderfns::draw_header(frame, chunks[0], app.store_endpoint(), app.identity());

  app.render_current_view(frame, chunks[1]);

  renderfns::draw_footer(
    frame,
    chunks[2],
    &app.breadcrumbs(),
    &app.current_shortcuts(),
    app.toast(),
  );

  // The command palette floats over the content
  app.render_command_overlay(frame, chunks[1]);
}

/// Keep a list selection inside bounds after the underlying data changed.
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  if len == 0 {
    state.select(None);
    return;
  }
  match state.selected() {
    None => state.select(Some(0)),
    Some(i) if i >= len => state.select(Some(len - 1)),
    _ => {}
  }
}
