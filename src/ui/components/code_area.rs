use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use super::input::InputResult;

/// Minimal multiline code editor: a line buffer with a character-indexed
/// cursor. Enter inserts a newline; Tab is left to the parent for focus
/// cycling.
#[derive(Debug, Clone)]
pub struct CodeArea {
  lines: Vec<Vec<char>>,
  row: usize,
  col: usize,
  /// First visible line, adjusted during render
  scroll: usize,
}

impl Default for CodeArea {
  fn default() -> Self {
    Self {
      lines: vec![Vec::new()],
      row: 0,
      col: 0,
      scroll: 0,
    }
  }
}

impl CodeArea {
  pub fn new() -> Self {
    Self::default()
  }

  /// The buffer joined with newlines.
  pub fn value(&self) -> String {
    self
      .lines
      .iter()
      .map(|l| l.iter().collect::<String>())
      .collect::<Vec<_>>()
      .join("\n")
  }

  pub fn set_value(&mut self, value: &str) {
    self.lines = if value.is_empty() {
      vec![Vec::new()]
    } else {
      value.split('\n').map(|l| l.chars().collect()).collect()
    };
    self.row = 0;
    self.col = 0;
    self.scroll = 0;
  }

  pub fn is_empty(&self) -> bool {
    self.lines.len() == 1 && self.lines[0].is_empty()
  }

  pub fn line_count(&self) -> usize {
    self.lines.len()
  }

  pub fn cursor(&self) -> (usize, usize) {
    (self.row, self.col)
  }

  fn clamp_col(&mut self) {
    self.col = self.col.min(self.lines[self.row].len());
  }

  /// Handle a key event. Enter is consumed (newline); Esc and Tab are
  /// not handled here.
  pub fn handle_key(&mut self, key: KeyEvent) -> InputResult {
    match key.code {
      KeyCode::Enter => {
        let rest = self.lines[self.row].split_off(self.col);
        self.lines.insert(self.row + 1, rest);
        self.row += 1;
        self.col = 0;
        InputResult::Consumed
      }
      KeyCode::Backspace => {
        if self.col > 0 {
          self.col -= 1;
          self.lines[self.row].remove(self.col);
        } else if self.row > 0 {
          // Join with the previous line
          let current = self.lines.remove(self.row);
          self.row -= 1;
          self.col = self.lines[self.row].len();
          self.lines[self.row].extend(current);
        }
        InputResult::Consumed
      }
      KeyCode::Delete => {
        if self.col < self.lines[self.row].len() {
          self.lines[self.row].remove(self.col);
        } else if self.row + 1 < self.lines.len() {
          let next = self.lines.remove(self.row + 1);
          self.lines[self.row].extend(next);
        }
        InputResult::Consumed
      }
      KeyCode::Left => {
        if self.col > 0 {
          self.col -= 1;
        } else if self.row > 0 {
          self.row -= 1;
          self.col = self.lines[self.row].len();
        }
        InputResult::Consumed
      }
      KeyCode::Right => {
        if self.col < self.lines[self.row].len() {
          self.col += 1;
        } else if self.row + 1 < self.lines.len() {
          self.row += 1;
          self.col = 0;
        }
        InputResult::Consumed
      }
      KeyCode::Up => {
        if self.row > 0 {
          self.row -= 1;
          self.clamp_col();
        }
        InputResult::Consumed
      }
      KeyCode::Down => {
        if self.row + 1 < self.lines.len() {
          self.row += 1;
          self.clamp_col();
        }
        InputResult::Consumed
      }
      KeyCode::Home => {
        self.col = 0;
        InputResult::Consumed
      }
      KeyCode::End => {
        self.col = self.lines[self.row].len();
        InputResult::Consumed
      }
      KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.lines[self.row].insert(self.col, c);
        self.col += 1;
        InputResult::Consumed
      }
      _ => InputResult::NotHandled,
    }
  }

  /// Render the visible window with line numbers. The cursor line is
  /// kept in view; the cursor cell is marked when focused.
  pub fn render(&mut self, frame: &mut Frame, area: Rect, focused: bool) {
    let height = area.height as usize;
    if height == 0 {
      return;
    }

    // Keep the cursor row inside the window
    if self.row < self.scroll {
      self.scroll = self.row;
    } else if self.row >= self.scroll + height {
      self.scroll = self.row + 1 - height;
    }

    let gutter_width = format!("{}", self.lines.len()).len().max(2);

    let visible = self
      .lines
      .iter()
      .enumerate()
      .skip(self.scroll)
      .take(height)
      .map(|(i, line)| {
        let mut spans = vec![Span::styled(
          format!("{:>width$} ", i + 1, width = gutter_width),
          Style::default().fg(Color::DarkGray),
        )];

        let text: String = line.iter().collect();
        if focused && i == self.row {
          let col = self.col.min(line.len());
          let before: String = line[..col].iter().collect();
          let at: String = line.get(col).map(|c| c.to_string()).unwrap_or_else(|| " ".to_string());
          let after: String = if col < line.len() {
            line[col + 1..].iter().collect()
          } else {
            String::new()
          };
          spans.push(Span::raw(before));
          spans.push(Span::styled(at, Style::default().bg(Color::White).fg(Color::Black)));
          spans.push(Span::raw(after));
        } else {
          spans.push(Span::raw(text));
        }

        Line::from(spans)
      })
      .collect::<Vec<_>>();

    frame.render_widget(Paragraph::new(visible), area);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn type_str(area: &mut CodeArea, s: &str) {
    for c in s.chars() {
      if c == '\n' {
        area.handle_key(key(KeyCode::Enter));
      } else {
        area.handle_key(key(KeyCode::Char(c)));
      }
    }
  }

  #[test]
  fn test_starts_empty() {
    let area = CodeArea::new();
    assert!(area.is_empty());
    assert_eq!(area.value(), "");
  }

  #[test]
  fn test_typing_multiline() {
    let mut area = CodeArea::new();
    type_str(&mut area, "fn main() {\n  println!(\"hi\");\n}");
    assert_eq!(area.line_count(), 3);
    assert_eq!(area.value(), "fn main() {\n  println!(\"hi\");\n}");
  }

  #[test]
  fn test_enter_splits_line() {
    let mut area = CodeArea::new();
    type_str(&mut area, "abcd");
    area.handle_key(key(KeyCode::Left));
    area.handle_key(key(KeyCode::Left));
    area.handle_key(key(KeyCode::Enter));
    assert_eq!(area.value(), "ab\ncd");
    assert_eq!(area.cursor(), (1, 0));
  }

  #[test]
  fn test_backspace_joins_lines() {
    let mut area = CodeArea::new();
    type_str(&mut area, "ab\ncd");
    area.handle_key(key(KeyCode::Home));
    area.handle_key(key(KeyCode::Backspace));
    assert_eq!(area.value(), "abcd");
    assert_eq!(area.cursor(), (0, 2));
  }

  #[test]
  fn test_set_value_round_trip() {
    let mut area = CodeArea::new();
    area.set_value("one\ntwo\nthree");
    assert_eq!(area.line_count(), 3);
    assert_eq!(area.value(), "one\ntwo\nthree");
  }

  #[test]
  fn test_vertical_movement_clamps_column() {
    let mut area = CodeArea::new();
    type_str(&mut area, "longest line\nab");
    // Cursor at end of "ab"; moving up clamps to that column
    area.handle_key(key(KeyCode::Up));
    assert_eq!(area.cursor(), (0, 2));
    area.handle_key(key(KeyCode::End));
    area.handle_key(key(KeyCode::Down));
    assert_eq!(area.cursor(), (1, 2));
  }

  #[test]
  fn test_tab_not_handled() {
    let mut area = CodeArea::new();
    assert_eq!(area.handle_key(key(KeyCode::Tab)), InputResult::NotHandled);
    assert_eq!(area.handle_key(key(KeyCode::Esc)), InputResult::NotHandled);
  }
}
