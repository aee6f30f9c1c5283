use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::event::{Toast, ToastKind};
use crate::ui::view::Shortcut;

/// Draw the footer bar: breadcrumb on the left, a toast or the current
/// view's shortcut hints on the right.
pub fn draw_footer(
  frame: &mut Frame,
  area: Rect,
  breadcrumb: &[String],
  shortcuts: &[Shortcut],
  toast: Option<&Toast>,
) {
  let mut spans = vec![Span::raw(" ")];

  for (i, part) in breadcrumb.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
    }

    let style = if i == breadcrumb.len() - 1 {
      // Current view - highlighted
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::White)
    };

    spans.push(Span::styled(part.clone(), style));
  }

  spans.push(Span::raw("   "));

  match toast {
    Some(toast) => {
      let color = match toast.kind {
        ToastKind::Success => Color::Green,
        ToastKind::Error => Color::Red,
        ToastKind::Ai => Color::Magenta,
      };
      spans.push(Span::styled(toast.message.clone(), Style::default().fg(color).bold()));
    }
    None => {
      for shortcut in shortcuts {
        spans.push(Span::styled(format!("<{}>", shortcut.key), Style::default().fg(Color::Cyan)));
        spans.push(Span::styled(
          format!(" {}  ", shortcut.label),
          Style::default().fg(Color::DarkGray),
        ));
      }
    }
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}
