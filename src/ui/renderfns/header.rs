use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::stash::types::Identity;

/// Draw the header bar with logo, store domain and the signed-in user
pub fn draw_header(frame: &mut Frame, area: Rect, endpoint: &str, identity: Option<&Identity>) {
  let domain = extract_domain(endpoint);

  let mut spans = vec![
    Span::styled(" snipstash ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", domain), Style::default().fg(Color::White)),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
  ];

  match identity {
    Some(identity) => {
      spans.push(Span::styled(
        format!(" [{}] ", identity.initials()),
        Style::default().fg(Color::Magenta).bold(),
      ));
      spans.push(Span::styled(
        identity.display_name().to_string(),
        Style::default().fg(Color::White),
      ));
    }
    None => {
      spans.push(Span::styled(" signed out ", Style::default().fg(Color::DarkGray)));
    }
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

/// Extract domain from an endpoint URL
fn extract_domain(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_extract_domain() {
    assert_eq!(extract_domain("https://api.snipstash.dev/v1"), "api.snipstash.dev");
    assert_eq!(extract_domain("http://localhost:9090/v1"), "localhost:9090");
    assert_eq!(extract_domain("api.snipstash.dev"), "api.snipstash.dev");
  }
}
