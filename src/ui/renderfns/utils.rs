use ratatui::prelude::Color;

/// Truncate a string to a maximum number of characters, adding "..." if
/// truncated.
pub fn truncate(s: &str, max_chars: usize) -> String {
  if s.chars().count() <= max_chars {
    return s.to_string();
  }
  let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
  format!("{}...", kept)
}

/// Display color for a snippet language badge
pub fn lang_color(language: &str) -> Color {
  match language {
    "javascript" => Color::Yellow,
    "typescript" => Color::Blue,
    "python" => Color::LightBlue,
    "html" => Color::Red,
    "css" => Color::Magenta,
    "json" => Color::Gray,
    "bash" => Color::Green,
    "sql" => Color::LightYellow,
    _ => Color::DarkGray,
  }
}

/// Short uppercase label for a language
pub fn lang_label(language: &str) -> &'static str {
  match language {
    "javascript" => "JS",
    "typescript" => "TS",
    "python" => "PY",
    "html" => "HTML",
    "css" => "CSS",
    "json" => "JSON",
    "bash" => "SH",
    "sql" => "SQL",
    _ => "TXT",
  }
}
