/// Available commands and autocomplete logic
#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "snippets",
    aliases: &["s", "list"],
    description: "Browse your snippets",
  },
  Command {
    name: "explore",
    aliases: &["e", "public"],
    description: "Browse public snippets",
  },
  Command {
    name: "new",
    aliases: &["n", "create"],
    description: "Create a snippet",
  },
  Command {
    name: "settings",
    aliases: &["keys", "account"],
    description: "Account and AI key",
  },
  Command {
    name: "update",
    aliases: &["refresh-shell"],
    description: "Refresh the cached web shell",
  },
  Command {
    name: "logout",
    aliases: &["signout"],
    description: "End the session",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit snipstash",
  },
];

/// Get autocomplete suggestions for a given input, best match first.
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    let priority = if cmd.name == input_lower {
      0
    } else if cmd.aliases.contains(&input_lower.as_str()) {
      1
    } else if cmd.name.starts_with(&input_lower) {
      2
    } else if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      3
    } else if cmd.name.contains(&input_lower) {
      4
    } else if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      5
    } else {
      continue;
    };
    matches.push((cmd, priority));
  }

  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match_ranks_first() {
    let suggestions = get_suggestions("new");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "new");
  }

  #[test]
  fn test_alias_match() {
    let suggestions = get_suggestions("e");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "explore");
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("snip");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "snippets");
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("ogout");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "logout");
  }

  #[test]
  fn test_no_match() {
    assert!(get_suggestions("zzz").is_empty());
  }
}
