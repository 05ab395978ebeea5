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
    name: "home",
    aliases: &["h", "anasayfa"],
    description: "Topics and popular stories",
  },
  Command {
    name: "stories",
    aliases: &["s", "masallar", "list"],
    description: "Browse and search all stories",
  },
  Command {
    name: "create",
    aliases: &["c", "new", "oluştur"],
    description: "Create a new story",
  },
  Command {
    name: "profile",
    aliases: &["p", "me", "profil"],
    description: "Your profile, stories and credits",
  },
  Command {
    name: "login",
    aliases: &["l", "signin", "giriş"],
    description: "Log in or register",
  },
  Command {
    name: "logout",
    aliases: &["signout", "çıkış"],
    description: "End the session",
  },
  Command {
    name: "admin",
    aliases: &["a", "dashboard"],
    description: "Admin dashboard",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit masal",
  },
];

/// How closely a command name or alias matches the typed text
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Rank {
  Exact,
  Prefix,
  Contains,
  /// Typed characters appear in order, e.g. `prf` for `profile`
  Scattered,
}

/// Lowercase and drop Turkish diacritics, so `çıkış` reaches `cikis`
fn fold(s: &str) -> String {
  s.chars()
    .flat_map(char::to_lowercase)
    .filter(|c| *c != '\u{307}')
    .map(|c| match c {
      'ç' => 'c',
      'ğ' => 'g',
      'ı' => 'i',
      'ö' => 'o',
      'ş' => 's',
      'ü' => 'u',
      other => other,
    })
    .collect()
}

fn rank(term: &str, candidate: &str) -> Option<Rank> {
  if candidate == term {
    Some(Rank::Exact)
  } else if candidate.starts_with(term) {
    Some(Rank::Prefix)
  } else if candidate.contains(term) {
    Some(Rank::Contains)
  } else {
    let mut rest = candidate.chars();
    term
      .chars()
      .all(|c| rest.any(|r| r == c))
      .then_some(Rank::Scattered)
  }
}

/// Get autocomplete suggestions for a given input
///
/// A match on the command name beats the same kind of match on an alias.
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let term = fold(input.trim());
  if term.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, (Rank, bool))> = COMMANDS
    .iter()
    .filter_map(|cmd| {
      let by_name = rank(&term, cmd.name).map(|r| (r, false));
      let by_alias = cmd
        .aliases
        .iter()
        .filter_map(|a| rank(&term, &fold(a)))
        .min()
        .map(|r| (r, true));
      by_name.into_iter().chain(by_alias).min().map(|key| (cmd, key))
    })
    .collect();

  matches.sort_by_key(|(_, key)| *key);
  matches.into_iter().map(|(cmd, _)| cmd).collect()
}
