use ratatui::prelude::Color;

/// Truncate a string to at most `max_len` characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Display color for a topic's `#rrggbb` color, cyan when unset or invalid
pub fn topic_color(color: &str) -> Color {
  let hex = color.trim().trim_start_matches('#');
  if hex.len() != 6 || !hex.is_ascii() {
    return Color::Cyan;
  }
  let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
  match (channel(0), channel(2), channel(4)) {
    (Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
    _ => Color::Cyan,
  }
}

/// Human label for a story's play count
pub fn listens(count: u64) -> String {
  match count {
    1 => "1 listen".to_string(),
    n => format!("{} listens", n),
  }
}
