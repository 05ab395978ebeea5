use crate::api::types::UserProfile;
use crate::ui::view::{ShortcutInfo, ShortcutVisibility};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar: title, backend host, session and shortcuts
pub fn draw_header(
  frame: &mut Frame,
  area: Rect,
  title: &str,
  api_url: &str,
  user: Option<&UserProfile>,
  shortcuts: &[ShortcutInfo],
) {
  let sep = || Span::styled("│", Style::default().fg(Color::DarkGray));

  let mut spans = vec![
    Span::styled(format!(" {} ", title), Style::default().fg(Color::Yellow).bold()),
    sep(),
    Span::styled(format!(" {} ", extract_host(api_url)), Style::default().fg(Color::White)),
    sep(),
  ];

  match user {
    Some(user) => {
      spans.push(Span::styled(
        format!(" {} ", user.display_name()),
        Style::default().fg(Color::Cyan).bold(),
      ));
      let credit_color = if user.credits > 0 { Color::Green } else { Color::Red };
      spans.push(Span::styled(
        format!("{} credits ", user.credits),
        Style::default().fg(credit_color),
      ));
      if user.is_admin() {
        spans.push(Span::styled("admin ", Style::default().fg(Color::Magenta)));
      }
    }
    None => spans.push(Span::styled(" guest ", Style::default().fg(Color::DarkGray))),
  }
  spans.push(Span::raw(" "));

  let mut visible: Vec<&ShortcutInfo> = shortcuts
    .iter()
    .filter(|s| s.visibility == ShortcutVisibility::Always)
    .collect();
  visible.sort_by_key(|s| s.priority);

  for shortcut in visible {
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

/// Host part of the API URL, or the URL itself when it is relative
fn extract_host(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .and_then(|rest| rest.split('/').next())
    .unwrap_or(url)
}
