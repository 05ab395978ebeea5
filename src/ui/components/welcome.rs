use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

/// First-run introduction. Dismissed with any key, then never shown again.
pub fn render_welcome(frame: &mut Frame, area: Rect, title: &str) {
  let rect = area.inner(Margin::new(area.width / 6, area.height / 5));
  frame.render_widget(Clear, rect);

  let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Cyan));
  let lines = vec![
    Line::styled(format!("Welcome to {}!", title), Style::default().fg(Color::Yellow).bold()),
    Line::raw(""),
    Line::raw("Pick a topic, describe a theme, and a narrated bedtime story (masal) is written for your child."),
    Line::raw("Stories built on a kazanım follow a learning objective for the age group."),
    Line::raw(""),
    Line::from(vec![key(":create"), Span::raw("  write a new story")]),
    Line::from(vec![key(":stories"), Span::raw(" browse everyone's stories")]),
    Line::from(vec![key(":login"), Span::raw("   sign in to use your credits")]),
    Line::raw(""),
    Line::styled("Press any key to start", Style::default().fg(Color::DarkGray)),
  ];

  let block = Block::default()
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Yellow))
    .title(" Hoş geldiniz ");

  frame.render_widget(
    Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
    rect,
  );
}
