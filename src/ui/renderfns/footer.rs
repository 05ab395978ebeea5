use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the footer bar with the view breadcrumb and a right-aligned status
pub fn draw_footer(frame: &mut Frame, area: Rect, breadcrumb: &[String], status: &str) {
  let mut spans = vec![Span::raw(" ")];

  for (i, part) in breadcrumb.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
    }

    let style = if i + 1 == breadcrumb.len() {
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::White)
    };

    spans.push(Span::styled(part.clone(), style));
  }

  let chunks = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([
      Constraint::Min(0),
      Constraint::Length(status.chars().count() as u16 + 1),
    ])
    .split(area);

  frame.render_widget(
    Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black)),
    chunks[0],
  );
  frame.render_widget(
    Paragraph::new(status)
      .alignment(Alignment::Right)
      .style(Style::default().bg(Color::Black).fg(Color::DarkGray)),
    chunks[1],
  );
}
