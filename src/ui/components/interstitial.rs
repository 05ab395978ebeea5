use ratatui::prelude::*;
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap};

/// Full-screen sponsor interstitial shown while an [`crate::gate::ActionGate`]
/// is open.
pub struct Interstitial<'a> {
  /// Seconds left before dismissal is allowed
  pub remaining_secs: u64,
  /// What runs when the overlay closes, if anything
  pub pending: Option<&'a str>,
}

impl Interstitial<'_> {
  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let rect = area.inner(Margin::new(area.width / 8, area.height / 6));
    frame.render_widget(Clear, rect);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_type(BorderType::Double)
      .border_style(Style::default().fg(Color::Magenta))
      .title(" Sponsor ")
      .title_alignment(Alignment::Center);

    let footer = if self.remaining_secs > 0 {
      Line::styled(
        format!("You can continue in {}s", self.remaining_secs),
        Style::default().fg(Color::DarkGray),
      )
    } else {
      Line::styled("Press Enter to continue", Style::default().fg(Color::Green).bold())
    };

    let mut lines = vec![
      Line::raw(""),
      Line::styled("Masal Sepeti is free thanks to our sponsors", Style::default().bold()),
      Line::raw(""),
      Line::styled("[ sponsored content ]", Style::default().fg(Color::Magenta)),
      Line::raw(""),
    ];
    if let Some(pending) = self.pending {
      lines.push(Line::styled(
        format!("Next: {}", pending),
        Style::default().fg(Color::Cyan),
      ));
      lines.push(Line::raw(""));
    }
    lines.push(footer);

    frame.render_widget(
      Paragraph::new(lines)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true }),
      rect,
    );
  }
}
