use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

/// y/n prompt guarding a destructive action.
///
/// Holds the payload to act on so the parent does not track it separately.
#[derive(Debug, Clone)]
pub struct Confirm<T> {
  pending: Option<(String, T)>,
}

impl<T> Default for Confirm<T> {
  fn default() -> Self {
    Self { pending: None }
  }
}

impl<T> Confirm<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.pending.is_some()
  }

  pub fn ask(&mut self, question: impl Into<String>, payload: T) {
    self.pending = Some((question.into(), payload));
  }

  /// `Event(payload)` on `y`; any other key cancels.
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<T> {
    let Some((_, payload)) = self.pending.take() else {
      return KeyResult::NotHandled;
    };
    match key.code {
      KeyCode::Char('y') | KeyCode::Char('Y') => KeyResult::Event(payload),
      _ => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    let Some((question, _)) = &self.pending else {
      return;
    };
    let width = (question.chars().count() as u16 + 6).clamp(30, area.width.max(30)).min(area.width);
    let rect = Rect::new(
      area.x + area.width.saturating_sub(width) / 2,
      area.y + area.height.saturating_sub(5) / 2,
      width,
      5.min(area.height),
    );
    frame.render_widget(Clear, rect);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Red))
      .title(" Confirm ");
    let text = vec![
      Line::raw(question.as_str()),
      Line::styled("y: yes   any other key: no", Style::default().fg(Color::DarkGray)),
    ];
    frame.render_widget(Paragraph::new(text).block(block).wrap(Wrap { trim: true }), rect);
  }
}
