use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events emitted by search input that parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
  /// Search term submitted (trimmed, never empty)
  Submitted(String),
  /// Overlay closed without a term
  Cancelled,
}

/// `/` search overlay. The term is only reported on submit, each submit is
/// a network search.
#[derive(Debug, Clone)]
pub struct SearchInput {
  input: TextInput,
  active: bool,
  title: &'static str,
}

impl Default for SearchInput {
  fn default() -> Self {
    Self::new(" Search stories ")
  }
}

impl SearchInput {
  pub fn new(title: &'static str) -> Self {
    Self {
      input: TextInput::new(),
      active: false,
      title,
    }
  }

  /// Check if search is currently active
  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Open the overlay, pre-filled with the current term
  pub fn activate(&mut self, current: &str) {
    self.active = true;
    self.input.set_value(current);
  }

  /// Handle a key event
  /// Call this regardless of active state - it handles activation too
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<SearchEvent> {
    if !self.active {
      if key.code == KeyCode::Char('/') {
        self.activate("");
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    match self.input.handle_key(key) {
      InputResult::Submitted(term) => {
        self.active = false;
        let term = term.trim().to_string();
        if term.is_empty() {
          KeyResult::Event(SearchEvent::Cancelled)
        } else {
          KeyResult::Event(SearchEvent::Submitted(term))
        }
      }
      InputResult::Cancelled => {
        self.active = false;
        self.input.clear();
        KeyResult::Event(SearchEvent::Cancelled)
      }
      // Swallow everything else while the overlay is up
      InputResult::Consumed | InputResult::NotHandled => KeyResult::Handled,
    }
  }

  /// Render the search overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = (area.width * 60 / 100).clamp(30, 60).min(area.width);
    let overlay_area = Rect::new(area.x + 1, area.y + 1, width, 3.min(area.height));

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(self.title);

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let (before, after) = self.input.split_at_cursor();
    let input_line = Line::from(vec![
      Span::styled("/", Style::default().fg(Color::Yellow)),
      Span::raw(before),
      Span::styled("_", Style::default().fg(Color::Yellow)),
      Span::raw(after),
    ]);
    frame.render_widget(Paragraph::new(input_line), inner);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_activation_and_submit() {
    let mut search = SearchInput::default();
    assert_eq!(search.handle_key(key(KeyCode::Char('x'))), KeyResult::NotHandled);

    assert_eq!(search.handle_key(key(KeyCode::Char('/'))), KeyResult::Handled);
    assert!(search.is_active());
    for c in " ayı ".chars() {
      search.handle_key(key(KeyCode::Char(c)));
    }
    assert_eq!(
      search.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(SearchEvent::Submitted("ayı".to_string()))
    );
    assert!(!search.is_active());
  }

  #[test]
  fn test_blank_submit_cancels() {
    let mut search = SearchInput::default();
    search.activate("   ");
    assert_eq!(
      search.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(SearchEvent::Cancelled)
    );
  }
}
