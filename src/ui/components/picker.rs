use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState};

/// One choice in a [`Picker`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerItem {
  pub id: String,
  pub label: String,
  /// Secondary text drawn dimmed after the label
  pub hint: String,
}

impl PickerItem {
  pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      label: label.into(),
      hint: String::new(),
    }
  }

  pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
    self.hint = hint.into();
    self
  }
}

/// Events emitted by the picker that parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerEvent {
  /// Item selected (returns its id)
  Selected(String),
  Cancelled,
}

/// Centered overlay list for choosing topics, subtopics and age groups
#[derive(Debug, Clone, Default)]
pub struct Picker {
  active: bool,
  items: Vec<PickerItem>,
  selected: usize,
  title: String,
}

impl Picker {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Show the picker, highlighting `current` if it is one of the items
  pub fn show(&mut self, title: impl Into<String>, items: Vec<PickerItem>, current: Option<&str>) {
    self.selected = current
      .and_then(|id| items.iter().position(|item| item.id == id))
      .unwrap_or(0);
    self.active = true;
    self.items = items;
    self.title = title.into();
  }

  pub fn hide(&mut self) {
    self.active = false;
    self.items.clear();
    self.selected = 0;
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<PickerEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc | KeyCode::Char('q') => {
        self.hide();
        KeyResult::Event(PickerEvent::Cancelled)
      }
      KeyCode::Enter => {
        let event = match self.items.get(self.selected) {
          Some(item) => PickerEvent::Selected(item.id.clone()),
          None => PickerEvent::Cancelled,
        };
        self.hide();
        KeyResult::Event(event)
      }
      KeyCode::Char('j') | KeyCode::Down => {
        if !self.items.is_empty() {
          self.selected = (self.selected + 1) % self.items.len();
        }
        KeyResult::Handled
      }
      KeyCode::Char('k') | KeyCode::Up => {
        if !self.items.is_empty() {
          self.selected = (self.selected + self.items.len() - 1) % self.items.len();
        }
        KeyResult::Handled
      }
      _ => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let widest = self
      .items
      .iter()
      .map(|item| item.label.chars().count() + item.hint.chars().count() + 3)
      .max()
      .unwrap_or(10)
      .max(self.title.chars().count() + 4);
    let width = (widest as u16 + 6).clamp(20, area.width.saturating_sub(4).max(20));
    let height = (self.items.len() as u16 + 2).clamp(3, area.height.saturating_sub(4).max(3));

    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let overlay_area = Rect::new(x, y, width.min(area.width), height.min(area.height));

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title));

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    if self.items.is_empty() {
      frame.render_widget(
        ratatui::widgets::Paragraph::new("Nothing to choose from")
          .style(Style::default().fg(Color::DarkGray)),
        inner,
      );
      return;
    }

    let items: Vec<ListItem> = self
      .items
      .iter()
      .map(|item| {
        let mut spans = vec![Span::styled(item.label.as_str(), Style::default().fg(Color::Cyan))];
        if !item.hint.is_empty() {
          spans.push(Span::styled(
            format!("  {}", item.hint),
            Style::default().fg(Color::DarkGray),
          ));
        }
        ListItem::new(Line::from(spans))
      })
      .collect();

    let list =
      List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut state = ListState::default();
    state.select(Some(self.selected));

    frame.render_stateful_widget(list, inner, &mut state);
  }
}
