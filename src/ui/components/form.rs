use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

#[derive(Debug, Clone)]
pub struct FormField {
  pub label: &'static str,
  pub input: TextInput,
}

impl FormField {
  pub fn text(label: &'static str) -> Self {
    Self {
      label,
      input: TextInput::new(),
    }
  }

  pub fn password(label: &'static str) -> Self {
    Self {
      label,
      input: TextInput::masked(),
    }
  }

  pub fn filled(label: &'static str, value: impl Into<String>) -> Self {
    Self {
      label,
      input: TextInput::with_value(value),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
  /// Enter on the last field
  Submitted,
  Cancelled,
}

/// Vertical stack of labelled text fields.
///
/// Tab/Down and Enter move to the next field; Enter on the last field submits.
#[derive(Debug, Clone)]
pub struct Form {
  fields: Vec<FormField>,
  focus: usize,
}

impl Form {
  pub fn new(fields: Vec<FormField>) -> Self {
    Self { fields, focus: 0 }
  }

  pub fn value(&self, index: usize) -> &str {
    self.fields.get(index).map(|f| f.input.value()).unwrap_or("")
  }

  /// Trimmed value of a field
  pub fn trimmed(&self, index: usize) -> String {
    self.value(index).trim().to_string()
  }

  pub fn focus(&self) -> usize {
    self.focus
  }

  pub fn len(&self) -> usize {
    self.fields.len()
  }

  fn next(&mut self) {
    if !self.fields.is_empty() {
      self.focus = (self.focus + 1) % self.fields.len();
    }
  }

  fn prev(&mut self) {
    if !self.fields.is_empty() {
      self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
    }
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FormEvent> {
    match key.code {
      KeyCode::Tab | KeyCode::Down => {
        self.next();
        return KeyResult::Handled;
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.prev();
        return KeyResult::Handled;
      }
      _ => {}
    }

    let Some(field) = self.fields.get_mut(self.focus) else {
      return KeyResult::NotHandled;
    };
    match field.input.handle_key(key) {
      InputResult::Submitted(_) if self.focus + 1 == self.fields.len() => {
        KeyResult::Event(FormEvent::Submitted)
      }
      InputResult::Submitted(_) => {
        self.next();
        KeyResult::Handled
      }
      InputResult::Cancelled => KeyResult::Event(FormEvent::Cancelled),
      InputResult::Consumed => KeyResult::Handled,
      InputResult::NotHandled => KeyResult::NotHandled,
    }
  }

  /// Draw one line per field; the focused field shows a cursor.
  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let label_width = self
      .fields
      .iter()
      .map(|f| f.label.chars().count())
      .max()
      .unwrap_or(0)
      + 2;

    let lines: Vec<Line> = self
      .fields
      .iter()
      .enumerate()
      .map(|(i, field)| {
        let focused = i == self.focus;
        let label_style = if focused {
          Style::default().fg(Color::Yellow).bold()
        } else {
          Style::default().fg(Color::DarkGray)
        };
        let mut spans = vec![Span::styled(
          format!("{:>width$}  ", field.label, width = label_width),
          label_style,
        )];
        if focused {
          let (before, after) = field.input.split_at_cursor();
          spans.push(Span::raw(before));
          spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
          spans.push(Span::raw(after));
        } else {
          spans.push(Span::raw(field.input.display()));
        }
        Line::from(spans)
      })
      .collect();

    frame.render_widget(Paragraph::new(lines), area);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn type_str(form: &mut Form, s: &str) {
    for c in s.chars() {
      form.handle_key(key(KeyCode::Char(c)));
    }
  }

  #[test]
  fn test_enter_advances_then_submits() {
    let mut form = Form::new(vec![FormField::text("Email"), FormField::password("Password")]);
    type_str(&mut form, "ada@example.com");
    assert_eq!(form.handle_key(key(KeyCode::Enter)), KeyResult::Handled);
    assert_eq!(form.focus(), 1);

    type_str(&mut form, "gizli");
    assert_eq!(
      form.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(FormEvent::Submitted)
    );
    assert_eq!(form.value(0), "ada@example.com");
    assert_eq!(form.value(1), "gizli");
  }

  #[test]
  fn test_tab_wraps_and_esc_cancels() {
    let mut form = Form::new(vec![FormField::filled("Name", " Ada "), FormField::text("Phone")]);
    form.handle_key(key(KeyCode::BackTab));
    assert_eq!(form.focus(), 1);
    form.handle_key(key(KeyCode::Tab));
    assert_eq!(form.focus(), 0);
    assert_eq!(form.trimmed(0), "Ada");
    assert_eq!(form.handle_key(key(KeyCode::Esc)), KeyResult::Event(FormEvent::Cancelled));
  }
}
