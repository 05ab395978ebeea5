use crate::api::types::{AdminCredentials, UserProfile};
use crate::api::{ApiError, Notice};
use crate::query::Query;
use crate::services::Services;
use crate::ui::components::{Form, FormEvent, FormField, KeyResult};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::AdminView;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

pub struct AdminLoginView {
  services: Services,
  form: Form,
  pending: Query<UserProfile>,
}

impl AdminLoginView {
  pub fn new(services: Services) -> Self {
    Self {
      services,
      form: Form::new(vec![FormField::text("Username"), FormField::password("Password")]),
      pending: Query::manual(),
    }
  }

  fn submit(&mut self) -> ViewAction {
    let credentials = AdminCredentials {
      username: self.form.trimmed(0),
      password: self.form.value(1).to_string(),
    };
    if credentials.username.is_empty() || credentials.password.is_empty() {
      return ViewAction::Notify(Notice::error("Username and password are required"));
    }
    let auth = self.services.auth.clone();
    self
      .pending
      .dispatch(async move { auth.admin_login(&credentials).await });
    ViewAction::None
  }
}

impl View for AdminLoginView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.pending.is_loading() {
      return ViewAction::None;
    }
    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submitted) => self.submit(),
      KeyResult::Event(FormEvent::Cancelled) => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(" Admin login ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Magenta));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .margin(1)
      .constraints([Constraint::Length(3), Constraint::Min(0)])
      .split(inner);
    self.form.render(frame, chunks[0]);

    let status = if self.pending.is_loading() {
      Line::styled("Checking...", Style::default().fg(Color::Yellow))
    } else {
      Line::styled("Administrators only.", Style::default().fg(Color::DarkGray))
    };
    frame.render_widget(Paragraph::new(status), chunks[1]);
  }

  fn breadcrumb_label(&self) -> String {
    "Admin login".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    if !self.pending.poll() {
      return ViewAction::None;
    }
    match (self.pending.error(), self.pending.data()) {
      (Some(ApiError::Unauthorized), _) => {
        ViewAction::Notify(Notice::error("Invalid admin credentials"))
      }
      (Some(err), _) => ViewAction::Notify(err.notice("Admin login failed")),
      (None, Some(user)) if user.is_admin() => ViewAction::Batch(vec![
        ViewAction::Notify(Notice::success("Admin session started")),
        ViewAction::Replace(Box::new(AdminView::new(self.services.clone()))),
      ]),
      (None, Some(_)) => ViewAction::Notify(Notice::error("This account is not an administrator")),
      (None, None) => ViewAction::None,
    }
  }

  fn is_editing(&self) -> bool {
    true
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("tab", "next field").with_priority(10),
      ShortcutInfo::new("esc", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::fake::{user, FakeApi};
  use crate::api::types::Role;
  use crate::services::testing::services;
  use crossterm::event::{KeyCode, KeyModifiers};
  use std::sync::Arc;
  use std::time::Duration;

  fn submit(view: &mut AdminLoginView) {
    for c in "admin".chars() {
      view.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
    }
    view.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
    for c in "s3cret".chars() {
      view.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
    }
    view.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
  }

  #[tokio::test]
  async fn test_admin_login_opens_dashboard() {
    let mut admin = user(0);
    admin.role = Role::Admin;
    let fake = Arc::new(FakeApi::new().with_user(admin));
    let mut view = AdminLoginView::new(services(fake));
    submit(&mut view);
    tokio::time::sleep(Duration::from_millis(20)).await;

    let ViewAction::Batch(actions) = view.tick() else {
      panic!("admin login should open the dashboard");
    };
    assert!(matches!(actions.last(), Some(ViewAction::Replace(_))));
  }

  #[tokio::test]
  async fn test_regular_user_is_refused() {
    let fake = Arc::new(FakeApi::new().with_user(user(4)));
    let mut view = AdminLoginView::new(services(fake));
    submit(&mut view);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(matches!(view.tick(), ViewAction::Notify(_)));
  }
}
