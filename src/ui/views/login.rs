use crate::api::types::{Credentials, Registration, UserProfile};
use crate::api::{ApiError, Notice};
use crate::auth::session_id_from_callback;
use crate::query::Query;
use crate::services::Services;
use crate::ui::components::{Form, FormEvent, FormField, KeyResult};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Tabs, Wrap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
  Login,
  Register,
  Google,
}

impl Mode {
  const ALL: [Mode; 3] = [Mode::Login, Mode::Register, Mode::Google];

  fn title(self) -> &'static str {
    match self {
      Mode::Login => "Log in",
      Mode::Register => "Register",
      Mode::Google => "Google",
    }
  }

  fn form(self) -> Form {
    match self {
      Mode::Login => Form::new(vec![FormField::text("Email"), FormField::password("Password")]),
      Mode::Register => Form::new(vec![
        FormField::text("Name"),
        FormField::text("Surname"),
        FormField::text("Email"),
        FormField::password("Password"),
        FormField::text("Phone (optional)"),
      ]),
      Mode::Google => Form::new(vec![FormField::text("Callback URL")]),
    }
  }

  fn next(self) -> Mode {
    match self {
      Mode::Login => Mode::Register,
      Mode::Register => Mode::Google,
      Mode::Google => Mode::Login,
    }
  }
}

/// Email/password login, registration and Google session exchange
pub struct LoginView {
  services: Services,
  mode: Mode,
  form: Form,
  pending: Query<UserProfile>,
}

impl LoginView {
  pub fn new(services: Services) -> Self {
    Self {
      services,
      mode: Mode::Login,
      form: Mode::Login.form(),
      pending: Query::manual(),
    }
  }

  fn switch_mode(&mut self) {
    self.mode = self.mode.next();
    self.form = self.mode.form();
  }

  fn submit(&mut self) -> ViewAction {
    let auth = self.services.auth.clone();
    match self.mode {
      Mode::Login => {
        let credentials = Credentials {
          email: self.form.trimmed(0),
          password: self.form.value(1).to_string(),
        };
        if credentials.email.is_empty() || credentials.password.is_empty() {
          return ViewAction::Notify(Notice::error("Email and password are required"));
        }
        self
          .pending
          .dispatch(async move { auth.login(&credentials).await });
      }
      Mode::Register => {
        let phone = self.form.trimmed(4);
        let registration = Registration {
          name: self.form.trimmed(0),
          surname: self.form.trimmed(1),
          email: self.form.trimmed(2),
          password: self.form.value(3).to_string(),
          phone: (!phone.is_empty()).then_some(phone),
        };
        if registration.name.is_empty()
          || registration.email.is_empty()
          || registration.password.is_empty()
        {
          return ViewAction::Notify(Notice::error("Name, email and password are required"));
        }
        self
          .pending
          .dispatch(async move { auth.register(&registration).await });
      }
      Mode::Google => {
        let Some(session_id) = session_id_from_callback(self.form.value(0)) else {
          return ViewAction::Notify(Notice::error("No session_id found in that URL"));
        };
        self
          .pending
          .dispatch(async move { auth.exchange_oauth(&session_id).await });
      }
    }
    ViewAction::None
  }

  fn failure(&self, err: &ApiError) -> Notice {
    match (self.mode, err) {
      (Mode::Login, ApiError::Unauthorized) => Notice::error("Invalid email or password"),
      (Mode::Google, ApiError::Unauthorized) => Notice::error("Google session expired, try again"),
      (Mode::Register, _) => err.notice("Registration failed"),
      _ => err.notice("Login failed"),
    }
  }
}

impl View for LoginView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.pending.is_loading() {
      return ViewAction::None;
    }
    if key.code == KeyCode::Char('n') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.switch_mode();
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
      .title(" Account ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .margin(1)
      .constraints([
        Constraint::Length(2),
        Constraint::Length(self.form.len() as u16 + 1),
        Constraint::Min(0),
      ])
      .split(inner);

    let selected = Mode::ALL.iter().position(|m| *m == self.mode).unwrap_or(0);
    let tabs = Tabs::new(Mode::ALL.iter().map(|m| m.title()))
      .select(selected)
      .highlight_style(Style::default().fg(Color::Yellow).bold());
    frame.render_widget(tabs, chunks[0]);

    self.form.render(frame, chunks[1]);

    let help = if self.pending.is_loading() {
      Line::styled("Signing in...", Style::default().fg(Color::Yellow))
    } else if self.mode == Mode::Google {
      Line::styled(
        "Sign in with Google in your browser, then paste the address you were sent back to (it contains #session_id=...).",
        Style::default().fg(Color::DarkGray),
      )
    } else {
      Line::styled(
        "Enter on the last field submits. Ctrl-n switches between log in, register and Google.",
        Style::default().fg(Color::DarkGray),
      )
    };
    frame.render_widget(Paragraph::new(help).wrap(Wrap { trim: true }), chunks[2]);
  }

  fn breadcrumb_label(&self) -> String {
    self.mode.title().to_string()
  }

  fn tick(&mut self) -> ViewAction {
    if !self.pending.poll() {
      return ViewAction::None;
    }
    if let Some(err) = self.pending.error() {
      return ViewAction::Notify(self.failure(err));
    }
    match self.pending.data() {
      Some(user) => ViewAction::Batch(vec![
        ViewAction::Notify(Notice::success(format!("Welcome, {}!", user.name))),
        ViewAction::Pop,
      ]),
      None => ViewAction::None,
    }
  }

  fn is_editing(&self) -> bool {
    true
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("tab", "next field").with_priority(10),
      ShortcutInfo::new("C-n", "mode").with_priority(20),
      ShortcutInfo::new("esc", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::fake::{user, FakeApi};
  use crate::services::testing::services;
  use std::sync::Arc;
  use std::time::Duration;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn type_str(view: &mut LoginView, s: &str) {
    for c in s.chars() {
      view.handle_key(key(KeyCode::Char(c)));
    }
  }

  #[tokio::test]
  async fn test_login_stores_token_and_pops() {
    let fake = Arc::new(FakeApi::new().with_user(user(5)).with_session_token("tok-1"));
    let services = services(fake);
    let mut view = LoginView::new(services.clone());

    type_str(&mut view, "ada@example.com");
    view.handle_key(key(KeyCode::Enter));
    type_str(&mut view, "gizli");
    view.handle_key(key(KeyCode::Enter));

    tokio::time::sleep(Duration::from_millis(20)).await;
    let ViewAction::Batch(actions) = view.tick() else {
      panic!("login should notify and pop");
    };
    assert!(matches!(actions.last(), Some(ViewAction::Pop)));
    assert!(services.auth.is_authenticated());
    assert_eq!(services.store.token().as_deref(), Some("tok-1"));
  }

  #[tokio::test]
  async fn test_bad_credentials_message() {
    let fake = Arc::new(FakeApi::new());
    let mut view = LoginView::new(services(fake));
    type_str(&mut view, "ada@example.com");
    view.handle_key(key(KeyCode::Enter));
    type_str(&mut view, "yanlis");
    view.handle_key(key(KeyCode::Enter));

    tokio::time::sleep(Duration::from_millis(20)).await;
    let ViewAction::Notify(notice) = view.tick() else {
      panic!("failed login should notify");
    };
    assert_eq!(notice.message, "Invalid email or password");
  }

  #[tokio::test]
  async fn test_google_mode_needs_session_id() {
    let fake = Arc::new(FakeApi::new().with_user(user(1)));
    let mut view = LoginView::new(services(fake.clone()));
    view.handle_key(KeyEvent::new(KeyCode::Char('n'), KeyModifiers::CONTROL));
    view.handle_key(KeyEvent::new(KeyCode::Char('n'), KeyModifiers::CONTROL));
    assert_eq!(view.mode, Mode::Google);

    assert!(matches!(view.handle_key(key(KeyCode::Enter)), ViewAction::Notify(_)));
    assert_eq!(fake.calls("google_session"), 0);

    type_str(&mut view, "https://masalsepeti.example/profile#session_id=abc123");
    view.handle_key(key(KeyCode::Enter));
    tokio::time::sleep(Duration::from_millis(20)).await;
    view.tick();
    assert_eq!(fake.calls("google_session"), 1);
  }
}
