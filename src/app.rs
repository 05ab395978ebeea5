use crate::api::types::{Story, StoryQuery};
use crate::api::{Notice, NoticeLink};
use crate::auth::AuthState;
use crate::create::failure_notice;
use crate::event::{Event, EventHandler};
use crate::gate::{ActionGate, Dismissal};
use crate::query::Query;
use crate::services::Services;
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult, Toasts};
use crate::ui::view::{GatedAction, ShortcutInfo, View, ViewAction};
use crate::ui::views::{
  AdminLoginView, AdminView, HomeView, LoginView, ProfileView, StoryCreateView, StoryDetailView,
  StoryListView,
};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Main application state
pub struct App {
  services: Services,

  /// Resolved backend base URL, shown in the header
  api_url: String,

  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// `:` palette
  command_input: CommandInput,

  /// Sponsor interstitial in front of gated actions
  gate: ActionGate<GatedAction>,

  toasts: Toasts,

  /// First-run overlay
  show_welcome: bool,

  /// Validation of the stored session token
  boot: Query<AuthState>,

  /// Generations whose view was closed before they finished
  detached: Vec<Query<Story>>,

  should_quit: bool,
}

impl App {
  /// Build the app over `services`, optionally opening a story straight away.
  pub fn new(services: Services, api_url: String, open_story: Option<String>) -> Self {
    let mut view_stack: Vec<Box<dyn View>> = vec![Box::new(HomeView::new(services.clone()))];
    if let Some(story_id) = open_story {
      view_stack.push(Box::new(StoryDetailView::new(services.clone(), story_id)));
    }

    let auth = services.auth.clone();
    let mut boot = Query::manual();
    boot.dispatch(async move { Ok(auth.boot().await) });

    Self {
      gate: ActionGate::new(services.config.interstitial()),
      show_welcome: !services.store.welcome_seen(),
      services,
      api_url,
      view_stack,
      command_input: CommandInput::new(),
      toasts: Toasts::new(),
      boot,
      detached: Vec::new(),
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(250));
    info!(views = self.view_stack.len(), "event loop started");

    let result = self.event_loop(&mut terminal, &mut events).await;

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop<B: Backend>(
    &mut self,
    terminal: &mut Terminal<B>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => self.tick(),
        Some(Event::Resize) => {}
        None => break,
      }
    }
    Ok(())
  }

  fn tick(&mut self) {
    let now = Instant::now();
    self.toasts.expire(now);

    if self.boot.poll() {
      if let Some(AuthState::Authenticated(user)) = self.boot.data() {
        let notice = Notice::info(format!("Welcome back, {}", user.name));
        self.toasts.push(notice, now);
      }
      if let Some(view) = self.view_stack.last_mut() {
        view.on_resume();
      }
    }

    let mut finished = Vec::new();
    self.detached.retain_mut(|query| {
      if !query.poll() {
        return true;
      }
      finished.extend(detached_notice(query));
      false
    });
    for notice in finished {
      self.toasts.push(notice, now);
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.tick(),
      None => ViewAction::None,
    };
    self.apply(action);
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    if self.gate.is_open() {
      if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
        self.dismiss_gate();
      }
      return;
    }

    if self.show_welcome {
      self.show_welcome = false;
      self.services.store.mark_welcome_seen();
      return;
    }

    if key.code == KeyCode::Char('g') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.follow_toast_link();
      return;
    }

    let editing = self.view_stack.last().is_some_and(|v| v.is_editing());
    if self.command_input.is_active() || !editing {
      match self.command_input.handle_key(key) {
        KeyResult::Event(CommandEvent::Submitted(cmd)) => {
          self.execute_command(&cmd);
          return;
        }
        KeyResult::NotHandled => {}
        _ => return,
      }
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key),
      None => ViewAction::None,
    };
    self.apply(action);
  }

  fn dismiss_gate(&mut self) {
    match self.gate.dismiss(Instant::now()) {
      Dismissal::TooEarly | Dismissal::Closed => {}
      Dismissal::Run(action) => {
        info!(action = %action.describe(), "gated action released");
        let next = match self.view_stack.last_mut() {
          Some(view) => view.on_gate(action),
          None => ViewAction::None,
        };
        self.apply(next);
      }
    }
  }

  fn follow_toast_link(&mut self) {
    let Some(link) = self.toasts.link() else {
      return;
    };
    self.toasts.consume_link(link);
    let view: Box<dyn View> = match link {
      NoticeLink::Profile => Box::new(ProfileView::new(self.services.clone())),
      NoticeLink::Login => Box::new(LoginView::new(self.services.clone())),
    };
    self.view_stack.push(view);
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
          if let Some(view) = self.view_stack.last_mut() {
            view.on_resume();
          }
        } else {
          self.should_quit = true;
        }
      }
      ViewAction::Replace(view) => {
        self.view_stack.pop();
        self.view_stack.push(view);
      }
      ViewAction::Notify(notice) => self.toasts.push(notice, Instant::now()),
      ViewAction::Gate(action) => {
        if let Some(replaced) = self.gate.request(action, Instant::now()) {
          debug!(replaced = %replaced.describe(), "pending gated action replaced");
        }
      }
      ViewAction::Detach(query) => {
        debug!(pending = self.detached.len() + 1, "generation continues in background");
        self.detached.push(query);
      }
      ViewAction::Batch(actions) => {
        for action in actions {
          self.apply(action);
        }
      }
    }
  }

  fn execute_command(&mut self, cmd: &str) {
    debug!(command = cmd, "executing command");
    let services = self.services.clone();
    match cmd {
      "home" => {
        self.view_stack.clear();
        self.view_stack.push(Box::new(HomeView::new(services)));
      }
      "stories" => self.view_stack.push(Box::new(StoryListView::new(
        services,
        StoryQuery::default(),
      ))),
      "create" => self
        .view_stack
        .push(Box::new(StoryCreateView::new(services, None, None))),
      "profile" => self.view_stack.push(Box::new(ProfileView::new(services))),
      "login" => self.view_stack.push(Box::new(LoginView::new(services))),
      "logout" => {
        let auth = services.auth.clone();
        tokio::spawn(async move { auth.logout().await });
        self.toasts.push(Notice::info("Logged out"), Instant::now());
      }
      "admin" => {
        let view: Box<dyn View> = if services.auth.is_admin() {
          Box::new(AdminView::new(services))
        } else {
          Box::new(AdminLoginView::new(services))
        };
        self.view_stack.push(view);
      }
      "quit" => self.should_quit = true,
      "" => {}
      other => self
        .toasts
        .push(Notice::error(format!("Unknown command: {}", other)), Instant::now()),
    }
  }

  // Accessors for UI rendering
  pub fn services(&self) -> &Services {
    &self.services
  }

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn api_url(&self) -> &str {
    &self.api_url
  }

  pub fn shortcuts(&self) -> Vec<ShortcutInfo> {
    self
      .view_stack
      .last()
      .map(|v| v.shortcuts())
      .unwrap_or_default()
  }

  pub fn breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect()
  }

  pub fn status(&self) -> String {
    match self.services.auth.state() {
      AuthState::Uninitialized | AuthState::Checking => "checking session ".to_string(),
      _ => format!("v{} ", env!("CARGO_PKG_VERSION")),
    }
  }

  pub fn command_input(&self) -> &CommandInput {
    &self.command_input
  }

  /// Countdown and pending action description while the gate is open
  pub fn interstitial(&self) -> Option<(u64, Option<String>)> {
    if !self.gate.is_open() {
      return None;
    }
    let remaining = self.gate.remaining_secs(Instant::now());
    Some((remaining, self.gate.pending().map(|a| a.describe())))
  }

  pub fn showing_welcome(&self) -> bool {
    self.show_welcome
  }

  pub fn toasts(&self) -> &Toasts {
    &self.toasts
  }
}

/// Outcome of a generation that finished after its view was closed
fn detached_notice(query: &Query<Story>) -> Option<Notice> {
  if let Some(err) = query.error() {
    return (!err.is_silent()).then(|| failure_notice(err));
  }
  query.data().map(|story| {
    Notice::success(format!("\"{}\" is ready in your profile", story.title))
      .with_link(NoticeLink::Profile)
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::fake::{story, FakeApi};
  use crate::services::testing::services;
  use std::sync::Arc;

  const API: &str = "http://localhost:8000/api";

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn type_str(app: &mut App, s: &str) {
    for c in s.chars() {
      app.handle_key(key(KeyCode::Char(c)));
    }
  }

  fn app(fake: Arc<FakeApi>) -> App {
    let services = services(fake);
    services.store.mark_welcome_seen();
    App::new(services, API.to_string(), None)
  }

  #[tokio::test]
  async fn test_welcome_shown_once() {
    let services = services(Arc::new(FakeApi::new()));
    let mut first = App::new(services.clone(), API.to_string(), None);
    assert!(first.showing_welcome());
    first.handle_key(key(KeyCode::Char('x')));
    assert!(!first.showing_welcome());

    let second = App::new(services, API.to_string(), None);
    assert!(!second.showing_welcome());
  }

  #[tokio::test]
  async fn test_search_waits_for_interstitial() {
    let fake = Arc::new(FakeApi::new().with_stories(vec![story("s1", "Paylaşan Ayı")]));
    let mut app = app(fake.clone());
    tokio::time::sleep(Duration::from_millis(20)).await;
    app.tick();
    let before = fake.calls("list_stories");

    app.handle_key(key(KeyCode::Char('/')));
    type_str(&mut app, "ayı");
    app.handle_key(key(KeyCode::Enter));
    assert!(app.interstitial().is_some());

    // Countdown still running
    app.handle_key(key(KeyCode::Enter));
    assert!(app.interstitial().is_some());
    assert_eq!(app.view_stack.len(), 1);

    app.gate = {
      let mut gate = ActionGate::new(Duration::ZERO);
      gate.request(GatedAction::Search("ayı".into()), Instant::now());
      gate
    };
    app.handle_key(key(KeyCode::Enter));
    assert!(app.interstitial().is_none());
    assert_eq!(app.view_stack.len(), 2);

    tokio::time::sleep(Duration::from_millis(20)).await;
    app.tick();
    assert_eq!(fake.calls("list_stories"), before + 1);
    assert_eq!(fake.last_query().and_then(|q| q.search).as_deref(), Some("ayı"));
  }

  #[tokio::test]
  async fn test_latest_gated_action_wins() {
    let mut app = app(Arc::new(FakeApi::new()));
    app.gate = ActionGate::new(Duration::ZERO);
    app.apply(ViewAction::Gate(GatedAction::Search("eski".into())));
    app.apply(ViewAction::Gate(GatedAction::Search("yeni".into())));

    let (_, pending) = app.interstitial().unwrap();
    assert_eq!(pending.as_deref(), Some("search for \"yeni\""));
  }

  #[tokio::test]
  async fn test_command_palette_navigation() {
    let mut app = app(Arc::new(FakeApi::new()));
    app.handle_key(key(KeyCode::Char(':')));
    type_str(&mut app, "stories");
    app.handle_key(key(KeyCode::Enter));
    assert_eq!(app.breadcrumb(), vec!["Home".to_string(), "Stories".to_string()]);

    app.handle_key(key(KeyCode::Char(':')));
    type_str(&mut app, "home");
    app.handle_key(key(KeyCode::Enter));
    assert_eq!(app.view_stack.len(), 1);
  }

  #[tokio::test]
  async fn test_pop_at_root_quits() {
    let mut app = app(Arc::new(FakeApi::new()));
    let profile = ProfileView::new(app.services.clone());
    app.apply(ViewAction::Push(Box::new(profile)));
    app.apply(ViewAction::Pop);
    assert!(!app.should_quit);
    app.apply(ViewAction::Pop);
    assert!(app.should_quit);
  }

  #[tokio::test]
  async fn test_detached_generation_still_reports() {
    let mut app = app(Arc::new(FakeApi::new()));
    let mut creating = Query::manual();
    creating.dispatch(async { Ok(story("s9", "Cesur Tavşan")) });
    app.apply(ViewAction::Detach(creating));

    let mut failing: Query<Story> = Query::manual();
    failing.dispatch(async { Err(crate::api::ApiError::Timeout) });
    app.apply(ViewAction::Detach(failing));

    tokio::time::sleep(Duration::from_millis(20)).await;
    app.tick();
    assert!(app.detached.is_empty());

    let messages: Vec<&str> = app.toasts.iter().map(|n| n.message.as_str()).collect();
    assert!(messages.iter().any(|m| m.contains("Cesur Tavşan")));
    assert_eq!(app.toasts.len(), 2);
    assert_eq!(app.toasts.link(), Some(NoticeLink::Profile));
  }

  #[tokio::test]
  async fn test_toast_link_opens_profile() {
    let mut app = app(Arc::new(FakeApi::new()));
    app.apply(ViewAction::Notify(
      Notice::error("Not enough credits").with_link(NoticeLink::Profile),
    ));
    app.handle_key(KeyEvent::new(KeyCode::Char('g'), KeyModifiers::CONTROL));
    assert_eq!(app.breadcrumb().last().map(String::as_str), Some("Profile"));
  }
}
