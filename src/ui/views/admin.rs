use crate::api::types::{
  AdminStats, CreditDecision, CreditRequest, ProfilePatch, Story, UserProfile,
};
use crate::api::{ApiError, Notice};
use crate::query::Query;
use crate::services::Services;
use crate::storage::Namespace;
use crate::ui::components::{Confirm, Form, FormEvent, FormField, KeyResult};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{listens, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::AdminLoginView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
  Stats,
  Users,
  Stories,
  Requests,
}

impl Tab {
  const ALL: [Tab; 4] = [Tab::Stats, Tab::Users, Tab::Stories, Tab::Requests];

  fn title(self) -> &'static str {
    match self {
      Tab::Stats => "1 Stats",
      Tab::Users => "2 Users",
      Tab::Stories => "3 Stories",
      Tab::Requests => "4 Credit requests",
    }
  }

  fn index(self) -> usize {
    Tab::ALL.iter().position(|t| *t == self).unwrap_or(0)
  }
}

/// Destructive admin operations awaiting y/n
#[derive(Debug, Clone)]
enum Target {
  User(String),
  Story(String),
}

/// Credit amount being typed, and for whom
#[derive(Debug, Clone)]
enum CreditEdit {
  SetBalance { user_id: String },
  Approve { request_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Done {
  Credits,
  UserDeleted,
  StoryDeleted,
  Approved,
  Rejected,
}

impl Done {
  fn message(self) -> &'static str {
    match self {
      Done::Credits => "Credits updated",
      Done::UserDeleted => "User deleted",
      Done::StoryDeleted => "Story deleted",
      Done::Approved => "Request approved",
      Done::Rejected => "Request rejected",
    }
  }
}

/// Admin dashboard over stats, users, stories and credit requests
pub struct AdminView {
  services: Services,
  tab: Tab,
  stats: Query<AdminStats>,
  users: Query<Vec<UserProfile>>,
  stories: Query<Vec<Story>>,
  requests: Query<Vec<CreditRequest>>,
  user_state: ListState,
  story_state: ListState,
  request_state: ListState,
  credit_form: Option<(CreditEdit, Form)>,
  confirm: Confirm<Target>,
  mutation: Query<Done>,
}

impl AdminView {
  pub fn new(services: Services) -> Self {
    let api = services.api.clone();
    let stats = Query::new(move || {
      let api = api.clone();
      async move { api.admin_stats().await }
    });
    let api = services.api.clone();
    let users = Query::new(move || {
      let api = api.clone();
      async move { api.admin_users().await }
    });
    let api = services.api.clone();
    let stories = Query::new(move || {
      let api = api.clone();
      async move { api.admin_stories().await }
    });
    let api = services.api.clone();
    let requests = Query::new(move || {
      let api = api.clone();
      async move { api.admin_credit_requests().await }
    });

    let mut view = Self {
      services,
      tab: Tab::Stats,
      stats,
      users,
      stories,
      requests,
      user_state: ListState::default(),
      story_state: ListState::default(),
      request_state: ListState::default(),
      credit_form: None,
      confirm: Confirm::new(),
      mutation: Query::manual(),
    };
    view.reload_all();
    view
  }

  fn reload_all(&mut self) {
    self.stats.refetch();
    self.users.refetch();
    self.stories.refetch();
    self.requests.refetch();
  }

  fn users(&self) -> &[UserProfile] {
    self.users.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  fn stories(&self) -> &[Story] {
    self.stories.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  fn requests(&self) -> &[CreditRequest] {
    self.requests.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  fn selected_user(&self) -> Option<&UserProfile> {
    self.user_state.selected().and_then(|i| self.users().get(i))
  }

  fn selected_story(&self) -> Option<&Story> {
    self.story_state.selected().and_then(|i| self.stories().get(i))
  }

  fn selected_request(&self) -> Option<&CreditRequest> {
    self.request_state.selected().and_then(|i| self.requests().get(i))
  }

  fn auth_failure(&self) -> bool {
    [
      self.stats.error(),
      self.users.error(),
      self.stories.error(),
      self.requests.error(),
      self.mutation.error(),
    ]
    .into_iter()
    .flatten()
    .any(ApiError::is_auth_failure)
  }

  fn list_state(&mut self) -> Option<&mut ListState> {
    match self.tab {
      Tab::Stats => None,
      Tab::Users => Some(&mut self.user_state),
      Tab::Stories => Some(&mut self.story_state),
      Tab::Requests => Some(&mut self.request_state),
    }
  }

  fn submit_credits(&mut self, edit: CreditEdit, form: &Form) -> ViewAction {
    let Ok(credits) = form.trimmed(0).parse::<i64>() else {
      return ViewAction::Notify(Notice::error("Credits must be a whole number"));
    };
    if credits < 0 {
      return ViewAction::Notify(Notice::error("Credits cannot be negative"));
    }
    let api = self.services.api.clone();
    match edit {
      CreditEdit::SetBalance { user_id } => {
        let auth = self.services.auth.clone();
        self.mutation.dispatch(async move {
          api.admin_update_credits(&user_id, credits).await?;
          // The header shows the admin's own balance
          if auth.user().is_some_and(|me| me.user_id == user_id) {
            auth.apply_local_update(ProfilePatch {
              credits: Some(credits),
              ..ProfilePatch::default()
            });
          }
          Ok(Done::Credits)
        })
      }
      CreditEdit::Approve { request_id } => self.mutation.dispatch(async move {
        api
          .admin_resolve_credit_request(&request_id, &CreditDecision::Approved { credits })
          .await?;
        Ok(Done::Approved)
      }),
    }
    ViewAction::None
  }

  fn run_delete(&mut self, target: Target) {
    let api = self.services.api.clone();
    match target {
      Target::User(user_id) => self.mutation.dispatch(async move {
        api.admin_delete_user(&user_id).await?;
        Ok(Done::UserDeleted)
      }),
      Target::Story(story_id) => {
        let cache = self.services.reconciler.cache().clone();
        self.mutation.dispatch(async move {
          api.admin_delete_story(&story_id).await?;
          cache.invalidate(Namespace::Stories);
          cache.invalidate(Namespace::PopularStories);
          Ok(Done::StoryDeleted)
        })
      }
    }
  }

  fn reject(&mut self, request_id: String) {
    let api = self.services.api.clone();
    self.mutation.dispatch(async move {
      api
        .admin_resolve_credit_request(&request_id, &CreditDecision::Rejected)
        .await?;
      Ok(Done::Rejected)
    });
  }

  fn handle_tab_key(&mut self, key: KeyEvent) {
    match (self.tab, key.code) {
      (Tab::Users, KeyCode::Char('e')) => {
        if let Some(user) = self.selected_user() {
          let edit = CreditEdit::SetBalance {
            user_id: user.user_id.clone(),
          };
          let form = Form::new(vec![FormField::filled("Credits", user.credits.to_string())]);
          self.credit_form = Some((edit, form));
        }
      }
      (Tab::Users, KeyCode::Char('x')) => {
        if let Some(user) = self.selected_user() {
          let question = format!("Delete user {}? (y/n)", user.email);
          let target = Target::User(user.user_id.clone());
          self.confirm.ask(question, target);
        }
      }
      (Tab::Stories, KeyCode::Char('x')) => {
        if let Some(story) = self.selected_story() {
          let question = format!("Delete \"{}\"? (y/n)", truncate(&story.title, 40));
          let target = Target::Story(story.id.clone());
          self.confirm.ask(question, target);
        }
      }
      (Tab::Requests, KeyCode::Char('a')) => {
        if let Some(request) = self.selected_request().filter(|r| r.is_pending()) {
          let edit = CreditEdit::Approve {
            request_id: request.id.clone(),
          };
          let form = Form::new(vec![FormField::filled(
            "Credits",
            request.requested_credits.to_string(),
          )]);
          self.credit_form = Some((edit, form));
        }
      }
      (Tab::Requests, KeyCode::Char('d')) => {
        if let Some(id) = self
          .selected_request()
          .filter(|r| r.is_pending())
          .map(|r| r.id.clone())
        {
          self.reject(id);
        }
      }
      _ => {}
    }
  }

  fn render_stats(&self, frame: &mut Frame, area: Rect) {
    let Some(stats) = self.stats.data() else {
      frame.render_widget(
        Paragraph::new(if self.stats.is_loading() { "Loading..." } else { "No data" })
          .style(Style::default().fg(Color::DarkGray)),
        area,
      );
      return;
    };
    let label = Style::default().fg(Color::DarkGray);
    let mut lines = vec![
      Line::from(vec![
        Span::styled("Users            ", label),
        Span::styled(stats.total_users.to_string(), Style::default().bold()),
      ]),
      Line::from(vec![
        Span::styled("Stories          ", label),
        Span::styled(stats.total_stories.to_string(), Style::default().bold()),
      ]),
      Line::from(vec![
        Span::styled("Pending requests ", label),
        Span::styled(
          stats.pending_requests.to_string(),
          Style::default().fg(Color::Yellow).bold(),
        ),
      ]),
      Line::raw(""),
      Line::styled("Recent users", Style::default().fg(Color::Cyan)),
    ];
    lines.extend(stats.recent_users.iter().map(|u| {
      Line::from(vec![
        Span::raw(format!("  {:<28}", truncate(&u.display_name(), 26))),
        Span::styled(u.email.clone(), label),
      ])
    }));
    frame.render_widget(Paragraph::new(lines), area);
  }

  fn render_list(frame: &mut Frame, area: Rect, items: Vec<ListItem>, state: &mut ListState) {
    let len = items.len();
    ensure_valid_selection(state, len);
    let list = List::new(items)
      .highlight_style(Style::default().bg(Color::DarkGray))
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, state);
  }

  fn render_credit_form(&self, frame: &mut Frame, area: Rect) {
    let Some((edit, form)) = &self.credit_form else {
      return;
    };
    let width = 44.min(area.width);
    let rect = Rect::new(
      area.x + area.width.saturating_sub(width) / 2,
      area.y + area.height.saturating_sub(5) / 2,
      width,
      5.min(area.height),
    );
    frame.render_widget(Clear, rect);
    let title = match edit {
      CreditEdit::SetBalance { .. } => " Set credit balance ",
      CreditEdit::Approve { .. } => " Approve with credits ",
    };
    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(rect);
    frame.render_widget(block, rect);
    form.render(frame, inner);
  }
}

impl View for AdminView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if let Some((edit, mut form)) = self.credit_form.take() {
      return match form.handle_key(key) {
        KeyResult::Event(FormEvent::Submitted) => self.submit_credits(edit, &form),
        KeyResult::Event(FormEvent::Cancelled) => ViewAction::None,
        _ => {
          self.credit_form = Some((edit, form));
          ViewAction::None
        }
      };
    }

    match self.confirm.handle_key(key) {
      KeyResult::Event(target) => {
        self.run_delete(target);
        return ViewAction::None;
      }
      KeyResult::NotHandled => {}
      _ => return ViewAction::None,
    }

    match key.code {
      KeyCode::Tab => self.tab = Tab::ALL[(self.tab.index() + 1) % Tab::ALL.len()],
      KeyCode::BackTab => {
        self.tab = Tab::ALL[(self.tab.index() + Tab::ALL.len() - 1) % Tab::ALL.len()]
      }
      KeyCode::Char(c @ '1'..='4') => {
        if let Some(tab) = c.to_digit(10).and_then(|d| Tab::ALL.get(d as usize - 1)) {
          self.tab = *tab;
        }
      }
      KeyCode::Char('j') | KeyCode::Down => {
        if let Some(state) = self.list_state() {
          state.select_next();
        }
      }
      KeyCode::Char('k') | KeyCode::Up => {
        if let Some(state) = self.list_state() {
          state.select_previous();
        }
      }
      KeyCode::Char('r') => self.reload_all(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => self.handle_tab_key(key),
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(" Admin ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Magenta));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(2), Constraint::Min(1)])
      .split(inner);

    let tabs = Tabs::new(Tab::ALL.iter().map(|t| t.title()))
      .select(self.tab.index())
      .highlight_style(Style::default().fg(Color::Yellow).bold());
    frame.render_widget(tabs, rows[0]);

    let body = rows[1];
    match self.tab {
      Tab::Stats => self.render_stats(frame, body),
      Tab::Users => {
        let items: Vec<ListItem> = self
          .users()
          .iter()
          .map(|u| {
            ListItem::new(Line::from(vec![
              Span::raw(format!("{:<26}", truncate(&u.display_name(), 24))),
              Span::styled(
                format!("{:<32}", truncate(&u.email, 30)),
                Style::default().fg(Color::Cyan),
              ),
              Span::styled(format!("{} credits", u.credits), Style::default().fg(Color::Green)),
              Span::styled(
                if u.is_admin() { "  admin" } else { "" },
                Style::default().fg(Color::Magenta),
              ),
            ]))
          })
          .collect();
        Self::render_list(frame, body, items, &mut self.user_state);
      }
      Tab::Stories => {
        let items: Vec<ListItem> = self
          .stories()
          .iter()
          .map(|s| {
            ListItem::new(Line::from(vec![
              Span::raw(format!("{:<42}", truncate(&s.title, 40))),
              Span::styled(
                format!("{:<18}", truncate(s.topic_label(), 16)),
                Style::default().fg(Color::Cyan),
              ),
              Span::styled(listens(s.play_count), Style::default().fg(Color::DarkGray)),
            ]))
          })
          .collect();
        Self::render_list(frame, body, items, &mut self.story_state);
      }
      Tab::Requests => {
        let items: Vec<ListItem> = self
          .requests()
          .iter()
          .map(|r| {
            let status_color = if r.is_pending() { Color::Yellow } else { Color::DarkGray };
            ListItem::new(vec![
              Line::from(vec![
                Span::raw(format!("{:<24}", truncate(&r.user_name, 22))),
                Span::styled(
                  format!("{:<30}", truncate(&r.user_email, 28)),
                  Style::default().fg(Color::Cyan),
                ),
                Span::styled(format!("+{}  ", r.requested_credits), Style::default().fg(Color::Green)),
                Span::styled(
                  if r.status.is_empty() { "pending".to_string() } else { r.status.clone() },
                  Style::default().fg(status_color),
                ),
              ]),
              Line::styled(
                format!("  {}", truncate(&r.message, 70)),
                Style::default().fg(Color::DarkGray),
              ),
            ])
          })
          .collect();
        Self::render_list(frame, body, items, &mut self.request_state);
      }
    }

    self.render_credit_form(frame, area);
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Admin".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    self.stats.poll();
    self.users.poll();
    self.stories.poll();
    self.requests.poll();
    let finished = self.mutation.poll();

    if self.auth_failure() {
      return ViewAction::Batch(vec![
        ViewAction::Notify(Notice::error("Admin session required")),
        ViewAction::Replace(Box::new(AdminLoginView::new(self.services.clone()))),
      ]);
    }
    if !finished {
      return ViewAction::None;
    }
    if let Some(err) = self.mutation.error() {
      return ViewAction::Notify(err.notice("Admin action failed"));
    }
    match self.mutation.data().copied() {
      Some(done) => {
        self.reload_all();
        ViewAction::Notify(Notice::success(done.message()))
      }
      None => ViewAction::None,
    }
  }

  fn is_editing(&self) -> bool {
    self.credit_form.is_some() || self.confirm.is_active()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let mut shortcuts = vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("tab", "section").with_priority(20),
    ];
    match self.tab {
      Tab::Users => {
        shortcuts.push(ShortcutInfo::new("e", "credits").with_priority(30));
        shortcuts.push(ShortcutInfo::new("x", "delete").with_priority(40));
      }
      Tab::Stories => shortcuts.push(ShortcutInfo::new("x", "delete").with_priority(40)),
      Tab::Requests => {
        shortcuts.push(ShortcutInfo::new("a", "approve").with_priority(30));
        shortcuts.push(ShortcutInfo::new("d", "reject").with_priority(40));
      }
      Tab::Stats => {}
    }
    shortcuts.push(ShortcutInfo::new("q", "back").with_priority(90));
    shortcuts
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::fake::{story, user, FakeApi};
  use crate::api::types::Role;
  use crate::services::testing::services;
  use crossterm::event::KeyModifiers;
  use std::sync::Arc;
  use std::time::Duration;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  async fn settle(view: &mut AdminView) -> ViewAction {
    tokio::time::sleep(Duration::from_millis(20)).await;
    view.tick()
  }

  #[tokio::test]
  async fn test_forbidden_sends_to_admin_login() {
    let fake = Arc::new(FakeApi::new().failing("admin_stats", ApiError::Forbidden));
    let mut view = AdminView::new(services(fake));
    let ViewAction::Batch(actions) = settle(&mut view).await else {
      panic!("forbidden should redirect");
    };
    assert!(matches!(actions.last(), Some(ViewAction::Replace(_))));
  }

  #[tokio::test]
  async fn test_set_user_credits() {
    let fake = Arc::new(FakeApi::new().with_user(user(2)));
    let mut view = AdminView::new(services(fake.clone()));
    settle(&mut view).await;

    view.handle_key(key(KeyCode::Char('2')));
    view.user_state.select(Some(0));
    view.handle_key(key(KeyCode::Char('e')));
    assert!(view.is_editing());
    view.handle_key(key(KeyCode::Backspace));
    view.handle_key(key(KeyCode::Char('9')));
    view.handle_key(key(KeyCode::Enter));

    let action = settle(&mut view).await;
    assert!(matches!(action, ViewAction::Notify(_)));
    assert_eq!(fake.calls("admin_update_credits"), 1);
    settle(&mut view).await;
    assert_eq!(view.users()[0].credits, 9);
  }

  #[tokio::test]
  async fn test_own_balance_edit_updates_session() {
    let admin = UserProfile {
      role: Role::Admin,
      ..user(2)
    };
    let fake = Arc::new(FakeApi::new().with_user(admin));
    let services = services(fake.clone());
    services.store.set_token("tok").unwrap();
    services.auth.boot().await;
    let mut view = AdminView::new(services.clone());
    settle(&mut view).await;
    let whoami = fake.calls("me");

    view.handle_key(key(KeyCode::Char('2')));
    view.user_state.select(Some(0));
    view.handle_key(key(KeyCode::Char('e')));
    view.handle_key(key(KeyCode::Backspace));
    view.handle_key(key(KeyCode::Char('7')));
    view.handle_key(key(KeyCode::Enter));
    settle(&mut view).await;

    assert_eq!(services.auth.user().map(|u| u.credits), Some(7));
    assert_eq!(fake.calls("me"), whoami);
  }

  #[tokio::test]
  async fn test_non_numeric_credits_rejected_locally() {
    let fake = Arc::new(FakeApi::new().with_user(user(2)));
    let mut view = AdminView::new(services(fake.clone()));
    settle(&mut view).await;

    view.handle_key(key(KeyCode::Char('2')));
    view.user_state.select(Some(0));
    view.handle_key(key(KeyCode::Char('e')));
    view.handle_key(key(KeyCode::Char('x')));
    assert!(matches!(view.handle_key(key(KeyCode::Enter)), ViewAction::Notify(_)));
    assert_eq!(fake.calls("admin_update_credits"), 0);
  }

  #[tokio::test]
  async fn test_delete_story_after_confirm() {
    let fake = Arc::new(FakeApi::new().with_stories(vec![story("s1", "Orman")]));
    let mut view = AdminView::new(services(fake.clone()));
    settle(&mut view).await;

    view.handle_key(key(KeyCode::Char('3')));
    view.story_state.select(Some(0));
    view.handle_key(key(KeyCode::Char('x')));
    assert!(view.is_editing());
    view.handle_key(key(KeyCode::Char('y')));

    settle(&mut view).await;
    assert_eq!(fake.calls("admin_delete_story"), 1);
    settle(&mut view).await;
    assert!(view.stories().is_empty());
  }
}
