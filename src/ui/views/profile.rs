use crate::api::types::{CreditRequestInput, ProfileUpdate, Story, UserProfile};
use crate::api::Notice;
use crate::auth::AuthState;
use crate::query::Query;
use crate::services::Services;
use crate::storage::Namespace;
use crate::ui::components::{Confirm, Form, FormEvent, FormField, KeyResult};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{listens, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::{LoginView, StoryDetailView};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

const CREDIT_REQUEST_AMOUNT: u32 = 10;

/// What the bottom overlay form is collecting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Editing {
  Profile,
  CreditRequest,
}

/// Pending write, reported once in tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mutation {
  Save,
  Delete,
  RequestCredits,
}

/// The logged-in user's account: details, credits and own stories
pub struct ProfileView {
  services: Services,
  user: Query<Option<UserProfile>>,
  stories: Query<Vec<Story>>,
  list_state: ListState,
  form: Option<(Editing, Form)>,
  confirm_delete: Confirm<String>,
  mutation: Query<Mutation>,
}

impl ProfileView {
  pub fn new(services: Services) -> Self {
    let auth = services.auth.clone();
    let mut user = Query::new(move || {
      let auth = auth.clone();
      async move { Ok(auth.refresh().await) }
    });
    if let Some(current) = services.auth.user() {
      user.seed(Some(current));
    }

    let api = services.api.clone();
    let stories = Query::new(move || {
      let api = api.clone();
      async move { api.my_stories().await }
    });

    let mut view = Self {
      services,
      user,
      stories,
      list_state: ListState::default(),
      form: None,
      confirm_delete: Confirm::new(),
      mutation: Query::manual(),
    };
    view.reload();
    view
  }

  fn reload(&mut self) {
    if self.services.auth.state() == AuthState::Anonymous {
      return;
    }
    self.user.refetch();
    self.stories.refetch();
  }

  fn current_user(&self) -> Option<&UserProfile> {
    self.user.data().and_then(|u| u.as_ref())
  }

  fn story_items(&self) -> &[Story] {
    self.stories.data().map(|s| s.as_slice()).unwrap_or(&[])
  }

  fn selected_story(&self) -> Option<&Story> {
    self.list_state.selected().and_then(|i| self.story_items().get(i))
  }

  fn start_edit(&mut self) {
    let Some(user) = self.current_user() else {
      return;
    };
    let form = Form::new(vec![
      FormField::filled("Name", user.name.clone()),
      FormField::filled("Surname", user.surname.clone().unwrap_or_default()),
      FormField::filled("Phone", user.phone.clone().unwrap_or_default()),
    ]);
    self.form = Some((Editing::Profile, form));
  }

  fn start_credit_request(&mut self) {
    let form = Form::new(vec![FormField::text("Message")]);
    self.form = Some((Editing::CreditRequest, form));
  }

  fn submit_form(&mut self, editing: Editing, form: &Form) -> ViewAction {
    match editing {
      Editing::Profile => {
        let update = ProfileUpdate {
          name: form.trimmed(0),
          surname: form.trimmed(1),
          phone: form.trimmed(2),
        };
        if update.name.is_empty() {
          return ViewAction::Notify(Notice::error("Name cannot be empty"));
        }
        let auth = self.services.auth.clone();
        self.mutation.dispatch(async move {
          auth.update_profile(&update).await?;
          Ok(Mutation::Save)
        });
      }
      Editing::CreditRequest => {
        let request = CreditRequestInput {
          requested_credits: CREDIT_REQUEST_AMOUNT,
          message: form.trimmed(0),
        };
        let api = self.services.api.clone();
        self.mutation.dispatch(async move {
          api.request_credits(&request).await?;
          Ok(Mutation::RequestCredits)
        });
      }
    }
    ViewAction::None
  }

  fn delete_story(&mut self, story_id: String) {
    let api = self.services.api.clone();
    let cache = self.services.reconciler.cache().clone();
    self.mutation.dispatch(async move {
      api.delete_my_story(&story_id).await?;
      cache.invalidate(Namespace::Stories);
      cache.invalidate(Namespace::PopularStories);
      Ok(Mutation::Delete)
    });
  }

  fn mutation_result(&mut self) -> ViewAction {
    if let Some(err) = self.mutation.error() {
      if err.is_silent() {
        return ViewAction::None;
      }
      return ViewAction::Notify(err.notice("Could not save changes"));
    }
    match self.mutation.data().copied() {
      Some(Mutation::Save) => {
        self.user.seed(self.services.auth.user());
        ViewAction::Notify(Notice::success("Profile updated"))
      }
      Some(Mutation::Delete) => {
        self.stories.refetch();
        ViewAction::Notify(Notice::success("Story deleted"))
      }
      Some(Mutation::RequestCredits) => ViewAction::Notify(Notice::success(format!(
        "Requested {} credits, an admin will review it",
        CREDIT_REQUEST_AMOUNT
      ))),
      None => ViewAction::None,
    }
  }

  fn render_anonymous(&self, frame: &mut Frame, area: Rect) {
    let text = vec![
      Line::raw("You are not logged in."),
      Line::raw(""),
      Line::styled(
        "Press 'l' to log in or register.",
        Style::default().fg(Color::DarkGray),
      ),
    ];
    frame.render_widget(
      Paragraph::new(text).block(
        Block::default()
          .title(" Profile ")
          .borders(Borders::ALL)
          .border_style(Style::default().fg(Color::Blue)),
      ),
      area,
    );
  }

  fn render_details(&self, frame: &mut Frame, area: Rect, user: &UserProfile) {
    let label = Style::default().fg(Color::DarkGray);
    let credits_color = if user.credits > 0 { Color::Green } else { Color::Red };
    let lines = vec![
      Line::from(vec![
        Span::styled(user.display_name(), Style::default().bold()),
        Span::styled(
          if user.is_admin() { "  admin" } else { "" },
          Style::default().fg(Color::Magenta),
        ),
      ]),
      Line::from(vec![Span::styled("Email   ", label), Span::raw(user.email.clone())]),
      Line::from(vec![
        Span::styled("Phone   ", label),
        Span::raw(user.phone.clone().unwrap_or_else(|| "-".to_string())),
      ]),
      Line::from(vec![
        Span::styled("Credits ", label),
        Span::styled(user.credits.to_string(), Style::default().fg(credits_color).bold()),
        Span::styled(
          format!("  ('c' to request {} more)", CREDIT_REQUEST_AMOUNT),
          label,
        ),
      ]),
    ];
    frame.render_widget(
      Paragraph::new(lines).block(
        Block::default()
          .title(" Profile ")
          .borders(Borders::ALL)
          .border_style(Style::default().fg(Color::Blue)),
      ),
      area,
    );
  }

  fn render_stories(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.story_items().len();
    ensure_valid_selection(&mut self.list_state, len);

    let block = Block::default()
      .title(format!(" My stories ({}) ", len))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 {
      let text = if self.stories.is_loading() {
        "Loading..."
      } else {
        "You have not created any stories yet."
      };
      frame.render_widget(
        Paragraph::new(text)
          .block(block)
          .style(Style::default().fg(Color::DarkGray)),
        area,
      );
      return;
    }

    let items: Vec<ListItem> = self
      .story_items()
      .iter()
      .map(|story| {
        ListItem::new(Line::from(vec![
          Span::raw(format!("{:<42}", truncate(&story.title, 40))),
          Span::styled(
            format!("{:<18}", truncate(story.topic_label(), 16)),
            Style::default().fg(Color::Cyan),
          ),
          Span::styled(listens(story.play_count), Style::default().fg(Color::DarkGray)),
        ]))
      })
      .collect();
    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray))
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  fn render_form(&self, frame: &mut Frame, area: Rect) {
    let Some((editing, form)) = &self.form else {
      return;
    };
    let height = (form.len() as u16 + 4).min(area.height);
    let width = area.width.saturating_sub(10).clamp(20, 70).min(area.width);
    let rect = Rect::new(
      area.x + area.width.saturating_sub(width) / 2,
      area.y + area.height.saturating_sub(height) / 2,
      width,
      height,
    );
    frame.render_widget(Clear, rect);

    let title = match editing {
      Editing::Profile => " Edit profile ",
      Editing::CreditRequest => " Request credits ",
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

impl View for ProfileView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if let Some((editing, mut form)) = self.form.take() {
      return match form.handle_key(key) {
        KeyResult::Event(FormEvent::Submitted) => self.submit_form(editing, &form),
        KeyResult::Event(FormEvent::Cancelled) => ViewAction::None,
        _ => {
          self.form = Some((editing, form));
          ViewAction::None
        }
      };
    }

    match self.confirm_delete.handle_key(key) {
      KeyResult::Event(story_id) => {
        self.delete_story(story_id);
        return ViewAction::None;
      }
      KeyResult::NotHandled => {}
      _ => return ViewAction::None,
    }

    if self.current_user().is_none() {
      return match key.code {
        KeyCode::Char('l') | KeyCode::Enter => {
          ViewAction::Push(Box::new(LoginView::new(self.services.clone())))
        }
        KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
        _ => ViewAction::None,
      };
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('e') => self.start_edit(),
      KeyCode::Char('c') => self.start_credit_request(),
      KeyCode::Char('r') => self.reload(),
      KeyCode::Char('x') => {
        if let Some(story) = self.selected_story() {
          let question = format!("Delete \"{}\"? (y/n)", truncate(&story.title, 40));
          let id = story.id.clone();
          self.confirm_delete.ask(question, id);
        }
      }
      KeyCode::Enter => {
        if let Some(story) = self.selected_story().cloned() {
          return ViewAction::Push(Box::new(StoryDetailView::with_story(
            self.services.clone(),
            story,
          )));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let Some(user) = self.current_user().cloned() else {
      self.render_anonymous(frame, area);
      return;
    };

    let rows = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(6), Constraint::Min(1)])
      .split(area);
    self.render_details(frame, rows[0], &user);
    self.render_stories(frame, rows[1]);

    self.render_form(frame, area);
    self.confirm_delete.render_overlay(frame, area);

    if self.mutation.is_loading() {
      let hint = Paragraph::new("Saving...").style(Style::default().fg(Color::Yellow));
      let line = Rect::new(area.x + 2, area.y + area.height.saturating_sub(1), 12, 1);
      frame.render_widget(hint, line.intersection(area));
    }
  }

  fn breadcrumb_label(&self) -> String {
    "Profile".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    self.user.poll();
    self.stories.poll();
    if self.mutation.poll() {
      return self.mutation_result();
    }
    ViewAction::None
  }

  fn is_editing(&self) -> bool {
    self.form.is_some() || self.confirm_delete.is_active()
  }

  fn on_resume(&mut self) {
    if let Some(user) = self.services.auth.user() {
      self.user.seed(Some(user));
    }
    self.reload();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("e", "edit").with_priority(20),
      ShortcutInfo::new("c", "credits").with_priority(30),
      ShortcutInfo::new("x", "delete").with_priority(40),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::fake::{story, user, FakeApi};
  use crate::services::testing::services;
  use crossterm::event::KeyModifiers;
  use std::sync::Arc;
  use std::time::Duration;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  async fn logged_in(fake: Arc<FakeApi>) -> ProfileView {
    let services = services(fake);
    services.store.set_token("tok").unwrap();
    services.auth.boot().await;
    let mut view = ProfileView::new(services);
    tokio::time::sleep(Duration::from_millis(20)).await;
    view.tick();
    view
  }

  #[tokio::test]
  async fn test_anonymous_offers_login() {
    let fake = Arc::new(FakeApi::new());
    let services = services(fake.clone());
    services.auth.boot().await;
    let mut view = ProfileView::new(services);
    assert_eq!(fake.calls("my_stories"), 0);
    assert!(matches!(view.handle_key(key(KeyCode::Char('l'))), ViewAction::Push(_)));
  }

  #[tokio::test]
  async fn test_delete_requires_confirmation() {
    let fake = Arc::new(
      FakeApi::new()
        .with_user(user(3))
        .with_stories(vec![story("s1", "Orman"), story("s2", "Deniz")]),
    );
    let mut view = logged_in(fake.clone()).await;
    assert_eq!(view.story_items().len(), 2);
    view.list_state.select(Some(0));

    view.handle_key(key(KeyCode::Char('x')));
    view.handle_key(key(KeyCode::Char('n')));
    assert_eq!(fake.calls("delete_my_story"), 0);

    view.handle_key(key(KeyCode::Char('x')));
    view.handle_key(key(KeyCode::Char('y')));
    tokio::time::sleep(Duration::from_millis(20)).await;
    let action = view.tick();
    assert!(matches!(action, ViewAction::Notify(_)));
    assert_eq!(fake.calls("delete_my_story"), 1);

    tokio::time::sleep(Duration::from_millis(20)).await;
    view.tick();
    assert_eq!(view.story_items().len(), 1);
  }

  #[tokio::test]
  async fn test_edit_profile_updates_session_user() {
    let fake = Arc::new(FakeApi::new().with_user(user(3)));
    let mut view = logged_in(fake.clone()).await;

    view.handle_key(key(KeyCode::Char('e')));
    assert!(view.is_editing());
    view.handle_key(key(KeyCode::Tab));
    view.handle_key(key(KeyCode::Tab));
    for c in "5551234".chars() {
      view.handle_key(key(KeyCode::Char(c)));
    }
    view.handle_key(key(KeyCode::Enter));
    assert!(!view.is_editing());

    tokio::time::sleep(Duration::from_millis(20)).await;
    view.tick();
    assert_eq!(fake.calls("update_profile"), 1);
    let phone = view.services.auth.user().and_then(|u| u.phone);
    assert_eq!(phone.as_deref(), Some("5551234"));
  }

  #[tokio::test]
  async fn test_credit_request_sends_ten() {
    let fake = Arc::new(FakeApi::new().with_user(user(0)));
    let mut view = logged_in(fake.clone()).await;

    view.handle_key(key(KeyCode::Char('c')));
    for c in "daha fazla masal".chars() {
      view.handle_key(key(KeyCode::Char(c)));
    }
    view.handle_key(key(KeyCode::Enter));
    tokio::time::sleep(Duration::from_millis(20)).await;
    let ViewAction::Notify(notice) = view.tick() else {
      panic!("credit request should notify");
    };
    assert!(notice.message.contains("10"));
    assert_eq!(fake.calls("request_credits"), 1);
  }
}
