use crate::api::types::{Story, StoryQuery, StorySort, Topic};
use crate::query::Query;
use crate::reconcile::{Reconciled, Source};
use crate::services::Services;
use crate::storage::Namespace;
use crate::ui::components::{KeyResult, Picker, PickerEvent, PickerItem, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{listens, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::StoryDetailView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

const ALL_TOPICS: &str = "";

/// All stories, with search, topic filter and sort
pub struct StoryListView {
  services: Services,
  filter: StoryQuery,
  stories: Query<Reconciled<Story>>,
  topics: Query<Reconciled<Topic>>,
  list_state: ListState,
  search: SearchInput,
  topic_picker: Picker,
}

impl StoryListView {
  pub fn new(services: Services, filter: StoryQuery) -> Self {
    let reconciler = services.reconciler.clone();
    let mut topics = Query::new(move || {
      let reconciler = reconciler.clone();
      async move { Ok(reconciler.topics().await) }
    });
    topics.fetch();

    let mut view = Self {
      services,
      filter,
      stories: Query::manual(),
      topics,
      list_state: ListState::default(),
      search: SearchInput::default(),
      topic_picker: Picker::new(),
    };
    if view.filter.is_default_view() {
      if let Some(cached) = view.services.reconciler.instant::<Story>(Namespace::Stories) {
        view.stories.seed(Reconciled::new(cached, Source::Cache));
      }
    }
    view.load();
    view
  }

  /// Dispatch a fetch for the current filter. A newer dispatch always
  /// supersedes older ones still in flight.
  fn load(&mut self) {
    let reconciler = self.services.reconciler.clone();
    let filter = self.filter.clone();
    self
      .stories
      .dispatch(async move { Ok(reconciler.stories(&filter).await) });
    self.list_state.select(Some(0));
  }

  fn items(&self) -> &[Story] {
    self
      .stories
      .data()
      .map(|r| r.items.as_slice())
      .unwrap_or(&[])
  }

  fn topic_name(&self, topic_id: &str) -> Option<&str> {
    self
      .topics
      .data()?
      .items
      .iter()
      .find(|t| t.id == topic_id)
      .map(|t| t.name.as_str())
  }

  fn filter_summary(&self) -> String {
    let mut parts = Vec::new();
    if let Some(term) = self.filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
      parts.push(format!("\"{}\"", term));
    }
    if let Some(topic) = &self.filter.topic_id {
      parts.push(self.topic_name(topic).unwrap_or(topic).to_string());
    }
    if self.filter.subtopic_id.is_some() {
      parts.push("subtopic".to_string());
    }
    parts.push(match self.filter.sort {
      StorySort::Popular => "most played".to_string(),
      StorySort::Newest => "newest".to_string(),
    });
    parts.join(" · ")
  }

  fn show_topic_picker(&mut self) {
    let mut items = vec![PickerItem::new(ALL_TOPICS, "All topics")];
    if let Some(topics) = self.topics.data() {
      items.extend(
        topics
          .items
          .iter()
          .map(|t| PickerItem::new(t.id.clone(), format!("{} {}", t.icon, t.name))),
      );
    }
    let current = self.filter.topic_id.as_deref().unwrap_or(ALL_TOPICS);
    self.topic_picker.show("Topic", items, Some(current));
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.items().len();
    ensure_valid_selection(&mut self.list_state, len);

    let loading = if self.stories.is_loading() { " loading..." } else { "" };
    let block = Block::default()
      .title(format!(" Stories ({}) {}{} ", len, self.filter_summary(), loading))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 && !self.stories.is_loading() {
      let text = if self.filter.is_default_view() {
        "No stories yet."
      } else {
        "No stories match. Press 'x' to clear filters."
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
      .items()
      .iter()
      .map(|story| {
        let audio = if story.has_audio() { "♪ " } else { "  " };
        ListItem::new(Line::from(vec![
          Span::styled(audio, Style::default().fg(Color::Magenta)),
          Span::raw(format!("{:<42}", truncate(&story.title, 40))),
          Span::styled(
            format!("{:<18}", truncate(story.topic_label(), 16)),
            Style::default().fg(Color::Cyan),
          ),
          Span::styled(
            format!("{:<6}", story.age_group.as_deref().unwrap_or("")),
            Style::default().fg(Color::Yellow),
          ),
          Span::styled(listens(story.play_count), Style::default().fg(Color::DarkGray)),
        ]))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl View for StoryListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.topic_picker.handle_key(key) {
      KeyResult::Event(PickerEvent::Selected(id)) => {
        self.filter.topic_id = (id != ALL_TOPICS).then_some(id);
        self.filter.subtopic_id = None;
        self.load();
        return ViewAction::None;
      }
      KeyResult::NotHandled => {}
      _ => return ViewAction::None,
    }

    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Submitted(term)) => {
        self.filter.search = Some(term);
        self.load();
        return ViewAction::None;
      }
      KeyResult::NotHandled => {}
      _ => return ViewAction::None,
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('s') => {
        self.filter.sort = match self.filter.sort {
          StorySort::Popular => StorySort::Newest,
          StorySort::Newest => StorySort::Popular,
        };
        self.load();
      }
      KeyCode::Char('t') => self.show_topic_picker(),
      KeyCode::Char('x') => {
        self.filter = StoryQuery::default();
        self.load();
      }
      KeyCode::Char('r') => self.load(),
      KeyCode::Enter => {
        let selected = self.list_state.selected().and_then(|i| self.items().get(i));
        if let Some(story) = selected {
          return ViewAction::Push(Box::new(StoryDetailView::new(
            self.services.clone(),
            story.id.clone(),
          )));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    self.search.render_overlay(frame, area);
    self.topic_picker.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    match self.filter.search.as_deref() {
      Some(term) if !term.trim().is_empty() => format!("Search \"{}\"", truncate(term, 20)),
      _ => "Stories".to_string(),
    }
  }

  fn tick(&mut self) -> ViewAction {
    self.topics.poll();
    if !self.stories.poll() {
      return ViewAction::None;
    }
    match self.stories.data().and_then(|r| r.error.as_ref()) {
      Some(err) if !err.is_silent() => ViewAction::Notify(err.notice("Could not load stories")),
      _ => ViewAction::None,
    }
  }

  fn is_editing(&self) -> bool {
    self.search.is_active() || self.topic_picker.is_active()
  }

  fn on_resume(&mut self) {
    self.load();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "search").with_priority(20),
      ShortcutInfo::new("t", "topic").with_priority(30),
      ShortcutInfo::new("s", "sort").with_priority(40),
      ShortcutInfo::new("x", "clear").with_priority(50),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::fake::{story, FakeApi};
  use crate::api::ApiError;
  use crate::services::testing::services;
  use std::sync::Arc;
  use std::time::Duration;

  async fn settle(view: &mut StoryListView) -> ViewAction {
    tokio::time::sleep(Duration::from_millis(20)).await;
    view.tick()
  }

  #[tokio::test]
  async fn test_search_bypasses_cache_and_sends_term() {
    let fake = Arc::new(FakeApi::new().with_stories(vec![story("s1", "Paylaşan Ayı")]));
    let mut view = StoryListView::new(services(fake.clone()), StoryQuery::default());
    settle(&mut view).await;
    assert_eq!(view.items().len(), 1);

    view.filter.search = Some("ayı".into());
    view.load();
    settle(&mut view).await;
    assert_eq!(fake.calls("list_stories"), 2);
    assert_eq!(fake.last_query().and_then(|q| q.search).as_deref(), Some("ayı"));
  }

  #[tokio::test]
  async fn test_superseded_search_never_overwrites_latest() {
    let fake = Arc::new(
      FakeApi::new()
        .with_search("eski", vec![story("s1", "Eski Orman")], Duration::from_millis(80))
        .with_search("yeni", vec![story("s2", "Yeni Deniz")], Duration::from_millis(10)),
    );
    let mut view = StoryListView::new(services(fake.clone()), StoryQuery::search("eski"));
    view.filter.search = Some("yeni".into());
    view.load();
    let latest = view.stories.generation();

    tokio::time::sleep(Duration::from_millis(40)).await;
    view.tick();
    let ids: Vec<&str> = view.items().iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["s2"]);

    // The slow "eski" response lands afterwards and is dropped
    tokio::time::sleep(Duration::from_millis(80)).await;
    view.tick();
    let ids: Vec<&str> = view.items().iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["s2"]);
    assert_eq!(view.stories.generation(), latest);
    assert_eq!(fake.calls("list_stories"), 2);
  }

  #[tokio::test]
  async fn test_transport_failure_raises_notice() {
    let fake = Arc::new(
      FakeApi::new().failing("list_stories", ApiError::Transport("connection refused".into())),
    );
    let mut view = StoryListView::new(services(fake), StoryQuery::search("ayı"));
    let action = settle(&mut view).await;
    assert!(matches!(action, ViewAction::Notify(_)));
    assert!(view.items().is_empty());
  }

  #[tokio::test]
  async fn test_malformed_payload_is_silent() {
    let fake = Arc::new(FakeApi::new().failing(
      "list_stories",
      ApiError::malformed("/stories", "expected array, got string"),
    ));
    let mut view = StoryListView::new(services(fake.clone()), StoryQuery::default());
    let action = settle(&mut view).await;
    assert!(action.is_none());
    assert!(view.items().is_empty());
    assert_eq!(fake.calls("list_stories"), 1);
  }
}
