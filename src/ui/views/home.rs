use crate::api::types::{Story, StoryQuery, Topic};
use crate::query::Query;
use crate::reconcile::{HomeData, Reconciled, Source};
use crate::services::Services;
use crate::storage::Namespace;
use crate::ui::components::{KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{listens, topic_color, truncate};
use crate::ui::view::{GatedAction, ShortcutInfo, View, ViewAction};
use crate::ui::views::{StoryCreateView, StoryDetailView, StoryListView, TopicDetailView};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pane {
  Topics,
  Popular,
}

/// Landing view: topic taxonomy and the most played stories
pub struct HomeView {
  services: Services,
  query: Query<HomeData>,
  focus: Pane,
  topics_state: ListState,
  popular_state: ListState,
  search: SearchInput,
}

impl HomeView {
  pub fn new(services: Services) -> Self {
    let reconciler = services.reconciler.clone();
    let mut query = Query::new(move || {
      let reconciler = reconciler.clone();
      async move { Ok(reconciler.home().await) }
    });

    // Paint whatever is cached before reconciling
    let topics = services.reconciler.instant::<Topic>(Namespace::Topics);
    let popular = services.reconciler.instant::<Story>(Namespace::PopularStories);
    if topics.is_some() || popular.is_some() {
      query.seed(HomeData {
        topics: Reconciled::new(topics.unwrap_or_default(), Source::Cache),
        popular: Reconciled::new(popular.unwrap_or_default(), Source::Cache),
      });
    }
    query.fetch();

    Self {
      services,
      query,
      focus: Pane::Topics,
      topics_state: ListState::default(),
      popular_state: ListState::default(),
      search: SearchInput::default(),
    }
  }

  fn topics(&self) -> &[Topic] {
    self
      .query
      .data()
      .map(|d| d.topics.items.as_slice())
      .unwrap_or(&[])
  }

  fn popular(&self) -> &[Story] {
    self
      .query
      .data()
      .map(|d| d.popular.items.as_slice())
      .unwrap_or(&[])
  }

  fn pane_block(&self, title: String, pane: Pane) -> Block<'static> {
    let color = if self.focus == pane { Color::Yellow } else { Color::Blue };
    Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(color))
  }

  fn render_topics(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.topics().len();
    ensure_valid_selection(&mut self.topics_state, len);

    let title = if self.query.is_loading() && len == 0 {
      " Topics (loading...) ".to_string()
    } else {
      format!(" Topics ({}) ", len)
    };
    let block = self.pane_block(title, Pane::Topics);

    if len == 0 && !self.query.is_loading() {
      frame.render_widget(
        Paragraph::new("No topics yet. Press 'r' to retry.")
          .block(block)
          .style(Style::default().fg(Color::DarkGray)),
        area,
      );
      return;
    }

    let items: Vec<ListItem> = self
      .topics()
      .iter()
      .map(|topic| {
        ListItem::new(Line::from(vec![
          Span::raw(format!("{} ", topic.icon)),
          Span::styled(
            truncate(&topic.name, 28),
            Style::default().fg(topic_color(&topic.color)).bold(),
          ),
          Span::styled(
            format!("  {} subtopics", topic.subtopic_count),
            Style::default().fg(Color::DarkGray),
          ),
        ]))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut self.topics_state);
  }

  fn render_popular(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.popular().len();
    ensure_valid_selection(&mut self.popular_state, len);

    let block = self.pane_block(format!(" Popular stories ({}) ", len), Pane::Popular);

    if len == 0 && !self.query.is_loading() {
      frame.render_widget(
        Paragraph::new("No stories yet. Create the first one with :create")
          .block(block)
          .style(Style::default().fg(Color::DarkGray)),
        area,
      );
      return;
    }

    let items: Vec<ListItem> = self
      .popular()
      .iter()
      .map(|story| {
        ListItem::new(Line::from(vec![
          Span::raw(truncate(&story.title, 40)),
          Span::styled(
            format!("  {}", story.topic_label()),
            Style::default().fg(Color::Cyan),
          ),
          Span::styled(
            format!("  {}", listens(story.play_count)),
            Style::default().fg(Color::DarkGray),
          ),
        ]))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut self.popular_state);
  }

  fn open_selected(&self) -> ViewAction {
    match self.focus {
      Pane::Topics => {
        let selected = self.topics_state.selected().and_then(|i| self.topics().get(i));
        if let Some(topic) = selected {
          return ViewAction::Push(Box::new(TopicDetailView::new(
            self.services.clone(),
            topic.id.clone(),
            topic.name.clone(),
          )));
        }
      }
      Pane::Popular => {
        let selected = self.popular_state.selected().and_then(|i| self.popular().get(i));
        if let Some(story) = selected {
          return ViewAction::Push(Box::new(StoryDetailView::new(
            self.services.clone(),
            story.id.clone(),
          )));
        }
      }
    }
    ViewAction::None
  }
}

impl View for HomeView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Submitted(term)) => {
        return ViewAction::Gate(GatedAction::Search(term));
      }
      KeyResult::NotHandled => {}
      _ => return ViewAction::None,
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => match self.focus {
        Pane::Topics => self.topics_state.select_next(),
        Pane::Popular => self.popular_state.select_next(),
      },
      KeyCode::Char('k') | KeyCode::Up => match self.focus {
        Pane::Topics => self.topics_state.select_previous(),
        Pane::Popular => self.popular_state.select_previous(),
      },
      KeyCode::Tab | KeyCode::BackTab | KeyCode::Char('h') | KeyCode::Char('l') => {
        self.focus = match self.focus {
          Pane::Topics => Pane::Popular,
          Pane::Popular => Pane::Topics,
        };
      }
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('c') => {
        return ViewAction::Push(Box::new(StoryCreateView::new(self.services.clone(), None, None)));
      }
      KeyCode::Char('s') => {
        return ViewAction::Push(Box::new(StoryListView::new(
          self.services.clone(),
          StoryQuery::default(),
        )));
      }
      KeyCode::Enter => return self.open_selected(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
      .split(area);

    self.render_topics(frame, chunks[0]);
    self.render_popular(frame, chunks[1]);
    self.search.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Home".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    // Home stays quiet on failure, the reconciler logs it
    self.query.poll();
    ViewAction::None
  }

  fn is_editing(&self) -> bool {
    self.search.is_active()
  }

  fn on_gate(&mut self, action: GatedAction) -> ViewAction {
    match action {
      GatedAction::Search(term) => ViewAction::Push(Box::new(StoryListView::new(
        self.services.clone(),
        StoryQuery::search(term),
      ))),
      _ => ViewAction::None,
    }
  }

  fn on_resume(&mut self) {
    // Creating a story invalidates the popular list
    self.query.refetch();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "search").with_priority(20),
      ShortcutInfo::new("tab", "pane").with_priority(30),
      ShortcutInfo::new("c", "create").with_priority(40),
      ShortcutInfo::new("s", "all stories").with_priority(50),
      ShortcutInfo::new("r", "refresh").with_priority(60),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}
