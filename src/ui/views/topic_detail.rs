use crate::api::types::{Story, StoryQuery, Subtopic, TopicDetail};
use crate::query::{Query, QueryState};
use crate::reconcile::Reconciled;
use crate::services::Services;
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{listens, topic_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::{StoryCreateView, StoryDetailView, StoryListView};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pane {
  Subtopics,
  Stories,
}

/// One topic: its subtopics with their kazanım, and stories written for it
pub struct TopicDetailView {
  services: Services,
  topic_id: String,
  name: String,
  detail: Query<TopicDetail>,
  stories: Query<Reconciled<Story>>,
  focus: Pane,
  subtopic_state: ListState,
  story_state: ListState,
}

impl TopicDetailView {
  pub fn new(services: Services, topic_id: String, name: String) -> Self {
    let api = services.api.clone();
    let id = topic_id.clone();
    let mut detail = Query::new(move || {
      let api = api.clone();
      let id = id.clone();
      async move { api.get_topic(&id).await }
    });
    detail.fetch();

    let reconciler = services.reconciler.clone();
    let query = StoryQuery::topic(topic_id.clone());
    let mut stories = Query::new(move || {
      let reconciler = reconciler.clone();
      let query = query.clone();
      async move { Ok(reconciler.stories(&query).await) }
    });
    stories.fetch();

    Self {
      services,
      topic_id,
      name,
      detail,
      stories,
      focus: Pane::Subtopics,
      subtopic_state: ListState::default(),
      story_state: ListState::default(),
    }
  }

  fn subtopics(&self) -> &[Subtopic] {
    self
      .detail
      .data()
      .map(|d| d.subtopics.as_slice())
      .unwrap_or(&[])
  }

  fn story_items(&self) -> &[Story] {
    self
      .stories
      .data()
      .map(|r| r.items.as_slice())
      .unwrap_or(&[])
  }

  fn selected_subtopic(&self) -> Option<&Subtopic> {
    self
      .subtopic_state
      .selected()
      .and_then(|i| self.subtopics().get(i))
  }

  fn border(&self, pane: Pane) -> Style {
    if self.focus == pane {
      Style::default().fg(Color::Yellow)
    } else {
      Style::default().fg(Color::Blue)
    }
  }

  fn render_header(&self, frame: &mut Frame, area: Rect) {
    let (color, description) = match self.detail.data() {
      Some(d) => (topic_color(&d.color), d.description.as_str()),
      None => (Color::Cyan, ""),
    };
    let status = match self.detail.state() {
      QueryState::Loading => "loading...".to_string(),
      QueryState::Error(e) => format!("error: {}", e),
      _ => String::new(),
    };
    let lines = vec![
      Line::from(vec![
        Span::styled(self.name.clone(), Style::default().fg(color).bold()),
        Span::styled(format!("  {}", status), Style::default().fg(Color::DarkGray)),
      ]),
      Line::raw(description.to_string()),
    ];
    frame.render_widget(
      Paragraph::new(lines)
        .block(Block::default().borders(Borders::BOTTOM))
        .wrap(Wrap { trim: true }),
      area,
    );
  }

  fn render_subtopics(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.subtopics().len();
    ensure_valid_selection(&mut self.subtopic_state, len);

    let block = Block::default()
      .title(format!(" Subtopics ({}) ", len))
      .borders(Borders::ALL)
      .border_style(self.border(Pane::Subtopics));

    let items: Vec<ListItem> = self
      .subtopics()
      .iter()
      .map(|sub| {
        ListItem::new(vec![
          Line::styled(sub.name.clone(), Style::default().bold()),
          Line::styled(
            format!("  {}", truncate(&sub.kazanim, 60)),
            Style::default().fg(Color::DarkGray),
          ),
        ])
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray))
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut self.subtopic_state);
  }

  fn render_stories(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.story_items().len();
    ensure_valid_selection(&mut self.story_state, len);

    let block = Block::default()
      .title(format!(" Stories ({}) ", len))
      .borders(Borders::ALL)
      .border_style(self.border(Pane::Stories));

    if len == 0 {
      let text = if self.stories.is_loading() {
        "Loading stories..."
      } else {
        "No stories for this topic yet. Press 'c' to create one."
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
          Span::raw(truncate(&story.title, 36)),
          Span::styled(
            format!("  {}", story.subtopic_name.as_deref().unwrap_or("")),
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
      .highlight_style(Style::default().bg(Color::DarkGray))
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut self.story_state);
  }
}

impl View for TopicDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => match self.focus {
        Pane::Subtopics => self.subtopic_state.select_next(),
        Pane::Stories => self.story_state.select_next(),
      },
      KeyCode::Char('k') | KeyCode::Up => match self.focus {
        Pane::Subtopics => self.subtopic_state.select_previous(),
        Pane::Stories => self.story_state.select_previous(),
      },
      KeyCode::Tab | KeyCode::BackTab | KeyCode::Char('h') | KeyCode::Char('l') => {
        self.focus = match self.focus {
          Pane::Subtopics => Pane::Stories,
          Pane::Stories => Pane::Subtopics,
        };
      }
      KeyCode::Char('r') => {
        self.detail.refetch();
        self.stories.refetch();
      }
      KeyCode::Char('c') => {
        let subtopic = match self.focus {
          Pane::Subtopics => self.selected_subtopic().map(|s| s.id.clone()),
          Pane::Stories => None,
        };
        return ViewAction::Push(Box::new(StoryCreateView::new(
          self.services.clone(),
          Some(self.topic_id.clone()),
          subtopic,
        )));
      }
      KeyCode::Enter => match self.focus {
        Pane::Subtopics => {
          if let Some(sub) = self.selected_subtopic() {
            let query = StoryQuery {
              topic_id: Some(self.topic_id.clone()),
              subtopic_id: Some(sub.id.clone()),
              ..StoryQuery::default()
            };
            return ViewAction::Push(Box::new(StoryListView::new(self.services.clone(), query)));
          }
        }
        Pane::Stories => {
          let selected = self.story_state.selected().and_then(|i| self.story_items().get(i));
          if let Some(story) = selected {
            return ViewAction::Push(Box::new(StoryDetailView::new(
              self.services.clone(),
              story.id.clone(),
            )));
          }
        }
      },
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let rows = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(3), Constraint::Min(1)])
      .split(area);
    self.render_header(frame, rows[0]);

    let cols = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
      .split(rows[1]);
    self.render_subtopics(frame, cols[0]);
    self.render_stories(frame, cols[1]);
  }

  fn breadcrumb_label(&self) -> String {
    self.name.clone()
  }

  fn tick(&mut self) -> ViewAction {
    self.detail.poll();
    self.stories.poll();
    ViewAction::None
  }

  fn on_resume(&mut self) {
    self.stories.refetch();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("tab", "pane").with_priority(20),
      ShortcutInfo::new("enter", "open").with_priority(30),
      ShortcutInfo::new("c", "create here").with_priority(40),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
