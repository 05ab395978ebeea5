use crate::api::types::PublicProfile;
use crate::query::{Query, QueryState};
use crate::services::Services;
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{listens, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::StoryDetailView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// Another author's public page
pub struct PublicProfileView {
  services: Services,
  profile: Query<PublicProfile>,
  list_state: ListState,
}

impl PublicProfileView {
  pub fn new(services: Services, user_id: String) -> Self {
    let api = services.api.clone();
    let mut profile = Query::new(move || {
      let api = api.clone();
      let user_id = user_id.clone();
      async move { api.public_profile(&user_id).await }
    });
    profile.fetch();

    Self {
      services,
      profile,
      list_state: ListState::default(),
    }
  }
}

impl View for PublicProfileView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('r') => self.profile.refetch(),
      KeyCode::Enter => {
        let story = self.list_state.selected().and_then(|i| {
          self.profile.data().and_then(|p| p.stories.get(i)).cloned()
        });
        if let Some(story) = story {
          return ViewAction::Push(Box::new(StoryDetailView::new(
            self.services.clone(),
            story.id,
          )));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let rows = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(4), Constraint::Min(1)])
      .split(area);

    let Some(profile) = self.profile.data() else {
      let text = match self.profile.state() {
        QueryState::Error(e) => format!("Could not load profile: {}", e),
        _ => "Loading profile...".to_string(),
      };
      frame.render_widget(
        Paragraph::new(text)
          .block(Block::default().borders(Borders::ALL))
          .style(Style::default().fg(Color::DarkGray)),
        area,
      );
      return;
    };

    let full_name = match &profile.surname {
      Some(surname) => format!("{} {}", profile.name, surname),
      None => profile.name.clone(),
    };
    let header = vec![
      Line::styled(full_name, Style::default().bold()),
      Line::from(vec![
        Span::styled(
          format!("{} stories", profile.story_count),
          Style::default().fg(Color::Cyan),
        ),
        Span::styled(
          profile
            .member_since
            .as_deref()
            .map(|d| format!("  member since {}", d))
            .unwrap_or_default(),
          Style::default().fg(Color::DarkGray),
        ),
      ]),
    ];
    frame.render_widget(
      Paragraph::new(header).block(Block::default().borders(Borders::BOTTOM)),
      rows[0],
    );

    let items: Vec<ListItem> = profile
      .stories
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
    let len = items.len();

    let list = List::new(items)
      .block(
        Block::default()
          .title(format!(" Stories ({}) ", len))
          .borders(Borders::ALL)
          .border_style(Style::default().fg(Color::Blue)),
      )
      .highlight_style(Style::default().bg(Color::DarkGray))
      .highlight_symbol("> ");
    ensure_valid_selection(&mut self.list_state, len);
    frame.render_stateful_widget(list, rows[1], &mut self.list_state);
  }

  fn breadcrumb_label(&self) -> String {
    self
      .profile
      .data()
      .map(|p| p.name.clone())
      .unwrap_or_else(|| "Author".to_string())
  }

  fn tick(&mut self) -> ViewAction {
    self.profile.poll();
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("enter", "open").with_priority(20),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
