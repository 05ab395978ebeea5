use crate::api::types::Story;
use crate::api::{Notice, NoticeLink};
use crate::download;
use crate::player::{format_time, Transport, RATES};
use crate::query::{Query, QueryState};
use crate::services::Services;
use crate::ui::view::{GatedAction, ShortcutInfo, View, ViewAction};
use crate::ui::views::PublicProfileView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Wrap};
use std::time::{Duration, Instant};
use tracing::warn;

const SEEK_STEP_SECS: i64 = 10;

/// A single story: text, narration transport, favorite and download
pub struct StoryDetailView {
  services: Services,
  story_id: String,
  query: Query<Story>,
  favorite: Query<bool>,
  transport: Option<Transport>,
  last_tick: Instant,
  scroll: u16,
}

impl StoryDetailView {
  pub fn new(services: Services, story_id: String) -> Self {
    let api = services.api.clone();
    let id = story_id.clone();
    let mut query = Query::new(move || {
      let api = api.clone();
      let id = id.clone();
      async move { api.get_story(&id).await }
    });
    query.fetch();

    let mut view = Self {
      services,
      story_id,
      query,
      favorite: Query::manual(),
      transport: None,
      last_tick: Instant::now(),
      scroll: 0,
    };
    view.load_favorite();
    view
  }

  /// Open a story that is already in hand, e.g. right after generation
  pub fn with_story(services: Services, story: Story) -> Self {
    let mut view = Self::new(services, story.id.clone());
    view.transport = Some(transport_for(&story));
    view.query.seed(story);
    view
  }

  fn story(&self) -> Option<&Story> {
    self.query.data()
  }

  fn load_favorite(&mut self) {
    if !self.services.auth.is_authenticated() {
      return;
    }
    let api = self.services.api.clone();
    let id = self.story_id.clone();
    self
      .favorite
      .dispatch(async move { api.is_favorite(&id).await });
  }

  fn toggle_favorite(&mut self) -> ViewAction {
    if !self.services.auth.is_authenticated() {
      return ViewAction::Notify(
        Notice::error("Log in to save favorites").with_link(NoticeLink::Login),
      );
    }
    let current = self.favorite.data().copied().unwrap_or(false);
    let api = self.services.api.clone();
    let id = self.story_id.clone();
    self.favorite.dispatch(async move {
      if current {
        api.remove_favorite(&id).await?;
      } else {
        api.add_favorite(&id).await?;
      }
      Ok(!current)
    });
    ViewAction::None
  }

  fn toggle_play(&mut self) -> ViewAction {
    let Some(transport) = self.transport.as_mut() else {
      return ViewAction::None;
    };
    if transport.length().is_zero() {
      return ViewAction::Notify(Notice::info("This story has no narration"));
    }
    if transport.toggle_play() {
      self.record_play();
    }
    ViewAction::None
  }

  /// Count a listen; fire and forget
  fn record_play(&mut self) {
    if let Some(story) = self.query.data_mut() {
      story.play_count += 1;
    }
    let api = self.services.api.clone();
    let id = self.story_id.clone();
    tokio::spawn(async move {
      if let Err(e) = api.record_play(&id).await {
        warn!(story = %id, error = %e, "failed to record play");
      }
    });
  }

  fn request_download(&self) -> ViewAction {
    match self.story() {
      Some(story) if story.has_audio() => ViewAction::Gate(GatedAction::Download(story.clone())),
      Some(_) => ViewAction::Notify(Notice::info("This story has no narration to download")),
      None => ViewAction::None,
    }
  }

  fn render_text(&self, frame: &mut Frame, area: Rect, story: &Story) {
    let mut meta = vec![Span::styled(
      story.topic_label().to_string(),
      Style::default().fg(Color::Cyan),
    )];
    if let Some(sub) = &story.subtopic_name {
      meta.push(Span::styled(format!(" / {}", sub), Style::default().fg(Color::Cyan)));
    }
    if let Some(age) = &story.age_group {
      meta.push(Span::styled(format!("  {} yaş", age), Style::default().fg(Color::Yellow)));
    }
    if self.favorite.data().copied().unwrap_or(false) {
      meta.push(Span::styled("  ♥ favorite", Style::default().fg(Color::Red)));
    }

    let mut lines = vec![Line::from(meta)];
    if let Some(kazanim) = story.kazanim.as_deref().filter(|k| !k.is_empty()) {
      lines.push(Line::styled(
        format!("Kazanım: {}", kazanim),
        Style::default().fg(Color::Green),
      ));
    }
    lines.push(Line::raw(""));
    lines.extend(story.content.lines().map(|l| Line::raw(l.to_string())));

    let block = Block::default()
      .title(format!(" {} ", story.title))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    frame.render_widget(
      Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((self.scroll, 0)),
      area,
    );
  }

  fn render_player(&self, frame: &mut Frame, area: Rect) {
    let Some(t) = &self.transport else {
      return;
    };
    let block = Block::default()
      .title(" Narration ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Magenta));

    if t.length().is_zero() {
      frame.render_widget(
        Paragraph::new("No narration for this story")
          .block(block)
          .style(Style::default().fg(Color::DarkGray)),
        area,
      );
      return;
    }

    let state = if t.is_playing() { "▶" } else { "⏸" };
    let volume = if t.is_muted() {
      "muted".to_string()
    } else {
      format!("vol {:.0}%", t.volume() * 100.0)
    };
    let label = format!(
      "{} {} / {}  {}x  {}",
      state,
      format_time(t.position()),
      format_time(t.length()),
      t.rate(),
      volume
    );

    let gauge = Gauge::default()
      .block(block)
      .gauge_style(Style::default().fg(Color::Magenta).bg(Color::Black))
      .ratio(t.progress())
      .label(label);
    frame.render_widget(gauge, area);
  }
}

fn transport_for(story: &Story) -> Transport {
  Transport::new(Duration::from_secs(u64::from(story.narration_secs())))
}

impl View for StoryDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char(' ') => return self.toggle_play(),
      KeyCode::Char('j') | KeyCode::Down => self.scroll = self.scroll.saturating_add(1),
      KeyCode::Char('k') | KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
      KeyCode::Left => {
        if let Some(t) = self.transport.as_mut() {
          t.seek_by(-SEEK_STEP_SECS);
        }
      }
      KeyCode::Right => {
        if let Some(t) = self.transport.as_mut() {
          t.seek_by(SEEK_STEP_SECS);
        }
      }
      KeyCode::Char(c @ '0'..='9') => {
        if let (Some(t), Some(digit)) = (self.transport.as_mut(), c.to_digit(10)) {
          t.seek_fraction(f64::from(digit) / 10.0);
        }
      }
      KeyCode::Char('b') => {
        if let Some(t) = self.transport.as_mut() {
          if !t.length().is_zero() {
            t.restart();
          }
        }
      }
      KeyCode::Char('m') => {
        if let Some(t) = self.transport.as_mut() {
          t.toggle_mute();
        }
      }
      KeyCode::Char('+') | KeyCode::Char('=') => {
        if let Some(t) = self.transport.as_mut() {
          t.step_volume(0.1);
        }
      }
      KeyCode::Char('-') => {
        if let Some(t) = self.transport.as_mut() {
          t.step_volume(-0.1);
        }
      }
      KeyCode::Char('>') => {
        if let Some(t) = self.transport.as_mut() {
          t.cycle_rate();
        }
      }
      KeyCode::Char('<') => {
        if let Some(t) = self.transport.as_mut() {
          t.set_rate(RATES[2]);
        }
      }
      KeyCode::Char('f') => return self.toggle_favorite(),
      KeyCode::Char('d') => return self.request_download(),
      KeyCode::Char('u') => {
        if let Some(user_id) = self.story().and_then(|s| s.user_id.clone()) {
          return ViewAction::Push(Box::new(PublicProfileView::new(self.services.clone(), user_id)));
        }
      }
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let story = match (self.query.state(), self.story()) {
      (_, Some(story)) => story.clone(),
      (QueryState::Error(e), None) => {
        frame.render_widget(
          Paragraph::new(format!("Could not load story: {}\n\nPress 'r' to retry.", e))
            .block(Block::default().borders(Borders::ALL))
            .style(Style::default().fg(Color::Red)),
          area,
        );
        return;
      }
      _ => {
        frame.render_widget(
          Paragraph::new("Loading story...")
            .block(Block::default().borders(Borders::ALL))
            .style(Style::default().fg(Color::DarkGray)),
          area,
        );
        return;
      }
    };

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(3), Constraint::Length(3)])
      .split(area);
    self.render_text(frame, chunks[0], &story);
    self.render_player(frame, chunks[1]);
  }

  fn breadcrumb_label(&self) -> String {
    self
      .story()
      .map(|s| crate::ui::renderfns::truncate(&s.title, 30))
      .unwrap_or_else(|| self.story_id.clone())
  }

  fn tick(&mut self) -> ViewAction {
    let now = Instant::now();
    let elapsed = now.saturating_duration_since(self.last_tick);
    self.last_tick = now;

    if self.query.poll() && self.transport.is_none() {
      if let Some(story) = self.query.data() {
        self.transport = Some(transport_for(story));
      }
    }
    if let Some(t) = self.transport.as_mut() {
      t.advance(elapsed);
    }

    if self.favorite.poll() {
      if let Some(err) = self.favorite.error() {
        if !err.is_silent() {
          return ViewAction::Notify(err.notice("Could not update favorites"));
        }
      }
    }
    ViewAction::None
  }

  fn on_gate(&mut self, action: GatedAction) -> ViewAction {
    let GatedAction::Download(story) = action else {
      return ViewAction::None;
    };
    match download::save_audio(&story, &self.services.download_dir) {
      Ok(path) => ViewAction::Notify(Notice::success(format!("Saved to {}", path.display()))),
      Err(e) => {
        warn!(story = %story.id, error = %e, "download failed");
        ViewAction::Notify(Notice::error(format!("Download failed: {}", e)))
      }
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("space", "play").with_priority(10),
      ShortcutInfo::new("←/→", "seek").with_priority(20),
      ShortcutInfo::new(">", "speed").with_priority(30),
      ShortcutInfo::new("m", "mute").with_priority(40),
      ShortcutInfo::new("f", "favorite").with_priority(50),
      ShortcutInfo::new("d", "download").with_priority(60),
      ShortcutInfo::new("u", "author").with_priority(70),
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

  fn key(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
  }

  async fn settle(view: &mut StoryDetailView) -> ViewAction {
    tokio::time::sleep(Duration::from_millis(20)).await;
    view.tick()
  }

  #[tokio::test]
  async fn test_first_play_records_a_listen() {
    let fake = Arc::new(FakeApi::new().with_stories(vec![story("s1", "Orman")]));
    let mut view = StoryDetailView::new(services(fake.clone()), "s1".into());
    settle(&mut view).await;
    let before = view.story().map(|s| s.play_count).unwrap_or_default();

    view.handle_key(key(' '));
    settle(&mut view).await;
    assert!(view.transport.as_ref().is_some_and(|t| !t.position().is_zero()));

    // Pausing and resuming mid-story is not a new listen
    view.handle_key(key(' '));
    view.handle_key(key(' '));
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(fake.calls("record_play"), 1);
    assert_eq!(view.story().map(|s| s.play_count), Some(before + 1));
  }

  #[tokio::test]
  async fn test_audio_without_duration_still_plays() {
    let legacy = Story {
      duration: None,
      ..story("s1", "Orman")
    };
    let fake = Arc::new(FakeApi::new().with_stories(vec![legacy]));
    let mut view = StoryDetailView::new(services(fake.clone()), "s1".into());
    settle(&mut view).await;
    assert!(view.transport.as_ref().is_some_and(|t| !t.length().is_zero()));

    assert!(view.handle_key(key(' ')).is_none());
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(fake.calls("record_play"), 1);
  }

  #[tokio::test]
  async fn test_download_goes_through_gate() {
    let fake = Arc::new(FakeApi::new().with_stories(vec![story("s1", "Orman")]));
    let mut services = services(fake);
    let dir = tempfile::tempdir().unwrap();
    services.download_dir = dir.path().to_path_buf();

    let mut view = StoryDetailView::new(services, "s1".into());
    settle(&mut view).await;

    let ViewAction::Gate(action) = view.handle_key(key('d')) else {
      panic!("download should be gated");
    };
    assert!(matches!(view.on_gate(action), ViewAction::Notify(_)));
    assert!(dir.path().join("orman-s1.mp3").exists());
  }

  #[tokio::test]
  async fn test_favorite_requires_login() {
    let fake = Arc::new(FakeApi::new().with_stories(vec![story("s1", "Orman")]));
    let mut view = StoryDetailView::new(services(fake.clone()), "s1".into());
    let ViewAction::Notify(notice) = view.handle_key(key('f')) else {
      panic!("anonymous favorite should notify");
    };
    assert_eq!(notice.link, Some(NoticeLink::Login));
    assert_eq!(fake.calls("add_favorite"), 0);
  }

  #[tokio::test]
  async fn test_favorite_toggles_when_logged_in() {
    let fake = Arc::new(
      FakeApi::new()
        .with_stories(vec![story("s1", "Orman")])
        .with_user(user(3)),
    );
    let services = services(fake.clone());
    services.store.set_token("tok").unwrap();
    services.auth.boot().await;

    let mut view = StoryDetailView::new(services, "s1".into());
    settle(&mut view).await;
    assert_eq!(view.favorite.data(), Some(&false));

    view.handle_key(key('f'));
    settle(&mut view).await;
    assert_eq!(view.favorite.data(), Some(&true));
    assert_eq!(fake.calls("add_favorite"), 1);
  }
}
