use crate::api::{Notice, NoticeLevel, NoticeLink};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

const TOAST_TTL: Duration = Duration::from_secs(5);
const MAX_TOASTS: usize = 3;

/// Transient notices stacked in the bottom-right corner
#[derive(Debug, Default)]
pub struct Toasts {
  items: VecDeque<(Notice, Instant)>,
}

impl Toasts {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, notice: Notice, now: Instant) {
    // Identical notices collapse into the newest
    self.items.retain(|(n, _)| n != &notice);
    self.items.push_back((notice, now));
    while self.items.len() > MAX_TOASTS {
      self.items.pop_front();
    }
  }

  /// Drop notices older than their time to live
  pub fn expire(&mut self, now: Instant) {
    self
      .items
      .retain(|(_, shown)| now.saturating_duration_since(*shown) < TOAST_TTL);
  }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.items.len()
  }

  #[cfg(test)]
  pub fn iter(&self) -> impl Iterator<Item = &Notice> {
    self.items.iter().map(|(n, _)| n)
  }

  /// Link of the newest notice that has one
  pub fn link(&self) -> Option<NoticeLink> {
    self.items.iter().rev().find_map(|(n, _)| n.link)
  }

  /// Remove the notices carrying `link` once it has been followed
  pub fn consume_link(&mut self, link: NoticeLink) {
    self.items.retain(|(n, _)| n.link != Some(link));
  }

  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let width = 44.min(area.width);
    let mut bottom = area.y + area.height;

    for (notice, _) in self.items.iter().rev() {
      let mut text = notice.message.clone();
      if notice.link.is_some() {
        text.push_str("\n(Ctrl-g to go there)");
      }
      let lines = wrapped_height(&text, width.saturating_sub(2));
      let height = (lines + 2).min(area.height);
      if bottom < area.y + height {
        break;
      }
      bottom -= height;
      let rect = Rect::new(area.x + area.width - width, bottom, width, height);

      let color = level_color(notice.level);
      let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color));

      frame.render_widget(Clear, rect);
      frame.render_widget(
        Paragraph::new(text)
          .block(block)
          .style(Style::default().fg(color))
          .wrap(Wrap { trim: true }),
        rect,
      );
    }
  }
}

fn level_color(level: NoticeLevel) -> Color {
  match level {
    NoticeLevel::Info => Color::Cyan,
    NoticeLevel::Success => Color::Green,
    NoticeLevel::Error => Color::Red,
  }
}

fn wrapped_height(text: &str, width: u16) -> u16 {
  let width = width.max(1) as usize;
  text
    .lines()
    .map(|line| line.chars().count().div_ceil(width).max(1) as u16)
    .sum()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_expiry() {
    let start = Instant::now();
    let mut toasts = Toasts::new();
    toasts.push(Notice::info("Hoş geldin"), start);
    toasts.push(Notice::error("Hata"), start + Duration::from_secs(3));

    toasts.expire(start + Duration::from_secs(6));
    assert_eq!(toasts.len(), 1);
    toasts.expire(start + Duration::from_secs(9));
    assert!(toasts.is_empty());
  }

  #[test]
  fn test_caps_and_dedupes() {
    let now = Instant::now();
    let mut toasts = Toasts::new();
    for i in 0..5 {
      toasts.push(Notice::info(format!("n{}", i)), now);
    }
    toasts.push(Notice::info("n4"), now);
    assert_eq!(toasts.len(), MAX_TOASTS);
  }

  #[test]
  fn test_link_follows_newest() {
    let now = Instant::now();
    let mut toasts = Toasts::new();
    toasts.push(Notice::error("login").with_link(NoticeLink::Login), now);
    toasts.push(Notice::error("credits").with_link(NoticeLink::Profile), now);
    assert_eq!(toasts.link(), Some(NoticeLink::Profile));

    toasts.consume_link(NoticeLink::Profile);
    assert_eq!(toasts.link(), Some(NoticeLink::Login));
  }

  #[test]
  fn test_wrapped_height() {
    assert_eq!(wrapped_height("abcdef", 3), 2);
    assert_eq!(wrapped_height("ab\n", 3), 1);
    assert_eq!(wrapped_height("ab\ncd", 3), 2);
  }
}
