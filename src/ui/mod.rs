pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use components::{render_welcome, Interstitial};
use ratatui::prelude::*;
use ratatui::widgets::ListState;
use renderfns::{draw_footer, draw_header};

/// Keep a list selection inside `0..len`, or clear it for an empty list.
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  if len == 0 {
    state.select(None);
    return;
  }
  match state.selected() {
    Some(i) if i >= len => state.select(Some(len - 1)),
    None => state.select(Some(0)),
    _ => {}
  }
}

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  let user = app.services().auth.user();
  draw_header(
    frame,
    chunks[0],
    app.services().config.title(),
    app.api_url(),
    user.as_ref(),
    &app.shortcuts(),
  );

  if let Some(view) = app.current_view_mut() {
    view.render(frame, chunks[1]);
  }

  draw_footer(frame, chunks[2], &app.breadcrumb(), &app.status());

  app.command_input().render_overlay(frame, chunks[1]);

  if let Some((remaining_secs, pending)) = app.interstitial() {
    Interstitial {
      remaining_secs,
      pending: pending.as_deref(),
    }
    .render(frame, chunks[1]);
  }

  if app.showing_welcome() {
    render_welcome(frame, chunks[1], app.services().config.title());
  }

  app.toasts().render(frame, chunks[1]);
}
