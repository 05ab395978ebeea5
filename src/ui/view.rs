use crate::api::types::{Story, StoryRequest};
use crate::api::Notice;
use crate::query::Query;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;

/// When a shortcut should be shown in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShortcutVisibility {
  #[default]
  Always, // Always shown
  WhenActive, // Only when component is active/focused
}

/// A keyboard shortcut hint for display in the header
#[derive(Debug, Clone)]
pub struct ShortcutInfo {
  pub key: &'static str,
  pub label: &'static str,
  pub visibility: ShortcutVisibility,
  pub priority: u8, // Lower = shown first
}

impl ShortcutInfo {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      visibility: ShortcutVisibility::Always,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }

  pub const fn when_active(mut self) -> Self {
    self.visibility = ShortcutVisibility::WhenActive;
    self
  }
}

/// Actions that must pass the sponsor interstitial before they run
#[derive(Debug, Clone, PartialEq)]
pub enum GatedAction {
  Generate(StoryRequest),
  Search(String),
  Download(Story),
}

impl GatedAction {
  pub fn describe(&self) -> String {
    match self {
      GatedAction::Generate(request) => format!("create a story about \"{}\"", request.theme),
      GatedAction::Search(term) => format!("search for \"{}\"", term),
      GatedAction::Download(story) => format!("download \"{}\"", story.title),
    }
  }
}

/// Actions that a view can request in response to user input
pub enum ViewAction {
  /// No action needed
  None,
  /// Push a new view onto the stack
  Push(Box<dyn View>),
  /// Pop current view from stack (go back)
  Pop,
  /// Swap the current view for another
  Replace(Box<dyn View>),
  /// Show a transient notice
  Notify(Notice),
  /// Run an action behind the interstitial
  Gate(GatedAction),
  /// Hand over a story generation that must outlive the view
  Detach(Query<Story>),
  /// Several actions, applied in order
  Batch(Vec<ViewAction>),
}

impl ViewAction {
  #[cfg(test)]
  pub fn is_none(&self) -> bool {
    matches!(self, ViewAction::None)
  }
}

/// Trait for view behavior
///
/// Views handle their own input modes (search, edit, etc.) and return
/// actions for the App to execute. This creates a clean delegation chain:
/// App → View → Components
///
/// Views that load data asynchronously should use Query<T> internally and
/// poll it in the tick() method.
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect);

  /// Get the breadcrumb label for this view
  fn breadcrumb_label(&self) -> String;

  /// Called on each tick to poll async queries; results may produce actions
  fn tick(&mut self) -> ViewAction {
    ViewAction::None
  }

  /// True while a text field has focus, so global keys go to the view
  fn is_editing(&self) -> bool {
    false
  }

  /// A gated action this view requested has passed the interstitial
  fn on_gate(&mut self, _action: GatedAction) -> ViewAction {
    ViewAction::None
  }

  /// The view is on top of the stack again after the one above was popped
  fn on_resume(&mut self) {}

  /// Get keyboard shortcuts to display in the header
  /// Override this to provide view-specific shortcuts
  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
