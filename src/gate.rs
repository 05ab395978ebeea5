//! Interstitial gate in front of sponsored actions.
//!
//! The gate is a single-slot mailbox: requesting an action while another is
//! pending replaces it (last write wins), and dismissing the interstitial runs
//! whatever is in the slot exactly once.

use std::time::{Duration, Instant};

/// Outcome of trying to dismiss the interstitial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dismissal<A> {
  /// The minimum visible duration has not elapsed; the gate stays open
  TooEarly,
  /// Closed with nothing pending
  Closed,
  /// Closed; run this action now
  Run(A),
}

#[derive(Debug, Clone)]
pub struct ActionGate<A> {
  pending: Option<A>,
  opened_at: Option<Instant>,
  min_visible: Duration,
}

impl<A> ActionGate<A> {
  pub fn new(min_visible: Duration) -> Self {
    Self {
      pending: None,
      opened_at: None,
      min_visible,
    }
  }

  /// Store `action` as pending and open the interstitial.
  ///
  /// Returns the action it replaced, if any. An already open gate keeps its
  /// countdown.
  pub fn request(&mut self, action: A, now: Instant) -> Option<A> {
    let replaced = self.pending.replace(action);
    self.open(now);
    replaced
  }

  /// Open the interstitial without a pending action.
  pub fn open(&mut self, now: Instant) {
    if self.opened_at.is_none() {
      self.opened_at = Some(now);
    }
  }

  pub fn is_open(&self) -> bool {
    self.opened_at.is_some()
  }

  pub fn pending(&self) -> Option<&A> {
    self.pending.as_ref()
  }

  /// Time left before the interstitial may be dismissed.
  pub fn remaining(&self, now: Instant) -> Duration {
    match self.opened_at {
      Some(opened) => self
        .min_visible
        .saturating_sub(now.saturating_duration_since(opened)),
      None => Duration::ZERO,
    }
  }

  /// Whole seconds left, rounded up, for the countdown display.
  pub fn remaining_secs(&self, now: Instant) -> u64 {
    let remaining = self.remaining(now);
    let secs = remaining.as_secs();
    if remaining.subsec_nanos() > 0 {
      secs + 1
    } else {
      secs
    }
  }

  pub fn can_dismiss(&self, now: Instant) -> bool {
    self.is_open() && self.remaining(now).is_zero()
  }

  pub fn dismiss(&mut self, now: Instant) -> Dismissal<A> {
    if self.is_open() && !self.can_dismiss(now) {
      return Dismissal::TooEarly;
    }
    self.opened_at = None;
    match self.pending.take() {
      Some(action) => Dismissal::Run(action),
      None => Dismissal::Closed,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SECS: Duration = Duration::from_secs(5);

  #[test]
  fn test_runs_pending_action_once() {
    let start = Instant::now();
    let mut gate = ActionGate::new(SECS);

    assert_eq!(gate.request("generate", start), None);
    assert!(gate.is_open());

    assert_eq!(gate.dismiss(start + SECS), Dismissal::Run("generate"));
    assert!(!gate.is_open());
    assert_eq!(gate.dismiss(start + SECS), Dismissal::Closed);
  }

  #[test]
  fn test_enforces_minimum_visible_duration() {
    let start = Instant::now();
    let mut gate = ActionGate::new(SECS);
    gate.request("search", start);

    let early = start + Duration::from_millis(4200);
    assert!(!gate.can_dismiss(early));
    assert_eq!(gate.remaining_secs(early), 1);
    assert_eq!(gate.dismiss(early), Dismissal::TooEarly);
    assert!(gate.is_open());
    assert_eq!(gate.pending(), Some(&"search"));

    assert!(gate.can_dismiss(start + SECS));
    assert_eq!(gate.dismiss(start + SECS), Dismissal::Run("search"));
  }

  #[test]
  fn test_second_request_replaces_first() {
    let start = Instant::now();
    let mut gate = ActionGate::new(SECS);

    gate.request("search", start);
    let replaced = gate.request("download", start + Duration::from_secs(2));
    assert_eq!(replaced, Some("search"));

    // Countdown continues from the first open
    assert_eq!(gate.remaining(start + Duration::from_secs(2)), Duration::from_secs(3));
    assert_eq!(gate.dismiss(start + SECS), Dismissal::Run("download"));
  }

  #[test]
  fn test_open_without_payload_fires_nothing() {
    let start = Instant::now();
    let mut gate: ActionGate<&str> = ActionGate::new(SECS);

    gate.open(start);
    assert_eq!(gate.remaining_secs(start), 5);
    assert_eq!(gate.dismiss(start + SECS), Dismissal::Closed);
  }

  #[test]
  fn test_closed_gate_has_no_countdown() {
    let gate: ActionGate<&str> = ActionGate::new(SECS);
    assert_eq!(gate.remaining(Instant::now()), Duration::ZERO);
    assert!(!gate.can_dismiss(Instant::now()));
  }
}
