//! Playback transport for story narration.
//!
//! Only the transport state is modelled (position, rate, volume); decoding is
//! left to external players.

use std::time::Duration;

pub const RATES: [f32; 5] = [0.5, 0.75, 1.0, 1.25, 1.5];
const NORMAL_RATE: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct Transport {
  length: Duration,
  position: Duration,
  playing: bool,
  muted: bool,
  volume: f32,
  rate: usize,
}

impl Transport {
  pub fn new(length: Duration) -> Self {
    Self {
      length,
      position: Duration::ZERO,
      playing: false,
      muted: false,
      volume: 1.0,
      rate: NORMAL_RATE,
    }
  }

  pub fn length(&self) -> Duration {
    self.length
  }

  pub fn position(&self) -> Duration {
    self.position
  }

  pub fn is_playing(&self) -> bool {
    self.playing
  }

  pub fn is_muted(&self) -> bool {
    self.muted
  }

  pub fn volume(&self) -> f32 {
    self.volume
  }

  pub fn rate(&self) -> f32 {
    RATES[self.rate]
  }

  /// Fraction of the narration already played, in `0.0..=1.0`.
  pub fn progress(&self) -> f64 {
    if self.length.is_zero() {
      return 0.0;
    }
    (self.position.as_secs_f64() / self.length.as_secs_f64()).clamp(0.0, 1.0)
  }

  /// Play or pause.
  ///
  /// Returns `true` when playback starts from the beginning, which counts as
  /// a listen.
  pub fn toggle_play(&mut self) -> bool {
    if self.playing {
      self.playing = false;
      return false;
    }
    self.playing = true;
    self.position.is_zero()
  }

  /// Move the playhead by `elapsed` wall time at the current rate.
  ///
  /// Reaching the end stops playback and rewinds.
  pub fn advance(&mut self, elapsed: Duration) {
    if !self.playing {
      return;
    }
    self.position += elapsed.mul_f32(self.rate());
    if self.position >= self.length {
      self.playing = false;
      self.position = Duration::ZERO;
    }
  }

  pub fn seek_fraction(&mut self, fraction: f64) {
    self.position = self.length.mul_f64(fraction.clamp(0.0, 1.0));
  }

  /// Seek relative to the current position, clamped to the narration.
  pub fn seek_by(&mut self, secs: i64) {
    let delta = Duration::from_secs(secs.unsigned_abs());
    self.position = if secs < 0 {
      self.position.saturating_sub(delta)
    } else {
      (self.position + delta).min(self.length)
    };
  }

  /// Rewind and play.
  pub fn restart(&mut self) {
    self.position = Duration::ZERO;
    self.playing = true;
  }

  pub fn toggle_mute(&mut self) {
    self.muted = !self.muted;
  }

  /// Set volume in `0.0..=1.0`. Zero mutes; raising it unmutes.
  pub fn set_volume(&mut self, volume: f32) {
    self.volume = volume.clamp(0.0, 1.0);
    if self.volume == 0.0 {
      self.muted = true;
    } else if self.muted {
      self.muted = false;
    }
  }

  pub fn step_volume(&mut self, delta: f32) {
    // Round to tenths so repeated steps land on zero exactly
    let next = ((self.volume + delta) * 10.0).round() / 10.0;
    self.set_volume(next);
  }

  pub fn set_rate(&mut self, rate: f32) {
    if let Some(index) = RATES.iter().position(|r| (*r - rate).abs() < f32::EPSILON) {
      self.rate = index;
    }
  }

  pub fn cycle_rate(&mut self) {
    self.rate = (self.rate + 1) % RATES.len();
  }
}

/// `m:ss`
pub fn format_time(time: Duration) -> String {
  let secs = time.as_secs();
  format!("{}:{:02}", secs / 60, secs % 60)
}
