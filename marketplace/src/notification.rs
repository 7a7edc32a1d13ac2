// marketplace/src/notification.rs

//! Single-slot, self-dismissing feedback banner.

use serde::Serialize;
use std::time::{Duration, Instant};

pub const DEFAULT_DURATION: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
  Success,
  Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
  /// Increases with every `show`; lets a caller dismiss only the message it saw.
  pub seq: u64,
  pub level: Level,
  pub message: String,
}

#[derive(Debug)]
struct Slot {
  notification: Notification,
  expires_at: Instant,
}

/// Holds at most one message. A new message replaces the current one and
/// restarts the timer.
#[derive(Debug)]
pub struct Notifier {
  duration: Duration,
  next_seq: u64,
  slot: Option<Slot>,
}

impl Default for Notifier {
  fn default() -> Self {
    Self::new(DEFAULT_DURATION)
  }
}

impl Notifier {
  pub fn new(duration: Duration) -> Self {
    Self { duration, next_seq: 1, slot: None }
  }

  pub fn success(&mut self, message: impl Into<String>) -> u64 {
    self.show_at(Level::Success, message, Instant::now())
  }

  pub fn error(&mut self, message: impl Into<String>) -> u64 {
    self.show_at(Level::Error, message, Instant::now())
  }

  pub fn show_at(&mut self, level: Level, message: impl Into<String>, now: Instant) -> u64 {
    let seq = self.next_seq;
    self.next_seq += 1;
    self.slot = Some(Slot {
      notification: Notification { seq, level, message: message.into() },
      expires_at: now + self.duration,
    });
    seq
  }

  pub fn current(&self) -> Option<&Notification> {
    self.current_at(Instant::now())
  }

  pub fn current_at(&self, now: Instant) -> Option<&Notification> {
    self
      .slot
      .as_ref()
      .filter(|slot| now < slot.expires_at)
      .map(|slot| &slot.notification)
  }

  /// Clears the banner if it still shows message `seq`.
  pub fn dismiss(&mut self, seq: u64) -> bool {
    if self.slot.as_ref().map(|s| s.notification.seq) == Some(seq) {
      self.slot = None;
      return true;
    }
    false
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn message_expires_after_duration() {
    let mut notifier = Notifier::new(Duration::from_millis(3000));
    let t0 = Instant::now();
    notifier.show_at(Level::Success, "Item added to cart", t0);

    assert_eq!(
      notifier.current_at(t0 + Duration::from_millis(2999)).map(|n| n.message.as_str()),
      Some("Item added to cart")
    );
    assert!(notifier.current_at(t0 + Duration::from_millis(3000)).is_none());
  }

  #[test]
  fn second_message_replaces_first_and_restarts_timer() {
    let mut notifier = Notifier::default();
    let t0 = Instant::now();
    let first = notifier.show_at(Level::Success, "Order confirmed successfully", t0);
    let second = notifier.show_at(Level::Error, "Could not reach the store.", t0 + Duration::from_millis(2000));

    let shown = notifier.current_at(t0 + Duration::from_millis(4000)).unwrap();
    assert_eq!(shown.seq, second);
    assert_eq!(shown.level, Level::Error);

    // A stale dismiss for the replaced message leaves the new one alone.
    assert!(!notifier.dismiss(first));
    assert!(notifier.dismiss(second));
    assert!(notifier.current_at(t0).is_none());
  }
}
