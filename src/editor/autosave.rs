//! Cancellable debounce timer for autosave and search.
//!
//! Deadline-based and polled from the event loop tick, so firing and
//! cancellation are synchronous: a cancelled deadline simply never fires.

use std::time::{Duration, Instant};

/// Delay between the last edit and the autosave persist.
pub const AUTOSAVE_DELAY: Duration = Duration::from_millis(2000);

/// Delay between the last search keystroke and the list refetch.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// A single pending deferred action. At most one deadline is armed at a
/// time; arming supersedes any earlier one (coalescing, not queuing).
#[derive(Debug)]
pub struct DebounceTimer {
  delay: Duration,
  deadline: Option<Instant>,
}

impl DebounceTimer {
  pub fn new(delay: Duration) -> Self {
    Self {
      delay,
      deadline: None,
    }
  }

  /// Arm (or re-arm) the timer. Implicitly cancels a pending deadline.
  pub fn arm(&mut self) {
    self.arm_at(Instant::now());
  }

  fn arm_at(&mut self, now: Instant) {
    self.deadline = Some(now + self.delay);
  }

  /// Drop the pending deadline, if any.
  pub fn cancel(&mut self) {
    self.deadline = None;
  }

  pub fn is_armed(&self) -> bool {
    self.deadline.is_some()
  }

  /// If the deadline has passed, disarm and return true. Call on tick.
  pub fn fire_if_due(&mut self) -> bool {
    self.fire_if_due_at(Instant::now())
  }

  fn fire_if_due_at(&mut self, now: Instant) -> bool {
    match self.deadline {
      Some(deadline) if now >= deadline => {
        self.deadline = None;
        true
      }
      _ => false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const DELAY: Duration = Duration::from_millis(2000);

  #[test]
  fn test_not_due_before_delay() {
    let mut timer = DebounceTimer::new(DELAY);
    let start = Instant::now();
    timer.arm_at(start);

    assert!(timer.is_armed());
    assert!(!timer.fire_if_due_at(start + Duration::from_millis(1999)));
    assert!(timer.is_armed());
  }

  #[test]
  fn test_fires_once_after_delay() {
    let mut timer = DebounceTimer::new(DELAY);
    let start = Instant::now();
    timer.arm_at(start);

    let later = start + Duration::from_millis(2100);
    assert!(timer.fire_if_due_at(later));
    // Disarmed after firing; no second fire
    assert!(!timer.fire_if_due_at(later + DELAY));
  }

  #[test]
  fn test_rearm_supersedes_previous_deadline() {
    let mut timer = DebounceTimer::new(DELAY);
    let start = Instant::now();

    // A burst of edits keeps deferring; there is one deadline, not a queue
    timer.arm_at(start);
    timer.arm_at(start + Duration::from_millis(500));
    timer.arm_at(start + Duration::from_millis(1000));

    // The original deadline has passed but was superseded
    assert!(!timer.fire_if_due_at(start + Duration::from_millis(2100)));

    // Only the trailing edge fires
    assert!(timer.fire_if_due_at(start + Duration::from_millis(3100)));
    assert!(!timer.fire_if_due_at(start + Duration::from_millis(6000)));
  }

  #[test]
  fn test_cancel_is_total() {
    let mut timer = DebounceTimer::new(DELAY);
    let start = Instant::now();
    timer.arm_at(start);
    timer.cancel();

    assert!(!timer.is_armed());
    assert!(!timer.fire_if_due_at(start + Duration::from_secs(60)));
  }

  #[test]
  fn test_rearm_after_cancel() {
    let mut timer = DebounceTimer::new(DELAY);
    let start = Instant::now();
    timer.arm_at(start);
    timer.cancel();
    timer.arm_at(start + Duration::from_millis(100));

    assert!(timer.fire_if_due_at(start + Duration::from_millis(2200)));
  }
}
