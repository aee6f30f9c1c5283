use crossterm::event::{self, Event as CrosstermEvent, KeyEvent};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::stash::types::Identity;

/// Toast kinds; they pick the accent color on the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
  Success,
  Error,
  Ai,
}

/// A transient notification.
#[derive(Debug, Clone)]
pub struct Toast {
  pub message: String,
  pub kind: ToastKind,
}

impl Toast {
  pub fn success(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      kind: ToastKind::Success,
    }
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      kind: ToastKind::Error,
    }
  }

  pub fn ai(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      kind: ToastKind::Ai,
    }
  }
}

/// Application events. Views hold a sender and use it to reach the app
/// from tick handlers and spawned tasks.
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Periodic tick for UI refresh, timers and query polling
  Tick,
  /// Show a transient notification
  Notice(Toast),
  /// A persist or delete completed; list views should refetch
  StoreChanged,
  /// Authentication succeeded with a fresh identity
  LoggedIn(Identity),
  /// The session ended
  LoggedOut,
}

/// Event handler that produces events from terminal input and a tick timer
pub struct EventHandler {
  tx: mpsc::UnboundedSender<Event>,
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    // Spawn terminal event reader
    let input_tx = tx.clone();
    tokio::spawn(async move {
      loop {
        if event::poll(tick_rate).unwrap_or(false) {
          if let Ok(evt) = event::read() {
            if let CrosstermEvent::Key(key) = evt {
              if input_tx.send(Event::Key(key)).is_err() {
                break;
              }
            }
          }
        } else {
          // Tick
          if input_tx.send(Event::Tick).is_err() {
            break;
          }
        }
      }
    });

    Self { tx, rx }
  }

  /// A sender for views and spawned tasks.
  pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
    self.tx.clone()
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
