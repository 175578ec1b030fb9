//! Transient user notifications
//!
//! Fire-and-forget: publishing never blocks and never fails, even with no
//! subscribers attached.

use std::time::Duration;
use tokio::sync::broadcast;
use tracing::debug;

/// Buffered notifications per subscriber before the oldest are dropped
const CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    /// How long the notification should stay visible
    pub ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct NotificationCenter {
    sender: broadcast::Sender<Notification>,
    ttl: Duration,
}

impl NotificationCenter {
    pub fn new(ttl: Duration) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender, ttl }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    pub fn success(&self, message: impl Into<String>) {
        self.publish(NotificationKind::Success, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.publish(NotificationKind::Error, message.into());
    }

    fn publish(&self, kind: NotificationKind, message: String) {
        debug!(?kind, message = %message, "Notification");
        // no subscribers is fine
        let _ = self.sender.send(Notification {
            kind,
            message,
            ttl: self.ttl,
        });
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(Duration::from_millis(2500))
    }
}
