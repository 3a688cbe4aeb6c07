use serde::Serialize;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Success,
    Info,
    Error,
}

/// A user-facing message about the outcome of an action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub teacher_id: i64,
    pub level: Level,
    pub message: String,
}

/// Fan-out channel for notifications. Cloning shares the channel.
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Dropped silently when nobody is listening.
    pub fn publish(&self, teacher_id: i64, level: Level, message: impl Into<String>) {
        let notification = Notification {
            teacher_id,
            level,
            message: message.into(),
        };
        tracing::debug!("notify teacher_id={teacher_id} {:?}: {}", level, notification.message);
        let _ = self.tx.send(notification);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}
