//! Notification sink.
//!
//! The core hands display-ready records to a sink and never waits for, or
//! inspects, any acknowledgement. Hosts pick the sink: a toast bridge over
//! [`ChannelSink`], plain logging via [`LogSink`], or [`MemorySink`] in tests.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Visual weight of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    /// Something the user should regret (completing a task, mostly).
    Destructive,
}

/// A toast-shaped record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
    /// How long the host should keep it on screen, if it cares.
    #[serde(default)]
    pub duration_hint_ms: Option<u64>,
}

impl Notification {
    pub fn new(title: impl Into<String>, description: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity,
            duration_hint_ms: None,
        }
    }

    pub fn with_duration_ms(mut self, ms: u64) -> Self {
        self.duration_hint_ms = Some(ms);
        self
    }
}

/// One-way, fire-and-forget notification channel.
pub trait NotificationSink: Send {
    fn notify(&self, notification: Notification);
}

/// Drops everything.
pub struct NoopSink;

impl NotificationSink for NoopSink {
    fn notify(&self, _notification: Notification) {}
}

/// Writes notifications to `tracing`.
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Destructive => tracing::warn!(
                title = %notification.title,
                "{}",
                notification.description
            ),
            Severity::Info | Severity::Success => tracing::info!(
                title = %notification.title,
                "{}",
                notification.description
            ),
        }
    }
}

/// Collects notifications in a shared buffer. Clones share the buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<Vec<Notification>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything received so far.
    pub fn snapshot(&self) -> Vec<Notification> {
        self.buffer().clone()
    }

    /// Take everything received so far, leaving the buffer empty.
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.buffer())
    }

    pub fn len(&self) -> usize {
        self.buffer().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer().is_empty()
    }

    fn buffer(&self) -> std::sync::MutexGuard<'_, Vec<Notification>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl NotificationSink for MemorySink {
    fn notify(&self, notification: Notification) {
        self.buffer().push(notification);
    }
}

/// Forwards notifications over an unbounded tokio channel.
///
/// A closed receiver is not an error; the record is dropped.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            tracing::debug!("notification receiver closed, dropping record");
        }
    }
}
