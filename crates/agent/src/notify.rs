use serde::Serialize;
use std::fmt;
use tokio::sync::mpsc;
use tracing::{debug, info};

pub const COLOR_INFO: &str = "#3498db";
pub const COLOR_THINKING: &str = "#9b59b6";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationRole {
    Info,
    Thinking,
    Success,
    Warning,
    Error,
}

impl fmt::Display for NotificationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NotificationRole::Info => "info",
            NotificationRole::Thinking => "thinking",
            NotificationRole::Success => "success",
            NotificationRole::Warning => "warning",
            NotificationRole::Error => "error",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub role: NotificationRole,
    pub message: String,
    pub label: Option<String>,
    pub color: Option<String>,
}

impl Notification {
    pub fn new(role: NotificationRole, message: impl Into<String>) -> Self {
        Self {
            role,
            message: message.into(),
            label: None,
            color: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_color(mut self, color: &str) -> Self {
        self.color = Some(color.to_string());
        self
    }
}

/// Fire-and-forget sink for user-facing progress messages. Implementations
/// must not block and must not fail.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, n: Notification) {
        info!(
            role = %n.role,
            label = n.label.as_deref().unwrap_or(""),
            "{}",
            n.message
        );
    }
}

/// Forwards notifications over a bounded channel, dropping them when the
/// receiver lags or is gone.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::Sender<Notification>,
}

impl ChannelNotifier {
    pub fn new(tx: mpsc::Sender<Notification>) -> Self {
        Self { tx }
    }

    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self::new(tx), rx)
    }
}

impl NotificationSink for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        if let Err(e) = self.tx.try_send(notification) {
            debug!(error = %e, "Notification dropped");
        }
    }
}
