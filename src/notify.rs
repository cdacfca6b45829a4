use crate::error::{GalleryError, LocationError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Info,
    Warning,
    Error,
}

/// A toast/alert shown to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
}

impl Notification {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        kind: NotificationKind,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind,
        }
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, NotificationKind::Success)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, NotificationKind::Warning)
    }

    /// The single notification an action failure is reported as
    pub fn from_error(error: &GalleryError) -> Self {
        let kind = match error {
            GalleryError::Validation { .. } => NotificationKind::Warning,
            GalleryError::Location(LocationError::Unavailable { .. })
            | GalleryError::Location(LocationError::Timeout) => NotificationKind::Warning,
            _ => NotificationKind::Error,
        };

        Self::new(error.title(), error.to_string(), kind)
    }
}

/// Fire-and-forget user notification surface
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Notifier that only writes to the log
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Error | NotificationKind::Warning => {
                warn!("{}: {}", notification.title, notification.message)
            }
            NotificationKind::Success => info!("{}: {}", notification.title, notification.message),
            NotificationKind::Info => debug!("{}: {}", notification.title, notification.message),
        }
    }
}
