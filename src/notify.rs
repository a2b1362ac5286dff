//! User-visible notifications. Rendering them is the UI's business; this
//! module only defines what gets handed over.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
    AccessDenied,
}

impl NotificationKind {
    /// Style class the front-end attaches to the toast.
    pub fn css_class(self) -> &'static str {
        match self {
            NotificationKind::Success => "success-snackbar",
            NotificationKind::Error => "error-snackbar",
            NotificationKind::Warning => "warning-snackbar",
            NotificationKind::Info => "info-snackbar",
            NotificationKind::AccessDenied => "access-denied-snackbar",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Emits notifications as log events. Used by the CLI and as a fallback when
/// no UI is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, n: Notification) {
        match n.kind {
            NotificationKind::Error | NotificationKind::AccessDenied | NotificationKind::Warning => {
                warn!(target: "stockgate::notify", kind = n.kind.css_class(), "{}", n.message)
            }
            _ => info!(target: "stockgate::notify", kind = n.kind.css_class(), "{}", n.message),
        }
    }
}
