//! Toast notifications carried across redirects in the session.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::models::session_keys;

/// Visual style of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    Success,
    Error,
}

/// A short notification describing the outcome of an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub kind: ToastKind,
    pub title: String,
    pub description: String,
}

impl Toast {
    #[must_use]
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Success,
            title: title.into(),
            description: description.into(),
        }
    }

    #[must_use]
    pub fn error(description: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Error,
            title: "Error".to_string(),
            description: description.into(),
        }
    }

    /// Error toast with its own title, e.g. "Validation Error".
    #[must_use]
    pub fn titled_error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Error,
            title: title.into(),
            description: description.into(),
        }
    }

    /// CSS modifier.
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self.kind {
            ToastKind::Success => "toast-success",
            ToastKind::Error => "toast-error",
        }
    }
}

/// Queue a toast for the next rendered page.
pub async fn push_flash(session: &Session, toast: Toast) {
    if let Err(e) = session.insert(session_keys::FLASH, toast).await {
        tracing::warn!(error = %e, "Failed to store flash toast");
    }
}

/// Take the queued toast, if any.
pub async fn take_flash(session: &Session) -> Option<Toast> {
    session
        .remove::<Toast>(session_keys::FLASH)
        .await
        .ok()
        .flatten()
}
