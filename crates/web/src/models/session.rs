//! Session-stored identity for the admin back-office.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use siddha_clinic_core::UserId;

use crate::supabase::{AuthSession, Caller};

/// Identity held in the cookie session after a successful sign-in.
///
/// The role is deliberately absent: it is re-resolved from the backend on
/// every gated request rather than trusted from the session.
#[derive(Clone, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub user_id: UserId,
    pub email: Option<String>,
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds) when the access token expires.
    pub expires_at: Option<i64>,
}

impl SessionIdentity {
    /// Backend caller acting as this identity.
    #[must_use]
    pub fn caller(&self) -> Caller {
        Caller::user(&self.access_token)
    }

    /// True once the access token's expiry has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at <= Utc::now().timestamp())
    }

    /// Display label for headers and logs.
    #[must_use]
    pub fn display_email(&self) -> &str {
        self.email.as_deref().unwrap_or("admin")
    }
}

impl From<AuthSession> for SessionIdentity {
    fn from(session: AuthSession) -> Self {
        Self {
            user_id: session.user.id,
            email: session.user.email,
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            expires_at: session.expires_at,
        }
    }
}

impl fmt::Debug for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionIdentity")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Session keys.
pub mod keys {
    /// The signed-in identity.
    pub const IDENTITY: &str = "identity";

    /// One-shot toast shown on the next rendered page.
    pub const FLASH: &str = "flash";

    /// Prefix for per-collection admin view state.
    pub const SCREEN_PREFIX: &str = "screen.";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(expires_at: Option<i64>) -> SessionIdentity {
        SessionIdentity {
            user_id: UserId::random(),
            email: Some("doctor@clinic.in".to_string()),
            access_token: "at-secret".to_string(),
            refresh_token: "rt-secret".to_string(),
            expires_at,
        }
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let debug = format!("{:?}", identity(None));
        assert!(!debug.contains("at-secret"));
        assert!(!debug.contains("rt-secret"));
        assert!(debug.contains("doctor@clinic.in"));
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now().timestamp();
        assert!(identity(Some(now - 1)).is_expired());
        assert!(!identity(Some(now + 600)).is_expired());
        assert!(!identity(None).is_expired());
    }
}
