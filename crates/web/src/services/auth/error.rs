//! Authentication error types.

use thiserror::Error;

use siddha_clinic_core::{EmailError, PasswordError};

use crate::db::RepositoryError;
use crate::supabase::StoreError;

/// Errors that can occur during sign-in, sign-up and account changes.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Email failed local validation.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Password failed local validation.
    #[error("invalid password: {0}")]
    InvalidPassword(#[from] PasswordError),

    /// The identity service rejected the email/password pair.
    #[error("invalid login credentials")]
    InvalidCredentials,

    /// Sign-up for an address that already has an account.
    #[error("user already registered")]
    AlreadyRegistered,

    /// The new email equals the current one.
    #[error("new email is the same as the current email")]
    SameEmail,

    /// The identity service rejected the request for another reason.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The identity service could not be reached or failed.
    #[error("identity service error: {0}")]
    Store(StoreError),

    /// Role lookup failed.
    #[error("role lookup failed: {0}")]
    Role(#[from] RepositoryError),

    /// Session store failure.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl AuthError {
    /// Classify a failed sign-in call.
    #[must_use]
    pub fn from_sign_in(err: StoreError) -> Self {
        match err {
            StoreError::Rejected(_) | StoreError::Unauthorized | StoreError::NotFound => {
                Self::InvalidCredentials
            }
            other => Self::Store(other),
        }
    }

    /// Classify a failed sign-up or account update call.
    #[must_use]
    pub fn from_account_change(err: StoreError) -> Self {
        match err {
            StoreError::Rejected(message) | StoreError::Conflict(message)
                if message.to_lowercase().contains("already") =>
            {
                Self::AlreadyRegistered
            }
            StoreError::Rejected(message) => Self::Rejected(message),
            other => Self::Store(other),
        }
    }

    /// Message shown on the form that triggered the error.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEmail(_) => "Please enter a valid email address.".to_string(),
            Self::InvalidPassword(PasswordError::TooShort { min }) => {
                format!("Password must be at least {min} characters.")
            }
            Self::InvalidPassword(PasswordError::Mismatch) => "Passwords do not match.".to_string(),
            Self::InvalidCredentials => "Invalid email or password.".to_string(),
            Self::AlreadyRegistered => "An account with this email already exists.".to_string(),
            Self::SameEmail => "Please enter a different email address.".to_string(),
            Self::Rejected(message) => message.clone(),
            Self::Store(_) | Self::Role(_) | Self::Session(_) => {
                "Unable to reach the server. Please try again.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_in_rejection_is_invalid_credentials() {
        let err = AuthError::from_sign_in(StoreError::Rejected("Invalid login credentials".into()));
        assert!(matches!(err, AuthError::InvalidCredentials));

        let err = AuthError::from_sign_in(StoreError::Unavailable("down".into()));
        assert!(matches!(err, AuthError::Store(_)));
    }

    #[test]
    fn test_duplicate_sign_up() {
        let err = AuthError::from_account_change(StoreError::Rejected(
            "User already registered".into(),
        ));
        assert!(matches!(err, AuthError::AlreadyRegistered));

        let err = AuthError::from_account_change(StoreError::Rejected("Password is weak".into()));
        assert_eq!(err.user_message(), "Password is weak");
    }

    #[test]
    fn test_password_messages() {
        let err = AuthError::from(PasswordError::TooShort { min: 6 });
        assert_eq!(err.user_message(), "Password must be at least 6 characters.");
    }
}
