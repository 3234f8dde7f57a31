//! Unified error handling with Sentry integration.
//!
//! Handlers return `Result<T, AppError>`. Server-side failures are captured
//! to Sentry before the response is built, and internal details never reach
//! the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use siddha_clinic_core::UserId;

use crate::components::CrudError;
use crate::db::RepositoryError;
use crate::models::ValidationError;
use crate::services::{AuthError, UploadError};
use crate::supabase::StoreError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Repository operation failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Raw backend call failed.
    #[error("Backend error: {0}")]
    Store(#[from] StoreError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Image upload failed.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Form input rejected.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Session store failure.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CrudError> for AppError {
    fn from(err: CrudError) -> Self {
        match err {
            CrudError::Validation(e) => Self::Validation(e),
            CrudError::Repository(e) => Self::Repository(e),
            CrudError::ConfirmationRequired => {
                Self::BadRequest("Deletion must be confirmed".to_string())
            }
            CrudError::NotInView => Self::NotFound("Record".to_string()),
        }
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Repository(RepositoryError::NotFound) | Self::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Repository(e) if e.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Store(e) if e.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Repository(RepositoryError::Store(StoreError::Unauthorized))
            | Self::Store(StoreError::Unauthorized)
            | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Repository(RepositoryError::Store(StoreError::Forbidden(_)))
            | Self::Store(StoreError::Forbidden(_))
            | Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Repository(_) | Self::Store(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::AlreadyRegistered => StatusCode::CONFLICT,
                AuthError::InvalidEmail(_)
                | AuthError::InvalidPassword(_)
                | AuthError::SameEmail
                | AuthError::Rejected(_) => StatusCode::BAD_REQUEST,
                AuthError::Store(_) | AuthError::Role(_) | AuthError::Session(_) => {
                    StatusCode::BAD_GATEWAY
                }
            },
            Self::Upload(UploadError::Store(StoreError::Forbidden(_))) => StatusCode::FORBIDDEN,
            Self::Upload(UploadError::Store(StoreError::Unauthorized)) => StatusCode::UNAUTHORIZED,
            Self::Upload(UploadError::Store(_)) => StatusCode::BAD_GATEWAY,
            Self::Upload(UploadError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Upload(UploadError::UnsupportedType { .. }) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            Self::Upload(UploadError::Empty | UploadError::TooMany { .. })
            | Self::Validation(_)
            | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }

    /// Message safe to show to the client.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::Repository(e) => e.user_message(),
            Self::Store(_) | Self::Session(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            Self::Auth(e) => e.user_message(),
            Self::Upload(e) => e.user_message(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, self.client_message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Associate subsequent Sentry events with a signed-in user.
pub fn set_sentry_user(user_id: UserId, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Record an admin action in the Sentry breadcrumb trail.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("medicine".to_string());
        assert_eq!(err.to_string(), "Not found: medicine");

        let err = AppError::from(ValidationError::Required("Name"));
        assert_eq!(err.to_string(), "Validation error: Name is required");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Repository(RepositoryError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Store(StoreError::Unavailable("down".into()))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(AppError::Store(StoreError::Forbidden("rls".into()))),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::InvalidCredentials)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Upload(UploadError::Empty)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_hidden() {
        let err = AppError::Store(StoreError::Decode("column \"secret\" missing".into()));
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn test_crud_error_conversion() {
        let err = AppError::from(CrudError::ConfirmationRequired);
        assert_eq!(get_status(err), StatusCode::BAD_REQUEST);
    }
}
