//! Admin gate extractor.
//!
//! Every `/admin/*` handler except login, signup and logout takes
//! [`RequireAdmin`]. The extractor resolves the session against the identity
//! service and the `user_roles` table, then applies [`decide`].

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::FromRequestParts,
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::SessionIdentity;
use crate::services::{GateOutcome, decide};
use crate::state::AppState;

/// Where unauthenticated admin requests are sent.
pub const LOGIN_PATH: &str = "/admin/login";

/// Seconds before the loading page reloads itself.
const LOADING_REFRESH_SECS: u32 = 2;

/// Extractor that requires a signed-in admin.
///
/// # Example
///
/// ```rust,ignore
/// async fn dashboard(RequireAdmin(admin): RequireAdmin) -> impl IntoResponse {
///     format!("Hello, {}!", admin.display_email())
/// }
/// ```
pub struct RequireAdmin(pub SessionIdentity);

/// Spinner shown while auth resolution is pending.
#[derive(Template, WebTemplate)]
#[template(path = "admin/loading.html")]
pub struct LoadingTemplate {
    pub refresh_secs: u32,
}

/// Rendered in place for signed-in users without the admin role.
#[derive(Template, WebTemplate)]
#[template(path = "admin/access_denied.html")]
pub struct AccessDeniedTemplate {
    pub email: String,
}

/// Why an admin request was not let through.
#[derive(Debug)]
pub enum AdminGateRejection {
    Loading,
    RedirectToLogin,
    AccessDenied(SessionIdentity),
    /// The session layer is missing from the stack.
    NoSession,
}

impl IntoResponse for AdminGateRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Loading => (
                StatusCode::SERVICE_UNAVAILABLE,
                [(header::RETRY_AFTER, LOADING_REFRESH_SECS.to_string())],
                LoadingTemplate {
                    refresh_secs: LOADING_REFRESH_SECS,
                },
            )
                .into_response(),
            Self::RedirectToLogin => Redirect::to(LOGIN_PATH).into_response(),
            Self::AccessDenied(identity) => (
                StatusCode::FORBIDDEN,
                AccessDeniedTemplate {
                    email: identity.display_email().to_string(),
                },
            )
                .into_response(),
            Self::NoSession => {
                tracing::error!("Session layer missing for admin route");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AdminGateRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AdminGateRejection::NoSession)?;

        let snapshot = state.auth().resolve(&session).await;
        match decide(snapshot) {
            GateOutcome::Authorized(identity) => Ok(Self(identity)),
            GateOutcome::Loading => Err(AdminGateRejection::Loading),
            GateOutcome::RedirectToLogin => Err(AdminGateRejection::RedirectToLogin),
            GateOutcome::AccessDenied(identity) => {
                tracing::info!(user_id = %identity.user_id, path = %parts.uri.path(), "Admin access denied");
                Err(AdminGateRejection::AccessDenied(identity))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_goes_to_login() {
        let response = AdminGateRejection::RedirectToLogin.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], LOGIN_PATH);
    }

    #[test]
    fn test_loading_asks_for_retry() {
        let response = AdminGateRejection::Loading.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
    }
}
