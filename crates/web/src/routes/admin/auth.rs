//! Admin sign-in, sign-up and sign-out.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::components::{Toast, push_flash};
use crate::filters;
use crate::middleware::LOGIN_PATH;
use crate::services::{AuthError, GateOutcome, decide};
use crate::state::AppState;

/// Shown to signed-in users who lack the admin role.
pub const NO_ADMIN_ACCESS: &str =
    "You do not have admin access. Please contact the administrator.";

const SIGNED_UP: &str = "Account created! Please check your email to confirm your account, or sign in if confirmation is not required.";

// =============================================================================
// Form Types
// =============================================================================

/// Login and sign-up form data.
#[derive(Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for CredentialsForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsForm")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Login / sign-up page. `tab` selects which form is shown.
#[derive(Template, WebTemplate)]
#[template(path = "admin/login.html")]
pub struct LoginTemplate {
    pub tab: &'static str,
    pub email: String,
    pub error: Option<String>,
    pub notice: Option<String>,
}

impl LoginTemplate {
    fn login(email: String, error: Option<String>) -> Self {
        Self {
            tab: "login",
            email,
            error,
            notice: None,
        }
    }

    fn signup(email: String, error: Option<String>, notice: Option<String>) -> Self {
        Self {
            tab: "signup",
            email,
            error,
            notice,
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the login page, or go straight to the dashboard if already an admin.
#[instrument(skip_all)]
pub async fn login_page(State(state): State<AppState>, session: Session) -> Response {
    match decide(state.auth().resolve(&session).await) {
        GateOutcome::Authorized(_) => Redirect::to("/admin").into_response(),
        GateOutcome::AccessDenied(identity) => LoginTemplate::login(
            identity.email.unwrap_or_default(),
            Some(NO_ADMIN_ACCESS.to_string()),
        )
        .into_response(),
        GateOutcome::Loading | GateOutcome::RedirectToLogin => {
            LoginTemplate::login(String::new(), None).into_response()
        }
    }
}

/// Handle login form submission.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Response {
    match state
        .auth()
        .sign_in(&session, &form.email, &form.password)
        .await
    {
        Ok(outcome) if outcome.is_admin => {
            push_flash(&session, Toast::success("Welcome back", "Signed in successfully.")).await;
            Redirect::to("/admin").into_response()
        }
        Ok(_) => (
            StatusCode::FORBIDDEN,
            LoginTemplate::login(form.email, Some(NO_ADMIN_ACCESS.to_string())),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            (
                login_error_status(&e),
                LoginTemplate::login(form.email, Some(e.user_message())),
            )
                .into_response()
        }
    }
}

/// Display the sign-up form.
pub async fn signup_page() -> impl IntoResponse {
    LoginTemplate::signup(String::new(), None, None)
}

/// Register a new account. The account gets no role; an administrator
/// grants it out of band.
#[instrument(skip(state, form), fields(email = %form.email))]
pub async fn signup(State(state): State<AppState>, Form(form): Form<CredentialsForm>) -> Response {
    match state.auth().sign_up(&form.email, &form.password).await {
        Ok(_) => LoginTemplate::signup(form.email, None, Some(SIGNED_UP.to_string())).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Sign-up failed");
            (
                login_error_status(&e),
                LoginTemplate::signup(form.email, Some(e.user_message()), None),
            )
                .into_response()
        }
    }
}

/// Sign out and return to the login page.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: Session) -> Response {
    state.auth().sign_out(&session).await;
    Redirect::to(LOGIN_PATH).into_response()
}

const fn login_error_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidEmail(_)
        | AuthError::InvalidPassword(_)
        | AuthError::Rejected(_)
        | AuthError::SameEmail => StatusCode::BAD_REQUEST,
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::AlreadyRegistered => StatusCode::CONFLICT,
        AuthError::Store(_) | AuthError::Role(_) | AuthError::Session(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
