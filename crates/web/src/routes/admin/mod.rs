//! Admin back-office route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /admin/login                       - Login page
//! POST /admin/login                       - Sign in
//! GET  /admin/signup                      - Sign-up page
//! POST /admin/signup                      - Register (no role granted)
//! POST /admin/logout                      - Sign out
//!
//! GET  /admin                             - Dashboard
//! GET  /admin/consultations               - Consultation list (?q=&status=)
//! POST /admin/consultations/{id}/status   - Update status
//! POST /admin/consultations/{id}/notes    - Save doctor notes
//! POST /admin/consultations/{id}/delete   - Delete (confirmed)
//! GET  /admin/medicines                   - Medicine list (?q=)
//! GET  /admin/medicines/new               - New medicine form
//! POST /admin/medicines                   - Create medicine
//! GET  /admin/medicines/{id}/edit         - Edit medicine form
//! POST /admin/medicines/{id}              - Update medicine
//! POST /admin/medicines/{id}/toggle       - Activate / deactivate
//! POST /admin/medicines/{id}/delete       - Delete (confirmed)
//! GET  /admin/inquiries                   - Inquiry list (?q=&status=)
//! POST /admin/inquiries/{id}/status       - Update status
//! POST /admin/inquiries/{id}/notes        - Save notes
//! POST /admin/inquiries/{id}/delete       - Delete (confirmed)
//! GET  /admin/content                     - Services and SEO
//! POST /admin/content/seo                 - Save SEO block
//! POST /admin/content/services            - Create service
//! POST /admin/content/services/{id}       - Update service
//! POST /admin/content/services/{id}/toggle - Enable / disable
//! POST /admin/content/services/{id}/delete - Delete (confirmed)
//! GET  /admin/profile                     - Doctor profile form
//! POST /admin/profile                     - Save profile
//! GET  /admin/settings                    - Settings form
//! POST /admin/settings                    - Save settings
//! POST /admin/settings/email              - Request email change
//! POST /admin/settings/password           - Change password
//! POST /admin/uploads                     - Image upload (multipart, JSON)
//! ```

pub mod auth;
pub mod consultations;
pub mod content;
pub mod dashboard;
pub mod inquiries;
pub mod medicines;
pub mod profile;
pub mod settings;
pub mod uploads;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use uuid::Uuid;

use crate::components::{
    CrudError, CrudScreen, Toast, load_screen, push_flash, save_screen, take_flash,
};
use crate::db::{Record, Table};
use crate::error::add_breadcrumb;
use crate::models::SessionIdentity;
use crate::state::AppState;
use crate::supabase;

/// Header and sidebar data shared by every admin page.
#[derive(Debug, Clone)]
pub struct AdminPage {
    pub email: String,
    pub current_path: &'static str,
    pub toast: Option<Toast>,
}

impl AdminPage {
    /// Build the page chrome, consuming any queued toast.
    pub async fn new(
        identity: &SessionIdentity,
        session: &Session,
        current_path: &'static str,
    ) -> Self {
        Self {
            email: identity.display_email().to_string(),
            current_path,
            toast: take_flash(session).await,
        }
    }

    /// Show `toast` instead of the queued one when set.
    #[must_use]
    pub fn with_toast(mut self, toast: Option<Toast>) -> Self {
        if toast.is_some() {
            self.toast = toast;
        }
        self
    }

    /// Whether a sidebar link points at the current section.
    #[must_use]
    pub fn is_current(&self, path: &str) -> bool {
        self.current_path == path
    }
}

/// Hidden `confirm` field sent by delete forms.
#[derive(Debug, Default, Deserialize)]
pub struct ConfirmForm {
    #[serde(default)]
    pub confirm: Option<String>,
}

/// Single-text-field forms (status, notes).
#[derive(Debug, Default, Deserialize)]
pub struct StatusForm {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct NotesForm {
    #[serde(default)]
    pub notes: String,
}

/// Toast for a failed mutation: validation problems are spelled out, backend
/// failures get the screen's fixed message.
#[must_use]
pub fn failure_toast(err: &CrudError, failure: &str) -> Toast {
    match err {
        CrudError::Validation(e) => Toast::titled_error("Validation Error", e.to_string()),
        CrudError::ConfirmationRequired | CrudError::NotInView => Toast::error(err.user_message()),
        CrudError::Repository(_) => Toast::error(failure),
    }
}

/// Store the patched screen and queue the outcome toast after a mutation.
///
/// Returns the mutation's value on success.
pub async fn settle<T: Record, R>(
    session: &Session,
    screen: &mut CrudScreen<T>,
    result: Result<R, CrudError>,
    success: impl FnOnce(&R) -> Toast,
    failure: &str,
) -> Option<R> {
    match result {
        Ok(value) => {
            if screen.is_loaded() {
                screen.mark_fresh();
            }
            save_screen(session, screen).await;
            push_flash(session, success(&value)).await;
            Some(value)
        }
        Err(e) => {
            tracing::warn!(error = %e, table = T::TABLE, "Admin change failed");
            push_flash(session, failure_toast(&e, failure)).await;
            None
        }
    }
}

/// The session's screen, loaded from the backend if it never was.
///
/// Row-level actions (toggle) need the row in view; a load failure is logged
/// and the action then reports the row as not loaded.
pub async fn loaded_screen<T: Record>(
    session: &Session,
    table: &Table<'_, T>,
    query: &supabase::Query,
) -> CrudScreen<T> {
    let mut screen = load_screen::<T>(session).await;
    if !screen.is_loaded()
        && let Err(e) = screen.load(table, query).await
    {
        tracing::warn!(error = %e, table = T::TABLE, "Failed to load screen");
    }
    screen
}

/// Breadcrumb for a successful admin change to one row.
pub fn audit(message: &str, id: Uuid) {
    let id = id.to_string();
    add_breadcrumb("admin", message, Some(&[("id", id.as_str())]));
}

/// 303 back to a list page.
pub fn back_to(path: &str) -> Response {
    Redirect::to(path).into_response()
}

/// Create the admin router, nested at `/admin`.
pub fn router() -> Router<AppState> {
    Router::new()
        // Auth
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/signup", get(auth::signup_page).post(auth::signup))
        .route("/logout", post(auth::logout))
        // Dashboard
        .route("/", get(dashboard::index))
        // Consultations
        .route("/consultations", get(consultations::index))
        .route("/consultations/{id}/status", post(consultations::update_status))
        .route("/consultations/{id}/notes", post(consultations::save_notes))
        .route("/consultations/{id}/delete", post(consultations::delete))
        // Medicines
        .route("/medicines", get(medicines::index).post(medicines::create))
        .route("/medicines/new", get(medicines::new_form))
        .route("/medicines/{id}", post(medicines::update))
        .route("/medicines/{id}/edit", get(medicines::edit))
        .route("/medicines/{id}/toggle", post(medicines::toggle))
        .route("/medicines/{id}/delete", post(medicines::delete))
        // Inquiries
        .route("/inquiries", get(inquiries::index))
        .route("/inquiries/{id}/status", post(inquiries::update_status))
        .route("/inquiries/{id}/notes", post(inquiries::save_notes))
        .route("/inquiries/{id}/delete", post(inquiries::delete))
        // Website content
        .route("/content", get(content::index))
        .route("/content/seo", post(content::save_seo))
        .route("/content/services", post(content::create_service))
        .route("/content/services/{id}", post(content::update_service))
        .route("/content/services/{id}/toggle", post(content::toggle_service))
        .route("/content/services/{id}/delete", post(content::delete_service))
        // Singletons
        .route("/profile", get(profile::show).post(profile::save))
        .route("/settings", get(settings::show).post(settings::save))
        .route("/settings/email", post(settings::change_email))
        .route("/settings/password", post(settings::change_password))
        // Uploads
        .route(
            "/uploads",
            post(uploads::upload).layer(DefaultBodyLimit::max(uploads::BODY_LIMIT)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::ToastKind;
    use crate::db::RepositoryError;
    use crate::models::ValidationError;
    use crate::supabase::StoreError;

    #[test]
    fn test_failure_toast() {
        let toast = failure_toast(
            &CrudError::Validation(ValidationError::Required("Name")),
            "Failed to save medicine.",
        );
        assert_eq!(toast.title, "Validation Error");
        assert_eq!(toast.description, "Name is required");

        let toast = failure_toast(
            &CrudError::Repository(RepositoryError::Store(StoreError::Unavailable(
                "down".into(),
            ))),
            "Failed to save medicine.",
        );
        assert_eq!(toast.kind, ToastKind::Error);
        assert_eq!(toast.title, "Error");
        assert_eq!(toast.description, "Failed to save medicine.");
    }
}
