//! Site settings and account security.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{AdminPage, audit, back_to};
use crate::components::{Singleton, Toast, push_flash};
use crate::db::Table;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::{AdminSettings, SettingsForm};
use crate::state::AppState;

const PATH: &str = "/admin/settings";

const EMAIL_CHANGE_SENT: &str = "A confirmation link has been sent to your new email address. Please click it to complete the email change.";

/// Settings template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/settings.html")]
pub struct SettingsTemplate {
    pub page: AdminPage,
    /// `None` when the stored settings could not be read.
    pub settings: Option<AdminSettings>,
}

#[derive(Deserialize)]
pub struct EmailForm {
    #[serde(default)]
    pub new_email: String,
}

#[derive(Deserialize)]
pub struct PasswordForm {
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl std::fmt::Debug for PasswordForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordForm").finish_non_exhaustive()
    }
}

/// Settings form, provisioning the default row on first visit.
#[instrument(skip_all, fields(user_id = %admin.user_id))]
pub async fn show(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
) -> Response {
    let caller = admin.caller();
    let table = Table::<AdminSettings>::new(state.tables(), &caller);
    let mut settings = Singleton::new();
    let page = AdminPage::new(&admin, &session, PATH).await;

    match settings.ensure_exists(&table).await {
        Ok(row) => SettingsTemplate {
            page,
            settings: Some(row.clone()),
        }
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load settings");
            (
                AppError::from(e).status(),
                SettingsTemplate {
                    page: page.with_toast(Some(Toast::error("Failed to load settings."))),
                    settings: None,
                },
            )
                .into_response()
        }
    }
}

/// Save the site settings.
#[instrument(skip_all, fields(user_id = %admin.user_id))]
pub async fn save(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SettingsForm>,
) -> Response {
    let caller = admin.caller();
    let table = Table::<AdminSettings>::new(state.tables(), &caller);
    let mut settings = Singleton::new();

    let saved = match settings.ensure_exists(&table).await {
        Ok(row) => table.update(row.id.as_uuid(), &form.to_patch()).await,
        Err(e) => Err(e),
    };

    match saved {
        Ok(row) => {
            tracing::info!(
                maintenance = row.maintenance_mode,
                selling = row.medicine_selling_enabled,
                "Settings saved"
            );
            push_flash(
                &session,
                Toast::success("Settings Saved", "Your settings have been updated successfully."),
            )
            .await;
            audit("Settings saved", row.id.as_uuid());
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to save settings");
            push_flash(&session, Toast::error("Failed to save settings.")).await;
        }
    }
    back_to(PATH)
}

/// Start an email change; the new address must confirm it.
#[instrument(skip_all, fields(user_id = %admin.user_id))]
pub async fn change_email(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<EmailForm>,
) -> Response {
    let toast = match state.auth().change_email(&admin, &form.new_email).await {
        Ok(_) => {
            audit("Email change requested", admin.user_id.as_uuid());
            Toast::success("Confirmation Email Sent", EMAIL_CHANGE_SENT)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Email change failed");
            Toast::error(e.user_message())
        }
    };
    push_flash(&session, toast).await;
    back_to(PATH)
}

/// Change the signed-in admin's password.
#[instrument(skip_all, fields(user_id = %admin.user_id))]
pub async fn change_password(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<PasswordForm>,
) -> Response {
    let toast = match state
        .auth()
        .change_password(&admin, &form.new_password, &form.confirm_password)
        .await
    {
        Ok(()) => {
            audit("Password changed", admin.user_id.as_uuid());
            Toast::success("Password Updated", "Your password has been updated successfully.")
        }
        Err(e) => {
            tracing::warn!(error = %e, "Password change failed");
            Toast::error(e.user_message())
        }
    };
    push_flash(&session, toast).await;
    back_to(PATH)
}
