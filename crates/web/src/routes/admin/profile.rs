//! Doctor profile handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use super::{AdminPage, audit, back_to, failure_toast};
use crate::components::{CrudError, Singleton, Toast, push_flash};
use crate::db::Table;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::{DoctorProfile, ProfileForm, SessionIdentity};
use crate::services::ImageField;
use crate::state::AppState;

const PATH: &str = "/admin/profile";

/// Storage folder for the profile photo.
pub const UPLOAD_FOLDER: &str = "profile";

/// Profile form template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/profile.html")]
pub struct ProfileTemplate {
    pub page: AdminPage,
    pub form: ProfileForm,
    /// False when the stored profile could not be read; the form is disabled.
    pub loaded: bool,
    pub upload_folder: &'static str,
}

impl ProfileTemplate {
    async fn new(admin: &SessionIdentity, session: &Session, form: ProfileForm, loaded: bool) -> Self {
        Self {
            page: AdminPage::new(admin, session, PATH).await,
            form,
            loaded,
            upload_folder: UPLOAD_FOLDER,
        }
    }
}

/// Profile form, provisioning the default profile on first visit.
#[instrument(skip_all, fields(user_id = %admin.user_id))]
pub async fn show(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
) -> Response {
    let caller = admin.caller();
    let table = Table::<DoctorProfile>::new(state.tables(), &caller);
    let mut profile = Singleton::new();

    match profile.ensure_exists(&table).await {
        Ok(row) => {
            let form = ProfileForm::from_profile(row);
            ProfileTemplate::new(&admin, &session, form, true)
                .await
                .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load profile");
            let mut template =
                ProfileTemplate::new(&admin, &session, ProfileForm::default(), false).await;
            template.page = template
                .page
                .with_toast(Some(Toast::error("Failed to load profile.")));
            (AppError::from(e).status(), template).into_response()
        }
    }
}

/// Save the profile.
#[instrument(skip_all, fields(user_id = %admin.user_id))]
pub async fn save(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Form(mut form): Form<ProfileForm>,
) -> Response {
    if let Some(url) = form.remove_photo.take() {
        let mut photo = ImageField::Single(Some(form.photo_url.clone()).filter(|u| !u.is_empty()));
        photo.remove(&url);
        form.photo_url = photo.into_urls().into_iter().next().unwrap_or_default();
        return ProfileTemplate::new(&admin, &session, form, true)
            .await
            .into_response();
    }

    let caller = admin.caller();
    let table = Table::<DoctorProfile>::new(state.tables(), &caller);
    let mut profile = Singleton::new();

    let result: Result<DoctorProfile, CrudError> = async {
        let patch = form.validate()?;
        let id = profile.ensure_exists(&table).await?.id.as_uuid();
        Ok(table.update(id, &patch).await?)
    }
    .await;

    match result {
        Ok(updated) => {
            push_flash(
                &session,
                Toast::success("Profile Saved", "Your profile has been updated successfully."),
            )
            .await;
            audit("Profile saved", updated.id.as_uuid());
            back_to(PATH)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to save profile");
            let toast = failure_toast(&e, "Failed to save profile.");
            let status = AppError::from(e).status();
            let mut template = ProfileTemplate::new(&admin, &session, form, true).await;
            template.page = template.page.with_toast(Some(toast));
            (status, template).into_response()
        }
    }
}
