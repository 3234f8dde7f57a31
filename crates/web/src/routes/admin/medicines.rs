//! Medicine catalog handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;
use uuid::Uuid;

use siddha_clinic_core::StockStatus;

use super::{AdminPage, ConfirmForm, audit, back_to, failure_toast, loaded_screen, settle};
use crate::components::{
    Confirmation, CrudError, InsertAt, ListFilter, Toast, load_screen, push_flash, save_screen,
};
use crate::db::Table;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::medicine::CATEGORIES;
use crate::models::{Medicine, MedicineDraft, SessionIdentity};
use crate::services::ImageField;
use crate::services::upload::MAX_BATCH_FILES;
use crate::state::AppState;
use crate::supabase;

const PATH: &str = "/admin/medicines";

/// Storage folder for medicine photos.
pub const UPLOAD_FOLDER: &str = "medicines";

/// Medicine list template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/medicines.html")]
pub struct MedicinesTemplate {
    pub page: AdminPage,
    pub rows: Vec<Medicine>,
    pub filter: ListFilter,
    pub loaded: bool,
}

/// Add / edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/medicine_form.html")]
pub struct MedicineFormTemplate {
    pub page: AdminPage,
    pub draft: MedicineDraft,
    /// `None` while adding.
    pub medicine_id: Option<Uuid>,
    pub categories: &'static [&'static str],
    pub stock_statuses: &'static [StockStatus],
    pub upload_folder: &'static str,
    pub max_files: usize,
}

impl MedicineFormTemplate {
    async fn new(
        admin: &SessionIdentity,
        session: &Session,
        draft: MedicineDraft,
        medicine_id: Option<Uuid>,
    ) -> Self {
        Self {
            page: AdminPage::new(admin, session, PATH).await,
            draft,
            medicine_id,
            categories: CATEGORIES,
            stock_statuses: StockStatus::KNOWN,
            upload_folder: UPLOAD_FOLDER,
            max_files: MAX_BATCH_FILES,
        }
    }

    /// Where the form posts.
    #[must_use]
    pub fn action(&self) -> String {
        self.medicine_id
            .map_or_else(|| PATH.to_string(), |id| format!("{PATH}/{id}"))
    }
}

fn list_query() -> supabase::Query {
    supabase::Query::new().order_desc("created_at")
}

/// Apply a pending gallery removal to the draft.
///
/// Returns true when the request was a removal rather than a save.
fn take_removal(draft: &mut MedicineDraft) -> bool {
    let Some(url) = draft.remove_image.take() else {
        return false;
    };
    let mut gallery = ImageField::Multiple(draft.image_list());
    gallery.remove(&url);
    draft.images = gallery.into_urls().join("\n");
    true
}

/// Re-render the form with the failure shown, keeping the admin's input.
async fn form_failure(
    admin: &SessionIdentity,
    session: &Session,
    draft: MedicineDraft,
    medicine_id: Option<Uuid>,
    err: CrudError,
) -> Response {
    tracing::warn!(error = %err, "Failed to save medicine");
    let toast = failure_toast(&err, "Failed to save medicine.");
    let status = AppError::from(err).status();
    let mut template = MedicineFormTemplate::new(admin, session, draft, medicine_id).await;
    template.page = template.page.with_toast(Some(toast));
    (status, template).into_response()
}

/// Medicine list with search.
#[instrument(skip_all, fields(user_id = %admin.user_id))]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<ListFilter>,
) -> Response {
    let caller = admin.caller();
    let table = Table::<Medicine>::new(state.tables(), &caller);
    let mut screen = load_screen::<Medicine>(&session).await;

    let toast = match screen.mount(&table, &list_query()).await {
        Ok(()) => None,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load medicines");
            Some(Toast::error("Failed to load medicines."))
        }
    };
    save_screen(&session, &screen).await;

    MedicinesTemplate {
        page: AdminPage::new(&admin, &session, PATH).await.with_toast(toast),
        rows: screen.visible(&filter).into_iter().cloned().collect(),
        filter,
        loaded: screen.is_loaded(),
    }
    .into_response()
}

/// Blank add form with catalog defaults.
#[instrument(skip_all)]
pub async fn new_form(RequireAdmin(admin): RequireAdmin, session: Session) -> Response {
    MedicineFormTemplate::new(&admin, &session, MedicineDraft::default(), None)
        .await
        .into_response()
}

/// Add a medicine to the catalog.
#[instrument(skip_all, fields(user_id = %admin.user_id))]
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Form(mut draft): Form<MedicineDraft>,
) -> Response {
    if take_removal(&mut draft) {
        return MedicineFormTemplate::new(&admin, &session, draft, None)
            .await
            .into_response();
    }

    let caller = admin.caller();
    let table = Table::<Medicine>::new(state.tables(), &caller);
    let mut screen = load_screen::<Medicine>(&session).await;

    let result = match draft.validate() {
        Ok(row) => screen.create(&table, &row, InsertAt::Front).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(created) => {
            if screen.is_loaded() {
                screen.mark_fresh();
            }
            save_screen(&session, &screen).await;
            push_flash(
                &session,
                Toast::success(
                    "Medicine Added",
                    format!("{} has been added to your catalog.", created.name),
                ),
            )
            .await;
            audit("Medicine added", created.id.as_uuid());
            back_to(PATH)
        }
        Err(e) => form_failure(&admin, &session, draft, None, e).await,
    }
}

/// Edit form, prefilled from the list copy or the backend.
#[instrument(skip_all, fields(user_id = %admin.user_id, %id))]
pub async fn edit(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let screen = load_screen::<Medicine>(&session).await;
    let medicine = match screen.find(id) {
        Some(medicine) => medicine.clone(),
        None => {
            let caller = admin.caller();
            Table::<Medicine>::new(state.tables(), &caller)
                .get(id)
                .await?
                .ok_or_else(|| AppError::NotFound("Medicine".to_string()))?
        }
    };

    Ok(MedicineFormTemplate::new(
        &admin,
        &session,
        MedicineDraft::from_medicine(&medicine),
        Some(id),
    )
    .await
    .into_response())
}

/// Save changes to a medicine.
#[instrument(skip_all, fields(user_id = %admin.user_id, %id))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Form(mut draft): Form<MedicineDraft>,
) -> Response {
    if take_removal(&mut draft) {
        return MedicineFormTemplate::new(&admin, &session, draft, Some(id))
            .await
            .into_response();
    }

    let caller = admin.caller();
    let table = Table::<Medicine>::new(state.tables(), &caller);
    let mut screen = load_screen::<Medicine>(&session).await;

    let result = match draft.validate() {
        Ok(patch) => screen.update(&table, id, &patch).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => {
            if screen.is_loaded() {
                screen.mark_fresh();
            }
            save_screen(&session, &screen).await;
            push_flash(
                &session,
                Toast::success(
                    "Medicine Updated",
                    format!("{} has been updated.", draft.name.trim()),
                ),
            )
            .await;
            audit("Medicine updated", id);
            back_to(PATH)
        }
        Err(e) => form_failure(&admin, &session, draft, Some(id), e).await,
    }
}

/// Show or hide a medicine on the public site.
#[instrument(skip_all, fields(user_id = %admin.user_id, %id))]
pub async fn toggle(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Response {
    let caller = admin.caller();
    let table = Table::<Medicine>::new(state.tables(), &caller);
    let mut screen = loaded_screen(&session, &table, &list_query()).await;

    let result = screen.toggle(&table, id, "is_active").await;

    if let Some(active) = settle(
        &session,
        &mut screen,
        result,
        |active| {
            if *active {
                Toast::success("Medicine Activated", "The medicine is now visible on the website.")
            } else {
                Toast::success("Medicine Deactivated", "The medicine is now hidden on the website.")
            }
        },
        "Failed to save medicine.",
    )
    .await
    {
        audit(if active { "Medicine activated" } else { "Medicine deactivated" }, id);
    }
    back_to(PATH)
}

/// Remove a medicine once confirmed.
#[instrument(skip_all, fields(user_id = %admin.user_id, %id))]
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Form(form): Form<ConfirmForm>,
) -> Response {
    let caller = admin.caller();
    let table = Table::<Medicine>::new(state.tables(), &caller);
    let mut screen = load_screen::<Medicine>(&session).await;

    let result = screen
        .delete(&table, id, Confirmation::from_form(form.confirm.as_deref()))
        .await;

    if settle(
        &session,
        &mut screen,
        result,
        |_| Toast::success("Medicine Deleted", "The medicine has been removed from your catalog."),
        "Failed to delete medicine.",
    )
    .await
    .is_some()
    {
        audit("Medicine deleted", id);
    }
    back_to(PATH)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;
    use crate::models::ValidationError;

    #[test]
    fn test_take_removal_drops_only_that_image() {
        let mut draft = MedicineDraft {
            images: "https://cdn/a.png\nhttps://cdn/b.png".to_string(),
            remove_image: Some("https://cdn/a.png".to_string()),
            ..MedicineDraft::default()
        };
        assert!(take_removal(&mut draft));
        assert_eq!(draft.images, "https://cdn/b.png");
        assert_eq!(draft.remove_image, None);

        assert!(!take_removal(&mut draft));
    }

    #[test]
    fn test_validation_failure_is_bad_request() {
        assert_eq!(
            AppError::from(CrudError::Validation(ValidationError::NonPositivePrice)).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
