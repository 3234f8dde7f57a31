//! Consultation request handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;
use tracing::instrument;
use uuid::Uuid;

use siddha_clinic_core::ConsultationStatus;

use super::{AdminPage, ConfirmForm, NotesForm, StatusForm, audit, back_to, settle};
use crate::components::{Confirmation, CrudError, ListFilter, Toast, load_screen, save_screen};
use crate::db::Table;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::{Consultation, ValidationError};
use crate::state::AppState;
use crate::supabase;

const PATH: &str = "/admin/consultations";

/// Consultation list template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/consultations.html")]
pub struct ConsultationsTemplate {
    pub page: AdminPage,
    pub rows: Vec<Consultation>,
    pub filter: ListFilter,
    pub statuses: &'static [ConsultationStatus],
    pub loaded: bool,
}

fn list_query() -> supabase::Query {
    supabase::Query::new().order_desc("created_at")
}

fn parse_status(text: &str) -> Result<ConsultationStatus, ValidationError> {
    let status = ConsultationStatus::from(text.trim().to_string());
    if status.is_known() {
        Ok(status)
    } else {
        Err(ValidationError::Invalid {
            field: "status",
            message: format!("unknown status {text:?}"),
        })
    }
}

/// Consultation list with search and status filter.
#[instrument(skip_all, fields(user_id = %admin.user_id))]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<ListFilter>,
) -> Response {
    let caller = admin.caller();
    let table = Table::<Consultation>::new(state.tables(), &caller);
    let mut screen = load_screen::<Consultation>(&session).await;

    let toast = match screen.mount(&table, &list_query()).await {
        Ok(()) => None,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load consultations");
            Some(Toast::error("Failed to load consultations."))
        }
    };
    save_screen(&session, &screen).await;

    ConsultationsTemplate {
        page: AdminPage::new(&admin, &session, PATH).await.with_toast(toast),
        rows: screen.visible(&filter).into_iter().cloned().collect(),
        filter,
        statuses: ConsultationStatus::KNOWN,
        loaded: screen.is_loaded(),
    }
    .into_response()
}

/// Move a consultation through its lifecycle.
#[instrument(skip_all, fields(user_id = %admin.user_id, %id))]
pub async fn update_status(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Form(form): Form<StatusForm>,
) -> Response {
    let caller = admin.caller();
    let table = Table::<Consultation>::new(state.tables(), &caller);
    let mut screen = load_screen::<Consultation>(&session).await;

    let result = match parse_status(&form.status) {
        Ok(status) => screen
            .update(&table, id, &json!({ "status": status }))
            .await
            .map(|()| status),
        Err(e) => Err(CrudError::from(e)),
    };

    let updated = settle(
        &session,
        &mut screen,
        result,
        |status| Toast::success("Status Updated", format!("Consultation marked as {status}.")),
        "Failed to update status.",
    )
    .await;
    if let Some(status) = updated {
        audit(&format!("Consultation marked as {status}"), id);
    }
    back_to(PATH)
}

/// Save the doctor's private notes.
#[instrument(skip_all, fields(user_id = %admin.user_id, %id))]
pub async fn save_notes(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Form(form): Form<NotesForm>,
) -> Response {
    let caller = admin.caller();
    let table = Table::<Consultation>::new(state.tables(), &caller);
    let mut screen = load_screen::<Consultation>(&session).await;

    let notes = form.notes.trim();
    let result = screen
        .update(&table, id, &json!({ "doctor_notes": notes }))
        .await;

    if settle(
        &session,
        &mut screen,
        result,
        |_| Toast::success("Notes Saved", "Doctor notes have been saved."),
        "Failed to save notes.",
    )
    .await
    .is_some()
    {
        audit("Consultation notes saved", id);
    }
    back_to(PATH)
}

/// Delete a consultation once confirmed.
#[instrument(skip_all, fields(user_id = %admin.user_id, %id))]
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Form(form): Form<ConfirmForm>,
) -> Response {
    let caller = admin.caller();
    let table = Table::<Consultation>::new(state.tables(), &caller);
    let mut screen = load_screen::<Consultation>(&session).await;

    let result = screen
        .delete(&table, id, Confirmation::from_form(form.confirm.as_deref()))
        .await;

    if settle(
        &session,
        &mut screen,
        result,
        |_| Toast::success("Consultation Deleted", "The consultation request has been removed."),
        "Failed to delete consultation.",
    )
    .await
    .is_some()
    {
        audit("Consultation deleted", id);
    }
    back_to(PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_rejects_unknown() {
        assert_eq!(parse_status(" Contacted "), Ok(ConsultationStatus::Contacted));
        assert!(matches!(
            parse_status("Rescheduled"),
            Err(ValidationError::Invalid { field: "status", .. })
        ));
    }
}
