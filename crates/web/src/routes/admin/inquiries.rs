//! Medicine inquiry handlers.

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

use siddha_clinic_core::InquiryStatus;

use super::{AdminPage, ConfirmForm, NotesForm, StatusForm, audit, back_to, settle};
use crate::components::{Confirmation, CrudError, ListFilter, Toast, load_screen, save_screen};
use crate::db::Table;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::{Inquiry, ValidationError};
use crate::state::AppState;
use crate::supabase;

const PATH: &str = "/admin/inquiries";

/// Inquiry list template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/inquiries.html")]
pub struct InquiriesTemplate {
    pub page: AdminPage,
    pub rows: Vec<Inquiry>,
    pub filter: ListFilter,
    pub statuses: &'static [InquiryStatus],
    pub loaded: bool,
}

fn list_query() -> supabase::Query {
    supabase::Query::new().order_desc("created_at")
}

fn parse_status(text: &str) -> Result<InquiryStatus, ValidationError> {
    let status = InquiryStatus::from(text.trim().to_string());
    if status.is_known() {
        Ok(status)
    } else {
        Err(ValidationError::Invalid {
            field: "status",
            message: format!("unknown status {text:?}"),
        })
    }
}

/// Inquiry list with search and status filter.
#[instrument(skip_all, fields(user_id = %admin.user_id))]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<ListFilter>,
) -> Response {
    let caller = admin.caller();
    let table = Table::<Inquiry>::new(state.tables(), &caller);
    let mut screen = load_screen::<Inquiry>(&session).await;

    let toast = match screen.mount(&table, &list_query()).await {
        Ok(()) => None,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load inquiries");
            Some(Toast::error("Failed to load inquiries."))
        }
    };
    save_screen(&session, &screen).await;

    InquiriesTemplate {
        page: AdminPage::new(&admin, &session, PATH).await.with_toast(toast),
        rows: screen.visible(&filter).into_iter().cloned().collect(),
        filter,
        statuses: InquiryStatus::KNOWN,
        loaded: screen.is_loaded(),
    }
    .into_response()
}

/// Mark an inquiry replied or closed.
#[instrument(skip_all, fields(user_id = %admin.user_id, %id))]
pub async fn update_status(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Form(form): Form<StatusForm>,
) -> Response {
    let caller = admin.caller();
    let table = Table::<Inquiry>::new(state.tables(), &caller);
    let mut screen = load_screen::<Inquiry>(&session).await;

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
        |status| Toast::success("Status Updated", format!("Inquiry marked as {status}.")),
        "Failed to update status.",
    )
    .await;
    if let Some(status) = updated {
        audit(&format!("Inquiry marked as {status}"), id);
    }
    back_to(PATH)
}

/// Save follow-up notes.
#[instrument(skip_all, fields(user_id = %admin.user_id, %id))]
pub async fn save_notes(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Form(form): Form<NotesForm>,
) -> Response {
    let caller = admin.caller();
    let table = Table::<Inquiry>::new(state.tables(), &caller);
    let mut screen = load_screen::<Inquiry>(&session).await;

    let notes = form.notes.trim();
    let result = screen
        .update(&table, id, &json!({ "notes": notes }))
        .await;

    if settle(
        &session,
        &mut screen,
        result,
        |_| Toast::success("Notes Saved", "Inquiry notes have been saved."),
        "Failed to save notes.",
    )
    .await
    .is_some()
    {
        audit("Inquiry notes saved", id);
    }
    back_to(PATH)
}

/// Delete an inquiry once confirmed.
#[instrument(skip_all, fields(user_id = %admin.user_id, %id))]
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Form(form): Form<ConfirmForm>,
) -> Response {
    let caller = admin.caller();
    let table = Table::<Inquiry>::new(state.tables(), &caller);
    let mut screen = load_screen::<Inquiry>(&session).await;

    let result = screen
        .delete(&table, id, Confirmation::from_form(form.confirm.as_deref()))
        .await;

    if settle(
        &session,
        &mut screen,
        result,
        |_| Toast::success("Inquiry Deleted", "The inquiry has been removed."),
        "Failed to delete inquiry.",
    )
    .await
    .is_some()
    {
        audit("Inquiry deleted", id);
    }
    back_to(PATH)
}
